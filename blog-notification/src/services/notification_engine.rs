use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use blog_shared::errors::{AppError, AppResult, ErrorCode};

use crate::clock::Clock;
use crate::mailer::Mailer;
use crate::models::{NewDigestQueueEntry, NewNotification, Notification};
use crate::preferences::PreferenceSettings;
use crate::schedule::{next_daily, next_weekly};
use crate::services::preference_service::PreferenceService;
use crate::store::NotificationStore;
use crate::templates;
use crate::types::{Channel, DigestKind, Frequency, NotificationType, RelatedData};

/// A notification-worthy event, fully formed by the producing service.
#[derive(Debug, Clone)]
pub struct DeliveryEvent {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub subtype: Option<String>,
    pub title: String,
    pub content: Option<String>,
    pub related_data: Option<RelatedData>,
}

impl DeliveryEvent {
    pub fn new(user_id: Uuid, notification_type: NotificationType, title: impl Into<String>) -> Self {
        Self {
            user_id,
            notification_type,
            subtype: None,
            title: title.into(),
            content: None,
            related_data: None,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_related_data(mut self, data: RelatedData) -> Self {
        self.related_data = Some(data);
        self
    }
}

/// Per-call channel overrides. A skipped channel is never used regardless
/// of the user's preferences.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryOptions {
    pub skip_in_app: bool,
    pub skip_email: bool,
}

/// Decides, per event, whether a notification is suppressed, delivered now,
/// or deferred into a digest.
#[derive(Clone)]
pub struct NotificationEngine {
    store: Arc<dyn NotificationStore>,
    preferences: PreferenceService,
    mailer: Mailer,
    clock: Arc<dyn Clock>,
    site_url: String,
}

impl NotificationEngine {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        mailer: Mailer,
        clock: Arc<dyn Clock>,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            preferences: PreferenceService::new(store.clone(), clock.clone()),
            store,
            mailer,
            clock,
            site_url: site_url.into(),
        }
    }

    /// Run one event through the delivery policy.
    ///
    /// Returns `Ok(None)` when the event is suppressed by the user's
    /// preferences; nothing is stored in that case. Email transport failures
    /// never surface here: the notification is returned with
    /// `is_email_sent == false`.
    pub async fn deliver(
        &self,
        event: DeliveryEvent,
        options: DeliveryOptions,
    ) -> AppResult<Option<Notification>> {
        let user_id = event.user_id;
        let kind = event.notification_type;
        let settings = self.preferences.get(user_id)?.settings;
        let channels = settings.channel_settings(kind);

        if channels.frequency == Frequency::Off {
            tracing::debug!(user_id = %user_id, notification_type = %kind, "notification type disabled, suppressed");
            return Ok(None);
        }

        if let (NotificationType::Interaction, Some(subtype)) = (kind, event.subtype.as_deref()) {
            if !settings.is_subtype_enabled(subtype) {
                tracing::debug!(user_id = %user_id, subtype, "interaction subtype disabled, suppressed");
                return Ok(None);
            }
        }

        let now = self.clock.now();
        let want_email = !options.skip_email
            && channels.email
            && settings.do_not_disturb.window().should_send_now(Channel::Email, &now);
        let want_in_app = !options.skip_in_app && channels.in_app;

        let digest = channels.frequency.digest_kind();
        if digest.is_none() && !want_in_app && !want_email {
            tracing::debug!(user_id = %user_id, notification_type = %kind, "no channel to deliver on, suppressed");
            return Ok(None);
        }

        // Resolved before anything is written so a corrupt digest time cannot
        // leave a notification without its queue entry.
        let scheduled_at = digest
            .map(|d| next_digest_at(self.clock.as_ref(), d, &settings, &now).map(|at| (d, at)))
            .transpose()?;

        let created_at = now.with_timezone(&Utc);
        let mut notification = self.store.insert_notification(&NewNotification {
            id: Uuid::now_v7(),
            user_id,
            notification_type: kind.as_str().to_string(),
            subtype: event.subtype,
            title: event.title,
            content: event.content,
            related_data: event.related_data.map(serde_json::Value::Object),
            is_in_app_sent: want_in_app,
            is_email_sent: false,
            created_at,
        })?;

        tracing::debug!(
            notification_id = %notification.id,
            user_id = %user_id,
            notification_type = %kind,
            frequency = ?channels.frequency,
            "notification created"
        );

        match scheduled_at {
            None if want_email => {
                if self.send_realtime_email(&notification).await {
                    notification.is_email_sent = true;
                }
            }
            None => {}
            Some((digest_kind, at)) => {
                let entry = self.store.enqueue(&NewDigestQueueEntry {
                    id: Uuid::now_v7(),
                    user_id,
                    notification_id: notification.id,
                    digest_type: digest_kind.as_str().to_string(),
                    scheduled_at: at.with_timezone(&Utc),
                    created_at,
                })?;
                tracing::debug!(
                    notification_id = %notification.id,
                    digest_type = %digest_kind,
                    scheduled_at = %entry.scheduled_at,
                    "notification queued for digest"
                );
            }
        }

        Ok(Some(notification))
    }

    /// [`Self::deliver`] for event producers: failures are logged, never
    /// returned, so the triggering action always succeeds.
    pub async fn notify(&self, event: DeliveryEvent, options: DeliveryOptions) -> Option<Notification> {
        let user_id = event.user_id;
        match self.deliver(event, options).await {
            Ok(notification) => notification,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "notification delivery failed");
                None
            }
        }
    }

    /// Best-effort immediate email. Returns whether the notification ended
    /// up marked as emailed.
    async fn send_realtime_email(&self, notification: &Notification) -> bool {
        let recipient = match self.store.find_recipient(notification.user_id) {
            Ok(Some(r)) => r,
            Ok(None) => {
                tracing::warn!(user_id = %notification.user_id, "no email address on file, skipping email");
                return false;
            }
            Err(e) => {
                tracing::error!(user_id = %notification.user_id, error = %e, "recipient lookup failed");
                return false;
            }
        };

        let (subject, html) = templates::render_realtime(notification, &self.site_url);
        if let Err(e) = self.mailer.send(&recipient, &subject, &html).await {
            tracing::warn!(
                notification_id = %notification.id,
                user_id = %notification.user_id,
                error = %e,
                "realtime notification email failed"
            );
            return false;
        }

        match self.store.mark_email_sent(notification.id) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(notification_id = %notification.id, error = %e, "failed to flag notification as emailed");
                false
            }
        }
    }
}

/// Fire time of the digest a notification created at `now` belongs to.
fn next_digest_at(
    clock: &dyn Clock,
    kind: DigestKind,
    settings: &PreferenceSettings,
    now: &DateTime<FixedOffset>,
) -> AppResult<DateTime<FixedOffset>> {
    let corrupt = || AppError::new(ErrorCode::InvalidPreference, "stored digest time is invalid");

    match kind {
        DigestKind::Daily => {
            let at = settings.digest_time.daily_time().ok_or_else(corrupt)?;
            Ok(next_daily(clock, now, at))
        }
        DigestKind::Weekly => {
            let at = settings.digest_time.weekly_time_of_day().ok_or_else(corrupt)?;
            let day = u32::try_from(settings.digest_time.weekly_day)
                .ok()
                .filter(|d| *d <= 6)
                .ok_or_else(corrupt)?;
            Ok(next_weekly(clock, now, day, at))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn next_at(kind: DigestKind, settings: &PreferenceSettings, now: &str) -> AppResult<DateTime<FixedOffset>> {
        let now = at(now);
        next_digest_at(&ManualClock::new(now), kind, settings, &now)
    }

    #[test]
    fn daily_digest_uses_configured_time() {
        let settings = PreferenceSettings::default();
        let next = next_at(DigestKind::Daily, &settings, "2024-03-04T10:00:00+00:00").unwrap();
        assert_eq!(next, at("2024-03-05T09:00:00+00:00"));
    }

    #[test]
    fn weekly_digest_uses_configured_day() {
        let settings = PreferenceSettings::default();
        // Sunday 10:00, weekly digest on Monday 09:00
        let next = next_at(DigestKind::Weekly, &settings, "2024-03-03T10:00:00+00:00").unwrap();
        assert_eq!(next, at("2024-03-04T09:00:00+00:00"));
    }

    #[test]
    fn corrupt_digest_time_is_rejected() {
        let mut settings = PreferenceSettings::default();
        settings.digest_time.weekly_day = 12;
        let err = next_at(DigestKind::Weekly, &settings, "2024-03-03T10:00:00+00:00").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidPreference);

        settings.digest_time.daily = "9am".into();
        assert!(next_at(DigestKind::Daily, &settings, "2024-03-03T10:00:00+00:00").is_err());
    }
}
