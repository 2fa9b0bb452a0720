use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use blog_shared::errors::{AppError, AppResult, ErrorCode};

use crate::clock::Clock;
use crate::mailer::Mailer;
use crate::models::Notification;
use crate::store::{DueDigestItem, NotificationStore};
use crate::templates;
use crate::types::DigestKind;

/// Outcome of one sweep, counted in queue rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub processed: usize,
    pub failed: usize,
}

/// Flushes due digest queue rows as one email per user.
pub struct DigestDispatcher {
    store: Arc<dyn NotificationStore>,
    mailer: Mailer,
    clock: Arc<dyn Clock>,
    site_url: String,
    daily_lease: Mutex<()>,
    weekly_lease: Mutex<()>,
}

impl DigestDispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        mailer: Mailer,
        clock: Arc<dyn Clock>,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            clock,
            site_url: site_url.into(),
            daily_lease: Mutex::new(()),
            weekly_lease: Mutex::new(()),
        }
    }

    fn lease(&self, kind: DigestKind) -> &Mutex<()> {
        match kind {
            DigestKind::Daily => &self.daily_lease,
            DigestKind::Weekly => &self.weekly_lease,
        }
    }

    /// Send every due, unsent digest row of `kind`.
    ///
    /// Each user's rows go out as a single email and are marked sent together.
    /// A failed group is left pending for the next sweep. Only one sweep per
    /// kind runs at a time in this process; a second caller gets
    /// [`ErrorCode::SweepInProgress`].
    pub async fn run_sweep(&self, kind: DigestKind) -> AppResult<SweepReport> {
        let _lease = self.lease(kind).try_lock().map_err(|_| {
            AppError::new(ErrorCode::SweepInProgress, format!("{kind} digest sweep already running"))
        })?;

        let now = self.clock.now().with_timezone(&Utc);
        let due = self.store.due_entries(kind, now)?;
        if due.is_empty() {
            tracing::debug!(digest_type = %kind, "no digest entries due");
            return Ok(SweepReport::default());
        }

        let mut report = SweepReport::default();
        for (user_id, items) in group_by_user(due) {
            let size = items.len();
            if self.send_group(kind, user_id, &items).await {
                report.processed += size;
            } else {
                report.failed += size;
            }
        }

        tracing::info!(
            digest_type = %kind,
            processed = report.processed,
            failed = report.failed,
            "digest sweep finished"
        );

        Ok(report)
    }

    /// Deliver one user's digest and mark it sent. Returns false when the
    /// group must be retried on a later sweep.
    async fn send_group(&self, kind: DigestKind, user_id: Uuid, items: &[DueDigestItem]) -> bool {
        let recipient = match self.store.find_recipient(user_id) {
            Ok(Some(r)) => r,
            Ok(None) => {
                tracing::warn!(user_id = %user_id, digest_type = %kind, "no email address on file, digest not sent");
                return false;
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "recipient lookup failed");
                return false;
            }
        };

        let notifications: Vec<Notification> = items.iter().map(|i| i.notification.clone()).collect();
        let (subject, html) =
            templates::render_digest(&recipient.name, kind, &notifications, &self.site_url);

        if let Err(e) = self.mailer.send(&recipient, &subject, &html).await {
            tracing::warn!(
                user_id = %user_id,
                digest_type = %kind,
                count = items.len(),
                error = %e,
                "digest email failed"
            );
            return false;
        }

        let entry_ids: Vec<Uuid> = items.iter().map(|i| i.entry.id).collect();
        let notification_ids: Vec<Uuid> = notifications.iter().map(|n| n.id).collect();
        let sent_at = self.clock.now().with_timezone(&Utc);

        match self.store.mark_group_sent(&entry_ids, &notification_ids, sent_at) {
            Ok(()) => {
                tracing::debug!(user_id = %user_id, digest_type = %kind, count = items.len(), "digest sent");
                true
            }
            Err(e) => {
                // The email is out but the rows stay pending; the next sweep resends.
                tracing::error!(user_id = %user_id, error = %e, "failed to mark digest sent");
                false
            }
        }
    }

    /// Delete sent queue rows older than `retention`, plus pending rows whose
    /// notification was soft-deleted.
    pub fn cleanup(&self, retention: chrono::Duration) -> AppResult<usize> {
        let cutoff = self.clock.now().with_timezone(&Utc) - retention;
        let removed = self.store.purge_sent_before(cutoff)?;

        tracing::info!(removed, cutoff = %cutoff, "digest queue cleaned up");
        Ok(removed)
    }
}

/// Split due rows into per-user groups, each ordered newest notification first.
fn group_by_user(items: Vec<DueDigestItem>) -> BTreeMap<Uuid, Vec<DueDigestItem>> {
    let mut groups: BTreeMap<Uuid, Vec<DueDigestItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.entry.user_id).or_default().push(item);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| b.notification.created_at.cmp(&a.notification.created_at));
    }
    groups
}
