use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use blog_shared::errors::{AppError, AppResult, ErrorCode};

use crate::clock::Clock;
use crate::preferences::{NotificationPreference, PreferenceSettings, PreferenceUpdate};
use crate::store::NotificationStore;
use crate::time_window::WindowStatus;
use crate::types::NotificationType;

/// Reads and updates per-user notification preferences. Every call goes to
/// the store; nothing is cached between calls.
#[derive(Clone)]
pub struct PreferenceService {
    store: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn NotificationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Stored preferences, materializing the defaults on first access.
    pub fn get(&self, user_id: Uuid) -> AppResult<NotificationPreference> {
        if let Some(pref) = self.store.try_get(user_id)? {
            return Ok(pref);
        }

        let now = self.clock.now().with_timezone(&Utc);
        self.store
            .create_default_if_absent(user_id, &PreferenceSettings::default(), now)
    }

    /// Deep-merge `update` into the stored preferences. Nothing is written,
    /// not even the default row, unless the merged result is valid as a whole.
    pub fn update(&self, user_id: Uuid, update: &PreferenceUpdate) -> AppResult<NotificationPreference> {
        let stored = self.store.try_get(user_id)?;
        let base = stored
            .as_ref()
            .map(|p| p.settings.clone())
            .unwrap_or_default();
        let merged = base.merged(update);

        merged.validate().map_err(|e| {
            tracing::debug!(user_id = %user_id, error = %e, "rejected preference update");
            let details = serde_json::to_value(&e).unwrap_or(serde_json::Value::Null);
            AppError::with_details(ErrorCode::InvalidPreference, e.to_string(), details)
        })?;

        let now = self.clock.now().with_timezone(&Utc);
        let current = match stored {
            Some(pref) => pref,
            None => self
                .store
                .create_default_if_absent(user_id, &PreferenceSettings::default(), now)?,
        };

        if merged == current.settings {
            return Ok(current);
        }

        let saved = self.store.save(user_id, &merged, now)?;

        tracing::info!(user_id = %user_id, "notification preferences updated");
        Ok(saved)
    }

    pub fn is_type_enabled(&self, user_id: Uuid, kind: NotificationType) -> AppResult<bool> {
        Ok(self.get(user_id)?.settings.is_type_enabled(kind))
    }

    pub fn is_subtype_enabled(&self, user_id: Uuid, subtype: &str) -> AppResult<bool> {
        Ok(self.get(user_id)?.settings.is_subtype_enabled(subtype))
    }

    /// Human-facing do-not-disturb state at the current instant.
    pub fn quiet_hours_status(&self, user_id: Uuid) -> AppResult<WindowStatus> {
        let pref = self.get(user_id)?;
        Ok(pref.settings.do_not_disturb.window().status(&self.clock.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};
    use crate::preferences::{
        DigestTimeUpdate, DoNotDisturbUpdate, InteractionSettingsUpdate, SubtypeTogglesUpdate,
        TypeSettingsUpdate,
    };
    use crate::store::{MemoryStore, PreferenceRepository};
    use crate::types::Frequency;
    use assert_matches::assert_matches;
    use chrono::DateTime;
    use std::sync::Barrier;

    fn service() -> (PreferenceService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            DateTime::parse_from_rfc3339("2024-03-04T23:30:00+00:00").unwrap(),
        ));
        (PreferenceService::new(store.clone(), clock), store)
    }

    #[test]
    fn first_read_materializes_defaults() {
        let (svc, store) = service();
        let user = Uuid::now_v7();
        assert!(store.try_get(user).unwrap().is_none());

        let pref = svc.get(user).unwrap();
        assert_eq!(pref.settings, PreferenceSettings::default());
        assert!(store.try_get(user).unwrap().is_some());

        let again = svc.get(user).unwrap();
        assert_eq!(again, pref);
    }

    #[test]
    fn dnd_start_round_trip_leaves_other_fields() {
        let (svc, _) = service();
        let user = Uuid::now_v7();
        let before = svc.get(user).unwrap();

        let update = PreferenceUpdate {
            do_not_disturb: Some(DoNotDisturbUpdate {
                start: Some("23:00".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        svc.update(user, &update).unwrap();

        let after = svc.get(user).unwrap();
        assert_eq!(after.settings.do_not_disturb.start.as_deref(), Some("23:00"));
        let mut expected = before.settings.clone();
        expected.do_not_disturb.start = Some("23:00".into());
        assert_eq!(after.settings, expected);
    }

    #[test]
    fn subtype_update_merges_individually() {
        let (svc, _) = service();
        let user = Uuid::now_v7();

        let off = |comment: Option<bool>, like: Option<bool>| PreferenceUpdate {
            interaction: Some(InteractionSettingsUpdate {
                subtypes: Some(SubtypeTogglesUpdate {
                    comment,
                    like,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        svc.update(user, &off(Some(false), None)).unwrap();
        let pref = svc.update(user, &off(None, Some(false))).unwrap();

        assert!(!pref.settings.interaction.subtypes.comment);
        assert!(!pref.settings.interaction.subtypes.like);
        assert!(pref.settings.interaction.subtypes.reply);
    }

    #[test]
    fn invalid_update_leaves_storage_untouched() {
        let (svc, store) = service();
        let user = Uuid::now_v7();
        let before = svc.get(user).unwrap();

        let update = PreferenceUpdate {
            system: Some(TypeSettingsUpdate {
                frequency: Some(Frequency::Daily),
                ..Default::default()
            }),
            digest_time: Some(DigestTimeUpdate {
                weekly_day: Some(9),
                ..Default::default()
            }),
            ..Default::default()
        };

        let err = svc.update(user, &update).unwrap_err();
        assert_matches!(err, AppError::Known { code: ErrorCode::InvalidPreference, .. });
        assert_eq!(store.try_get(user).unwrap().unwrap(), before);
    }

    #[test]
    fn invalid_update_for_new_user_creates_nothing() {
        let (svc, store) = service();
        let user = Uuid::now_v7();

        let update = PreferenceUpdate {
            do_not_disturb: Some(DoNotDisturbUpdate {
                end: Some("24:00".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let err = svc.update(user, &update).unwrap_err();
        assert_matches!(
            err,
            AppError::Known { code: ErrorCode::InvalidPreference, details: Some(_), .. }
        );
        assert!(store.try_get(user).unwrap().is_none());
    }

    #[test]
    fn valid_update_for_new_user_starts_from_defaults() {
        let (svc, _) = service();
        let user = Uuid::now_v7();

        let update = PreferenceUpdate {
            system: Some(TypeSettingsUpdate {
                email: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let pref = svc.update(user, &update).unwrap();

        let mut expected = PreferenceSettings::default();
        expected.system.email = false;
        assert_eq!(pref.settings, expected);
    }

    #[test]
    fn concurrent_first_reads_share_one_row() {
        let store = Arc::new(MemoryStore::new());
        let svc = PreferenceService::new(store.clone(), Arc::new(SystemClock));
        let user = Uuid::now_v7();
        let barrier = Barrier::new(8);

        let results: Vec<NotificationPreference> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        svc.get(user).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let stored = store.try_get(user).unwrap().unwrap();
        for pref in &results {
            assert_eq!(pref.created_at, stored.created_at);
            assert_eq!(pref, &stored);
        }
    }

    #[test]
    fn type_and_subtype_queries() {
        let (svc, _) = service();
        let user = Uuid::now_v7();

        let update = PreferenceUpdate {
            interaction: Some(InteractionSettingsUpdate {
                frequency: Some(Frequency::Off),
                ..Default::default()
            }),
            ..Default::default()
        };
        svc.update(user, &update).unwrap();

        assert!(svc.is_type_enabled(user, NotificationType::System).unwrap());
        assert!(!svc.is_type_enabled(user, NotificationType::Interaction).unwrap());
        assert!(!svc.is_subtype_enabled(user, "comment").unwrap());
    }

    #[test]
    fn quiet_hours_status_follows_clock() {
        let (svc, _) = service();
        let user = Uuid::now_v7();
        assert_eq!(svc.quiet_hours_status(user).unwrap(), WindowStatus::Disabled);

        let update = PreferenceUpdate {
            do_not_disturb: Some(DoNotDisturbUpdate {
                enabled: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        svc.update(user, &update).unwrap();

        // 23:30 inside 22:00-08:00
        assert_eq!(
            svc.quiet_hours_status(user).unwrap(),
            WindowStatus::Active { minutes_remaining: 30 + 480 }
        );
    }
}
