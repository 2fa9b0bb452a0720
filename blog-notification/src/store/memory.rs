use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use blog_shared::clients::email::Recipient;
use blog_shared::errors::{AppError, AppResult};

use super::{
    DigestQueueRepository, DueDigestItem, NotificationRepository, PreferenceRepository, UserDirectory,
};
use crate::models::{DigestQueueEntry, NewDigestQueueEntry, NewNotification, Notification};
use crate::preferences::{NotificationPreference, PreferenceSettings};
use crate::types::DigestKind;

#[derive(Default)]
struct Tables {
    preferences: HashMap<Uuid, NotificationPreference>,
    notifications: Vec<Notification>,
    queue: Vec<DigestQueueEntry>,
    users: HashMap<Uuid, (String, Option<String>)>,
}

/// In-process store with the same observable semantics as [`super::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a user for recipient lookups.
    pub fn add_user(&self, user_id: Uuid, name: &str, email: Option<&str>) {
        self.lock()
            .users
            .insert(user_id, (name.to_string(), email.map(str::to_string)));
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    pub fn notification(&self, id: Uuid) -> Option<Notification> {
        self.lock().notifications.iter().find(|n| n.id == id).cloned()
    }

    pub fn queue_entries(&self) -> Vec<DigestQueueEntry> {
        self.lock().queue.clone()
    }
}

impl PreferenceRepository for MemoryStore {
    fn try_get(&self, user_id: Uuid) -> AppResult<Option<NotificationPreference>> {
        Ok(self.lock().preferences.get(&user_id).cloned())
    }

    fn create_default_if_absent(
        &self,
        user_id: Uuid,
        defaults: &PreferenceSettings,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationPreference> {
        let mut tables = self.lock();
        let pref = tables
            .preferences
            .entry(user_id)
            .or_insert_with(|| NotificationPreference {
                user_id,
                settings: defaults.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(pref.clone())
    }

    fn save(
        &self,
        user_id: Uuid,
        settings: &PreferenceSettings,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationPreference> {
        let mut tables = self.lock();
        let pref = tables
            .preferences
            .get_mut(&user_id)
            .ok_or(AppError::Database(diesel::result::Error::NotFound))?;
        pref.settings = settings.clone();
        pref.updated_at = now;
        Ok(pref.clone())
    }
}

impl NotificationRepository for MemoryStore {
    fn insert_notification(&self, new: &NewNotification) -> AppResult<Notification> {
        let notification = Notification {
            id: new.id,
            user_id: new.user_id,
            notification_type: new.notification_type.clone(),
            subtype: new.subtype.clone(),
            title: new.title.clone(),
            content: new.content.clone(),
            related_data: new.related_data.clone(),
            is_in_app_sent: new.is_in_app_sent,
            is_email_sent: new.is_email_sent,
            is_read: false,
            read_at: None,
            deleted_at: None,
            created_at: new.created_at,
        };
        self.lock().notifications.push(notification.clone());
        Ok(notification)
    }

    fn mark_email_sent(&self, notification_id: Uuid) -> AppResult<()> {
        if let Some(n) = self
            .lock()
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
        {
            n.is_email_sent = true;
        }
        Ok(())
    }

    fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> AppResult<(Vec<Notification>, i64)> {
        let tables = self.lock();
        let mut live: Vec<&Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && n.deleted_at.is_none())
            .collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = live.len() as i64;
        let items = live
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    fn count_unread(&self, user_id: Uuid) -> AppResult<i64> {
        let count = self
            .lock()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read && n.deleted_at.is_none())
            .count();
        Ok(count as i64)
    }

    fn mark_read(&self, notification_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Notification>> {
        let mut tables = self.lock();
        let found = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id && n.deleted_at.is_none());
        Ok(found.map(|n| {
            if !n.is_read {
                n.is_read = true;
                n.read_at = Some(now);
            }
            n.clone()
        }))
    }

    fn mark_all_read(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<usize> {
        let mut updated = 0;
        for n in self.lock().notifications.iter_mut() {
            if n.user_id == user_id && !n.is_read && n.deleted_at.is_none() {
                n.is_read = true;
                n.read_at = Some(now);
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn soft_delete(&self, notification_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let mut tables = self.lock();
        match tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id && n.deleted_at.is_none())
        {
            Some(n) => {
                n.deleted_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn purge_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let mut tables = self.lock();
        let expired: Vec<Uuid> = tables
            .notifications
            .iter()
            .filter(|n| n.created_at < cutoff)
            .map(|n| n.id)
            .collect();
        tables.queue.retain(|e| !expired.contains(&e.notification_id));
        tables.notifications.retain(|n| n.created_at >= cutoff);
        Ok(expired.len())
    }
}

impl DigestQueueRepository for MemoryStore {
    fn enqueue(&self, new: &NewDigestQueueEntry) -> AppResult<DigestQueueEntry> {
        let entry = DigestQueueEntry {
            id: new.id,
            user_id: new.user_id,
            notification_id: new.notification_id,
            digest_type: new.digest_type.clone(),
            scheduled_at: new.scheduled_at,
            is_sent: false,
            sent_at: None,
            created_at: new.created_at,
        };
        let mut tables = self.lock();
        if tables.queue.iter().any(|e| e.notification_id == new.notification_id) {
            return Err(AppError::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                Box::new(format!("notification {} is already queued", new.notification_id)),
            )));
        }
        tables.queue.push(entry.clone());
        Ok(entry)
    }

    fn due_entries(&self, kind: DigestKind, now: DateTime<Utc>) -> AppResult<Vec<DueDigestItem>> {
        let tables = self.lock();
        let mut due: Vec<DueDigestItem> = tables
            .queue
            .iter()
            .filter(|e| e.digest_type == kind.as_str() && !e.is_sent && e.scheduled_at <= now)
            .filter_map(|e| {
                tables
                    .notifications
                    .iter()
                    .find(|n| n.id == e.notification_id && n.deleted_at.is_none())
                    .map(|n| DueDigestItem {
                        entry: e.clone(),
                        notification: n.clone(),
                    })
            })
            .collect();
        due.sort_by(|a, b| {
            a.entry
                .user_id
                .cmp(&b.entry.user_id)
                .then(b.notification.created_at.cmp(&a.notification.created_at))
        });
        Ok(due)
    }

    fn mark_group_sent(&self, entry_ids: &[Uuid], notification_ids: &[Uuid], sent_at: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.lock();
        for entry in tables.queue.iter_mut() {
            if entry_ids.contains(&entry.id) && !entry.is_sent {
                entry.is_sent = true;
                entry.sent_at = Some(sent_at);
            }
        }
        for n in tables.notifications.iter_mut() {
            if notification_ids.contains(&n.id) {
                n.is_email_sent = true;
            }
        }
        Ok(())
    }

    fn purge_sent_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let mut tables = self.lock();
        let deleted: Vec<Uuid> = tables
            .notifications
            .iter()
            .filter(|n| n.deleted_at.is_some())
            .map(|n| n.id)
            .collect();
        let before = tables.queue.len();
        tables.queue.retain(|e| {
            let expired = e.is_sent && e.sent_at.is_some_and(|at| at < cutoff);
            let orphaned = !e.is_sent && deleted.contains(&e.notification_id);
            !(expired || orphaned)
        });
        Ok(before - tables.queue.len())
    }
}

impl UserDirectory for MemoryStore {
    fn find_recipient(&self, user_id: Uuid) -> AppResult<Option<Recipient>> {
        Ok(self.lock().users.get(&user_id).and_then(|(name, email)| {
            email
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .map(|e| Recipient::new(name.clone(), e))
        }))
    }
}
