//! Storage seams consumed by the notification core.
//!
//! [`PgStore`] is the production implementation over diesel; [`MemoryStore`]
//! keeps everything in process and backs the test suite.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use blog_shared::clients::email::Recipient;
use blog_shared::errors::AppResult;

use crate::models::{DigestQueueEntry, NewDigestQueueEntry, NewNotification, Notification};
use crate::preferences::{NotificationPreference, PreferenceSettings};
use crate::types::DigestKind;

pub trait PreferenceRepository: Send + Sync {
    fn try_get(&self, user_id: Uuid) -> AppResult<Option<NotificationPreference>>;

    /// Insert `defaults` unless a row already exists, then return whatever is
    /// stored. Concurrent callers all observe the same row.
    fn create_default_if_absent(
        &self,
        user_id: Uuid,
        defaults: &PreferenceSettings,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationPreference>;

    fn save(
        &self,
        user_id: Uuid,
        settings: &PreferenceSettings,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationPreference>;
}

pub trait NotificationRepository: Send + Sync {
    fn insert_notification(&self, new: &NewNotification) -> AppResult<Notification>;

    fn mark_email_sent(&self, notification_id: Uuid) -> AppResult<()>;

    /// Undeleted notifications for a user, newest first, with the total count.
    fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> AppResult<(Vec<Notification>, i64)>;

    fn count_unread(&self, user_id: Uuid) -> AppResult<i64>;

    fn mark_read(&self, notification_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Notification>>;

    fn mark_all_read(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<usize>;

    fn soft_delete(&self, notification_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> AppResult<bool>;

    /// Physically remove notifications created before `cutoff` along with
    /// their queue rows. Returns the number of notifications removed.
    fn purge_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize>;
}

/// A queue row that is due, paired with its live notification.
#[derive(Debug, Clone, PartialEq)]
pub struct DueDigestItem {
    pub entry: DigestQueueEntry,
    pub notification: Notification,
}

pub trait DigestQueueRepository: Send + Sync {
    fn enqueue(&self, new: &NewDigestQueueEntry) -> AppResult<DigestQueueEntry>;

    /// Unsent rows of `kind` with `scheduled_at <= now` whose notification is
    /// not soft-deleted, ordered by user then newest notification first.
    fn due_entries(&self, kind: DigestKind, now: DateTime<Utc>) -> AppResult<Vec<DueDigestItem>>;

    /// Mark queue rows and their notifications as sent in one transaction.
    fn mark_group_sent(&self, entry_ids: &[Uuid], notification_ids: &[Uuid], sent_at: DateTime<Utc>) -> AppResult<()>;

    /// Delete sent rows whose `sent_at` is before `cutoff`, and unsent rows
    /// whose notification has been soft-deleted.
    fn purge_sent_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize>;
}

/// Read-only access to the account service's user records.
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` when the user is unknown or has no email address.
    fn find_recipient(&self, user_id: Uuid) -> AppResult<Option<Recipient>>;
}

pub trait NotificationStore:
    PreferenceRepository + NotificationRepository + DigestQueueRepository + UserDirectory
{
}

impl<T> NotificationStore for T where
    T: PreferenceRepository + NotificationRepository + DigestQueueRepository + UserDirectory
{
}
