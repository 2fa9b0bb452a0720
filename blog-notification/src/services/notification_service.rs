use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use blog_shared::errors::{AppError, AppResult, ErrorCode};
use blog_shared::types::pagination::{Paginated, PaginationParams};

use crate::clock::Clock;
use crate::models::Notification;
use crate::store::NotificationStore;

/// Read-side operations on a user's own notifications.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// List notifications for a user with pagination, newest first.
    pub fn list(&self, user_id: Uuid, params: &PaginationParams) -> AppResult<Paginated<Notification>> {
        let limit = i64::try_from(params.limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(params.offset()).unwrap_or(i64::MAX);
        let (items, total) = self.store.list_for_user(user_id, limit, offset)?;

        Ok(Paginated::new(items, u64::try_from(total).unwrap_or(0), params))
    }

    pub fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        self.store.count_unread(user_id)
    }

    /// Mark a single notification as read. `read_at` keeps the time of the
    /// first read.
    pub fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<Notification> {
        let now = self.clock.now().with_timezone(&Utc);
        let notification = self
            .store
            .mark_read(notification_id, user_id, now)?
            .ok_or_else(|| not_found(notification_id))?;

        tracing::debug!(notification_id = %notification_id, user_id = %user_id, "notification marked as read");

        Ok(notification)
    }

    /// Mark all of a user's notifications as read.
    pub fn mark_all_read(&self, user_id: Uuid) -> AppResult<usize> {
        let now = self.clock.now().with_timezone(&Utc);
        let updated = self.store.mark_all_read(user_id, now)?;

        tracing::debug!(user_id = %user_id, updated, "all notifications marked as read");

        Ok(updated)
    }

    /// Soft delete. The row stays until the retention purge removes it.
    pub fn delete(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let now = self.clock.now().with_timezone(&Utc);
        if !self.store.soft_delete(notification_id, user_id, now)? {
            return Err(not_found(notification_id));
        }

        tracing::debug!(notification_id = %notification_id, user_id = %user_id, "notification deleted");
        Ok(())
    }

    /// Physically remove notifications older than `retention`.
    pub fn purge_expired(&self, retention: chrono::Duration) -> AppResult<usize> {
        let cutoff = self.clock.now().with_timezone(&Utc) - retention;
        let removed = self.store.purge_created_before(cutoff)?;

        tracing::info!(removed, cutoff = %cutoff, "expired notifications purged");
        Ok(removed)
    }
}

fn not_found(notification_id: Uuid) -> AppError {
    AppError::new(
        ErrorCode::NotificationNotFound,
        format!("notification {notification_id} not found"),
    )
}
