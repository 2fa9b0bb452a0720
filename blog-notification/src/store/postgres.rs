use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use blog_shared::clients::db::{checkout, DbPool};
use blog_shared::clients::email::Recipient;
use blog_shared::errors::{AppError, AppResult};

use super::{
    DigestQueueRepository, DueDigestItem, NotificationRepository, PreferenceRepository, UserDirectory,
};
use crate::models::{
    DigestQueueEntry, NewDigestQueueEntry, NewNotification, NewPreferenceRow, Notification,
    PreferenceRow, UserContact,
};
use crate::preferences::{NotificationPreference, PreferenceSettings};
use crate::schema::{notification_digest_queue, notification_preferences, notifications, users};
use crate::types::DigestKind;

/// Postgres-backed store over a diesel r2d2 pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T: DeserializeOwned>(value: serde_json::Value, column: &str) -> AppResult<T> {
    serde_json::from_value(value).map_err(|e| {
        tracing::error!(error = %e, column, "corrupt preference column");
        AppError::internal(format!("corrupt preference column {column}"))
    })
}

fn encode<T: Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

fn row_to_preference(row: PreferenceRow) -> AppResult<NotificationPreference> {
    Ok(NotificationPreference {
        user_id: row.user_id,
        settings: PreferenceSettings {
            system: decode(row.system_settings, "system_settings")?,
            interaction: decode(row.interaction_settings, "interaction_settings")?,
            do_not_disturb: decode(row.do_not_disturb, "do_not_disturb")?,
            digest_time: decode(row.digest_time, "digest_time")?,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl PreferenceRepository for PgStore {
    fn try_get(&self, user_id: Uuid) -> AppResult<Option<NotificationPreference>> {
        let mut conn = checkout(&self.pool)?;

        notification_preferences::table
            .find(user_id)
            .first::<PreferenceRow>(&mut conn)
            .optional()?
            .map(row_to_preference)
            .transpose()
    }

    fn create_default_if_absent(
        &self,
        user_id: Uuid,
        defaults: &PreferenceSettings,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationPreference> {
        let mut conn = checkout(&self.pool)?;

        let new_row = NewPreferenceRow {
            user_id,
            system_settings: encode(&defaults.system)?,
            interaction_settings: encode(&defaults.interaction)?,
            do_not_disturb: encode(&defaults.do_not_disturb)?,
            digest_time: encode(&defaults.digest_time)?,
            created_at: now,
            updated_at: now,
        };

        let inserted = diesel::insert_into(notification_preferences::table)
            .values(&new_row)
            .on_conflict_do_nothing()
            .execute(&mut conn)?;

        if inserted > 0 {
            tracing::debug!(user_id = %user_id, "default notification preferences created");
        }

        let row = notification_preferences::table
            .find(user_id)
            .first::<PreferenceRow>(&mut conn)?;

        row_to_preference(row)
    }

    fn save(
        &self,
        user_id: Uuid,
        settings: &PreferenceSettings,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationPreference> {
        let mut conn = checkout(&self.pool)?;

        let row = diesel::update(notification_preferences::table.find(user_id))
            .set((
                notification_preferences::system_settings.eq(encode(&settings.system)?),
                notification_preferences::interaction_settings.eq(encode(&settings.interaction)?),
                notification_preferences::do_not_disturb.eq(encode(&settings.do_not_disturb)?),
                notification_preferences::digest_time.eq(encode(&settings.digest_time)?),
                notification_preferences::updated_at.eq(now),
            ))
            .get_result::<PreferenceRow>(&mut conn)?;

        row_to_preference(row)
    }
}

impl NotificationRepository for PgStore {
    fn insert_notification(&self, new: &NewNotification) -> AppResult<Notification> {
        let mut conn = checkout(&self.pool)?;

        let notification = diesel::insert_into(notifications::table)
            .values(new)
            .get_result::<Notification>(&mut conn)?;

        Ok(notification)
    }

    fn mark_email_sent(&self, notification_id: Uuid) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;

        diesel::update(notifications::table.find(notification_id))
            .set(notifications::is_email_sent.eq(true))
            .execute(&mut conn)?;

        Ok(())
    }

    fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> AppResult<(Vec<Notification>, i64)> {
        let mut conn = checkout(&self.pool)?;

        let total: i64 = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::deleted_at.is_null())
            .count()
            .get_result(&mut conn)?;

        let items = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::deleted_at.is_null())
            .order(notifications::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load::<Notification>(&mut conn)?;

        Ok((items, total))
    }

    fn count_unread(&self, user_id: Uuid) -> AppResult<i64> {
        let mut conn = checkout(&self.pool)?;

        let count: i64 = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::is_read.eq(false))
            .filter(notifications::deleted_at.is_null())
            .count()
            .get_result(&mut conn)?;

        Ok(count)
    }

    fn mark_read(&self, notification_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Notification>> {
        let mut conn = checkout(&self.pool)?;

        let updated = diesel::update(
            notifications::table
                .filter(notifications::id.eq(notification_id))
                .filter(notifications::user_id.eq(user_id))
                .filter(notifications::deleted_at.is_null())
                .filter(notifications::is_read.eq(false)),
        )
        .set((
            notifications::is_read.eq(true),
            notifications::read_at.eq(Some(now)),
        ))
        .get_result::<Notification>(&mut conn)
        .optional()?;

        if updated.is_some() {
            return Ok(updated);
        }

        // Already read: hand back the row untouched so read_at keeps its first value.
        let existing = notifications::table
            .filter(notifications::id.eq(notification_id))
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::deleted_at.is_null())
            .first::<Notification>(&mut conn)
            .optional()?;

        Ok(existing)
    }

    fn mark_all_read(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<usize> {
        let mut conn = checkout(&self.pool)?;

        let updated = diesel::update(
            notifications::table
                .filter(notifications::user_id.eq(user_id))
                .filter(notifications::is_read.eq(false))
                .filter(notifications::deleted_at.is_null()),
        )
        .set((
            notifications::is_read.eq(true),
            notifications::read_at.eq(Some(now)),
        ))
        .execute(&mut conn)?;

        Ok(updated)
    }

    fn soft_delete(&self, notification_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;

        let deleted = diesel::update(
            notifications::table
                .filter(notifications::id.eq(notification_id))
                .filter(notifications::user_id.eq(user_id))
                .filter(notifications::deleted_at.is_null()),
        )
        .set(notifications::deleted_at.eq(Some(now)))
        .execute(&mut conn)?;

        Ok(deleted > 0)
    }

    fn purge_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let mut conn = checkout(&self.pool)?;

        let removed = conn.transaction::<usize, diesel::result::Error, _>(|conn| {
            let expired_ids = notifications::table
                .filter(notifications::created_at.lt(cutoff))
                .select(notifications::id);

            diesel::delete(
                notification_digest_queue::table
                    .filter(notification_digest_queue::notification_id.eq_any(expired_ids)),
            )
            .execute(conn)?;

            diesel::delete(notifications::table.filter(notifications::created_at.lt(cutoff)))
                .execute(conn)
        })?;

        Ok(removed)
    }
}

impl DigestQueueRepository for PgStore {
    fn enqueue(&self, new: &NewDigestQueueEntry) -> AppResult<DigestQueueEntry> {
        let mut conn = checkout(&self.pool)?;

        let entry = diesel::insert_into(notification_digest_queue::table)
            .values(new)
            .get_result::<DigestQueueEntry>(&mut conn)?;

        Ok(entry)
    }

    fn due_entries(&self, kind: DigestKind, now: DateTime<Utc>) -> AppResult<Vec<DueDigestItem>> {
        let mut conn = checkout(&self.pool)?;

        let rows = notification_digest_queue::table
            .inner_join(notifications::table)
            .filter(notification_digest_queue::digest_type.eq(kind.as_str()))
            .filter(notification_digest_queue::is_sent.eq(false))
            .filter(notification_digest_queue::scheduled_at.le(now))
            .filter(notifications::deleted_at.is_null())
            .order((
                notification_digest_queue::user_id.asc(),
                notifications::created_at.desc(),
            ))
            .load::<(DigestQueueEntry, Notification)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(entry, notification)| DueDigestItem { entry, notification })
            .collect())
    }

    fn mark_group_sent(&self, entry_ids: &[Uuid], notification_ids: &[Uuid], sent_at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;

        conn.transaction::<(), diesel::result::Error, _>(|conn| {
            diesel::update(
                notification_digest_queue::table
                    .filter(notification_digest_queue::id.eq_any(entry_ids.to_vec()))
                    .filter(notification_digest_queue::is_sent.eq(false)),
            )
            .set((
                notification_digest_queue::is_sent.eq(true),
                notification_digest_queue::sent_at.eq(Some(sent_at)),
            ))
            .execute(conn)?;

            diesel::update(notifications::table.filter(notifications::id.eq_any(notification_ids.to_vec())))
                .set(notifications::is_email_sent.eq(true))
                .execute(conn)?;

            Ok(())
        })?;

        Ok(())
    }

    fn purge_sent_before(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let mut conn = checkout(&self.pool)?;

        let sent = diesel::delete(
            notification_digest_queue::table
                .filter(notification_digest_queue::is_sent.eq(true))
                .filter(notification_digest_queue::sent_at.lt(cutoff)),
        )
        .execute(&mut conn)?;

        let deleted_ids = notifications::table
            .filter(notifications::deleted_at.is_not_null())
            .select(notifications::id);

        let orphaned = diesel::delete(
            notification_digest_queue::table
                .filter(notification_digest_queue::is_sent.eq(false))
                .filter(notification_digest_queue::notification_id.eq_any(deleted_ids)),
        )
        .execute(&mut conn)?;

        Ok(sent + orphaned)
    }
}

impl UserDirectory for PgStore {
    fn find_recipient(&self, user_id: Uuid) -> AppResult<Option<Recipient>> {
        let mut conn = checkout(&self.pool)?;

        let contact = users::table
            .find(user_id)
            .first::<UserContact>(&mut conn)
            .optional()?;

        Ok(contact.and_then(|c| {
            let email = c.email.as_deref().map(str::trim).filter(|e| !e.is_empty())?;
            Some(Recipient::new(c.display_name(), email))
        }))
    }
}
