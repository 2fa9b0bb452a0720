use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{notification_digest_queue, notification_preferences, notifications};
use crate::types::DigestKind;

// --- Notification ---

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub subtype: Option<String>,
    pub title: String,
    pub content: Option<String>,
    pub related_data: Option<serde_json::Value>,
    pub is_in_app_sent: bool,
    pub is_email_sent: bool,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub subtype: Option<String>,
    pub title: String,
    pub content: Option<String>,
    pub related_data: Option<serde_json::Value>,
    pub is_in_app_sent: bool,
    pub is_email_sent: bool,
    pub created_at: DateTime<Utc>,
}

// --- Preference ---

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = notification_preferences, primary_key(user_id))]
pub struct PreferenceRow {
    pub user_id: Uuid,
    pub system_settings: serde_json::Value,
    pub interaction_settings: serde_json::Value,
    pub do_not_disturb: serde_json::Value,
    pub digest_time: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notification_preferences)]
pub struct NewPreferenceRow {
    pub user_id: Uuid,
    pub system_settings: serde_json::Value,
    pub interaction_settings: serde_json::Value,
    pub do_not_disturb: serde_json::Value,
    pub digest_time: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Digest queue ---

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize)]
#[diesel(table_name = notification_digest_queue)]
pub struct DigestQueueEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_id: Uuid,
    pub digest_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DigestQueueEntry {
    pub fn kind(&self) -> Option<DigestKind> {
        self.digest_type.parse().ok()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notification_digest_queue)]
pub struct NewDigestQueueEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_id: Uuid,
    pub digest_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// --- Users (owned by the account service, read-only here) ---

#[derive(Debug, Clone, Queryable)]
pub struct UserContact {
    pub id: Uuid,
    pub username: String,
    pub nickname: Option<String>,
    pub email: Option<String>,
}

impl UserContact {
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}
