//! Shared fixtures: an in-memory store, a hand-driven clock and an email
//! sender that records instead of sending.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use blog_notification::clock::ManualClock;
use blog_notification::config::AppConfig;
use blog_notification::preferences::PreferenceUpdate;
use blog_notification::state::AppState;
use blog_notification::store::MemoryStore;
use blog_shared::clients::email::{EmailError, EmailSender, Recipient};

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: Recipient,
    pub subject: String,
    pub body_html: String,
}

/// Records every send. Flip `fail` to make sends return a rejection.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentEmail>>,
    fail: AtomicBool,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send(&self, to: &Recipient, subject: &str, body_html: &str) -> Result<(), EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::Rejected {
                status: 503,
                body: "unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.clone(),
            subject: subject.to_string(),
            body_html: body_html.to_string(),
        });
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub sender: Arc<RecordingSender>,
    pub state: Arc<AppState>,
}

pub fn at(rfc3339: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap()
}

/// A harness whose clock starts at `now`.
pub fn harness(now: &str) -> Harness {
    harness_with_sender(now, Arc::new(RecordingSender::default()))
}

pub fn harness_with_sender(now: &str, sender: Arc<RecordingSender>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(at(now)));
    let state = Arc::new(AppState::new(
        AppConfig::default(),
        store.clone(),
        sender.clone(),
        clock.clone(),
    ));
    Harness {
        store,
        clock,
        sender,
        state,
    }
}

impl Harness {
    /// A user with an email address on file.
    pub fn user(&self, name: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.store
            .add_user(id, name, Some(&format!("{}@example.com", name.to_lowercase())));
        id
    }

    pub fn user_without_email(&self, name: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.store.add_user(id, name, None);
        id
    }

    pub fn set_preferences(&self, user_id: Uuid, update: PreferenceUpdate) {
        self.state.preferences.update(user_id, &update).unwrap();
    }
}

/// Build a partial preference update from its camelCase JSON form.
pub fn update(value: serde_json::Value) -> PreferenceUpdate {
    serde_json::from_value(value).unwrap()
}
