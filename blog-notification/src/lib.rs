//! Notification delivery and digest pipeline for the blog backend.
//!
//! [`services::NotificationEngine`] decides per event whether a notification
//! is suppressed, delivered now or deferred into a digest;
//! [`services::DigestDispatcher`] later flushes due digests one email per user.

pub mod clock;
pub mod config;
pub mod mailer;
pub mod models;
pub mod preferences;
pub mod schedule;
pub mod scheduler;
pub mod schema;
pub mod services;
pub mod state;
pub mod store;
pub mod templates;
pub mod time_window;
pub mod types;
