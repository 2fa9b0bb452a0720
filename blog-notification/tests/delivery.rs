//! Delivery policy: suppression, realtime channels, do-not-disturb and
//! digest enqueueing.

mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;

use blog_notification::services::{DeliveryEvent, DeliveryOptions};
use blog_notification::types::{DigestKind, NotificationType};
use common::{at, harness, update, Harness};

const NOON_MONDAY: &str = "2024-03-04T12:00:00+00:00";

fn all_options() -> [DeliveryOptions; 4] {
    [
        DeliveryOptions::default(),
        DeliveryOptions { skip_in_app: true, skip_email: false },
        DeliveryOptions { skip_in_app: false, skip_email: true },
        DeliveryOptions { skip_in_app: true, skip_email: true },
    ]
}

fn comment_for(h: &Harness, name: &str) -> (uuid::Uuid, DeliveryEvent) {
    let user = h.user(name);
    let event = DeliveryEvent::new(user, NotificationType::Interaction, "New comment on your post")
        .with_subtype("comment")
        .with_content("Great write-up!");
    (user, event)
}

// ---------------------------------------------------------------------------
// Suppression
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disabled_type_is_suppressed_for_every_option_combination() {
    let h = harness(NOON_MONDAY);
    let (user, event) = comment_for(&h, "Ada");
    h.set_preferences(user, update(json!({ "interaction": { "frequency": "off" } })));

    for options in all_options() {
        let result = h.state.engine.deliver(event.clone(), options).await.unwrap();
        assert!(result.is_none());
    }

    assert!(h.store.notifications().is_empty());
    assert!(h.store.queue_entries().is_empty());
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn disabled_system_type_ignores_interaction_frequency() {
    let h = harness(NOON_MONDAY);
    let user = h.user("Ada");
    h.set_preferences(
        user,
        update(json!({ "system": { "frequency": "off" }, "interaction": { "frequency": "daily" } })),
    );

    let system = DeliveryEvent::new(user, NotificationType::System, "Maintenance tonight");
    assert!(h.state.engine.deliver(system, DeliveryOptions::default()).await.unwrap().is_none());
    assert!(h.store.notifications().is_empty());
}

#[tokio::test]
async fn realtime_with_no_channel_is_suppressed() {
    let h = harness(NOON_MONDAY);
    let (user, event) = comment_for(&h, "Ada");
    h.set_preferences(user, update(json!({ "interaction": { "inApp": false, "email": false } })));

    for options in all_options() {
        assert!(h.state.engine.deliver(event.clone(), options).await.unwrap().is_none());
    }
    assert!(h.store.notifications().is_empty());
}

#[tokio::test]
async fn skipping_both_channels_suppresses_realtime() {
    let h = harness(NOON_MONDAY);
    let (_, event) = comment_for(&h, "Ada");

    let options = DeliveryOptions { skip_in_app: true, skip_email: true };
    assert!(h.state.engine.deliver(event, options).await.unwrap().is_none());
    assert!(h.store.notifications().is_empty());
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn disabled_subtype_is_suppressed_others_delivered() {
    let h = harness(NOON_MONDAY);
    let user = h.user("Ada");
    h.set_preferences(user, update(json!({ "interaction": { "subtypes": { "like": false } } })));

    let like = DeliveryEvent::new(user, NotificationType::Interaction, "Someone liked your post")
        .with_subtype("like");
    assert!(h.state.engine.deliver(like, DeliveryOptions::default()).await.unwrap().is_none());

    let comment = DeliveryEvent::new(user, NotificationType::Interaction, "New comment")
        .with_subtype("comment");
    assert!(h.state.engine.deliver(comment, DeliveryOptions::default()).await.unwrap().is_some());

    let unknown = DeliveryEvent::new(user, NotificationType::Interaction, "Something new")
        .with_subtype("share");
    assert!(h.state.engine.deliver(unknown, DeliveryOptions::default()).await.unwrap().is_some());

    assert_eq!(h.store.notifications().len(), 2);
}

#[test]
fn unknown_notification_type_is_rejected_at_parse() {
    assert!("announcement".parse::<NotificationType>().is_err());
    assert_eq!("system".parse::<NotificationType>().unwrap(), NotificationType::System);
}

// ---------------------------------------------------------------------------
// Realtime delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn realtime_delivers_in_app_and_email() {
    let h = harness(NOON_MONDAY);
    let (user, event) = comment_for(&h, "Ada");

    let n = h
        .state
        .engine
        .deliver(event, DeliveryOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(n.user_id, user);
    assert_eq!(n.notification_type, "interaction");
    assert_eq!(n.subtype.as_deref(), Some("comment"));
    assert!(n.is_in_app_sent);
    assert!(n.is_email_sent);
    assert!(!n.is_read);
    assert_eq!(n.created_at, at(NOON_MONDAY).with_timezone(&Utc));

    let stored = h.store.notification(n.id).unwrap();
    assert!(stored.is_email_sent);

    let sent = h.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.email, "ada@example.com");
    assert_eq!(sent[0].subject, "New comment on your post");
    assert!(sent[0].body_html.contains("Great write-up!"));
    assert!(h.store.queue_entries().is_empty());
}

#[tokio::test]
async fn send_failure_keeps_notification_unsent() {
    let h = harness(NOON_MONDAY);
    h.sender.set_failing(true);
    let (_, event) = comment_for(&h, "Ada");

    let n = h
        .state
        .engine
        .deliver(event, DeliveryOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert!(n.is_in_app_sent);
    assert!(!n.is_email_sent);
    assert!(!h.store.notification(n.id).unwrap().is_email_sent);
}

#[tokio::test]
async fn missing_email_address_keeps_notification_unsent() {
    let h = harness(NOON_MONDAY);
    let user = h.user_without_email("Grace");
    let event = DeliveryEvent::new(user, NotificationType::System, "Welcome aboard");

    let n = h.state.engine.notify(event, DeliveryOptions::default()).await.unwrap();

    assert!(!n.is_email_sent);
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn skip_email_delivers_in_app_only() {
    let h = harness(NOON_MONDAY);
    let (_, event) = comment_for(&h, "Ada");

    let options = DeliveryOptions { skip_in_app: false, skip_email: true };
    let n = h.state.engine.deliver(event, options).await.unwrap().unwrap();

    assert!(n.is_in_app_sent);
    assert!(!n.is_email_sent);
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn related_data_is_persisted() {
    let h = harness(NOON_MONDAY);
    let user = h.user("Ada");
    let mut data = serde_json::Map::new();
    data.insert("postId".into(), json!(42));
    data.insert("commentId".into(), json!("c-7"));
    let event = DeliveryEvent::new(user, NotificationType::Interaction, "New reply")
        .with_subtype("reply")
        .with_related_data(data);

    let n = h.state.engine.deliver(event, DeliveryOptions::default()).await.unwrap().unwrap();

    assert_eq!(n.related_data, Some(json!({ "postId": 42, "commentId": "c-7" })));
}

#[tokio::test]
async fn long_titles_are_stored_and_sent_whole() {
    let h = harness(NOON_MONDAY);
    let user = h.user("Ada");
    let title = "Re: ".repeat(250);
    let event = DeliveryEvent::new(user, NotificationType::System, title.clone());

    let n = h.state.engine.deliver(event, DeliveryOptions::default()).await.unwrap().unwrap();

    assert_eq!(n.title.len(), 1000);
    assert_eq!(h.store.notification(n.id).unwrap().title, title);
    assert_eq!(h.sender.sent()[0].subject, title);
}

// ---------------------------------------------------------------------------
// Do-not-disturb
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quiet_hours_hold_back_email_but_not_in_app() {
    let h = harness("2024-03-04T23:00:00+00:00");
    let (user, event) = comment_for(&h, "Ada");
    h.set_preferences(user, update(json!({ "doNotDisturb": { "enabled": true } })));

    let n = h.state.engine.deliver(event, DeliveryOptions::default()).await.unwrap().unwrap();

    assert!(n.is_in_app_sent);
    assert!(!n.is_email_sent);
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn quiet_hours_with_in_app_off_suppress_realtime() {
    let h = harness("2024-03-04T07:30:00+00:00");
    let (user, event) = comment_for(&h, "Ada");
    h.set_preferences(
        user,
        update(json!({ "doNotDisturb": { "enabled": true }, "interaction": { "inApp": false } })),
    );

    assert!(h.state.engine.deliver(event, DeliveryOptions::default()).await.unwrap().is_none());
    assert!(h.store.notifications().is_empty());
}

#[tokio::test]
async fn email_resumes_after_quiet_hours_end() {
    let h = harness("2024-03-04T08:01:00+00:00");
    let (user, event) = comment_for(&h, "Ada");
    h.set_preferences(user, update(json!({ "doNotDisturb": { "enabled": true } })));

    let n = h.state.engine.deliver(event, DeliveryOptions::default()).await.unwrap().unwrap();
    assert!(n.is_email_sent);
}

// ---------------------------------------------------------------------------
// Digest enqueueing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn daily_frequency_always_queues_exactly_one_entry() {
    let toggles = [(true, true), (true, false), (false, true), (false, false)];

    for (in_app, email) in toggles {
        let h = harness(NOON_MONDAY);
        let (user, event) = comment_for(&h, "Ada");
        h.set_preferences(
            user,
            update(json!({ "interaction": { "frequency": "daily", "inApp": in_app, "email": email } })),
        );

        let n = h.state.engine.deliver(event, DeliveryOptions::default()).await.unwrap().unwrap();

        let queue = h.store.queue_entries();
        assert_eq!(queue.len(), 1, "inApp={in_app} email={email}");
        let entry = &queue[0];
        assert_eq!(entry.notification_id, n.id);
        assert_eq!(entry.user_id, user);
        assert_eq!(entry.kind(), Some(DigestKind::Daily));
        assert!(!entry.is_sent);
        assert!(entry.scheduled_at > at(NOON_MONDAY).with_timezone(&Utc));
        assert_eq!(entry.scheduled_at, at("2024-03-05T09:00:00+00:00").with_timezone(&Utc));

        assert_eq!(n.is_in_app_sent, in_app);
        assert!(!n.is_email_sent);
        assert!(h.sender.sent().is_empty());
    }
}

#[tokio::test]
async fn daily_frequency_queues_even_when_channels_are_skipped() {
    let h = harness("2024-03-04T08:00:00+00:00");
    let (user, event) = comment_for(&h, "Ada");
    h.set_preferences(user, update(json!({ "interaction": { "frequency": "daily" } })));

    let options = DeliveryOptions { skip_in_app: true, skip_email: true };
    h.state.engine.deliver(event, options).await.unwrap().unwrap();

    let queue = h.store.queue_entries();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].scheduled_at, at("2024-03-04T09:00:00+00:00").with_timezone(&Utc));
}

#[tokio::test]
async fn weekly_frequency_queues_for_configured_weekday() {
    // Monday 10:00 with a Monday 09:00 digest rolls over a full week.
    let h = harness("2024-03-04T10:00:00+00:00");
    let user = h.user("Ada");
    h.set_preferences(user, update(json!({ "system": { "frequency": "weekly" } })));

    let event = DeliveryEvent::new(user, NotificationType::System, "Your weekly stats");
    h.state.engine.deliver(event, DeliveryOptions::default()).await.unwrap().unwrap();

    let queue = h.store.queue_entries();
    assert_eq!(queue.len(), 1);
    assert_matches!(queue[0].kind(), Some(DigestKind::Weekly));
    assert_eq!(queue[0].scheduled_at, at("2024-03-11T09:00:00+00:00").with_timezone(&Utc));
}

#[tokio::test]
async fn digest_time_follows_clock_offset() {
    let h = harness("2024-03-04T20:00:00+08:00");
    let (user, event) = comment_for(&h, "Ada");
    h.set_preferences(
        user,
        update(json!({ "interaction": { "frequency": "daily" }, "digestTime": { "daily": "21:30" } })),
    );

    h.state.engine.deliver(event, DeliveryOptions::default()).await.unwrap().unwrap();

    let queue = h.store.queue_entries();
    assert_eq!(queue[0].scheduled_at, at("2024-03-04T21:30:00+08:00").with_timezone(&Utc));
}
