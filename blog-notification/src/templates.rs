//! HTML bodies for notification emails.

use crate::models::Notification;
use crate::types::DigestKind;

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn notifications_url(site_url: &str) -> String {
    format!("{}/notifications", site_url.trim_end_matches('/'))
}

/// A single notification sent as it happens.
pub fn render_realtime(notification: &Notification, site_url: &str) -> (String, String) {
    let title = escape_html(&notification.title);
    let content = notification
        .content
        .as_deref()
        .map(|c| format!(r#"<p style="color: #333;">{}</p>"#, escape_html(c)))
        .unwrap_or_default();
    let link = notifications_url(site_url);

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #2563eb;">{title}</h2>
            {content}
            <p style="margin-top: 20px;"><a href="{link}" style="color: #2563eb;">View on the blog</a></p>
            </div>"#
    );

    (notification.title.clone(), html)
}

/// One batched email covering every notification in `notifications`, in the
/// order given.
pub fn render_digest(
    recipient_name: &str,
    kind: DigestKind,
    notifications: &[Notification],
    site_url: &str,
) -> (String, String) {
    let count = notifications.len();
    let noun = if count == 1 { "notification" } else { "notifications" };
    let subject = format!("Your {} digest: {count} new {noun}", kind.as_str());

    let items: String = notifications
        .iter()
        .map(|n| {
            let content = n
                .content
                .as_deref()
                .map(|c| format!(r#"<div style="color: #555;">{}</div>"#, escape_html(c)))
                .unwrap_or_default();
            format!(
                r#"<li style="margin-bottom: 12px;"><strong>{}</strong>{content}<div style="color: #999; font-size: 12px;">{}</div></li>"#,
                escape_html(&n.title),
                n.created_at.format("%Y-%m-%d %H:%M UTC"),
            )
        })
        .collect();

    let greeting = escape_html(recipient_name);
    let link = notifications_url(site_url);
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #2563eb;">Hi {greeting},</h2>
            <p>You have {count} new {noun} since your last {kind} digest.</p>
            <ul style="padding-left: 18px;">{items}</ul>
            <p style="margin-top: 20px;"><a href="{link}" style="color: #2563eb;">See all notifications</a></p>
            </div>"#,
        kind = kind.as_str(),
    );

    (subject, html)
}
