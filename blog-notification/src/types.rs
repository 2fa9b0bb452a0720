use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Caller-defined structured payload attached to a notification.
pub type RelatedData = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    System,
    Interaction,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Interaction => "interaction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionSubtype {
    Comment,
    Like,
    Favorite,
    Mention,
    Reply,
}

impl InteractionSubtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Like => "like",
            Self::Favorite => "favorite",
            Self::Mention => "mention",
            Self::Reply => "reply",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
}

/// Delivery cadence for one notification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Realtime,
    Daily,
    Weekly,
    Off,
}

impl Frequency {
    /// The digest a notification of this frequency is deferred into, if any.
    pub fn digest_kind(&self) -> Option<DigestKind> {
        match self {
            Self::Daily => Some(DigestKind::Daily),
            Self::Weekly => Some(DigestKind::Weekly),
            Self::Realtime | Self::Off => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestKind {
    Daily,
    Weekly,
}

impl DigestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

macro_rules! impl_str_enum {
    ($ty:ty, $kind:literal, [$($variant:expr),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| UnknownVariant { kind: $kind, value: s.to_string() })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_str_enum!(NotificationType, "notification type", [NotificationType::System, NotificationType::Interaction]);
impl_str_enum!(
    InteractionSubtype,
    "interaction subtype",
    [
        InteractionSubtype::Comment,
        InteractionSubtype::Like,
        InteractionSubtype::Favorite,
        InteractionSubtype::Mention,
        InteractionSubtype::Reply,
    ]
);
impl_str_enum!(DigestKind, "digest type", [DigestKind::Daily, DigestKind::Weekly]);
