//! Per-user notification preferences and their partial-update merge rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::time_window::{QuietWindow, TimeOfDay};
use crate::types::{Frequency, InteractionSubtype, NotificationType};

fn validate_time_of_day(value: &str) -> Result<(), ValidationError> {
    if TimeOfDay::is_valid(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("time_of_day");
        err.message = Some(format!("{value:?} is not a valid HH:mm time").into());
        Err(err)
    }
}

// --- Settings ---

/// The delivery switches shared by every notification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    pub in_app: bool,
    pub email: bool,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSettings {
    pub in_app: bool,
    pub email: bool,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtypeToggles {
    pub comment: bool,
    pub like: bool,
    pub favorite: bool,
    pub mention: bool,
    pub reply: bool,
}

impl Default for SubtypeToggles {
    fn default() -> Self {
        Self {
            comment: true,
            like: true,
            favorite: true,
            mention: true,
            reply: true,
        }
    }
}

impl SubtypeToggles {
    pub fn is_enabled(&self, subtype: InteractionSubtype) -> bool {
        match subtype {
            InteractionSubtype::Comment => self.comment,
            InteractionSubtype::Like => self.like,
            InteractionSubtype::Favorite => self.favorite,
            InteractionSubtype::Mention => self.mention,
            InteractionSubtype::Reply => self.reply,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionSettings {
    pub in_app: bool,
    pub email: bool,
    pub frequency: Frequency,
    #[serde(default)]
    pub subtypes: SubtypeToggles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DoNotDisturb {
    pub enabled: bool,
    #[validate(custom = "validate_time_of_day")]
    pub start: Option<String>,
    #[validate(custom = "validate_time_of_day")]
    pub end: Option<String>,
    pub timezone: String,
}

impl DoNotDisturb {
    /// Parsed view of the window. Unparseable bounds count as missing.
    pub fn window(&self) -> QuietWindow {
        QuietWindow::new(
            self.enabled,
            self.start.as_deref().and_then(|s| s.parse().ok()),
            self.end.as_deref().and_then(|s| s.parse().ok()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DigestTime {
    #[validate(custom = "validate_time_of_day")]
    pub daily: String,
    /// 0 = Sunday through 6 = Saturday.
    #[validate(range(min = 0, max = 6))]
    pub weekly_day: i32,
    #[validate(custom = "validate_time_of_day")]
    pub weekly_time: String,
}

impl DigestTime {
    pub fn daily_time(&self) -> Option<TimeOfDay> {
        self.daily.parse().ok()
    }

    pub fn weekly_time_of_day(&self) -> Option<TimeOfDay> {
        self.weekly_time.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSettings {
    pub system: TypeSettings,
    pub interaction: InteractionSettings,
    #[validate]
    pub do_not_disturb: DoNotDisturb,
    #[validate]
    pub digest_time: DigestTime,
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        Self {
            system: TypeSettings {
                in_app: true,
                email: true,
                frequency: Frequency::Realtime,
            },
            interaction: InteractionSettings {
                in_app: true,
                email: true,
                frequency: Frequency::Realtime,
                subtypes: SubtypeToggles::default(),
            },
            do_not_disturb: DoNotDisturb {
                enabled: false,
                start: Some("22:00".into()),
                end: Some("08:00".into()),
                timezone: "UTC".into(),
            },
            digest_time: DigestTime {
                daily: "09:00".into(),
                weekly_day: 1,
                weekly_time: "09:00".into(),
            },
        }
    }
}

impl PreferenceSettings {
    pub fn channel_settings(&self, kind: NotificationType) -> ChannelSettings {
        match kind {
            NotificationType::System => ChannelSettings {
                in_app: self.system.in_app,
                email: self.system.email,
                frequency: self.system.frequency,
            },
            NotificationType::Interaction => ChannelSettings {
                in_app: self.interaction.in_app,
                email: self.interaction.email,
                frequency: self.interaction.frequency,
            },
        }
    }

    pub fn is_type_enabled(&self, kind: NotificationType) -> bool {
        self.channel_settings(kind).frequency != Frequency::Off
    }

    /// Unrecognized subtypes are treated as enabled.
    pub fn is_subtype_enabled(&self, subtype: &str) -> bool {
        if self.interaction.frequency == Frequency::Off {
            return false;
        }
        subtype
            .parse::<InteractionSubtype>()
            .map(|s| self.interaction.subtypes.is_enabled(s))
            .unwrap_or(true)
    }

    /// Apply a partial update. Fields absent from `update` keep their value.
    pub fn merged(&self, update: &PreferenceUpdate) -> PreferenceSettings {
        let mut next = self.clone();

        if let Some(system) = &update.system {
            merge_opt(&mut next.system.in_app, system.in_app);
            merge_opt(&mut next.system.email, system.email);
            merge_opt(&mut next.system.frequency, system.frequency);
        }

        if let Some(interaction) = &update.interaction {
            merge_opt(&mut next.interaction.in_app, interaction.in_app);
            merge_opt(&mut next.interaction.email, interaction.email);
            merge_opt(&mut next.interaction.frequency, interaction.frequency);
            if let Some(subtypes) = &interaction.subtypes {
                let toggles = &mut next.interaction.subtypes;
                merge_opt(&mut toggles.comment, subtypes.comment);
                merge_opt(&mut toggles.like, subtypes.like);
                merge_opt(&mut toggles.favorite, subtypes.favorite);
                merge_opt(&mut toggles.mention, subtypes.mention);
                merge_opt(&mut toggles.reply, subtypes.reply);
            }
        }

        if let Some(dnd) = &update.do_not_disturb {
            merge_opt(&mut next.do_not_disturb.enabled, dnd.enabled);
            if dnd.start.is_some() {
                next.do_not_disturb.start = dnd.start.clone();
            }
            if dnd.end.is_some() {
                next.do_not_disturb.end = dnd.end.clone();
            }
            merge_opt(&mut next.do_not_disturb.timezone, dnd.timezone.clone());
        }

        if let Some(digest) = &update.digest_time {
            merge_opt(&mut next.digest_time.daily, digest.daily.clone());
            merge_opt(&mut next.digest_time.weekly_day, digest.weekly_day);
            merge_opt(&mut next.digest_time.weekly_time, digest.weekly_time.clone());
        }

        next
    }
}

fn merge_opt<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// A user's stored preference row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub settings: PreferenceSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Partial update ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSettingsUpdate {
    pub in_app: Option<bool>,
    pub email: Option<bool>,
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubtypeTogglesUpdate {
    pub comment: Option<bool>,
    pub like: Option<bool>,
    pub favorite: Option<bool>,
    pub mention: Option<bool>,
    pub reply: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionSettingsUpdate {
    pub in_app: Option<bool>,
    pub email: Option<bool>,
    pub frequency: Option<Frequency>,
    pub subtypes: Option<SubtypeTogglesUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoNotDisturbUpdate {
    pub enabled: Option<bool>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestTimeUpdate {
    pub daily: Option<String>,
    pub weekly_day: Option<i32>,
    pub weekly_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceUpdate {
    pub system: Option<TypeSettingsUpdate>,
    pub interaction: Option<InteractionSettingsUpdate>,
    pub do_not_disturb: Option<DoNotDisturbUpdate>,
    pub digest_time: Option<DigestTimeUpdate>,
}
