use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::member::{Role, UserId};
use crate::domain::thread::GuildId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Warn,
    Kick,
    Mute,
    Quarantine,
    Ban,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Kick => "kick",
            Self::Mute => "mute",
            Self::Quarantine => "quarantine",
            Self::Ban => "ban",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Warn => "warned",
            Self::Kick => "kicked",
            Self::Mute => "muted",
            Self::Quarantine => "quarantined",
            Self::Ban => "banned",
        }
    }

    /// Kinds that last over time and therefore carry a duration.
    pub fn is_lasting(self) -> bool {
        matches!(self, Self::Mute | Self::Quarantine | Self::Ban)
    }

    pub fn consequence(self) -> &'static str {
        match self {
            Self::Warn => "Please take the reason below to heart.",
            Self::Kick => "You may rejoin the server, but please respect its rules.",
            Self::Mute => {
                "This means you can no longer send any messages in the server until you have been unmuted again."
            }
            Self::Quarantine => {
                "This means you can no longer interact with anyone in the server until you have been unquarantined again."
            }
            Self::Ban => "This means you can no longer join the server until the ban is lifted.",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "kick" => Ok(Self::Kick),
            "mute" => Ok(Self::Mute),
            "quarantine" => Ok(Self::Quarantine),
            "ban" => Ok(Self::Ban),
            other => Err(format!("unknown moderation action `{other}`")),
        }
    }
}

pub const PERMANENT_DURATION: &str = "permanent";

/// Selectable durations, in the order they are offered to moderators.
pub const DURATION_CHOICES: &[&str] = &[
    "10 minutes",
    "30 minutes",
    "1 hour",
    "3 hours",
    "1 day",
    "3 days",
    "7 days",
    PERMANENT_DURATION,
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionDuration {
    Permanent,
    Temporary { label: String, length: Duration },
}

impl ActionDuration {
    pub fn from_choice(choice: &str) -> Option<Self> {
        let normalized = choice.trim().to_ascii_lowercase();
        let length = match normalized.as_str() {
            PERMANENT_DURATION => return Some(Self::Permanent),
            "10 minutes" => Duration::minutes(10),
            "30 minutes" => Duration::minutes(30),
            "1 hour" => Duration::hours(1),
            "3 hours" => Duration::hours(3),
            "1 day" => Duration::days(1),
            "3 days" => Duration::days(3),
            "7 days" => Duration::days(7),
            _ => return None,
        };
        Some(Self::Temporary { label: normalized, length })
    }

    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Permanent => None,
            Self::Temporary { length, .. } => Some(issued_at + *length),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Permanent => PERMANENT_DURATION,
            Self::Temporary { label, .. } => label,
        }
    }
}

/// How a restriction is materialized on the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Restriction {
    AssignRole(Role),
    Ban,
    Kick,
    /// Recorded only; nothing changes on the platform.
    RecordOnly,
}

/// Immutable audit entry for an issued moderation action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationAction {
    pub id: ActionId,
    pub guild_id: GuildId,
    pub actor_id: UserId,
    pub target_id: UserId,
    pub kind: ActionKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{ActionDuration, ActionKind, DURATION_CHOICES};

    #[test]
    fn every_offered_choice_resolves() {
        for choice in DURATION_CHOICES {
            assert!(ActionDuration::from_choice(choice).is_some(), "choice `{choice}`");
        }
        assert_eq!(ActionDuration::from_choice("2 weeks"), None);
    }

    #[test]
    fn temporary_duration_computes_expiry() {
        let issued_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let duration = ActionDuration::from_choice("3 hours").expect("known choice");

        assert_eq!(duration.expires_at(issued_at), Some(issued_at + Duration::hours(3)));
        assert_eq!(ActionDuration::Permanent.expires_at(issued_at), None);
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("Mute".parse::<ActionKind>(), Ok(ActionKind::Mute));
        assert!("timeout".parse::<ActionKind>().is_err());
    }
}
