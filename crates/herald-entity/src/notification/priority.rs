//! Notification priority levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use herald_core::error::AppError;

/// Priority tier of a notification.
///
/// Variants are declared lowest first so that `Ord` (and the PostgreSQL
/// enum ordering) sorts `Emergency` as the greatest value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "notification_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    /// Delivered through the channels the user opted into.
    Normal,
    /// Push or SMS until one succeeds, email as the last resort.
    High,
    /// Every available channel, overriding user opt-outs.
    Emergency,
}

impl NotificationPriority {
    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationPriority {
    type Err = AppError;

    /// Unknown values are rejected, never defaulted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "emergency" => Ok(Self::Emergency),
            other => Err(AppError::validation(format!("unknown priority '{other}'"))),
        }
    }
}
