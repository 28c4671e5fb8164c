//! Delivery channel enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A delivery transport.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "delivery_channel", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Mobile push notification.
    Push,
    /// Text message.
    Sms,
    /// Email.
    Email,
}

impl ChannelKind {
    /// Every known channel in canonical order.
    pub const ALL: [ChannelKind; 3] = [Self::Push, Self::Sms, Self::Email];

    /// Return the channel as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }

    /// Parse a channel name, ignoring case. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "sms" => Ok(Self::Sms),
            "email" => Ok(Self::Email),
            other => Err(format!("unknown channel '{other}'")),
        }
    }
}
