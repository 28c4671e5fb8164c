//! User preference value object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use herald_core::types::UserId;

use crate::channel::ChannelKind;

/// Channel-enablement map for one user.
///
/// Keys are channel names as stored upstream; names that do not match a
/// known [`ChannelKind`] are kept but never routed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreference {
    /// The user these preferences belong to.
    pub user_id: UserId,
    /// Channel name → enabled flag.
    pub channels: BTreeMap<String, bool>,
}

impl UserPreference {
    /// Build from a raw channel map.
    pub fn new(user_id: UserId, channels: BTreeMap<String, bool>) -> Self {
        Self { user_id, channels }
    }

    /// Fallback used when preferences cannot be resolved: email only.
    pub fn fallback(user_id: UserId) -> Self {
        let mut channels = BTreeMap::new();
        channels.insert(ChannelKind::Email.as_str().to_string(), true);
        Self { user_id, channels }
    }

    /// Whether the user opted into `channel`.
    pub fn is_enabled(&self, channel: ChannelKind) -> bool {
        self.channels
            .iter()
            .any(|(name, enabled)| *enabled && ChannelKind::parse(name) == Some(channel))
    }

    /// Enabled known channels in canonical order.
    pub fn enabled_channels(&self) -> Vec<ChannelKind> {
        ChannelKind::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}
