//! Construction of the configured channel senders.

use std::sync::Arc;

use tracing::info;

use herald_core::config::ChannelsConfig;
use herald_core::result::AppResult;
use herald_entity::ChannelKind;

use crate::http::HttpChannelSender;
use crate::sender::ChannelSender;

/// Build a sender for every enabled gateway, in canonical channel order.
pub fn build_senders(config: &ChannelsConfig) -> AppResult<Vec<Arc<dyn ChannelSender>>> {
    let mut senders: Vec<Arc<dyn ChannelSender>> = Vec::new();
    for kind in ChannelKind::ALL {
        let gateway = match kind {
            ChannelKind::Push => &config.push,
            ChannelKind::Sms => &config.sms,
            ChannelKind::Email => &config.email,
        };
        if !gateway.enabled {
            info!(channel = %kind, "Channel disabled");
            continue;
        }
        info!(channel = %kind, endpoint = %gateway.endpoint, "Channel enabled");
        senders.push(Arc::new(HttpChannelSender::new(kind, gateway)?));
    }
    Ok(senders)
}
