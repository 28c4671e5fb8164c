//! Registry of delivery channels and their live availability.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use herald_channels::ChannelSender;
use herald_entity::ChannelKind;

/// A registered sender plus its availability flag.
#[derive(Debug)]
struct RegisteredChannel {
    sender: Arc<dyn ChannelSender>,
    available: AtomicBool,
}

/// Registry of all delivery channels known to this engine instance.
///
/// Availability flags are plain atomics behind shared map guards, so
/// routing reads never wait for a health-check write.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: DashMap<ChannelKind, RegisteredChannel>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding `senders`, all marked available.
    pub fn with_senders(senders: impl IntoIterator<Item = Arc<dyn ChannelSender>>) -> Self {
        let registry = Self::new();
        for sender in senders {
            registry.register(sender);
        }
        registry
    }

    /// Registers (or replaces) the sender for its channel, marked available.
    pub fn register(&self, sender: Arc<dyn ChannelSender>) {
        self.channels.insert(
            sender.kind(),
            RegisteredChannel {
                sender,
                available: AtomicBool::new(true),
            },
        );
    }

    /// Removes a channel. It is treated as unavailable from then on.
    pub fn deregister(&self, kind: ChannelKind) -> bool {
        self.channels.remove(&kind).is_some()
    }

    /// Returns the sender of a channel, if registered.
    pub fn sender(&self, kind: ChannelKind) -> Option<Arc<dyn ChannelSender>> {
        self.channels.get(&kind).map(|c| Arc::clone(&c.sender))
    }

    /// Whether a channel is registered and currently available.
    pub fn is_available(&self, kind: ChannelKind) -> bool {
        self.channels
            .get(&kind)
            .is_some_and(|c| c.available.load(Ordering::Acquire))
    }

    /// Updates the availability flag. Returns the previous value, or `None`
    /// if the channel is not registered.
    pub fn set_available(&self, kind: ChannelKind, available: bool) -> Option<bool> {
        self.channels
            .get(&kind)
            .map(|c| c.available.swap(available, Ordering::AcqRel))
    }

    /// All registered senders in canonical channel order.
    pub fn senders(&self) -> Vec<Arc<dyn ChannelSender>> {
        ChannelKind::ALL
            .into_iter()
            .filter_map(|kind| self.sender(kind))
            .collect()
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channel is registered.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
