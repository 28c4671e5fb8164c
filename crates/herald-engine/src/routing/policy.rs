//! The routing table.
//!
//! Every priority tier maps to exactly one [`RoutingPolicy`]. Adding a tier
//! means adding a row here; the router itself has no per-priority branches.

use herald_entity::{ChannelKind, NotificationPriority};

/// How the candidates of a plan are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutMode {
    /// Send on every candidate concurrently and wait for all of them.
    BroadcastAll,
    /// Send one at a time and stop at the first success.
    FirstSuccess,
    /// Send one at a time on every candidate regardless of outcome.
    EachInOrder,
}

/// Where the candidate channels of a policy come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// A fixed ordered list; user opt-outs are overridden.
    Fixed(&'static [ChannelKind]),
    /// The channels the user enabled, optionally narrowed by the request's
    /// channel hint.
    Preferences,
}

/// One row of the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPolicy {
    /// Priority this row applies to.
    pub priority: NotificationPriority,
    /// Candidate channels.
    pub candidates: CandidateSource,
    /// Fan-out mode over the candidates.
    pub mode: FanOutMode,
    /// Single last-resort channel tried when no candidate succeeded.
    pub fallback: Option<ChannelKind>,
}

impl RoutingPolicy {
    /// Whether this policy needs the user's preference map.
    pub fn uses_preferences(&self) -> bool {
        self.candidates == CandidateSource::Preferences
    }
}

/// The routing table, one row per priority.
pub const ROUTING_TABLE: [RoutingPolicy; 3] = [
    RoutingPolicy {
        priority: NotificationPriority::Emergency,
        candidates: CandidateSource::Fixed(&[ChannelKind::Push, ChannelKind::Sms, ChannelKind::Email]),
        mode: FanOutMode::BroadcastAll,
        fallback: None,
    },
    RoutingPolicy {
        priority: NotificationPriority::High,
        candidates: CandidateSource::Fixed(&[ChannelKind::Push, ChannelKind::Sms]),
        mode: FanOutMode::FirstSuccess,
        fallback: Some(ChannelKind::Email),
    },
    RoutingPolicy {
        priority: NotificationPriority::Normal,
        candidates: CandidateSource::Preferences,
        mode: FanOutMode::EachInOrder,
        fallback: None,
    },
];

/// Look up the policy row of a priority.
pub fn policy_for(priority: NotificationPriority) -> &'static RoutingPolicy {
    match priority {
        NotificationPriority::Emergency => &ROUTING_TABLE[0],
        NotificationPriority::High => &ROUTING_TABLE[1],
        NotificationPriority::Normal => &ROUTING_TABLE[2],
    }
}
