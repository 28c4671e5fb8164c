//! Turns a notification's priority into an ordered channel plan.

use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_entity::{ChannelKind, NotificationPriority, UserPreference};

use super::policy::{CandidateSource, FanOutMode, RoutingPolicy, policy_for};

/// The channels to attempt for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    /// How [`channels`](Self::channels) are attempted.
    pub mode: FanOutMode,
    /// Primary candidates, in attempt order. Only available channels.
    pub channels: Vec<ChannelKind>,
    /// Last-resort channel, attempted only if no primary succeeded.
    pub fallback: Option<ChannelKind>,
}

impl RoutePlan {
    /// Every channel the plan may touch, primary first.
    pub fn all_channels(&self) -> impl Iterator<Item = ChannelKind> + '_ {
        self.channels.iter().copied().chain(self.fallback)
    }
}

/// Stateless routing decision over the routing table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Router;

impl Router {
    /// Plan the delivery of a notification.
    ///
    /// `hint` is the request's ordered channel list and only narrows
    /// preference-driven routing. `preferences` may be `None` for priorities
    /// that override user choice. `is_available` reports live channel
    /// availability; channels it rejects are dropped from the plan.
    ///
    /// Fails with a `NoViableChannel` error when nothing can be attempted.
    pub fn plan(
        priority: NotificationPriority,
        hint: &[String],
        preferences: Option<&UserPreference>,
        is_available: impl Fn(ChannelKind) -> bool,
    ) -> AppResult<RoutePlan> {
        let policy = policy_for(priority);
        let channels: Vec<ChannelKind> = Self::candidates(policy, hint, preferences)
            .into_iter()
            .filter(|c| is_available(*c))
            .collect();
        let fallback = policy
            .fallback
            .filter(|c| !channels.contains(c) && is_available(*c));

        if channels.is_empty() && fallback.is_none() {
            return Err(AppError::no_viable_channel(format!(
                "No available channel for {priority} notification"
            )));
        }

        Ok(RoutePlan {
            mode: policy.mode,
            channels,
            fallback,
        })
    }

    fn candidates(
        policy: &RoutingPolicy,
        hint: &[String],
        preferences: Option<&UserPreference>,
    ) -> Vec<ChannelKind> {
        match policy.candidates {
            CandidateSource::Fixed(channels) => channels.to_vec(),
            CandidateSource::Preferences => {
                let Some(prefs) = preferences else {
                    return Vec::new();
                };
                let hinted: Vec<ChannelKind> = hint
                    .iter()
                    .filter_map(|name| ChannelKind::parse(name))
                    .collect();
                if hinted.is_empty() {
                    return prefs.enabled_channels();
                }
                let mut ordered = Vec::with_capacity(hinted.len());
                for channel in hinted {
                    if prefs.is_enabled(channel) && !ordered.contains(&channel) {
                        ordered.push(channel);
                    }
                }
                ordered
            }
        }
    }
}
