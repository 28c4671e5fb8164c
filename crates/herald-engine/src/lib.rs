//! # herald-engine
//!
//! The delivery core of Herald: the channel registry, preference
//! resolution, the priority-keyed router, the dispatcher that fans a
//! notification out over its channels, and the delivery tracker that
//! turns per-channel outcomes into a notification status.

pub mod dispatcher;
pub mod preferences;
pub mod registry;
pub mod routing;
pub mod tracker;

pub use dispatcher::{DispatchOutcome, Dispatcher, RetryOutcome};
pub use preferences::PreferenceResolver;
pub use registry::ChannelRegistry;
pub use routing::{FanOutMode, RoutePlan, Router, RoutingPolicy};
pub use tracker::DeliveryTracker;
