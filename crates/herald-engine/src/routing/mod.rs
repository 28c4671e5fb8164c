//! Priority-keyed routing.

pub mod policy;
pub mod router;

pub use policy::{CandidateSource, FanOutMode, ROUTING_TABLE, RoutingPolicy, policy_for};
pub use router::{RoutePlan, Router};
