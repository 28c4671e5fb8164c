//! # herald-worker
//!
//! Long-running background tasks of the Herald engine:
//!
//! - [`Scheduler`]: deferred promotion and failed-delivery retry sweeps
//! - [`IngestLoop`]: pulls notification requests off the event bus
//! - [`ChannelHealthMonitor`]: keeps channel availability flags current
//! - [`ServiceRunner`]: runs all of the above against one shutdown signal
//!
//! Event source backends live in [`sources`].

pub mod health;
pub mod ingest;
pub mod runner;
pub mod scheduler;
pub mod sources;

pub use health::ChannelHealthMonitor;
pub use ingest::IngestLoop;
pub use runner::ServiceRunner;
pub use scheduler::{Scheduler, SweepReport};
