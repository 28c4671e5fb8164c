//! Per-channel delivery outcome records.

pub mod attempt;

pub use attempt::{DeliveryAttempt, DeliveryStatus};
