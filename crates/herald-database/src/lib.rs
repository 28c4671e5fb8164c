//! # herald-database
//!
//! Persistence for the Herald engine: the [`NotificationStore`] and
//! [`PreferenceSource`] contracts, their PostgreSQL implementations, and
//! in-memory implementations for single-node setups and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::{MemoryNotificationStore, MemoryPreferenceSource};
pub use repositories::{PgNotificationStore, PgPreferenceSource};
pub use store::{NotificationStore, PreferenceSource, RetryCandidate};
