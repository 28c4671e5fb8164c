//! Traits implemented by pluggable backends.

pub mod cache;
pub mod event_source;

pub use cache::CacheProvider;
pub use event_source::{EventSource, RawEvent};
