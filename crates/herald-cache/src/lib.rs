//! # herald-cache
//!
//! Cache provider implementations for Herald. The only tenant today is the
//! per-user preference map, but every backend implements the generic
//! [`CacheProvider`](herald_core::traits::CacheProvider) contract:
//!
//! - **memory**: In-process cache using [moka](https://crates.io/crates/moka)
//!   with per-entry TTL
//! - **redis**: Redis-backed cache using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
