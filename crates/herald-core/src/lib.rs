//! # herald-core
//!
//! Core crate for the Herald notification engine. Contains the
//! configuration schemas, typed identifiers, the cache and event-source
//! traits, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Herald crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
