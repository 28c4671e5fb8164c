//! User channel preferences.

pub mod model;

pub use model::UserPreference;
