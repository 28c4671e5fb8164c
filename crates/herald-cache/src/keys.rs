//! Cache key builders.
//!
//! The Redis provider adds its own configured prefix on top of these.

use herald_core::types::UserId;

/// Cache key for the resolved channel map of a user.
pub fn user_prefs(user_id: UserId) -> String {
    format!("user_prefs:{user_id}")
}
