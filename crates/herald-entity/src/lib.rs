//! # herald-entity
//!
//! Domain entity models for the Herald notification engine. Every struct
//! in this crate represents a database table row or a domain value
//! object. Database entities additionally derive `sqlx::FromRow`.

pub mod channel;
pub mod delivery;
pub mod notification;
pub mod preference;

pub use channel::ChannelKind;
pub use delivery::{DeliveryAttempt, DeliveryStatus};
pub use notification::{
    Notification, NotificationPriority, NotificationRequest, NotificationStatus,
};
pub use preference::UserPreference;
