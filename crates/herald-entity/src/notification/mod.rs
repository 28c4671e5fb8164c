//! Notification domain entities.

pub mod model;
pub mod priority;
pub mod request;
pub mod status;

pub use model::Notification;
pub use priority::NotificationPriority;
pub use request::NotificationRequest;
pub use status::NotificationStatus;
