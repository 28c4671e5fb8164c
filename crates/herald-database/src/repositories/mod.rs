//! PostgreSQL implementations of the storage contracts.

pub mod notification;
pub mod preference;

pub use notification::PgNotificationStore;
pub use preference::PgPreferenceSource;
