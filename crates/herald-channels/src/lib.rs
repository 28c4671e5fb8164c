//! # herald-channels
//!
//! Delivery channel abstraction and the HTTP gateway senders used for
//! push, SMS and email. The engine only ever sees
//! [`ChannelSender`] trait objects, so providers can be swapped without
//! touching routing or tracking.

pub mod builder;
pub mod http;
pub mod sender;

pub use builder::build_senders;
pub use http::HttpChannelSender;
pub use sender::{ChannelSender, SendError};
