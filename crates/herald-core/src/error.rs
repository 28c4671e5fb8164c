//! Unified application error types for Herald.
//!
//! All crates map their internal errors into [`AppError`] so they can be
//! propagated with `?`. The [`ErrorKind`] tells callers at which scope the
//! failure must be handled (per channel, per notification, per sweep).

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A required field is missing or the priority is unknown.
    Validation,
    /// Routing produced no channel that can be attempted.
    NoViableChannel,
    /// A channel send failed or timed out.
    Delivery,
    /// A persistence operation failed.
    Database,
    /// A concurrent writer moved the record first (refused status transition).
    Conflict,
    /// User preferences could not be resolved.
    Preference,
    /// A cache error occurred.
    Cache,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An upstream service (bus, gateway) misbehaved.
    ExternalService,
    /// The requested resource was not found.
    NotFound,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::NoViableChannel => write!(f, "NO_VIABLE_CHANNEL"),
            Self::Delivery => write!(f, "DELIVERY"),
            Self::Database => write!(f, "DATABASE"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Preference => write!(f, "PREFERENCE"),
            Self::Cache => write!(f, "CACHE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout Herald.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a no-viable-channel error.
    pub fn no_viable_channel(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoViableChannel, message)
    }

    /// Create a delivery error.
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Delivery, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a preference lookup error.
    pub fn preference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Preference, message)
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an external service error.
    pub fn external(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error was raised before the notification was persisted.
    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
