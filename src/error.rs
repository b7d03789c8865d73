//! Error types for evhub.
//!
//! All errors in evhub are strongly typed using thiserror.
//! Registry mutations never fail; errors only surface from input validation,
//! from callbacks that report a failure during a dispatch pass, and from
//! channel subscriptions.

use std::error::Error as StdError;

use thiserror::Error;

use crate::registry::CallbackId;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Event name cannot be empty")]
    EmptyEventName,

    #[error("Invalid registry config: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Failure reported by a fallible callback.
///
/// Returning this from a callback aborts the rest of the dispatch pass.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CallbackError {
    /// Creates a callback error with a message only.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying error, using its display text as the message.
    #[must_use]
    pub fn from_error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Top-level error type for evhub.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Callback {callback_id} for event '{event_name}' failed: {source}")]
    CallbackFailed {
        event_name: String,
        callback_id: CallbackId,
        #[source]
        source: CallbackError,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

impl EventError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if a callback failed during dispatch.
    #[must_use]
    pub const fn is_callback_failure(&self) -> bool {
        matches!(self, Self::CallbackFailed { .. })
    }

    /// Returns true if a channel subscription was disconnected.
    #[must_use]
    pub const fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }
}

/// Result type alias for evhub operations.
pub type EventResult<T> = Result<T, EventError>;
