//! Error types and result aliases for tarq.
//!
//! This module defines the shared error types used across all tarq components.
//! Errors are structured for programmatic handling and include context for debugging.

/// The result type used throughout tarq.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tarq core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A scene identifier failed validation.
    #[error("invalid scene id: {message}")]
    InvalidSceneId {
        /// Description of what made the identifier invalid.
        message: String,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// A path or object was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn invalid_scene_id_display() {
        let err = Error::InvalidSceneId {
            message: "path 999 out of range".into(),
        };
        assert!(err.to_string().contains("invalid scene id"));
        assert!(err.to_string().contains("999"));
    }

    #[test]
    fn storage_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "object missing");
        let err = Error::storage_with_source("failed to read run info", source);
        assert!(err.to_string().contains("storage error"));
        assert!(StdError::source(&err).is_some());
    }
}
