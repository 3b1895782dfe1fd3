//! Error types and handling for the Vandebron integration
//!
//! This module defines the error types used throughout the crate, providing
//! consistent error handling and reporting. Per-request fetch failures have
//! their own type in [`crate::api::FetchError`] because they are usually
//! recovered from rather than propagated.

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, VandebronError>;

/// Main error type for the integration
#[derive(Debug, Error)]
pub enum VandebronError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream API returned something we cannot use
    #[error("API error: {message}")]
    Api { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// A coordinator refresh could not complete
    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    /// Config entry setup/unload errors
    #[error("Setup error: {message}")]
    Setup { message: String },

    /// HTTP server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl VandebronError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        VandebronError::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        VandebronError::Api {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        VandebronError::Network {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        VandebronError::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        VandebronError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new update-failed error
    pub fn update_failed<S: Into<String>>(message: S) -> Self {
        VandebronError::UpdateFailed {
            message: message.into(),
        }
    }

    /// Create a new setup error
    pub fn setup<S: Into<String>>(message: S) -> Self {
        VandebronError::Setup {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        VandebronError::Web {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        VandebronError::Generic {
            message: message.into(),
        }
    }

    /// Whether this error is the coordinator's "update failed" signal
    pub fn is_update_failed(&self) -> bool {
        matches!(self, VandebronError::UpdateFailed { .. })
    }
}

impl From<std::io::Error> for VandebronError {
    fn from(err: std::io::Error) -> Self {
        VandebronError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for VandebronError {
    fn from(err: serde_yaml::Error) -> Self {
        VandebronError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for VandebronError {
    fn from(err: serde_json::Error) -> Self {
        VandebronError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for VandebronError {
    fn from(err: reqwest::Error) -> Self {
        VandebronError::network(err.to_string())
    }
}

impl From<chrono::ParseError> for VandebronError {
    fn from(err: chrono::ParseError) -> Self {
        VandebronError::validation("datetime", err.to_string())
    }
}
