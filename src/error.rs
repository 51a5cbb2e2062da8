//! Error types for DropMail
//!
//! Defines a comprehensive error enum covering all failure modes across the relay.
//! Uses thiserror for ergonomic error handling.

use crate::registry::ProviderKind;
use thiserror::Error;

/// Result type alias for DropMail operations
pub type Result<T> = std::result::Result<T, DropMailError>;

/// Comprehensive error type for DropMail operations
#[derive(Error, Debug)]
pub enum DropMailError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request rejected before any upstream call
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// The upstream provider could not be reached or answered with a server error
    #[error("{provider} is unavailable: {detail}")]
    UpstreamUnavailable {
        provider: ProviderKind,
        detail: String,
    },

    /// A token-based provider rejected the session token
    #[error("session expired for {provider}, generate a new mailbox")]
    SessionExpired { provider: ProviderKind },

    /// The requested message does not exist in the mailbox
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// Generation failed on the preferred provider and on the fallback
    #[error("all providers exhausted: {0}")]
    AllProvidersExhausted(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Anyhow errors (for more context)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl DropMailError {
    /// Shorthand for an `InvalidInput` with an owned reason
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Whether this error degrades a listing into an empty result
    /// instead of failing the request. Session expiry is the one
    /// listing failure that must surface to the caller.
    pub fn degrades_listing(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::Http(_) | Self::Json(_)
        )
    }
}
