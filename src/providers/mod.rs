//! Upstream provider adapters
//!
//! One adapter per temporary-mail service. Each adapter speaks its
//! provider's native request/response shapes and returns the canonical
//! types from [`crate::message`]; nothing provider-specific escapes this
//! module.
//!
//! # Built-in providers
//!
//! - **1secmail**: anonymous query-parameter API, no token
//! - **mail.tm**: account registration plus bearer-token auth
//! - **tempmail.lol**: one-call generation returning an opaque token

use crate::mailbox::{GeneratedMailbox, MailboxHandle};
use crate::message::{FullMessage, MessageSummary};
use crate::registry::ProviderKind;
use crate::{DropMailError, Result};
use async_trait::async_trait;
use std::time::Duration;

pub mod mailtm;
pub mod secmail;
pub mod templol;

pub use mailtm::MailTmAdapter;
pub use secmail::SecMailAdapter;
pub use templol::TempLolAdapter;

/// Per-request timeouts for upstream calls
#[derive(Debug, Clone, Copy)]
pub struct UpstreamTimeouts {
    /// Generation and domain-listing calls
    pub generate: Duration,
    /// Message listing and reading calls
    pub fetch: Duration,
}

impl Default for UpstreamTimeouts {
    fn default() -> Self {
        Self {
            generate: Duration::from_secs(10),
            fetch: Duration::from_secs(15),
        }
    }
}

/// The operations every provider strategy supports
///
/// Selected via the registry and dispatched by [`crate::dispatcher`], so
/// per-endpoint branching on provider names stays out of the handlers.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Which provider this adapter talks to
    fn kind(&self) -> ProviderKind;

    /// Create a new mailbox, returning the address and any session token
    async fn generate_mailbox(&self) -> Result<GeneratedMailbox>;

    /// List the mailbox in provider-native order
    async fn list_messages(&self, handle: &MailboxHandle) -> Result<Vec<MessageSummary>>;

    /// Fetch one message with its full body
    async fn read_message(&self, handle: &MailboxHandle, id: &str) -> Result<FullMessage>;

    /// Domains the provider currently serves, fetched live
    async fn list_domains(&self) -> Result<Vec<String>>;
}

/// Classify a reqwest transport failure into `UpstreamUnavailable`
/// with a caller-readable detail.
pub(crate) fn upstream_error(provider: ProviderKind, err: &reqwest::Error) -> DropMailError {
    let detail = if err.is_timeout() {
        "request timed out; the API may be slow, try again later".to_string()
    } else if err.is_connect() {
        "connection failed; check network access".to_string()
    } else if let Some(status) = err.status() {
        format!("upstream answered HTTP {}", status)
    } else {
        err.to_string()
    };
    DropMailError::UpstreamUnavailable { provider, detail }
}

/// Non-2xx response from an upstream, as `UpstreamUnavailable`
pub(crate) fn upstream_status(provider: ProviderKind, status: reqwest::StatusCode) -> DropMailError {
    DropMailError::UpstreamUnavailable {
        provider,
        detail: format!("upstream answered HTTP {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts_are_bounded() {
        let timeouts = UpstreamTimeouts::default();
        assert_eq!(timeouts.generate, Duration::from_secs(10));
        assert_eq!(timeouts.fetch, Duration::from_secs(15));
    }

    #[test]
    fn test_status_classification() {
        let err = upstream_status(ProviderKind::SecMail, reqwest::StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("502"));
        assert!(err.degrades_listing());
    }
}
