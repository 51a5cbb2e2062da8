//! Request dispatch
//!
//! The dispatcher owns one adapter per provider plus the configured default,
//! and is the only place that picks an adapter: handlers hand it the raw
//! request parameters and get canonical results back.
//!
//! The default provider is an explicit configuration value threaded in at
//! construction; there is no mutable process-wide selection.

use crate::config::DropMailConfig;
use crate::mailbox::{GeneratedMailbox, MailboxHandle};
use crate::message::{FullMessage, MessageSummary};
use crate::providers::{
    MailProvider, MailTmAdapter, SecMailAdapter, TempLolAdapter, UpstreamTimeouts,
};
use crate::registry::{ProviderKind, FALLBACK_PROVIDER};
use crate::{DropMailError, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound on any single upstream exchange, over and above the
/// per-request timeouts
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes each operation to the right provider adapter
pub struct Dispatcher {
    secmail: SecMailAdapter,
    mailtm: MailTmAdapter,
    templol: TempLolAdapter,
    default_provider: ProviderKind,
}

impl Dispatcher {
    /// Build the dispatcher and its shared HTTP client from config
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &DropMailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()?;
        let timeouts = UpstreamTimeouts {
            generate: Duration::from_secs(config.upstream.generate_timeout_secs),
            fetch: Duration::from_secs(config.upstream.fetch_timeout_secs),
        };

        Ok(Self {
            secmail: SecMailAdapter::new(client.clone(), timeouts),
            mailtm: MailTmAdapter::new(client.clone(), timeouts),
            templol: TempLolAdapter::new(client, timeouts),
            default_provider: config.default_provider,
        })
    }

    /// The provider used when a request names none
    pub fn default_provider(&self) -> ProviderKind {
        self.default_provider
    }

    fn adapter(&self, kind: ProviderKind) -> &dyn MailProvider {
        match kind {
            ProviderKind::SecMail => &self.secmail,
            ProviderKind::MailTm => &self.mailtm,
            ProviderKind::TempLol => &self.templol,
        }
    }

    /// Generate a mailbox on the preferred (or default) provider,
    /// retrying once against the designated fallback provider
    pub async fn generate(&self, preferred: Option<ProviderKind>) -> Result<GeneratedMailbox> {
        let primary = preferred.unwrap_or(self.default_provider);

        let primary_err = match self.adapter(primary).generate_mailbox().await {
            Ok(mailbox) => {
                info!(
                    provider = %primary,
                    email = %mailbox.email,
                    confirmed = mailbox.confirmed,
                    "Mailbox generated"
                );
                return Ok(mailbox);
            }
            Err(e) => e,
        };

        if primary == FALLBACK_PROVIDER {
            return Err(DropMailError::AllProvidersExhausted(primary_err.to_string()));
        }

        warn!(
            provider = %primary,
            error = %primary_err,
            "Generation failed, retrying on the fallback provider"
        );

        match self.adapter(FALLBACK_PROVIDER).generate_mailbox().await {
            Ok(mailbox) => {
                info!(
                    provider = %FALLBACK_PROVIDER,
                    email = %mailbox.email,
                    "Fallback provider generated a mailbox"
                );
                Ok(mailbox)
            }
            Err(fallback_err) => Err(DropMailError::AllProvidersExhausted(format!(
                "{}; fallback {}",
                primary_err, fallback_err
            ))),
        }
    }

    /// List a mailbox, inferring the provider from the request parameters
    pub async fn list_messages(
        &self,
        email: &str,
        token: Option<String>,
        hint: Option<ProviderKind>,
    ) -> Result<Vec<MessageSummary>> {
        let handle = MailboxHandle::parse(email, token, hint)?;
        self.adapter(handle.provider).list_messages(&handle).await
    }

    /// Read one message, inferring the provider the same way as listing
    pub async fn read_message(
        &self,
        email: &str,
        id: &str,
        token: Option<String>,
        hint: Option<ProviderKind>,
    ) -> Result<FullMessage> {
        if id.trim().is_empty() {
            return Err(DropMailError::invalid("id", "message id is required"));
        }
        let handle = MailboxHandle::parse(email, token, hint)?;
        self.adapter(handle.provider).read_message(&handle, id).await
    }

    /// Live domain fetch, without the static fallback
    pub async fn live_domains(&self, kind: ProviderKind) -> Result<Vec<String>> {
        self.adapter(kind).list_domains().await
    }

    /// Domains served by a provider: live when the upstream answers,
    /// the static set otherwise. Never fails.
    pub async fn list_domains(&self, kind: Option<ProviderKind>) -> (ProviderKind, Vec<String>) {
        let kind = kind.unwrap_or(self.default_provider);
        match self.live_domains(kind).await {
            Ok(domains) if !domains.is_empty() => (kind, domains),
            Ok(_) | Err(_) => {
                warn!(provider = %kind, "Live domain lookup failed, serving the static set");
                (
                    kind,
                    kind.domains().iter().map(|d| d.to_string()).collect(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DropMailConfig;

    #[test]
    fn test_dispatcher_builds_from_default_config() {
        let config = DropMailConfig::default();
        let dispatcher = Dispatcher::new(&config).unwrap();
        assert_eq!(dispatcher.default_provider(), ProviderKind::SecMail);
    }

    #[test]
    fn test_adapter_selection_matches_kind() {
        let dispatcher = Dispatcher::new(&DropMailConfig::default()).unwrap();
        for kind in [
            ProviderKind::SecMail,
            ProviderKind::MailTm,
            ProviderKind::TempLol,
        ] {
            assert_eq!(dispatcher.adapter(kind).kind(), kind);
        }
    }

    #[tokio::test]
    async fn test_read_rejects_blank_id() {
        let dispatcher = Dispatcher::new(&DropMailConfig::default()).unwrap();
        let err = dispatcher
            .read_message("a@1secmail.com", "  ", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DropMailError::InvalidInput { field: "id", .. }));
    }

    #[tokio::test]
    async fn test_list_rejects_malformed_email_before_upstream() {
        let dispatcher = Dispatcher::new(&DropMailConfig::default()).unwrap();
        let err = dispatcher
            .list_messages("no-at-sign", None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DropMailError::InvalidInput { field: "email", .. }
        ));
    }
}
