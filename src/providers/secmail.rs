//! 1secmail adapter
//!
//! 1secmail's API is a single endpoint dispatched on an `action` query
//! parameter, with no authentication. Generation uses the upstream
//! `genRandomMailbox` action and accepts the assigned address verbatim;
//! when the upstream is unreachable the adapter constructs an address
//! locally from the word generator plus a domain from the static set, and
//! marks the result as not upstream-confirmed.

use super::{upstream_error, upstream_status, MailProvider, UpstreamTimeouts};
use crate::mailbox::{self, GeneratedMailbox, MailboxHandle};
use crate::message::{normalize_body, Attachment, FullMessage, MessageSummary};
use crate::registry::ProviderKind;
use crate::{DropMailError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// 1secmail API client
pub struct SecMailAdapter {
    client: Client,
    base_url: String,
    timeouts: UpstreamTimeouts,
}

/// Listing entry as returned by `action=getMessages`
#[derive(Debug, Clone, Deserialize)]
struct SecMailListItem {
    id: u64,
    from: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(rename = "textBody", default)]
    text_body: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

/// Full message as returned by `action=readMessage`
#[derive(Debug, Clone, Deserialize)]
struct SecMailFullMessage {
    id: u64,
    from: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(rename = "textBody", default)]
    text_body: Option<String>,
    #[serde(rename = "htmlBody", default)]
    html_body: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    attachments: Vec<SecMailAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
struct SecMailAttachment {
    #[serde(default)]
    filename: String,
    #[serde(rename = "contentType", default)]
    content_type: String,
    #[serde(default)]
    size: u64,
}

impl SecMailAdapter {
    pub fn new(client: Client, timeouts: UpstreamTimeouts) -> Self {
        Self {
            client,
            base_url: ProviderKind::SecMail.base_url().to_string(),
            timeouts,
        }
    }

    /// Ask the upstream to assign a random mailbox
    async fn upstream_generate(&self) -> Result<GeneratedMailbox> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("action", "genRandomMailbox"), ("count", "1")])
            .timeout(self.timeouts.generate)
            .send()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        if !response.status().is_success() {
            return Err(upstream_status(self.kind(), response.status()));
        }

        let addresses: Vec<String> = response
            .json()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        let address = addresses.first().ok_or_else(|| DropMailError::UpstreamUnavailable {
            provider: self.kind(),
            detail: "generate returned an empty list".to_string(),
        })?;

        info!(email = %address, "1secmail assigned a mailbox");
        GeneratedMailbox::from_address(address, self.kind(), None)
    }

    fn summarize(item: SecMailListItem) -> MessageSummary {
        let preview = item.text_body.or(item.body).unwrap_or_default();
        MessageSummary {
            id: item.id.to_string(),
            from: item.from,
            subject: item.subject.unwrap_or_else(|| "(no subject)".to_string()),
            date: item.date.unwrap_or_default(),
            body_preview: preview,
        }
    }
}

#[async_trait]
impl MailProvider for SecMailAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SecMail
    }

    async fn generate_mailbox(&self) -> Result<GeneratedMailbox> {
        match self.upstream_generate().await {
            Ok(mailbox) => Ok(mailbox),
            Err(e) => {
                warn!(error = %e, "1secmail generate failed, constructing address locally");
                let username = mailbox::random_username();
                let domain = mailbox::random_domain(self.kind().domains());
                Ok(GeneratedMailbox {
                    email: format!("{}@{}", username, domain),
                    username,
                    domain,
                    provider: self.kind(),
                    token: None,
                    confirmed: false,
                })
            }
        }
    }

    async fn list_messages(&self, handle: &MailboxHandle) -> Result<Vec<MessageSummary>> {
        debug!(email = %handle.email, "Checking 1secmail mailbox");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("action", "getMessages"),
                ("login", handle.username.as_str()),
                ("domain", handle.domain.as_str()),
            ])
            .timeout(self.timeouts.fetch)
            .send()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        if !response.status().is_success() {
            return Err(upstream_status(self.kind(), response.status()));
        }

        let items: Vec<SecMailListItem> = response
            .json()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        info!(email = %handle.email, count = items.len(), "1secmail listing complete");
        Ok(items.into_iter().map(Self::summarize).collect())
    }

    async fn read_message(&self, handle: &MailboxHandle, id: &str) -> Result<FullMessage> {
        debug!(email = %handle.email, id = %id, "Reading 1secmail message");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("action", "readMessage"),
                ("login", handle.username.as_str()),
                ("domain", handle.domain.as_str()),
                ("id", id),
            ])
            .timeout(self.timeouts.fetch)
            .send()
            .await
            .map_err(|_| DropMailError::MessageNotFound(id.to_string()))?;

        if !response.status().is_success() {
            return Err(DropMailError::MessageNotFound(id.to_string()));
        }

        let message: SecMailFullMessage = response
            .json()
            .await
            .map_err(|_| DropMailError::MessageNotFound(id.to_string()))?;

        let text = message.text_body.or(message.body);
        let (html_body, text_body) = normalize_body(message.html_body, text);

        Ok(FullMessage {
            id: message.id.to_string(),
            from: message.from,
            subject: message.subject.unwrap_or_else(|| "(no subject)".to_string()),
            date: message.date.unwrap_or_default(),
            html_body,
            text_body,
            attachments: message
                .attachments
                .into_iter()
                .map(|a| Attachment {
                    filename: a.filename,
                    content_type: a.content_type,
                    size: a.size,
                })
                .collect(),
        })
    }

    async fn list_domains(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("action", "getDomainList")])
            .timeout(self.timeouts.generate)
            .send()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        if !response.status().is_success() {
            return Err(upstream_status(self.kind(), response.status()));
        }

        let domains: Vec<String> = response
            .json()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;
        Ok(domains)
    }
}
