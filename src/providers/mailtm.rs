//! mail.tm adapter
//!
//! mail.tm is an account-based provider: generation registers an account and
//! exchanges the credentials for a bearer token, which every later call must
//! carry. Collections come wrapped in hydra envelopes (`hydra:member`).
//!
//! Account creation and token exchange are sequential and must both succeed;
//! an account with no usable token is not a valid result. Only the initial
//! domain lookup has a fallback (the hardcoded default domain).

use super::{upstream_error, upstream_status, MailProvider, UpstreamTimeouts};
use crate::mailbox::{self, GeneratedMailbox, MailboxHandle};
use crate::message::{normalize_body, Attachment, FullMessage, MessageSummary};
use crate::registry::ProviderKind;
use crate::{DropMailError, Result};
use async_trait::async_trait;
use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Domain used when the live domain lookup fails
const FALLBACK_DOMAIN: &str = "mail.tm";
/// Fixed username prefix; a random numeric suffix is appended
const ACCOUNT_PREFIX: &str = "drop";
/// Length of the generated account password
const PASSWORD_LEN: usize = 16;

/// mail.tm API client
pub struct MailTmAdapter {
    client: Client,
    base_url: String,
    timeouts: UpstreamTimeouts,
}

/// hydra collection envelope
#[derive(Debug, Clone, Deserialize)]
struct HydraCollection<T> {
    #[serde(rename = "hydra:member", default = "Vec::new")]
    member: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmDomain {
    domain: String,
}

#[derive(Debug, Clone, Serialize)]
struct TmCredentials {
    address: String,
    password: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TmToken {
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TmAddress {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TmListItem {
    id: String,
    #[serde(default)]
    from: Option<TmAddress>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    intro: String,
    #[serde(rename = "createdAt", default)]
    created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TmFullMessage {
    id: String,
    #[serde(default)]
    from: Option<TmAddress>,
    #[serde(default)]
    subject: String,
    #[serde(rename = "createdAt", default)]
    created_at: String,
    #[serde(default)]
    text: Option<String>,
    /// mail.tm returns the HTML body as an array of fragments
    #[serde(default)]
    html: Option<Vec<String>>,
    #[serde(default)]
    attachments: Vec<TmAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmAttachment {
    #[serde(default)]
    filename: String,
    #[serde(rename = "contentType", default)]
    content_type: String,
    #[serde(default)]
    size: u64,
}

impl MailTmAdapter {
    pub fn new(client: Client, timeouts: UpstreamTimeouts) -> Self {
        Self {
            client,
            base_url: ProviderKind::MailTm.base_url().to_string(),
            timeouts,
        }
    }

    /// Fetch a live domain, falling back to the hardcoded default
    async fn live_domain(&self) -> String {
        let result = self
            .client
            .get(format!("{}/domains", self.base_url))
            .timeout(self.timeouts.generate)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                match response.json::<HydraCollection<TmDomain>>().await {
                    Ok(collection) => collection
                        .member
                        .into_iter()
                        .next()
                        .map(|d| d.domain)
                        .unwrap_or_else(|| {
                            warn!("mail.tm domain list is empty, using fallback domain");
                            FALLBACK_DOMAIN.to_string()
                        }),
                    Err(e) => {
                        warn!(error = %e, "mail.tm domain list unparseable, using fallback domain");
                        FALLBACK_DOMAIN.to_string()
                    }
                }
            }
            Ok(response) => {
                warn!(status = %response.status(), "mail.tm domain lookup failed, using fallback domain");
                FALLBACK_DOMAIN.to_string()
            }
            Err(e) => {
                warn!(error = %e, "mail.tm domain lookup failed, using fallback domain");
                FALLBACK_DOMAIN.to_string()
            }
        }
    }

    fn summarize(item: TmListItem) -> MessageSummary {
        MessageSummary {
            id: item.id,
            from: item.from.map(|f| f.address).unwrap_or_default(),
            subject: item.subject,
            date: item.created_at,
            body_preview: item.intro,
        }
    }

    fn bearer_token<'a>(handle: &'a MailboxHandle) -> Result<&'a str> {
        handle
            .token
            .as_deref()
            .ok_or_else(|| DropMailError::invalid("token", "mail.tm requires the session token"))
    }
}

#[async_trait]
impl MailProvider for MailTmAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MailTm
    }

    async fn generate_mailbox(&self) -> Result<GeneratedMailbox> {
        let domain = self.live_domain().await;
        let username = format!("{}{}", ACCOUNT_PREFIX, mailbox::random_suffix());
        let address = format!("{}@{}", username, domain);
        let password: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(PASSWORD_LEN)
            .map(char::from)
            .collect();

        debug!(address = %address, "Registering mail.tm account");

        let credentials = TmCredentials {
            address: address.clone(),
            password,
        };

        let response = self
            .client
            .post(format!("{}/accounts", self.base_url))
            .json(&credentials)
            .timeout(self.timeouts.generate)
            .send()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        if !response.status().is_success() {
            return Err(DropMailError::UpstreamUnavailable {
                provider: self.kind(),
                detail: format!("account creation rejected with HTTP {}", response.status()),
            });
        }

        let response = self
            .client
            .post(format!("{}/token", self.base_url))
            .json(&credentials)
            .timeout(self.timeouts.generate)
            .send()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        if !response.status().is_success() {
            return Err(DropMailError::UpstreamUnavailable {
                provider: self.kind(),
                detail: format!("token exchange rejected with HTTP {}", response.status()),
            });
        }

        let token: TmToken = response
            .json()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        info!(email = %address, "mail.tm account registered");
        GeneratedMailbox::from_address(&address, self.kind(), Some(token.token))
    }

    async fn list_messages(&self, handle: &MailboxHandle) -> Result<Vec<MessageSummary>> {
        let Some(token) = handle.token.as_deref() else {
            debug!(email = %handle.email, "No session token for mail.tm, returning empty list");
            return Ok(Vec::new());
        };

        // One request at the API's page size; multi-page mailboxes are
        // truncated by contract.
        let response = self
            .client
            .get(format!("{}/messages", self.base_url))
            .query(&[("page", "1")])
            .bearer_auth(token)
            .timeout(self.timeouts.fetch)
            .send()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        match response.status() {
            status if status.is_success() => {
                let collection: HydraCollection<TmListItem> = response
                    .json()
                    .await
                    .map_err(|e| upstream_error(self.kind(), &e))?;

                info!(
                    email = %handle.email,
                    count = collection.member.len(),
                    "mail.tm listing complete"
                );
                Ok(collection.member.into_iter().map(Self::summarize).collect())
            }
            StatusCode::UNAUTHORIZED => Err(DropMailError::SessionExpired {
                provider: self.kind(),
            }),
            status => Err(upstream_status(self.kind(), status)),
        }
    }

    async fn read_message(&self, handle: &MailboxHandle, id: &str) -> Result<FullMessage> {
        let token = Self::bearer_token(handle)?;

        debug!(email = %handle.email, id = %id, "Reading mail.tm message");

        let response = self
            .client
            .get(format!("{}/messages/{}", self.base_url, id))
            .bearer_auth(token)
            .timeout(self.timeouts.fetch)
            .send()
            .await
            .map_err(|_| DropMailError::MessageNotFound(id.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let message: TmFullMessage = response
                    .json()
                    .await
                    .map_err(|_| DropMailError::MessageNotFound(id.to_string()))?;

                let html = message.html.map(|fragments| fragments.join("\n"));
                let (html_body, text_body) = normalize_body(html, message.text);

                Ok(FullMessage {
                    id: message.id,
                    from: message.from.map(|f| f.address).unwrap_or_default(),
                    subject: message.subject,
                    date: message.created_at,
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
            StatusCode::UNAUTHORIZED => Err(DropMailError::SessionExpired {
                provider: self.kind(),
            }),
            _ => Err(DropMailError::MessageNotFound(id.to_string())),
        }
    }

    async fn list_domains(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/domains", self.base_url))
            .timeout(self.timeouts.generate)
            .send()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        if !response.status().is_success() {
            return Err(upstream_status(self.kind(), response.status()));
        }

        let collection: HydraCollection<TmDomain> = response
            .json()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;
        Ok(collection.member.into_iter().map(|d| d.domain).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hydra_envelope_deserializes() {
        let collection: HydraCollection<TmDomain> = serde_json::from_value(serde_json::json!({
            "hydra:member": [{"domain": "mail.tm", "isActive": true}],
            "hydra:totalItems": 1
        }))
        .unwrap();
        assert_eq!(collection.member.len(), 1);
        assert_eq!(collection.member[0].domain, "mail.tm");
    }

    #[test]
    fn test_hydra_envelope_defaults_to_empty() {
        let collection: HydraCollection<TmDomain> =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(collection.member.is_empty());
    }

    #[test]
    fn test_summarize_maps_hydra_item() {
        let item: TmListItem = serde_json::from_value(serde_json::json!({
            "id": "65abc",
            "from": {"address": "sender@example.com", "name": "Sender"},
            "subject": "Greetings",
            "intro": "First line of the body",
            "createdAt": "2025-06-08T14:33:55+00:00"
        }))
        .unwrap();

        let summary = MailTmAdapter::summarize(item);
        assert_eq!(summary.id, "65abc");
        assert_eq!(summary.from, "sender@example.com");
        assert_eq!(summary.body_preview, "First line of the body");
        assert_eq!(summary.date, "2025-06-08T14:33:55+00:00");
    }

    #[test]
    fn test_full_message_joins_html_fragments() {
        let message: TmFullMessage = serde_json::from_value(serde_json::json!({
            "id": "65abc",
            "from": {"address": "a@b.c"},
            "subject": "s",
            "createdAt": "2025-06-08T14:33:55+00:00",
            "text": "plain",
            "html": ["<p>one</p>", "<p>two</p>"]
        }))
        .unwrap();

        let html = message.html.map(|fragments| fragments.join("\n"));
        let (html_body, text_body) = normalize_body(html, message.text);
        assert_eq!(html_body, "<p>one</p>\n<p>two</p>");
        assert_eq!(text_body, "plain");
    }

    #[test]
    fn test_bearer_token_required() {
        let handle = MailboxHandle {
            email: "x@mail.tm".to_string(),
            username: "x".to_string(),
            domain: "mail.tm".to_string(),
            provider: ProviderKind::MailTm,
            token: None,
        };
        assert!(MailTmAdapter::bearer_token(&handle).is_err());
    }
}
