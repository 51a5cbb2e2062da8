//! tempmail.lol adapter
//!
//! tempmail.lol hands out an address and an opaque access token in a single
//! `generate` call; there is no registration step. The token retrieves the
//! whole mailbox at once, and there is no read-by-id endpoint, so a single
//! read re-fetches the inbox and locates the message by id.
//!
//! Inbox entries usually carry no stable native id; ids are derived from the
//! immutable message fields so repeated polls agree.

use super::{upstream_error, upstream_status, MailProvider, UpstreamTimeouts};
use crate::mailbox::{GeneratedMailbox, MailboxHandle};
use crate::message::{
    derive_message_id, loose_id_eq, normalize_body, FullMessage, MessageSummary,
};
use crate::registry::ProviderKind;
use crate::{DropMailError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

/// tempmail.lol API client
pub struct TempLolAdapter {
    client: Client,
    base_url: String,
    timeouts: UpstreamTimeouts,
}

#[derive(Debug, Clone, Deserialize)]
struct LolGenerated {
    address: String,
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LolInbox {
    #[serde(default)]
    email: Vec<LolMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct LolMessage {
    /// Present on some deployments as a string or a number
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    from: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    html: Option<String>,
    /// Epoch milliseconds
    #[serde(default)]
    date: Option<i64>,
}

impl LolMessage {
    fn date_string(&self) -> String {
        self.date.map(|ms| ms.to_string()).unwrap_or_default()
    }

    /// Native id when the upstream supplies one, derived otherwise
    fn stable_id(&self) -> String {
        match &self.id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => derive_message_id(
                &self.from,
                &self.subject,
                &self.date_string(),
                self.body.as_deref().unwrap_or_default(),
            ),
        }
    }
}

impl TempLolAdapter {
    pub fn new(client: Client, timeouts: UpstreamTimeouts) -> Self {
        Self {
            client,
            base_url: ProviderKind::TempLol.base_url().to_string(),
            timeouts,
        }
    }

    /// Fetch the whole inbox for a token
    async fn fetch_inbox(&self, token: &str) -> Result<Vec<LolMessage>> {
        let response = self
            .client
            .get(format!("{}/auth/{}", self.base_url, token))
            .timeout(self.timeouts.fetch)
            .send()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        match response.status() {
            status if status.is_success() => {
                let inbox: LolInbox = response
                    .json()
                    .await
                    .map_err(|e| upstream_error(self.kind(), &e))?;
                Ok(inbox.email)
            }
            StatusCode::UNAUTHORIZED => Err(DropMailError::SessionExpired {
                provider: self.kind(),
            }),
            status => Err(upstream_status(self.kind(), status)),
        }
    }

    fn summarize(message: &LolMessage) -> MessageSummary {
        MessageSummary {
            id: message.stable_id(),
            from: message.from.clone(),
            subject: message.subject.clone(),
            date: message.date_string(),
            body_preview: message.body.clone().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl MailProvider for TempLolAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::TempLol
    }

    async fn generate_mailbox(&self) -> Result<GeneratedMailbox> {
        let response = self
            .client
            .get(format!("{}/generate", self.base_url))
            .timeout(self.timeouts.generate)
            .send()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        if !response.status().is_success() {
            return Err(upstream_status(self.kind(), response.status()));
        }

        let generated: LolGenerated = response
            .json()
            .await
            .map_err(|e| upstream_error(self.kind(), &e))?;

        info!(email = %generated.address, "tempmail.lol assigned a mailbox");
        GeneratedMailbox::from_address(&generated.address, self.kind(), Some(generated.token))
    }

    async fn list_messages(&self, handle: &MailboxHandle) -> Result<Vec<MessageSummary>> {
        let Some(token) = handle.token.as_deref() else {
            debug!(email = %handle.email, "No session token for tempmail.lol, returning empty list");
            return Ok(Vec::new());
        };

        let inbox = self.fetch_inbox(token).await?;
        info!(email = %handle.email, count = inbox.len(), "tempmail.lol listing complete");
        Ok(inbox.iter().map(Self::summarize).collect())
    }

    async fn read_message(&self, handle: &MailboxHandle, id: &str) -> Result<FullMessage> {
        let token = handle.token.as_deref().ok_or_else(|| {
            DropMailError::invalid("token", "tempmail.lol requires the session token")
        })?;

        let inbox = self.fetch_inbox(token).await?;
        let message = inbox
            .into_iter()
            .find(|m| loose_id_eq(id, &m.stable_id()))
            .ok_or_else(|| DropMailError::MessageNotFound(id.to_string()))?;

        let stable_id = message.stable_id();
        let date = message.date_string();
        let (html_body, text_body) = normalize_body(message.html, message.body);

        Ok(FullMessage {
            id: stable_id,
            from: message.from,
            subject: message.subject,
            date,
            html_body,
            text_body,
            attachments: Vec::new(),
        })
    }

    async fn list_domains(&self) -> Result<Vec<String>> {
        // No upstream domain endpoint; the static set is the whole answer.
        Ok(self
            .kind()
            .domains()
            .iter()
            .map(|d| d.to_string())
            .collect())
    }
}
