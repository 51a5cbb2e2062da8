//! Canonical message model
//!
//! The three upstream providers return three different JSON schemas for a
//! message. Everything the relay hands back to clients is normalized into the
//! shapes here, so callers never see a provider-specific field.
//!
//! # Stable ids
//!
//! Clients use message ids to detect "already seen" across polls, so an id
//! must not change between two listings of an unchanged mailbox. Providers
//! without a native id field get one derived deterministically from the
//! immutable fields of the message (sender, subject, date, body prefix).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How many body characters participate in id derivation
const ID_BODY_PREFIX: usize = 64;

/// One message in a mailbox listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    /// Stable id, native or derived
    pub id: String,
    pub from: String,
    pub subject: String,
    /// Provider-native date string; format varies by provider
    pub date: String,
    /// Short plain-text preview, empty when the provider's listing has none
    pub body_preview: String,
}

/// A fully fetched message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullMessage {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub date: String,
    /// Always non-empty: native HTML, synthesized from text, or a placeholder
    pub html_body: String,
    pub text_body: String,
    pub attachments: Vec<Attachment>,
}

/// Attachment metadata; the relay never fetches attachment content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
}

/// Derive a stable message id from immutable message fields
///
/// SHA-256 over sender, subject, date, and the first 64 characters of the
/// body, hex-truncated to 16 characters. Deriving twice from an unchanged
/// payload yields the same string; this is a documented contract, not an
/// implementation detail.
pub fn derive_message_id(from: &str, subject: &str, date: &str, body: &str) -> String {
    let prefix: String = body.chars().take(ID_BODY_PREFIX).collect();

    let mut hasher = Sha256::new();
    hasher.update(from.as_bytes());
    hasher.update([0]);
    hasher.update(subject.as_bytes());
    hasher.update([0]);
    hasher.update(date.as_bytes());
    hasher.update([0]);
    hasher.update(prefix.as_bytes());

    let digest = hasher.finalize();
    let mut id = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        id.push_str(&format!("{:02x}", byte));
    }
    id
}

/// Compare a requested id against a native one, loosely
///
/// Upstream ids may be strings or numbers; a client asking for "42" must
/// match a native numeric 42.
pub fn loose_id_eq(requested: &str, native: &str) -> bool {
    let requested = requested.trim();
    let native = native.trim();
    if requested == native {
        return true;
    }
    match (requested.parse::<i64>(), native.parse::<i64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Escape the five HTML-reserved characters
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Normalize a message body into (html, text)
///
/// Prefers native HTML. A text-only message gets its content escaped and
/// wrapped in a container that preserves whitespace and line breaks. A
/// message with neither body produces a fixed placeholder.
pub fn normalize_body(html: Option<String>, text: Option<String>) -> (String, String) {
    let text = text.unwrap_or_default();

    let html_body = match html {
        Some(h) if !h.trim().is_empty() => h,
        _ if !text.trim().is_empty() => format!(
            "<div style=\"font-family: Arial, sans-serif; white-space: pre-wrap; line-height: 1.6;\">{}</div>",
            escape_html(&text)
        ),
        _ => "<p style=\"color: #999;\">(empty message)</p>".to_string(),
    };

    (html_body, text)
}
