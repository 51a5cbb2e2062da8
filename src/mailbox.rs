//! Mailbox handles
//!
//! A handle is the client-held identifying information for one disposable
//! inbox: the address, and for token-based providers the session token. The
//! relay keeps no per-mailbox state, so every listing or read request is
//! parsed back into a handle before dispatch.

use crate::registry::{self, ProviderKind};
use crate::{DropMailError, Result};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Word pools for locally constructed usernames
const USERNAME_PREFIXES: &[&str] = &[
    "drop", "temp", "quick", "fast", "safe", "anon", "win", "mail", "box", "secure",
];
const USERNAME_SUFFIXES: &[&str] = &[
    "mail", "post", "box", "drop", "win", "safe", "fast", "temp", "user", "test",
];

/// Client-held identity of one disposable inbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxHandle {
    pub email: String,
    pub username: String,
    pub domain: String,
    pub provider: ProviderKind,
    pub token: Option<String>,
}

impl MailboxHandle {
    /// Build a handle from the raw request parameters
    ///
    /// Validates the address shape and applies provider inference. Rejects
    /// malformed input before any upstream call is made.
    pub fn parse(email: &str, token: Option<String>, hint: Option<ProviderKind>) -> Result<Self> {
        let email = email.trim();
        if email.is_empty() {
            return Err(DropMailError::invalid("email", "address is required"));
        }

        let (username, domain) = email.split_once('@').ok_or_else(|| {
            DropMailError::invalid("email", format!("'{}' is missing the '@' separator", email))
        })?;

        if username.is_empty() {
            return Err(DropMailError::invalid("email", "local part is empty"));
        }
        if domain.is_empty() || !domain.contains('.') {
            return Err(DropMailError::invalid(
                "email",
                format!("'{}' is not a valid domain", domain),
            ));
        }

        let token = token.filter(|t| !t.trim().is_empty());
        let provider = registry::infer(domain, token.is_some(), hint);

        Ok(Self {
            email: email.to_string(),
            username: username.to_string(),
            domain: domain.to_string(),
            provider,
            token,
        })
    }
}

/// Result of a mailbox generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedMailbox {
    pub email: String,
    pub username: String,
    pub domain: String,
    pub provider: ProviderKind,
    pub token: Option<String>,
    /// False when the address was constructed locally after an upstream
    /// failure and is therefore not upstream-confirmed
    pub confirmed: bool,
}

impl GeneratedMailbox {
    /// Build a confirmed result from an upstream-assigned address
    pub fn from_address(email: &str, provider: ProviderKind, token: Option<String>) -> Result<Self> {
        let (username, domain) = email.split_once('@').ok_or_else(|| {
            DropMailError::UpstreamUnavailable {
                provider,
                detail: format!("returned malformed address '{}'", email),
            }
        })?;
        Ok(Self {
            email: email.to_string(),
            username: username.to_string(),
            domain: domain.to_string(),
            provider,
            token,
            confirmed: true,
        })
    }
}

/// Generate a word-based username: prefix word + suffix word + 4-digit number
pub fn random_username() -> String {
    let mut rng = rand::rng();
    let prefix = USERNAME_PREFIXES
        .choose(&mut rng)
        .copied()
        .unwrap_or("drop");
    let suffix = USERNAME_SUFFIXES
        .choose(&mut rng)
        .copied()
        .unwrap_or("mail");
    let number: u32 = rng.random_range(1000..10000);
    format!("{}{}{}", prefix, suffix, number).to_lowercase()
}

/// Generate a 4-digit numeric suffix for account-style usernames
pub fn random_suffix() -> u32 {
    rand::rng().random_range(1000..10000)
}

/// Pick a random domain from a static set
pub fn random_domain(domains: &[&str]) -> String {
    domains
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or("example.com")
        .to_string()
}
