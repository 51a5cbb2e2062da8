//! Provider registry
//!
//! Static table of the upstream temporary-mail providers the relay knows how
//! to talk to, plus the inference rules that recover a provider from the
//! address/token/hint a client supplies on each request.
//!
//! The relay holds no session state: after generation, every listing or read
//! request must carry enough information to re-select the provider. The
//! explicit `provider` hint always wins; domain-set membership is the
//! heuristic fallback.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of upstream providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// 1secmail: anonymous, query-parameter API, no token
    #[default]
    SecMail,
    /// mail.tm: registered account with bearer-token auth
    MailTm,
    /// tempmail.lol: single-call generation returning an opaque token
    TempLol,
}

/// Static description of one upstream provider
#[derive(Debug, Clone, Copy)]
pub struct ProviderInfo {
    pub kind: ProviderKind,
    /// Display name, also accepted as a hint
    pub name: &'static str,
    /// Base endpoint for all calls to this provider
    pub base_url: &'static str,
    /// Domains this provider is known to serve
    pub domains: &'static [&'static str],
}

const SECMAIL: ProviderInfo = ProviderInfo {
    kind: ProviderKind::SecMail,
    name: "1secmail",
    base_url: "https://www.1secmail.com/api/v1/",
    domains: &[
        "1secmail.com",
        "1secmail.org",
        "1secmail.net",
        "kzccv.com",
        "qiott.com",
        "wuuvo.com",
        "icznn.com",
    ],
};

const MAILTM: ProviderInfo = ProviderInfo {
    kind: ProviderKind::MailTm,
    name: "mail.tm",
    base_url: "https://api.mail.tm",
    domains: &["mail.tm"],
};

const TEMPLOL: ProviderInfo = ProviderInfo {
    kind: ProviderKind::TempLol,
    name: "tempmail.lol",
    base_url: "https://api.tempmail.lol",
    domains: &["tempmail.lol"],
};

/// All known providers, in preference order
pub const PROVIDERS: &[ProviderInfo] = &[SECMAIL, MAILTM, TEMPLOL];

/// The provider used for the single generation-level retry when the
/// preferred provider's strategy fails
pub const FALLBACK_PROVIDER: ProviderKind = ProviderKind::TempLol;

impl ProviderKind {
    /// Static metadata for this provider
    pub fn info(&self) -> &'static ProviderInfo {
        match self {
            ProviderKind::SecMail => &SECMAIL,
            ProviderKind::MailTm => &MAILTM,
            ProviderKind::TempLol => &TEMPLOL,
        }
    }

    /// Domains this provider is known to serve
    pub fn domains(&self) -> &'static [&'static str] {
        self.info().domains
    }

    /// Base endpoint for this provider
    pub fn base_url(&self) -> &'static str {
        self.info().base_url
    }

    /// Whether retrieval from this provider requires a session token
    pub fn requires_token(&self) -> bool {
        !matches!(self, ProviderKind::SecMail)
    }

    /// Stable slug used in API responses and accepted as a hint
    pub fn slug(&self) -> &'static str {
        match self {
            ProviderKind::SecMail => "secmail",
            ProviderKind::MailTm => "mailtm",
            ProviderKind::TempLol => "templol",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}

/// Resolve a client-supplied provider hint
///
/// Accepts the response slug, the upstream display name, and a few
/// historical aliases. Unknown hints resolve to `None`; the caller decides
/// whether to fall back to inference or reject.
pub fn lookup_by_hint(hint: &str) -> Option<ProviderKind> {
    match hint.trim().to_lowercase().as_str() {
        "secmail" | "1secmail" | "1secmail-local" => Some(ProviderKind::SecMail),
        "mailtm" | "mail.tm" | "mail.gw" | "mailjs" => Some(ProviderKind::MailTm),
        "templol" | "tempmail.lol" | "tempmail" => Some(ProviderKind::TempLol),
        _ => None,
    }
}

/// Infer which provider services an address
///
/// Precedence, applied identically for listing and reading:
/// 1. An explicit hint is trusted outright.
/// 2. Token present and domain in mail.tm's set: mail.tm.
/// 3. Token present and domain in tempmail.lol's set: tempmail.lol.
/// 4. Token present, domain unknown: tempmail.lol. Token-bearing addresses
///    belong to a token-based provider even when the domain set has drifted.
/// 5. No token: 1secmail, the only provider that retrieves without one.
pub fn infer(domain: &str, has_token: bool, hint: Option<ProviderKind>) -> ProviderKind {
    if let Some(kind) = hint {
        return kind;
    }
    if has_token {
        if ProviderKind::MailTm.domains().contains(&domain) {
            return ProviderKind::MailTm;
        }
        return ProviderKind::TempLol;
    }
    ProviderKind::SecMail
}
