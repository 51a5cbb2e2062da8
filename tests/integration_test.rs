//! Integration tests for DropMail
//!
//! These tests exercise the public API: provider inference, canonical
//! normalization, handle parsing, and configuration round-trips. Nothing
//! here touches a live upstream.

use dropmail::config::DropMailConfig;
use dropmail::dispatcher::Dispatcher;
use dropmail::mailbox::{self, MailboxHandle};
use dropmail::message::{derive_message_id, escape_html, loose_id_eq, normalize_body};
use dropmail::registry::{self, ProviderKind, FALLBACK_PROVIDER, PROVIDERS};
use dropmail::DropMailError;
use tempfile::TempDir;

mod registry_tests {
    use super::*;

    #[test]
    fn test_inference_precedence_table() {
        // (domain, has_token, hint) -> expected provider
        let cases = [
            ("1secmail.com", false, None, ProviderKind::SecMail),
            ("mail.tm", true, None, ProviderKind::MailTm),
            ("tempmail.lol", true, None, ProviderKind::TempLol),
            // token with a drifted domain belongs to the token provider
            ("unknown.example", true, None, ProviderKind::TempLol),
            // tokenless requests always go to the anonymous provider
            ("mail.tm", false, None, ProviderKind::SecMail),
            // the explicit hint beats every heuristic
            ("mail.tm", true, Some(ProviderKind::SecMail), ProviderKind::SecMail),
            ("1secmail.com", false, Some(ProviderKind::MailTm), ProviderKind::MailTm),
        ];

        for (domain, has_token, hint, expected) in cases {
            assert_eq!(
                registry::infer(domain, has_token, hint),
                expected,
                "inference for ({}, {}, {:?})",
                domain,
                has_token,
                hint
            );
        }
    }

    #[test]
    fn test_fallback_provider_is_token_only() {
        assert_eq!(FALLBACK_PROVIDER, ProviderKind::TempLol);
        assert!(FALLBACK_PROVIDER.requires_token());
    }

    #[test]
    fn test_registry_domains_are_disjoint() {
        for (i, a) in PROVIDERS.iter().enumerate() {
            for b in PROVIDERS.iter().skip(i + 1) {
                for domain in a.domains {
                    assert!(
                        !b.domains.contains(domain),
                        "domain {} served by both {} and {}",
                        domain,
                        a.name,
                        b.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_hints_cover_display_names_and_slugs() {
        for info in PROVIDERS {
            assert_eq!(registry::lookup_by_hint(info.name), Some(info.kind));
            assert_eq!(registry::lookup_by_hint(info.kind.slug()), Some(info.kind));
        }
        assert_eq!(registry::lookup_by_hint("outlook"), None);
    }
}

mod normalization_tests {
    use super::*;

    #[test]
    fn test_escape_matches_contract() {
        assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#039;");
    }

    #[test]
    fn test_synthesized_html_preserves_line_breaks() {
        let (html, text) = normalize_body(None, Some("first\nsecond".to_string()));
        assert!(html.contains("white-space: pre-wrap"));
        assert!(html.contains("first\nsecond"));
        assert_eq!(text, "first\nsecond");
    }

    #[test]
    fn test_id_derivation_is_stable_across_calls() {
        let id1 = derive_message_id("a@b.c", "subject", "2025-01-01", "body");
        let id2 = derive_message_id("a@b.c", "subject", "2025-01-01", "body");
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_loose_comparison_bridges_string_and_numeric_ids() {
        assert!(loose_id_eq("42", "42"));
        assert!(loose_id_eq("007", "7"));
        assert!(!loose_id_eq("42", "420"));
    }
}

mod mailbox_tests {
    use super::*;

    #[test]
    fn test_handle_carries_inferred_provider() {
        let handle = MailboxHandle::parse(
            "dropbox1234@1secmail.org",
            None,
            None,
        )
        .unwrap();
        assert_eq!(handle.provider, ProviderKind::SecMail);
        assert_eq!(handle.username, "dropbox1234");
        assert_eq!(handle.domain, "1secmail.org");
    }

    #[test]
    fn test_handle_rejects_garbage_before_any_upstream_call() {
        for bad in ["", "no-at", "@nodomain.com", "user@", "user@nodot"] {
            let err = MailboxHandle::parse(bad, None, None).unwrap_err();
            assert!(
                matches!(err, DropMailError::InvalidInput { field: "email", .. }),
                "expected InvalidInput for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_local_usernames_use_provider_domains() {
        for _ in 0..10 {
            let domain = mailbox::random_domain(ProviderKind::SecMail.domains());
            assert!(ProviderKind::SecMail.domains().contains(&domain.as_str()));
        }
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");

        let mut config = DropMailConfig::new();
        config.default_provider = ProviderKind::TempLol;
        config.upstream.fetch_timeout_secs = 20;
        config.save(&path).unwrap();

        let loaded = DropMailConfig::load(&path).unwrap();
        assert_eq!(loaded.default_provider, ProviderKind::TempLol);
        assert_eq!(loaded.upstream.fetch_timeout_secs, 20);
        assert_eq!(loaded.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_dispatcher_honors_configured_default() {
        let mut config = DropMailConfig::new();
        config.default_provider = ProviderKind::MailTm;

        let dispatcher = Dispatcher::new(&config).unwrap();
        assert_eq!(dispatcher.default_provider(), ProviderKind::MailTm);
    }

    #[tokio::test]
    async fn test_dispatcher_validates_before_dispatch() {
        let dispatcher = Dispatcher::new(&DropMailConfig::new()).unwrap();

        let err = dispatcher
            .list_messages("malformed", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DropMailError::InvalidInput { .. }));

        let err = dispatcher
            .read_message("a@1secmail.com", "", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DropMailError::InvalidInput { field: "id", .. }));
    }
}
