//! DropMail - Disposable Email Relay
//!
//! DropMail is a stateless HTTP backend that lets clients obtain a disposable
//! email address, poll for incoming messages, and read message contents by
//! delegating to public temporary-mail providers (1secmail, mail.tm,
//! tempmail.lol). Each endpoint forwards the request upstream, then reshapes
//! the provider-specific JSON into one canonical schema.
//!
//! # Architecture
//!
//! - **registry**: static provider table and provider-inference rules
//! - **mailbox**: client-held mailbox handles and username generation
//! - **message**: canonical message model, id derivation, HTML synthesis
//! - **providers**: one reqwest adapter per upstream provider
//! - **dispatcher**: provider selection, generation fallback, dispatch
//! - **server**: axum HTTP API
//! - **config**: YAML configuration

// Core modules
pub mod config;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod registry;

// Components
pub mod dispatcher;
pub mod logging;
pub mod providers;
pub mod server;

// Re-exports
pub use error::{DropMailError, Result};
