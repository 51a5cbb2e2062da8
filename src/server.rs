//! HTTP API for the relay
//!
//! Exposes the JSON endpoints clients poll:
//!
//! - `GET /api/generate-email[?provider=]` - create a disposable mailbox
//! - `GET /api/get-messages?email=&token=&provider=` - list the inbox
//! - `GET /api/read-message?email=&id=&token=&provider=` - read one message
//! - `GET /api/get-domains[?provider=]` - domains served by a provider
//! - `GET /api/test` - server status
//! - `GET /api/check-api` - diagnostic probes against the default provider
//! - `GET /health` - liveness
//!
//! Transient upstream failures during listing degrade to an empty result
//! with a diagnostic instead of failing the request; an expired session on a
//! token-based provider is the one listing failure surfaced as a hard error.
//!
//! # Example
//!
//! ```no_run
//! use dropmail::config::DropMailConfig;
//! use dropmail::server::RelayServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DropMailConfig::new();
//!     let server = RelayServer::new(&config).expect("Failed to create server");
//!     server.run(&config.bind).await.expect("Server failed");
//! }
//! ```

use crate::dispatcher::Dispatcher;
use crate::message::{FullMessage, MessageSummary};
use crate::registry::{self, ProviderKind};
use crate::{DropMailError, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::warn;

/// Server error types
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Bind error: {0}")]
    Bind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared server state
pub struct AppState {
    dispatcher: Dispatcher,
}

/// HTTP server for the relay
pub struct RelayServer {
    state: Arc<AppState>,
}

impl RelayServer {
    /// Create a server from config
    pub fn new(config: &crate::config::DropMailConfig) -> Result<Self> {
        let dispatcher = Dispatcher::new(config)?;
        Ok(Self {
            state: Arc::new(AppState { dispatcher }),
        })
    }

    /// Build the router
    fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/api/generate-email", get(generate_email))
            .route("/api/get-messages", get(get_messages))
            .route("/api/read-message", get(read_message))
            .route("/api/get-domains", get(get_domains))
            .route("/api/test", get(server_status))
            .route("/api/check-api", get(check_api))
            .with_state(state)
    }

    /// Run the server on the given address
    pub async fn run(self, addr: &str) -> std::result::Result<(), ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        tracing::info!(
            addr = addr,
            default_provider = %self.state.dispatcher.default_provider(),
            "DropMail relay listening"
        );

        axum::serve(listener, Self::router(self.state))
            .await
            .map_err(ServerError::Io)
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateQuery {
    provider: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    email: Option<String>,
    token: Option<String>,
    provider: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadQuery {
    email: Option<String>,
    id: Option<String>,
    token: Option<String>,
    provider: Option<String>,
}

/// Response for a generated mailbox
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub email: String,
    pub username: String,
    pub domain: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// False when the address was constructed locally and is not
    /// upstream-confirmed
    pub confirmed: bool,
    pub message: String,
    pub is_real: bool,
}

/// Response for a mailbox listing; the degraded form carries an empty list
/// plus a diagnostic
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<MessageSummary>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReadResponse {
    pub success: bool,
    pub message: FullMessage,
}

#[derive(Debug, Serialize)]
pub struct DomainsResponse {
    pub success: bool,
    pub provider: String,
    pub domains: Vec<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// One probe in the diagnostic report
#[derive(Debug, Serialize)]
pub struct ApiProbe {
    pub test: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiProbe {
    fn passed(test: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            status: "SUCCESS",
            result: Some(result.into()),
            error: None,
        }
    }

    fn failed(test: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            status: "FAILED",
            result: None,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Map an error onto the HTTP surface
fn error_response(err: DropMailError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        DropMailError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        DropMailError::SessionExpired { .. } => StatusCode::UNAUTHORIZED,
        DropMailError::MessageNotFound(_) => StatusCode::NOT_FOUND,
        DropMailError::UpstreamUnavailable { .. } | DropMailError::AllProvidersExhausted(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(err.to_string())))
}

/// Resolve an optional provider hint, rejecting unknown names
fn parse_hint(raw: Option<&str>) -> Result<Option<ProviderKind>> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => registry::lookup_by_hint(s)
            .map(Some)
            .ok_or_else(|| DropMailError::invalid("provider", format!("unknown provider '{}'", s))),
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn generate_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GenerateQuery>,
) -> std::result::Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let hint = parse_hint(query.provider.as_deref()).map_err(error_response)?;

    let mailbox = state
        .dispatcher
        .generate(hint)
        .await
        .map_err(error_response)?;

    let message = if mailbox.confirmed {
        "Mailbox ready. Send mail to this address.".to_string()
    } else {
        "Mailbox constructed locally; delivery is not upstream-confirmed.".to_string()
    };

    Ok(Json(GenerateResponse {
        success: true,
        email: mailbox.email,
        username: mailbox.username,
        domain: mailbox.domain,
        provider: mailbox.provider.slug().to_string(),
        token: mailbox.token,
        confirmed: mailbox.confirmed,
        message,
        is_real: true,
    }))
}

async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
) -> std::result::Result<Json<MessagesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let hint = parse_hint(query.provider.as_deref()).map_err(error_response)?;
    let email = query.email.as_deref().unwrap_or_default();

    match state.dispatcher.list_messages(email, query.token, hint).await {
        Ok(messages) => Ok(Json(MessagesResponse {
            success: true,
            count: messages.len(),
            messages,
            error: None,
            tip: None,
        })),
        Err(e) if e.degrades_listing() => {
            warn!(email = %email, error = %e, "Listing degraded to empty result");
            Ok(Json(MessagesResponse {
                success: true,
                messages: Vec::new(),
                count: 0,
                error: Some(e.to_string()),
                tip: Some("Wait 30-60 seconds after sending and try again".to_string()),
            }))
        }
        Err(e) => Err(error_response(e)),
    }
}

async fn read_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReadQuery>,
) -> std::result::Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let hint = parse_hint(query.provider.as_deref()).map_err(error_response)?;
    let email = query.email.as_deref().unwrap_or_default();
    let id = query.id.as_deref().unwrap_or_default();

    let message = state
        .dispatcher
        .read_message(email, id, query.token, hint)
        .await
        .map_err(error_response)?;

    Ok(Json(ReadResponse {
        success: true,
        message,
    }))
}

async fn get_domains(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GenerateQuery>,
) -> std::result::Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let hint = parse_hint(query.provider.as_deref()).map_err(error_response)?;
    let (provider, domains) = state.dispatcher.list_domains(hint).await;

    Ok(Json(DomainsResponse {
        success: true,
        provider: provider.slug().to_string(),
        domains,
    }))
}

async fn server_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let provider = state.dispatcher.default_provider();
    Json(serde_json::json!({
        "success": true,
        "message": "DropMail relay is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "provider": {
            "name": provider.to_string(),
            "url": provider.base_url(),
            "domains": provider.domains().len(),
        },
        "tip": "Use /api/check-api for diagnostics",
    }))
}

/// Run the three diagnostic probes against the default provider
async fn check_api(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let provider = state.dispatcher.default_provider();
    let mut tests = Vec::with_capacity(3);

    match state.dispatcher.generate(Some(provider)).await {
        Ok(mailbox) => tests.push(ApiProbe::passed("generate", mailbox.email)),
        Err(e) => tests.push(ApiProbe::failed("generate", e.to_string())),
    }

    match state.dispatcher.live_domains(provider).await {
        Ok(domains) => tests.push(ApiProbe::passed(
            "domains",
            format!("{} domains available", domains.len()),
        )),
        Err(e) => tests.push(ApiProbe::failed("domains", e.to_string())),
    }

    let probe_domain = provider.domains().first().copied().unwrap_or("example.com");
    let probe_address = format!("probe@{}", probe_domain);
    match state
        .dispatcher
        .list_messages(&probe_address, None, Some(provider))
        .await
    {
        Ok(_) => tests.push(ApiProbe::passed("messages", "listing answered")),
        Err(e) => tests.push(ApiProbe::failed("messages", e.to_string())),
    }

    let all_passed = tests.iter().all(|t| t.status == "SUCCESS");
    Json(serde_json::json!({
        "success": all_passed,
        "message": if all_passed {
            "All probes passed"
        } else {
            "Some probes failed; the upstream may be degraded"
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "tests": tests,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DropMailConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn create_test_state() -> Arc<AppState> {
        let config = DropMailConfig::new();
        let dispatcher = Dispatcher::new(&config).unwrap();
        Arc::new(AppState { dispatcher })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = RelayServer::router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_messages_requires_email() {
        let app = RelayServer::router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/get-messages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_get_messages_rejects_malformed_email() {
        let app = RelayServer::router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/get-messages?email=not-an-address")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("email"));
    }

    #[tokio::test]
    async fn test_read_message_requires_id() {
        let app = RelayServer::router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/read-message?email=a@1secmail.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("id"));
    }

    #[tokio::test]
    async fn test_unknown_provider_hint_is_rejected() {
        let app = RelayServer::router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/generate-email?provider=gmail")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("gmail"));
    }

    #[tokio::test]
    async fn test_server_status_reports_provider() {
        let app = RelayServer::router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["provider"]["name"], "1secmail");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_tokenless_mailtm_listing_is_empty_not_error() {
        // A mail.tm hint without a token answers locally with an empty
        // list; no upstream call is made.
        let app = RelayServer::router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/get-messages?email=drop1234@mail.tm&provider=mailtm")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 0);
    }
}
