//! Demo webhook receiver
//!
//! Provides a `/health` endpoint and a signature-protected `/webhook`
//! endpoint that echoes the verified body back to the sender.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    http::header,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use super::{verify_webhook, WebhookVerifier};
use crate::error::WebhookResult;
use crate::secret::{HasWebhookSecret, Secret, WebhookTarget};
use crate::settings::ReceiverSettings;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// The `/webhook` endpoint, which knows the secret its senders share.
#[derive(Debug, Clone)]
pub struct EchoEndpoint {
    secret: Secret,
}

impl EchoEndpoint {
    pub fn new(secret: Secret) -> Self {
        Self { secret }
    }
}

impl HasWebhookSecret for EchoEndpoint {
    fn webhook_secret(&self) -> Option<Secret> {
        Some(self.secret.clone())
    }
}

/// Create the receiver router.
///
/// `/webhook` is verified by `verifier`. When `target` is given it is attached
/// to that route so a verifier built with [`WebhookVerifier::from_target`]
/// can ask the endpoint for its secret.
pub fn router(verifier: WebhookVerifier, target: Option<WebhookTarget>) -> Router {
    let mut webhooks = Router::new()
        .route("/webhook", post(echo_handler))
        .route_layer(from_fn_with_state(verifier, verify_webhook));
    if let Some(target) = target {
        webhooks = webhooks.route_layer(Extension(target));
    }

    Router::new()
        .route("/health", get(health_handler))
        .merge(webhooks)
        .layer(TraceLayer::new_for_http())
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "hubsig".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /webhook
///
/// Only reached once the signature has been verified.
async fn echo_handler(body: Bytes) -> impl IntoResponse {
    tracing::info!(len = body.len(), "Received webhook");
    ([(header::CONTENT_TYPE, "application/octet-stream")], body)
}

/// Build the verifier described by `settings`, asking the endpoint for its secret.
pub fn verifier_for(settings: &ReceiverSettings) -> WebhookVerifier {
    let mut verifier = WebhookVerifier::from_target().with_comparison(settings.comparison);
    if let Some(limit) = settings.max_body_size {
        verifier = verifier.with_max_body_size(limit);
    }
    verifier
}

/// Bind and serve the receiver until the process is stopped.
pub async fn run(settings: &ReceiverSettings, secret: Secret) -> WebhookResult<()> {
    let app = router(
        verifier_for(settings),
        Some(WebhookTarget::new(EchoEndpoint::new(secret))),
    );

    let listener = tokio::net::TcpListener::bind(settings.socket_addr()).await?;
    let local: SocketAddr = listener.local_addr()?;
    tracing::info!(address = %local, "Webhook receiver listening");

    axum::serve(listener, app).await?;
    Ok(())
}
