//! Error types for webhook signing and verification.
//!
//! Only failures live here. Client protocol violations seen by the verifier
//! (missing, repeated or malformed signature headers, digest mismatches) are
//! ordinary outcomes and are modelled by [`crate::server::Verdict`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// An explicitly configured secret had no bytes.
    #[error("Webhook secret must not be empty")]
    EmptySecret,
    /// The verifier could not resolve a secret for the request.
    #[error("Webhook secret may not be null or empty")]
    SecretUnavailable,
    /// The matched endpoint was not attached as a webhook target.
    #[error("Matched endpoint does not provide a webhook secret")]
    MissingWebhookTarget,
    #[error("Failed to read body: {0}")]
    BodyRead(String),
    #[error("Body exceeds the configured limit of {limit} bytes")]
    BodyTooLarge { limit: usize },
    /// A streaming outbound body cannot be buffered for signing.
    #[error("Streaming request bodies cannot be signed")]
    UnsignableBody,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(#[from] axum::http::Error),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Result type for webhook operations
pub type WebhookResult<T> = Result<T, WebhookError>;

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            too_large @ WebhookError::BodyTooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorResponse {
                    error: too_large.to_string(),
                }),
            )
                .into_response(),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Something wrong happened.".to_string(),
                }),
            )
                .into_response(),
        }
    }
}
