//! Inbound verification of `X-Hub-Signature`
//!
//! [`WebhookVerifier`] recomputes the HMAC-SHA1 of a request body and checks it
//! against the single signature header sent by the peer. It is applied to
//! individual routes through the [`verify_webhook`] middleware:
//!
//! ```no_run
//! use axum::{middleware::from_fn_with_state, routing::post, Router};
//! use hubsig::server::{verify_webhook, WebhookVerifier};
//!
//! let verifier = WebhookVerifier::new("This is a secret")?;
//! let app: Router = Router::new()
//!     .route("/webhook", post(|| async { "ok" }))
//!     .route_layer(from_fn_with_state(verifier, verify_webhook));
//! # Ok::<(), hubsig::error::WebhookError>(())
//! ```
//!
//! Routes without the middleware are not verified.

pub mod app;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::codec;
use crate::error::WebhookError;
use crate::secret::{Secret, SecretSource, WebhookTarget};
use crate::signature::{self, Comparison, Signature};

pub use app::{router, run, EchoEndpoint, HealthResponse};

/// Why a signature header was refused before any body was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProblem {
    /// No `X-Hub-Signature` header.
    Missing,
    /// The header occurred more than once.
    Repeated(usize),
    /// The value does not start with `sha1=`.
    BadPrefix,
}

/// Outcome of checking a request against its signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Digests agree; the request may proceed.
    Accepted,
    /// The header was unusable. Answered with 400 Bad Request.
    Malformed(HeaderProblem),
    /// Digests disagree. Answered with an empty 200 OK so callers cannot
    /// tell a forged delivery from an accepted one by status code.
    Mismatch,
}

impl IntoResponse for Verdict {
    fn into_response(self) -> Response {
        match self {
            Verdict::Malformed(_) => StatusCode::BAD_REQUEST.into_response(),
            Verdict::Accepted | Verdict::Mismatch => StatusCode::OK.into_response(),
        }
    }
}

#[derive(Clone)]
enum Resolution {
    Fixed(Secret),
    Source(Arc<dyn SecretSource>),
    Target,
}

/// Checks inbound webhook deliveries against a shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    resolution: Resolution,
    max_body_size: Option<usize>,
    comparison: Comparison,
}

impl WebhookVerifier {
    /// Verify with a fixed secret (raw bytes, or text as UTF-8).
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, WebhookError> {
        Ok(Self::with_resolution(Resolution::Fixed(Secret::new(secret)?)))
    }

    /// Ask the matched endpoint for the secret through its [`WebhookTarget`]
    /// request extension. A protected route without one is a server
    /// configuration error.
    pub fn from_target() -> Self {
        Self::with_resolution(Resolution::Target)
    }

    /// Resolve the secret per request with a custom strategy.
    pub fn with_source(source: impl SecretSource + 'static) -> Self {
        Self::with_resolution(Resolution::Source(Arc::new(source)))
    }

    fn with_resolution(resolution: Resolution) -> Self {
        Self {
            resolution,
            max_body_size: None,
            comparison: Comparison::default(),
        }
    }

    /// Refuse bodies longer than `limit` bytes with 413. Unbounded by default.
    pub fn with_max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = Some(limit);
        self
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn max_body_size(&self) -> Option<usize> {
        self.max_body_size
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// The secret to verify this request with.
    pub fn resolve_secret(&self, parts: &Parts) -> Result<Secret, WebhookError> {
        match &self.resolution {
            Resolution::Fixed(secret) => Ok(secret.clone()),
            Resolution::Source(source) => {
                source.secret(parts).ok_or(WebhookError::SecretUnavailable)
            }
            Resolution::Target => parts
                .extensions
                .get::<WebhookTarget>()
                .ok_or(WebhookError::MissingWebhookTarget)?
                .webhook_secret()
                .ok_or(WebhookError::SecretUnavailable),
        }
    }

    /// Compare a claimed digest (header bytes after `sha1=`) against the one
    /// computed over `body`. Bytes that are not text never match.
    pub fn check(&self, secret: &Secret, claimed: &[u8], body: &[u8]) -> Verdict {
        let actual = Signature::compute(secret, body);
        match std::str::from_utf8(claimed) {
            Ok(claimed_hex) if actual.matches(claimed_hex, self.comparison) => Verdict::Accepted,
            _ => Verdict::Mismatch,
        }
    }

    /// Run the whole check for a request whose body is already in memory.
    pub fn verify(&self, parts: &Parts, body: &[u8]) -> Result<Verdict, WebhookError> {
        let secret = self.resolve_secret(parts)?;
        Ok(match claimed_digest(&parts.headers) {
            Ok(claimed) => self.check(&secret, claimed, body),
            Err(problem) => Verdict::Malformed(problem),
        })
    }
}

/// Extract the claimed digest from the one and only signature header.
///
/// Only the header count and the `sha1=` tag are checked here; the bytes
/// after the tag are left for digest comparison.
pub fn claimed_digest(headers: &HeaderMap) -> Result<&[u8], HeaderProblem> {
    let mut values = headers.get_all(signature::HEADER).iter();
    let value = values.next().ok_or(HeaderProblem::Missing)?;
    let extra = values.count();
    if extra > 0 {
        return Err(HeaderProblem::Repeated(extra + 1));
    }
    signature::strip_prefix(value.as_bytes()).ok_or(HeaderProblem::BadPrefix)
}

/// Middleware verifying the request body against `X-Hub-Signature`.
///
/// Intended to be given to `axum::middleware::from_fn_with_state` and
/// installed with `route_layer` on the routes that receive webhooks. On
/// success the handler sees a fresh body with exactly the bytes that were
/// hashed.
pub async fn verify_webhook(
    State(verifier): State<WebhookVerifier>,
    request: Request,
    next: Next,
) -> Result<Response, WebhookError> {
    let (parts, body) = request.into_parts();

    let secret = match verifier.resolve_secret(&parts) {
        Ok(secret) => secret,
        Err(e) => {
            tracing::error!(error = %e, uri = %parts.uri, "Cannot verify webhook");
            return Err(e);
        }
    };

    let claimed = match claimed_digest(&parts.headers) {
        Ok(claimed) => claimed.to_vec(),
        Err(problem) => {
            tracing::warn!(?problem, uri = %parts.uri, "Rejected webhook signature header");
            return Ok(Verdict::Malformed(problem).into_response());
        }
    };

    let bytes = codec::collect_body(body, verifier.max_body_size).await?;

    match verifier.check(&secret, &claimed, &bytes) {
        Verdict::Accepted => {
            tracing::debug!(
                uri = %parts.uri,
                len = bytes.len(),
                algorithm = signature::ALGORITHM,
                "Webhook signature verified"
            );
            Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
        }
        verdict => {
            tracing::warn!(uri = %parts.uri, len = bytes.len(), "Webhook signature mismatch");
            Ok(verdict.into_response())
        }
    }
}
