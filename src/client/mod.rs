//! Outbound signing of webhook deliveries
//!
//! [`WebhookSigner`] computes the `X-Hub-Signature` header for a request body
//! and can be plugged into an outgoing pipeline three ways:
//!
//! - [`SigningWriter`] for code that writes the body through `std::io::Write`
//! - [`SignWebhookLayer`] for tower clients and in-process services
//! - [`WebhookSigner::sign_reqwest`] for an already built `reqwest::Request`
//!
//! See <https://pubsubhubbub.github.io/PubSubHubbub/pubsubhubbub-core-0.4.html#authednotify>

mod layer;
mod writer;

pub use layer::{SignWebhook, SignWebhookLayer};
pub use writer::SigningWriter;

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use axum::http::{request::Parts, Request};

use crate::error::WebhookError;
use crate::secret::{Secret, SecretSource};
use crate::signature::{self, Signature};

/// Signs outgoing request bodies with a shared secret.
#[derive(Clone)]
pub struct WebhookSigner {
    source: Arc<dyn SecretSource>,
}

impl WebhookSigner {
    /// Sign with a fixed secret (raw bytes, or text as UTF-8).
    ///
    /// ```
    /// use hubsig::client::WebhookSigner;
    ///
    /// assert!(WebhookSigner::new("This is a secret").is_ok());
    /// assert!(WebhookSigner::new("").is_err());
    /// ```
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, WebhookError> {
        Ok(Self::with_source(Secret::new(secret)?))
    }

    /// Look the secret up per request. When `source` yields nothing the
    /// request goes out unsigned.
    pub fn with_source(source: impl SecretSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn resolve_secret(&self, parts: &Parts) -> Option<Secret> {
        self.source.secret(parts)
    }

    /// Signature of `body`, or `None` when no secret applies to the request.
    pub fn sign(&self, parts: &Parts, body: &[u8]) -> Option<Signature> {
        self.resolve_secret(parts)
            .map(|secret| Signature::compute(&secret, body))
    }

    /// Intercept the body written to `out` for the request described by `parts`.
    pub fn writer<W: Write>(&self, parts: &Parts, out: W) -> SigningWriter<W> {
        SigningWriter::new(self.resolve_secret(parts).as_ref(), out)
    }

    pub fn layer(&self) -> SignWebhookLayer {
        SignWebhookLayer::new(self.clone())
    }

    /// Set `X-Hub-Signature` on a reqwest request with a buffered body.
    ///
    /// Returns `Ok(None)` and leaves the request untouched when no secret
    /// applies. Streaming bodies cannot be signed before they are sent.
    pub fn sign_reqwest(
        &self,
        request: &mut reqwest::Request,
    ) -> Result<Option<Signature>, WebhookError> {
        let parts = reqwest_parts(request)?;
        let Some(secret) = self.resolve_secret(&parts) else {
            tracing::debug!(url = %request.url(), "No webhook secret, sending unsigned");
            return Ok(None);
        };

        let signature = match request.body() {
            None => Signature::compute(&secret, &[]),
            Some(body) => {
                let bytes = body.as_bytes().ok_or(WebhookError::UnsignableBody)?;
                Signature::compute(&secret, bytes)
            }
        };
        request
            .headers_mut()
            .insert(signature::header_name(), signature.to_header_value());
        Ok(Some(signature))
    }
}

impl fmt::Debug for WebhookSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSigner").finish_non_exhaustive()
    }
}

/// Request metadata of a reqwest request, as seen by secret sources.
fn reqwest_parts(request: &reqwest::Request) -> Result<Parts, WebhookError> {
    let (mut parts, ()) = Request::builder()
        .method(request.method().clone())
        .uri(request.url().as_str())
        .body(())?
        .into_parts();
    parts.headers = request.headers().clone();
    Ok(parts)
}
