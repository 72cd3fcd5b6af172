//! Shared secrets and how they are looked up per request.
//!
//! Both the signer and the verifier ask a [`SecretSource`] for the key to use
//! with the current request. A [`Secret`] is itself a source that always
//! answers with its own bytes, and so is any closure over request [`Parts`].
//!
//! On the receiving side the matched endpoint may supply the secret itself by
//! implementing [`HasWebhookSecret`] and being attached to its route as a
//! [`WebhookTarget`] request extension.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::request::Parts;

use crate::error::WebhookError;

/// Key material for the keyed hash. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Arc<[u8]>);

impl Secret {
    /// Build a secret from raw bytes or from text (its UTF-8 encoding).
    ///
    /// Fails with [`WebhookError::EmptySecret`] if there are no bytes.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, WebhookError> {
        let bytes = secret.as_ref();
        if bytes.is_empty() {
            return Err(WebhookError::EmptySecret);
        }
        Ok(Self(Arc::from(bytes)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl FromStr for Secret {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<Vec<u8>> for Secret {
    type Error = WebhookError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl TryFrom<&[u8]> for Secret {
    type Error = WebhookError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

/// Strategy for finding the secret that applies to a request.
///
/// Returning `None` means no secret is available. The signer treats that as
/// "send unsigned"; the verifier treats it as a server misconfiguration.
pub trait SecretSource: Send + Sync {
    fn secret(&self, parts: &Parts) -> Option<Secret>;
}

impl SecretSource for Secret {
    fn secret(&self, _parts: &Parts) -> Option<Secret> {
        Some(self.clone())
    }
}

impl<F> SecretSource for F
where
    F: Fn(&Parts) -> Option<Secret> + Send + Sync,
{
    fn secret(&self, parts: &Parts) -> Option<Secret> {
        self(parts)
    }
}

/// Capability of a webhook endpoint that knows its own secret.
pub trait HasWebhookSecret: Send + Sync {
    fn webhook_secret(&self) -> Option<Secret>;
}

/// The endpoint a request was routed to, carried as a request extension.
///
/// Attach it to protected routes with `route_layer(Extension(target))` so it
/// is present when the verification middleware runs.
#[derive(Clone)]
pub struct WebhookTarget(Arc<dyn HasWebhookSecret>);

impl WebhookTarget {
    pub fn new(endpoint: impl HasWebhookSecret + 'static) -> Self {
        Self(Arc::new(endpoint))
    }

    pub fn from_arc(endpoint: Arc<dyn HasWebhookSecret>) -> Self {
        Self(endpoint)
    }

    pub fn webhook_secret(&self) -> Option<Secret> {
        self.0.webhook_secret()
    }
}

impl fmt::Debug for WebhookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookTarget")
    }
}
