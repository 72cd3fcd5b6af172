//! hubsig - authenticated content distribution for HTTP webhooks
//!
//! Implements the PubSubHubbub `X-Hub-Signature` convention: the sender
//! computes an HMAC-SHA1 over the exact request body with a shared secret and
//! sends it as `X-Hub-Signature: sha1=<hex>`; the receiver recomputes it and
//! refuses the delivery if the two disagree.
//!
//! - [`client`] signs outgoing bodies
//! - [`server`] verifies incoming ones as axum middleware
//! - [`secret`] decides which secret applies to a request

pub mod client;
pub mod codec;
pub mod error;
pub mod logging;
pub mod secret;
pub mod server;
pub mod settings;
pub mod signature;

pub use client::{SignWebhookLayer, SigningWriter, WebhookSigner};
pub use error::{WebhookError, WebhookResult};
pub use secret::{HasWebhookSecret, Secret, SecretSource, WebhookTarget};
pub use server::{verify_webhook, HeaderProblem, Verdict, WebhookVerifier};
pub use signature::{Comparison, Signature};
