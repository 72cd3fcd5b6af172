//! Tower middleware that signs outgoing requests.

use std::io::Write;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use tower::{BoxError, Layer, Service};

use super::WebhookSigner;
use crate::error::WebhookError;

/// Layer applying [`SignWebhook`] to a service.
#[derive(Debug, Clone)]
pub struct SignWebhookLayer {
    signer: WebhookSigner,
}

impl SignWebhookLayer {
    pub fn new(signer: WebhookSigner) -> Self {
        Self { signer }
    }
}

impl<S> Layer<S> for SignWebhookLayer {
    type Service = SignWebhook<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SignWebhook {
            inner,
            signer: self.signer.clone(),
        }
    }
}

/// Buffers the request body through a [`super::SigningWriter`], sets
/// `X-Hub-Signature` and only then hands the request to the inner service.
#[derive(Debug, Clone)]
pub struct SignWebhook<S> {
    inner: S,
    signer: WebhookSigner,
}

impl<S> Service<Request<Body>> for SignWebhook<S>
where
    S: Service<Request<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // The clone may not be ready; keep the one poll_ready was called on.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let signer = self.signer.clone();

        Box::pin(sign_and_call(signer, inner, request))
    }
}

async fn sign_and_call<S>(
    signer: WebhookSigner,
    mut inner: S,
    request: Request<Body>,
) -> Result<S::Response, BoxError>
where
    S: Service<Request<Body>>,
    S::Error: Into<BoxError>,
{
    let (mut parts, mut body) = request.into_parts();

    let mut writer = signer.writer(&parts, Vec::new());
    if !writer.is_signing() {
        tracing::debug!(uri = %parts.uri, "No webhook secret, sending unsigned");
        return inner
            .call(Request::from_parts(parts, body))
            .await
            .map_err(Into::into);
    }

    let mut trailers = None;
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| WebhookError::BodyRead(e.to_string()))?;
        match frame.into_data() {
            Ok(data) => writer.write_all(&data).map_err(WebhookError::from)?,
            Err(frame) => trailers = frame.into_trailers().ok(),
        }
    }

    let (bytes, _) = writer
        .finish(&mut parts.headers)
        .map_err(WebhookError::from)?;
    tracing::debug!(
        uri = %parts.uri,
        len = bytes.len(),
        trailers = trailers.is_some(),
        "Signed webhook delivery"
    );

    // Trailers are not covered by the signature but still travel with the body.
    let body = match trailers {
        None => Body::from(bytes),
        Some(trailers) => {
            Body::new(Full::from(bytes).with_trailers(async move { Some(Ok(trailers)) }))
        }
    };

    inner
        .call(Request::from_parts(parts, body))
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::Secret;
    use crate::signature;
    use axum::http::{request::Parts, HeaderMap, HeaderValue};
    use axum::response::Response;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    const SECRET: &str = "This is a secret";
    const PAYLOAD: &str = "This is the request payload";
    const HEADER_VALUE: &str = "sha1=3daba1f18d85905076a8ed72caf13565ece571fb";

    /// Echoes the signature header and body it was given.
    async fn echo(request: Request<Body>) -> Result<Response, Infallible> {
        let signature = request
            .headers()
            .get(signature::HEADER)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let body = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap();
        Ok(Response::builder()
            .header("X-Seen-Signature", signature)
            .body(Body::from(body))
            .unwrap())
    }

    async fn send(signer: WebhookSigner, body: Body) -> (String, Vec<u8>) {
        let service = signer.layer().layer(service_fn(echo));
        let response = service
            .oneshot(
                Request::post("/webhook")
                    .header(signature::HEADER, "sha1=stale")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        let seen = response.headers()["X-Seen-Signature"]
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (seen, body.to_vec())
    }

    #[tokio::test]
    async fn test_layer_signs_request() {
        let signer = WebhookSigner::new(SECRET).unwrap();
        let (seen, body) = send(signer, Body::from(PAYLOAD)).await;
        assert_eq!(seen, HEADER_VALUE);
        assert_eq!(body, PAYLOAD.as_bytes());
    }

    #[tokio::test]
    async fn test_layer_signs_streamed_body() {
        let chunks: Vec<Result<&'static str, Infallible>> =
            vec![Ok("This is "), Ok("the request "), Ok("payload")];
        let body = Body::from_stream(futures::stream::iter(chunks));

        let signer = WebhookSigner::new(SECRET).unwrap();
        let (seen, body) = send(signer, body).await;
        assert_eq!(seen, HEADER_VALUE);
        assert_eq!(body, PAYLOAD.as_bytes());
    }

    #[tokio::test]
    async fn test_layer_without_secret_forwards_unchanged() {
        let signer = WebhookSigner::with_source(|_: &Parts| -> Option<Secret> { None });
        let (seen, body) = send(signer, Body::from(PAYLOAD)).await;
        assert_eq!(seen, "sha1=stale");
        assert_eq!(body, PAYLOAD.as_bytes());
    }

    #[tokio::test]
    async fn test_layer_keeps_trailers() {
        async fn inspect(request: Request<Body>) -> Result<Response, Infallible> {
            let signature = request.headers()[signature::HEADER].clone();
            let collected = request.into_body().collect().await.unwrap();
            let checksum = collected
                .trailers()
                .and_then(|t| t.get("x-checksum"))
                .cloned()
                .unwrap_or(HeaderValue::from_static("missing"));
            Ok(Response::builder()
                .header("X-Seen-Signature", signature)
                .header("X-Seen-Checksum", checksum)
                .body(Body::from(collected.to_bytes()))
                .unwrap())
        }

        let mut trailers = HeaderMap::new();
        trailers.insert("x-checksum", HeaderValue::from_static("abc"));
        let body = Body::new(
            Full::from(PAYLOAD).with_trailers(async move { Some(Ok(trailers)) }),
        );

        let signer = WebhookSigner::new(SECRET).unwrap();
        let response = signer
            .layer()
            .layer(service_fn(inspect))
            .oneshot(Request::post("/webhook").body(body).unwrap())
            .await
            .unwrap();

        assert_eq!(response.headers()["X-Seen-Signature"], HEADER_VALUE);
        assert_eq!(response.headers()["X-Seen-Checksum"], "abc");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], PAYLOAD.as_bytes());
    }
}
