//! Hex encoding and body draining helpers shared by signer and verifier.

use std::io::{self, Read};

use axum::body::{Body, Bytes};
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::error::WebhookError;

/// Chunk size used when draining a reader.
const BUF_SIZE: usize = 8192;

/// Encode bytes as lowercase hex, two characters per byte, no separators.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Read `reader` to end-of-stream in fixed-size chunks.
pub fn drain<R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(out),
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Collect an HTTP body into memory.
///
/// With `limit` unset the body is read without bound. Otherwise a body longer
/// than `limit` bytes fails with [`WebhookError::BodyTooLarge`].
pub async fn collect_body(body: Body, limit: Option<usize>) -> Result<Bytes, WebhookError> {
    match limit {
        None => body
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| WebhookError::BodyRead(e.to_string())),
        Some(limit) => match Limited::new(body, limit).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                Err(WebhookError::BodyTooLarge { limit })
            }
            Err(e) => Err(WebhookError::BodyRead(e.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_encode_hex() {
        assert_eq!(encode_hex(&[]), "");
        assert_eq!(encode_hex(&[0x00, 0x0f, 0xa0, 0xff]), "000fa0ff");
    }

    #[test]
    fn test_drain_small_reads() {
        let data = b"This is the request payload";
        let drained = drain(Trickle { data, step: 3 }).unwrap();
        assert_eq!(drained, data);
    }

    #[test]
    fn test_drain_larger_than_buffer() {
        let data: Vec<u8> = (0..(BUF_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let drained = drain(io::Cursor::new(&data)).unwrap();
        assert_eq!(drained, data);
    }

    #[test]
    fn test_drain_empty() {
        assert!(drain(io::empty()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collect_body_unbounded() {
        let payload = vec![7u8; 100_000];
        let bytes = collect_body(Body::from(payload.clone()), None).await.unwrap();
        assert_eq!(bytes, payload);
    }

    #[tokio::test]
    async fn test_collect_body_within_limit() {
        let bytes = collect_body(Body::from("hello"), Some(5)).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn test_collect_body_over_limit() {
        let result = collect_body(Body::from("hello!"), Some(5)).await;
        assert!(matches!(result, Err(WebhookError::BodyTooLarge { limit: 5 })));
    }
}
