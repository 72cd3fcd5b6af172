//! `X-Hub-Signature` primitives
//!
//! Provides the HMAC-SHA1 accumulator shared by the signing and verifying
//! halves, the [`Signature`] value and the rules for rendering and comparing it.

use std::fmt;

use axum::http::{HeaderName, HeaderValue};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::codec;
use crate::secret::Secret;

/// Name of the header carrying the signature.
pub const HEADER: &str = "X-Hub-Signature";

/// Name of the keyed-hash algorithm as PubSubHubbub spells it.
pub const ALGORITHM: &str = "HmacSHA1";

/// Algorithm tag prepended to the hex digest in the header value.
pub const PREFIX: &str = "sha1=";

/// Length in bytes of an HMAC-SHA1 digest.
pub const DIGEST_LEN: usize = 20;

/// Type alias for HMAC-SHA1
type HmacSha1 = Hmac<Sha1>;

/// The signature header name in the form `HeaderMap` expects.
pub fn header_name() -> HeaderName {
    HeaderName::from_static("x-hub-signature")
}

/// How a claimed digest is compared against the computed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Plain string equality ignoring ASCII case.
    #[default]
    CaseInsensitive,
    /// Hex-decode the claimed digest and compare the bytes in constant time.
    ConstantTime,
}

/// Running keyed-hash over a body, fed one chunk at a time.
#[derive(Clone)]
pub struct Accumulator {
    mac: HmacSha1,
}

impl Accumulator {
    /// Start a new accumulator keyed with `secret`.
    pub fn new(secret: &Secret) -> Self {
        let mac = HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can take any key size");
        Self { mac }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.mac.update(chunk);
    }

    /// Consume the accumulator and produce the digest of everything fed so far.
    pub fn finalize(self) -> Signature {
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&self.mac.finalize().into_bytes());
        Signature(digest)
    }
}

/// An HMAC-SHA1 digest of a request body.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; DIGEST_LEN]);

impl Signature {
    /// Compute the signature of `body` in one go.
    pub fn compute(secret: &Secret, body: &[u8]) -> Self {
        let mut accumulator = Accumulator::new(secret);
        accumulator.update(body);
        accumulator.finalize()
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex digest, without the algorithm tag.
    pub fn to_hex(&self) -> String {
        codec::encode_hex(&self.0)
    }

    /// The full header value: `sha1=` followed by the hex digest.
    pub fn header_value(&self) -> String {
        format!("{PREFIX}{}", self.to_hex())
    }

    pub fn to_header_value(&self) -> HeaderValue {
        HeaderValue::from_str(&self.header_value()).expect("hex digest is a valid header value")
    }

    /// Compare against the hex digest a peer claimed (tag already stripped).
    pub fn matches(&self, claimed_hex: &str, comparison: Comparison) -> bool {
        match comparison {
            Comparison::CaseInsensitive => claimed_hex.eq_ignore_ascii_case(&self.to_hex()),
            Comparison::ConstantTime => match hex::decode(claimed_hex) {
                Ok(claimed) => claimed.as_slice().ct_eq(&self.0[..]).into(),
                Err(_) => false,
            },
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature").field(&self.to_hex()).finish()
    }
}

/// Strip the algorithm tag from a raw header value. The match is
/// case-sensitive; whatever follows the tag is returned untouched.
pub fn strip_prefix(value: &[u8]) -> Option<&[u8]> {
    value.strip_prefix(PREFIX.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "This is a secret";
    const PAYLOAD: &[u8] = b"This is the request payload";
    const EXPECTED: &str = "3daba1f18d85905076a8ed72caf13565ece571fb";

    fn secret() -> Secret {
        Secret::new(SECRET).unwrap()
    }

    #[test]
    fn test_known_vector() {
        let signature = Signature::compute(&secret(), PAYLOAD);
        assert_eq!(signature.to_hex(), EXPECTED);
        assert_eq!(signature.header_value(), format!("sha1={EXPECTED}"));
        assert_eq!(signature.to_string(), signature.header_value());
    }

    #[test]
    fn test_chunked_accumulation_matches_one_shot() {
        let mut accumulator = Accumulator::new(&secret());
        for chunk in PAYLOAD.chunks(5) {
            accumulator.update(chunk);
        }
        assert_eq!(accumulator.finalize(), Signature::compute(&secret(), PAYLOAD));
    }

    #[test]
    fn test_digest_length() {
        let signature = Signature::compute(&secret(), b"");
        assert_eq!(signature.as_bytes().len(), DIGEST_LEN);
        assert_eq!(signature.to_hex().len(), DIGEST_LEN * 2);
    }

    #[test]
    fn test_matches_ignores_case() {
        let signature = Signature::compute(&secret(), PAYLOAD);
        assert!(signature.matches(EXPECTED, Comparison::CaseInsensitive));
        assert!(signature.matches(&EXPECTED.to_uppercase(), Comparison::CaseInsensitive));
        assert!(signature.matches(&EXPECTED.to_uppercase(), Comparison::ConstantTime));
    }

    #[test]
    fn test_matches_rejects_other_digests() {
        let signature = Signature::compute(&secret(), PAYLOAD);
        for comparison in [Comparison::CaseInsensitive, Comparison::ConstantTime] {
            assert!(!signature.matches("bad516", comparison));
            assert!(!signature.matches("", comparison));
            assert!(!signature.matches(&format!("{EXPECTED}00"), comparison));
        }
    }

    #[test]
    fn test_constant_time_rejects_non_hex() {
        let signature = Signature::compute(&secret(), PAYLOAD);
        let mut garbled = EXPECTED.to_string();
        garbled.replace_range(0..1, "z");
        assert!(!signature.matches(&garbled, Comparison::ConstantTime));
    }

    #[test]
    fn test_strip_prefix_is_case_sensitive() {
        assert_eq!(strip_prefix(b"sha1=abc"), Some(&b"abc"[..]));
        assert_eq!(strip_prefix(b"SHA1=abc"), None);
        assert_eq!(strip_prefix(b"md5=abc"), None);
        assert_eq!(strip_prefix(b"sha1="), Some(&b""[..]));
        assert_eq!(strip_prefix(b"sha1=ab\xe9"), Some(&b"ab\xe9"[..]));
    }

    #[test]
    fn test_header_name_is_canonical() {
        assert!(header_name().as_str().eq_ignore_ascii_case(HEADER));
    }

    #[test]
    fn test_comparison_deserialization() {
        let parsed: Comparison = serde_json::from_str("\"constant_time\"").unwrap();
        assert_eq!(parsed, Comparison::ConstantTime);
        assert_eq!(Comparison::default(), Comparison::CaseInsensitive);
    }
}
