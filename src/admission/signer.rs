//! Request body signing.
//!
//! # Responsibilities
//! - Compute the keyed signature of a request body (HMAC-SHA256, lowercase hex)
//! - Compare a claimed signature against a computed one in constant time
//! - Build the header set a client sends with a signed request
//!
//! The same [`sign`] function backs the server check and `gateway-cli`, so the two
//! sides cannot disagree on the encoding.

use ring::hmac;
use subtle::ConstantTimeEq;

use crate::admission::claim::{
    ACCESS_KEY_HEADER, BODY_HEADER, NONCE_HEADER, SIGN_HEADER, TIMESTAMP_HEADER,
};

/// Computes signatures over request bodies.
pub trait Signer: Send + Sync {
    /// Sign `body` with `secret_key`. Must be deterministic.
    fn sign(&self, body: &str, secret_key: &str) -> String;
}

/// HMAC-SHA256 signer producing lowercase hex.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSigner;

impl Signer for HmacSigner {
    fn sign(&self, body: &str, secret_key: &str) -> String {
        sign(body, secret_key)
    }
}

/// Sign `body` with `secret_key` using HMAC-SHA256, hex encoded.
pub fn sign(body: &str, secret_key: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret_key.as_bytes());
    let tag = hmac::sign(&key, body.as_bytes());
    hex::encode(tag.as_ref())
}

/// Constant-time equality of a claimed and a computed signature.
pub fn signatures_match(claimed: &str, computed: &str) -> bool {
    claimed.as_bytes().ct_eq(computed.as_bytes()).into()
}

/// Headers a client attaches to a signed request, as `(name, value)` pairs.
pub fn signed_headers(
    access_key: &str,
    secret_key: &str,
    body: &str,
    nonce: u64,
    timestamp: u64,
) -> Vec<(&'static str, String)> {
    vec![
        (ACCESS_KEY_HEADER, access_key.to_string()),
        (NONCE_HEADER, nonce.to_string()),
        (TIMESTAMP_HEADER, timestamp.to_string()),
        (SIGN_HEADER, sign(body, secret_key)),
        (BODY_HEADER, body.to_string()),
    ]
}
