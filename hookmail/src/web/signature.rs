//! GitHub `X-Hub-Signature` verification.
//!
//! GitHub signs the raw request body with HMAC-SHA1 and sends the result as
//! `sha1=<hex digest>`.
//! Reference: https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries

use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

use crate::secret::SigningSecret;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

const SIGNATURE_PREFIX: &str = "sha1=";

/// Compute the signature GitHub would send for `raw_body`.
pub fn expected_signature(raw_body: &[u8], secret: &SigningSecret) -> String {
    // HMAC accepts keys of any length, so this only fails on an impossible key size.
    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };

    mac.update(raw_body);

    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Verify the supplied signature against the raw body.
///
/// A missing or empty signature goes through the same comparison as a
/// wrong one, so the three cases are indistinguishable by timing.
pub fn verify(raw_body: &[u8], supplied: Option<&str>, secret: &SigningSecret) -> bool {
    let expected = expected_signature(raw_body, secret);
    let supplied = supplied.unwrap_or_default();

    !expected.is_empty() && constant_time_eq(&expected, supplied)
}

/// Constant-time comparison of two signature strings.
///
/// Both sides are hashed first so neither the content nor the length of the
/// supplied value changes how long the comparison takes.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let ha = Sha1::digest(a.as_bytes());
    let hb = Sha1::digest(b.as_bytes());
    ha.ct_eq(&hb).into()
}
