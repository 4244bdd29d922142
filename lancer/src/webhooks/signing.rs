//! HMAC-SHA256 signing for inbound webhooks.
//!
//! Senders sign every delivery with the shared webhook secret:
//! - Signature is computed over: `{timestamp}.{payload}`
//! - The signature is the lowercase hex-encoded HMAC-SHA256
//! - Headers carry the pieces: `x-timestamp`, `x-signature`

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the sender's timestamp, signed verbatim
pub const TIMESTAMP_HEADER: &str = "x-timestamp";

/// Header carrying the hex-encoded signature
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Build the message that gets signed: `{timestamp}.{payload}`
fn signed_content(timestamp: &str, payload: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(timestamp.len() + 1 + payload.len());
    content.extend_from_slice(timestamp.as_bytes());
    content.push(b'.');
    content.extend_from_slice(payload);
    content
}

/// Sign a webhook payload.
///
/// # Arguments
///
/// * `secret` - The shared webhook secret
/// * `timestamp` - The x-timestamp header value, used verbatim
/// * `payload` - The canonical payload bytes
///
/// # Returns
///
/// The signature as lowercase hex, ready for the `x-signature` header
pub fn sign_payload(secret: &[u8], timestamp: &str, payload: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(&signed_content(timestamp, payload));
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a webhook signature.
///
/// # Arguments
///
/// * `secret` - The shared webhook secret
/// * `timestamp` - The x-timestamp header value
/// * `payload` - The canonical payload bytes
/// * `signature` - The x-signature header value
///
/// # Returns
///
/// `true` if the signature is valid, `false` otherwise.
pub fn verify_signature(secret: &[u8], timestamp: &str, payload: &[u8], signature: &str) -> bool {
    let expected = sign_payload(secret, timestamp, payload);
    constant_time_eq(signature.as_bytes(), expected.as_bytes())
}

/// Constant-time byte comparison.
///
/// Length is public (the expected signature is always 64 hex chars), so a length
/// mismatch is rejected up front. Equal-length inputs are compared with `subtle`,
/// whose optimization barriers keep the comparison free of early exits.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}
