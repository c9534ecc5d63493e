//! HMAC-SHA256 purchase tokens and webhook signatures.
//!
//! # Security notes
//!
//! - Every comparison against a secret-derived value uses **constant-time**
//!   equality via the `subtle` crate.
//! - Supplied tokens and signatures are never included in error messages.

use ring::hmac;
use subtle::ConstantTimeEq;

use crate::error::{OintmentError, Result};

/// Header carrying the webhook body signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

fn sign(secret: &str, message: &[u8]) -> hmac::Tag {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::sign(&key, message)
}

/// Lowercase hex HMAC-SHA256 of `user_id` keyed by `secret`.
pub fn purchase_token(secret: &str, user_id: &str) -> String {
    hex::encode(sign(secret, user_id.as_bytes()).as_ref())
}

/// Check a client-submitted purchase token for `user_id`.
pub fn verify_purchase_token(secret: &str, user_id: &str, token: &str) -> Result<()> {
    let expected = purchase_token(secret, user_id);
    if bool::from(expected.as_bytes().ct_eq(token.as_bytes())) {
        Ok(())
    } else {
        Err(OintmentError::AuthenticationFailed(
            "Unable to verify GitHub Marketplace payment".to_string(),
        ))
    }
}

/// `sha256=<hex>` signature of `body`, as sent in [`SIGNATURE_HEADER`].
pub fn webhook_signature(secret: &str, body: &[u8]) -> String {
    format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(sign(secret, body).as_ref())
    )
}

/// Verify the raw webhook `body` against the signature header value.
///
/// A missing header, a wrong scheme prefix, undecodable hex and a digest
/// mismatch all fail the same way.
pub fn verify_webhook_signature(secret: &str, body: &[u8], header: Option<&str>) -> Result<()> {
    let rejected =
        || OintmentError::AuthenticationFailed("Invalid webhook signature".to_string());

    let supplied = header
        .map(str::trim)
        .and_then(|h| h.strip_prefix(SIGNATURE_PREFIX))
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or_else(rejected)?;

    let expected = sign(secret, body);
    if bool::from(expected.as_ref().ct_eq(supplied.as_slice())) {
        Ok(())
    } else {
        Err(rejected())
    }
}
