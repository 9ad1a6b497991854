//! HMAC-SHA256 webhook signature verification.
//!
//! Both providers sign the raw request body with a shared secret:
//!
//! - Razorpay sends the bare hex digest in `X-Razorpay-Signature`.
//! - Meta (WhatsApp, Instagram) sends `sha256=<hex>` in `X-Hub-Signature-256`.
//!
//! The digest must be computed over the exact body bytes, never over
//! re-serialized JSON. Comparison is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header name carrying the Razorpay signature.
pub const RAZORPAY_SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Header name carrying the Meta signature.
pub const META_SIGNATURE_HEADER: &str = "x-hub-signature-256";

const META_PREFIX: &str = "sha256=";

/// Signature header format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// Bare lowercase hex digest.
    Razorpay,
    /// Hex digest prefixed with `sha256=`.
    Meta,
}

impl SignatureScheme {
    /// Request header the provider puts the signature in.
    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::Razorpay => RAZORPAY_SIGNATURE_HEADER,
            Self::Meta => META_SIGNATURE_HEADER,
        }
    }
}

/// Returns the hex-encoded `HMAC-SHA256(secret, raw_body)`.
#[must_use]
pub fn sign(raw_body: &[u8], secret: &str) -> String {
    hex::encode(digest(raw_body, secret))
}

/// Checks a bare hex signature against the body.
///
/// Returns `false` when the secret or header is missing or empty, when the
/// header is not valid hex, or when the digests differ. Never panics.
#[must_use]
pub fn verify(raw_body: &[u8], signature_header: Option<&str>, secret: Option<&str>) -> bool {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return false;
    };
    let Some(header) = signature_header.map(str::trim).filter(|h| !h.is_empty()) else {
        return false;
    };
    let Ok(expected) = hex::decode(header) else {
        return false;
    };

    let computed = digest(raw_body, secret);
    computed.as_slice().ct_eq(expected.as_slice()).into()
}

/// Checks a Meta `sha256=<hex>` signature against the body.
#[must_use]
pub fn verify_meta(raw_body: &[u8], signature_header: Option<&str>, secret: Option<&str>) -> bool {
    let stripped = signature_header
        .map(str::trim)
        .and_then(|h| h.strip_prefix(META_PREFIX));
    stripped.is_some() && verify(raw_body, stripped, secret)
}

/// Dispatches to [`verify`] or [`verify_meta`] by scheme.
#[must_use]
pub fn verify_with(
    scheme: SignatureScheme,
    raw_body: &[u8],
    signature_header: Option<&str>,
    secret: Option<&str>,
) -> bool {
    match scheme {
        SignatureScheme::Razorpay => verify(raw_body, signature_header, secret),
        SignatureScheme::Meta => verify_meta(raw_body, signature_header, secret),
    }
}

fn digest(raw_body: &[u8], secret: &str) -> Vec<u8> {
    // HMAC accepts keys of any length, so this never takes the error branch.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return Vec::new();
    };
    mac.update(raw_body);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"event":"payment.captured"}"#;
    const SECRET: &str = "whsec_test";

    #[test]
    fn own_signature_verifies() {
        let signature = sign(BODY, SECRET);
        assert!(verify(BODY, Some(&signature), Some(SECRET)));
    }

    #[test]
    fn uppercase_hex_verifies() {
        let signature = sign(BODY, SECRET).to_uppercase();
        assert!(verify(BODY, Some(&signature), Some(SECRET)));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let signature = sign(b"what do ya want for nothing?", "Jefe");
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn other_strings_are_rejected() {
        let valid = sign(BODY, SECRET);
        let candidates = [
            String::new(),
            "deadbeef".to_string(),
            "not hex at all".to_string(),
            sign(BODY, "other_secret"),
            format!("{valid}00"),
            valid.get(..valid.len() - 2).unwrap_or_default().to_string(),
        ];
        for candidate in &candidates {
            assert!(!verify(BODY, Some(candidate), Some(SECRET)), "{candidate}");
        }
    }

    #[test]
    fn tampered_body_is_rejected() {
        let signature = sign(BODY, SECRET);
        assert!(!verify(br#"{"event":"payment.failed"}"#, Some(&signature), Some(SECRET)));
    }

    #[test]
    fn missing_secret_or_header_is_rejected() {
        let signature = sign(BODY, SECRET);
        assert!(!verify(BODY, Some(&signature), None));
        assert!(!verify(BODY, Some(&signature), Some("")));
        assert!(!verify(BODY, None, Some(SECRET)));
    }

    #[test]
    fn meta_scheme_requires_prefix() {
        let signature = sign(BODY, SECRET);
        let header = format!("sha256={signature}");
        assert!(verify_meta(BODY, Some(&header), Some(SECRET)));
        assert!(!verify_meta(BODY, Some(&signature), Some(SECRET)));
        assert!(!verify_meta(BODY, Some("sha1=abc"), Some(SECRET)));
        assert!(verify_with(SignatureScheme::Meta, BODY, Some(&header), Some(SECRET)));
        assert!(!verify_with(SignatureScheme::Razorpay, BODY, Some(&header), Some(SECRET)));
    }
}
