//! HMAC-signed attachment URLs (§4.E / §6).
//!
//! Ported from `original_source/.../signed_urls.py`: payload is the
//! newline-joined tuple `METHOD\nPATH\nEXPIRES\nSHA256\nDOWNLOAD_FLAG\nFILENAME`,
//! signed with HMAC-SHA256 and base64url-encoded. Verification is
//! constant-time. Absent secret disables both minting and verification
//! (§9 open question (a): no nonce, replay is accepted within the TTL).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("signed URLs are disabled (no secret configured)")]
    Disabled,
    #[error("signature does not verify")]
    BadSignature,
    #[error("signed URL has expired")]
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Download,
    Head,
}

impl Scope {
    fn as_str(self) -> &'static str {
        match self {
            Scope::Download => "download",
            Scope::Head => "head",
        }
    }
}

/// Parameters bound into a signed URL's signature.
pub struct SignParams<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub sha256: &'a str,
    pub expires_unix: i64,
    pub download: bool,
    pub filename: Option<&'a str>,
}

fn payload(method: &str, path: &str, expires: i64, sha256: &str, download: bool, filename: &str) -> String {
    format!(
        "{method}\n{path}\n{expires}\n{sha256}\n{}\n{filename}",
        if download { "1" } else { "0" }
    )
}

/// Mint a base64url HMAC-SHA256 signature for `params`, or `Disabled` if no
/// secret is configured.
pub fn sign(secret: Option<&str>, params: &SignParams) -> Result<String, SigningError> {
    let secret = secret.ok_or(SigningError::Disabled)?;
    let filename = params.filename.unwrap_or("");
    let msg = payload(
        params.method,
        params.path,
        params.expires_unix,
        params.sha256,
        params.download,
        filename,
    );
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(msg.as_bytes());
    let sig = mac.finalize().into_bytes();
    Ok(URL_SAFE_NO_PAD.encode(sig))
}

/// Verify a previously minted signature, checking both expiry and
/// constant-time equality (via `hmac::Mac::verify_slice`).
pub fn verify(
    secret: Option<&str>,
    params: &SignParams,
    signature_b64url: &str,
    now_unix: i64,
) -> Result<(), SigningError> {
    let secret = secret.ok_or(SigningError::Disabled)?;
    if now_unix > params.expires_unix {
        return Err(SigningError::Expired);
    }
    let filename = params.filename.unwrap_or("");
    let msg = payload(
        params.method,
        params.path,
        params.expires_unix,
        params.sha256,
        params.download,
        filename,
    );
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(signature_b64url)
        .map_err(|_| SigningError::BadSignature)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(msg.as_bytes());
    mac.verify_slice(&sig_bytes).map_err(|_| SigningError::BadSignature)
}

pub fn scope_query_value(scope: Scope) -> &'static str {
    scope.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(expires: i64) -> SignParams<'static> {
        SignParams {
            method: "GET",
            path: "/attachments/abc",
            sha256: "deadbeef",
            expires_unix: expires,
            download: true,
            filename: Some("part.gcode"),
        }
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let p = params(2_000_000_000);
        let sig = sign(Some("secret"), &p).unwrap();
        assert!(verify(Some("secret"), &p, &sig, 1_700_000_000).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let p = params(2_000_000_000);
        let sig = sign(Some("secret"), &p).unwrap();
        assert_eq!(
            verify(Some("other"), &p, &sig, 1_700_000_000).unwrap_err(),
            SigningError::BadSignature
        );
    }

    #[test]
    fn verify_rejects_expired() {
        let p = params(1_000);
        let sig = sign(Some("secret"), &p).unwrap();
        assert_eq!(
            verify(Some("secret"), &p, &sig, 2_000).unwrap_err(),
            SigningError::Expired
        );
    }

    #[test]
    fn disabled_without_secret() {
        let p = params(2_000_000_000);
        assert_eq!(sign(None, &p).unwrap_err(), SigningError::Disabled);
    }

    #[test]
    fn tampered_field_fails_verification() {
        let p = params(2_000_000_000);
        let sig = sign(Some("secret"), &p).unwrap();
        let mut tampered = params(2_000_000_000);
        tampered.sha256 = "0000";
        assert!(verify(Some("secret"), &tampered, &sig, 1_700_000_000).is_err());
    }
}
