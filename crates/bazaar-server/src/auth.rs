// SPDX-License-Identifier: Apache-2.0

//! Bearer session tokens.
//!
//! Wire form: `base64url(json{sub, exp}) "." hex(hmac_sha256(secret, payload))`
//! where `payload` is the base64url segment and `exp` is unix seconds.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bazaar_core::{hmac_sha256_hex, hmac_sha256_verify};
use bazaar_model::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionClaims {
    pub sub: UserId,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(#[from] bazaar_core::Error),
}

pub fn issue_token(secret: &[u8], claims: &SessionClaims) -> Result<String, AuthError> {
    let json = serde_json::to_vec(claims).map_err(|_| AuthError::Malformed)?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let signature = hmac_sha256_hex(secret, payload.as_bytes())?;
    Ok(format!("{payload}.{signature}"))
}

pub fn verify_token(secret: &[u8], token: &str, now_secs: i64) -> Result<SessionClaims, AuthError> {
    let (payload, signature) = token.split_once('.').ok_or(AuthError::Malformed)?;
    if payload.is_empty() || signature.is_empty() {
        return Err(AuthError::Malformed);
    }
    if !hmac_sha256_verify(secret, payload.as_bytes(), signature) {
        return Err(AuthError::BadSignature);
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::Malformed)?;
    let claims: SessionClaims = serde_json::from_slice(&bytes).map_err(|_| AuthError::Malformed)?;
    if claims.exp <= now_secs {
        return Err(AuthError::Expired);
    }
    Ok(claims)
}

/// Pulls the token out of an `Authorization: Bearer ...` value.
pub(crate) fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let raw = header.ok_or(AuthError::Missing)?.trim();
    let (scheme, token) = raw.split_once(' ').ok_or(AuthError::Malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Malformed);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Missing);
    }
    Ok(token)
}
