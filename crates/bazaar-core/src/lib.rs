// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Shared primitives for the bazaar workspace: token signing, canonical
//! JSON and the cursor codec, the clock port and CLI error shapes.

pub mod canonical;
mod errors;
pub mod ports;
mod types;

use hmac::{Hmac, Mac};
use sha2::Sha256;

pub use errors::{Error, ErrorContext, ExitCode, MachineError, ResultExt, UserIdProblem};
pub use ports::{Clock, FixedClock, SystemClock};
pub use types::ids::UserId;

/// Hex HMAC-SHA256 of `payload` under `secret`.
pub fn hmac_sha256_hex(secret: &[u8], payload: &[u8]) -> Result<String, Error> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| Error::SigningKey)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex HMAC-SHA256 signature.
#[must_use]
pub fn hmac_sha256_verify(secret: &[u8], payload: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_roundtrip_verifies_and_rejects_tampering() {
        let sig = hmac_sha256_hex(b"secret", b"payload").expect("sign");
        assert_eq!(sig.len(), 64);
        assert!(hmac_sha256_verify(b"secret", b"payload", &sig));
        assert!(!hmac_sha256_verify(b"secret", b"payload2", &sig));
        assert!(!hmac_sha256_verify(b"other", b"payload", &sig));
        assert!(!hmac_sha256_verify(b"secret", b"payload", "zz"));
    }
}
