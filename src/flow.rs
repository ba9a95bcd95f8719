//! Per-attempt login material: the anti-forgery state and the PKCE verifier.
//!
//! A [`PendingLogin`] is created when the browser is sent to the provider and
//! checked exactly once when the provider redirects back.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::error::Error;

/// How long a started login may wait for its callback.
pub const PENDING_LOGIN_TTL: Duration = Duration::minutes(10);

/// 16 random bytes, base64url: a 22-character state value.
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// 48 random bytes, base64url: a 64-character verifier (RFC 7636 allows 43-128).
#[must_use]
pub fn generate_code_verifier() -> String {
    let random_bytes: [u8; 48] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// `BASE64URL(SHA256(verifier))`
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Outstanding authorization request, stored client-side in an encrypted cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub state: String,
    pub code_verifier: String,
    /// Unix seconds.
    pub issued_at: i64,
}

impl PendingLogin {
    /// Fresh random state and verifier.
    #[must_use]
    pub fn start() -> Self {
        Self {
            state: generate_state(),
            code_verifier: generate_code_verifier(),
            issued_at: OffsetDateTime::now_utc().unix_timestamp(),
        }
    }

    #[must_use]
    pub fn code_challenge(&self) -> String {
        code_challenge(&self.code_verifier)
    }

    /// The callback `state` must byte-equal the issued one, within the TTL.
    #[must_use]
    pub fn accepts(&self, returned_state: &str, now: OffsetDateTime) -> bool {
        let age = now.unix_timestamp() - self.issued_at;
        age >= 0 && age <= PENDING_LOGIN_TTL.whole_seconds() && self.state == returned_state
    }

    /// JSON for the flow cookie; the cookie jar encrypts it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] if serialization fails.
    pub fn to_cookie_value(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Session(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`Error::Session`] if the value is not a pending login record.
    pub fn from_cookie_value(value: &str) -> Result<Self, Error> {
        serde_json::from_str(value).map_err(|e| Error::Session(e.to_string()))
    }
}
