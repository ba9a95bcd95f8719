//! Session payload carried in the `auth` cookie.
//!
//! The value is base64url-encoded JSON. The cookie jar seals it with the
//! server key, so tampering surfaces as an unreadable cookie before this codec
//! ever runs.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::token::IdTokenClaims;
use crate::types::Subject;

/// Identity attributes of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub sub: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Session {
    #[must_use]
    pub fn from_claims(claims: &IdTokenClaims) -> Self {
        Self {
            name: claims.display_name().to_owned(),
            sub: claims.sub.clone(),
            email: claims.email.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::Session`] if the session cannot be serialized.
    pub fn encode(&self) -> Result<String, Error> {
        let json = serde_json::to_vec(self).map_err(|e| Error::Session(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// # Errors
    ///
    /// Returns [`Error::Session`] if the value is not base64url or not a session object.
    pub fn decode(value: &str) -> Result<Self, Error> {
        let json = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| Error::Session(format!("invalid encoding: {e}")))?;
        serde_json::from_slice(&json).map_err(|e| Error::Session(e.to_string()))
    }
}
