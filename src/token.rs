use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::discovery::{Jwk, JwkSet, ProviderMetadata};
use crate::error::Error;
use crate::types::{Audience, Subject};

/// Clock skew tolerated on `exp`, `nbf` and `iat`.
pub const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Verifies ID tokens against the provider's published key set.
///
/// Built once at startup from [`ProviderMetadata`] and shared read-only.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    issuer: String,
    client_id: String,
    keys: JwkSet,
    leeway: u64,
}

/// A token whose signature and registered claims have been checked.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    kid: Option<String>,
    payload: JsonValue,
}

impl VerifiedToken {
    /// Key id the token was verified with.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Decode the structured identity claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Claims`] if the payload lacks a string `sub` or has
    /// wrongly typed standard claims.
    pub fn claims(&self) -> Result<IdTokenClaims, Error> {
        IdTokenClaims::deserialize(&self.payload).map_err(|e| Error::Claims(e.to_string()))
    }
}

/// Identity claims read from a verified ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IdTokenClaims {
    pub sub: Subject,
    pub iss: String,
    pub aud: Audience,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

impl IdTokenClaims {
    /// `name`, else `preferred_username`, else the subject.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.preferred_username.as_deref())
            .unwrap_or(self.sub.as_str())
    }
}

impl TokenVerifier {
    #[must_use]
    pub fn new(metadata: &ProviderMetadata, client_id: impl Into<String>) -> Self {
        Self {
            issuer: metadata.issuer_claim().to_owned(),
            client_id: client_id.into(),
            keys: metadata.keys().clone(),
            leeway: DEFAULT_LEEWAY_SECS,
        }
    }

    #[must_use]
    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway = secs;
        self
    }

    /// Expected `aud` member.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Verifies a raw ID token (compact JWS).
    ///
    /// Checks the signature against the provider key selected by `kid`, then
    /// `iss`, `aud` (must contain the client id), `exp` and `nbf` when present. The algorithm is
    /// taken from the key, never from the token alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] on any failure; no claims are exposed.
    pub fn verify(&self, raw: &str) -> Result<VerifiedToken, Error> {
        let header = decode_header(raw).map_err(|e| Error::Token(format!("malformed token: {e}")))?;
        let kid = header.kid;

        let jwk = self.keys.find(kid.as_deref()).ok_or_else(|| {
            Error::Token(format!(
                "no signing key for kid '{}'",
                kid.as_deref().unwrap_or("<none>")
            ))
        })?;
        let (decoding_key, algorithm) = decoding_key(jwk)?;
        if header.alg != algorithm {
            return Err(Error::Token(format!(
                "token algorithm {:?} does not match key algorithm {algorithm:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = self.leeway;

        let data = decode::<JsonValue>(raw, &decoding_key, &validation)
            .map_err(|e| Error::Token(describe(&e)))?;

        tracing::debug!(kid = ?kid, "ID token verified");

        Ok(VerifiedToken {
            kid,
            payload: data.claims,
        })
    }
}

fn describe(e: &jsonwebtoken::errors::Error) -> String {
    match e.kind() {
        ErrorKind::ExpiredSignature => "token expired".into(),
        ErrorKind::ImmatureSignature => "token not yet valid".into(),
        ErrorKind::InvalidAudience => "audience does not include client id".into(),
        ErrorKind::InvalidIssuer => "issuer mismatch".into(),
        ErrorKind::InvalidSignature => "invalid signature".into(),
        ErrorKind::MissingRequiredClaim(claim) => format!("missing claim: {claim}"),
        _ => e.to_string(),
    }
}

fn decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), Error> {
    let member = |value: &Option<String>, name: &str| {
        value
            .clone()
            .ok_or_else(|| Error::Token(format!("{} key missing '{name}'", jwk.kty)))
    };
    let build_failed = |e: jsonwebtoken::errors::Error| Error::Token(format!("unusable key: {e}"));

    match jwk.kty.as_str() {
        "RSA" => {
            let key = DecodingKey::from_rsa_components(&member(&jwk.n, "n")?, &member(&jwk.e, "e")?)
                .map_err(build_failed)?;
            let alg = match jwk.alg.as_deref() {
                None | Some("RS256") => Algorithm::RS256,
                Some("RS384") => Algorithm::RS384,
                Some("RS512") => Algorithm::RS512,
                Some(other) => return Err(Error::Token(format!("unsupported RSA algorithm {other}"))),
            };
            Ok((key, alg))
        }
        "EC" => {
            let key = DecodingKey::from_ec_components(&member(&jwk.x, "x")?, &member(&jwk.y, "y")?)
                .map_err(build_failed)?;
            let alg = match (jwk.alg.as_deref(), jwk.crv.as_deref()) {
                (Some("ES256"), _) | (None, Some("P-256")) => Algorithm::ES256,
                (Some("ES384"), _) | (None, Some("P-384")) => Algorithm::ES384,
                (alg, crv) => {
                    return Err(Error::Token(format!(
                        "unsupported EC key (alg {alg:?}, crv {crv:?})"
                    )));
                }
            };
            Ok((key, alg))
        }
        "OKP" if jwk.crv.as_deref() == Some("Ed25519") => {
            let key = DecodingKey::from_ed_components(&member(&jwk.x, "x")?).map_err(build_failed)?;
            Ok((key, Algorithm::EdDSA))
        }
        other => Err(Error::Token(format!("unsupported key type {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, SigningKey};
    use serde_json::json;

    const ISSUER: &str = "https://id.example.com";

    fn verifier_for(key: &SigningKey) -> TokenVerifier {
        TokenVerifier::new(&test_support::metadata(ISSUER, key), "chat-client")
    }

    #[test]
    fn verifies_valid_token() {
        let key = SigningKey::generate("k1");
        let token = key.sign(&test_support::id_token_claims(ISSUER, "chat-client", "Alice"));

        let verified = verifier_for(&key).verify(&token).unwrap();
        assert_eq!(verified.kid(), Some("k1"));
        let claims = verified.claims().unwrap();
        assert_eq!(claims.name.as_deref(), Some("Alice"));
        assert_eq!(claims.iss, ISSUER);
        assert!(claims.aud.contains("chat-client"));
    }

    #[test]
    fn rejects_token_signed_by_foreign_key() {
        let trusted = SigningKey::generate("k1");
        let forger = SigningKey::generate("k1");
        let token = forger.sign(&test_support::id_token_claims(ISSUER, "chat-client", "Mallory"));

        let err = verifier_for(&trusted).verify(&token).unwrap_err();
        assert!(err.to_string().contains("invalid signature"), "{err}");
    }

    #[test]
    fn rejects_unknown_kid() {
        let trusted = SigningKey::generate("k1");
        let other = SigningKey::generate("k2");
        let token = other.sign(&test_support::id_token_claims(ISSUER, "chat-client", "Alice"));

        let err = verifier_for(&trusted).verify(&token).unwrap_err();
        assert!(err.to_string().contains("no signing key for kid 'k2'"));
    }

    #[test]
    fn rejects_other_audience() {
        let key = SigningKey::generate("k1");
        let token = key.sign(&test_support::id_token_claims(ISSUER, "someone-else", "Alice"));

        let err = verifier_for(&key).verify(&token).unwrap_err();
        assert!(err.to_string().contains("audience"), "{err}");
    }

    #[test]
    fn accepts_audience_array_containing_client() {
        let key = SigningKey::generate("k1");
        let mut claims = test_support::id_token_claims(ISSUER, "chat-client", "Alice");
        claims["aud"] = json!(["admin-console", "chat-client"]);

        assert!(verifier_for(&key).verify(&key.sign(&claims)).is_ok());
    }

    #[test]
    fn rejects_other_issuer() {
        let key = SigningKey::generate("k1");
        let token = key.sign(&test_support::id_token_claims(
            "https://evil.example.com",
            "chat-client",
            "Alice",
        ));

        let err = verifier_for(&key).verify(&token).unwrap_err();
        assert!(err.to_string().contains("issuer mismatch"));
    }

    #[test]
    fn rejects_expired_token_with_valid_signature() {
        let key = SigningKey::generate("k1");
        let mut claims = test_support::id_token_claims(ISSUER, "chat-client", "Alice");
        claims["exp"] = json!(test_support::now() - 3600);

        let err = verifier_for(&key).verify(&key.sign(&claims)).unwrap_err();
        assert!(err.to_string().contains("token expired"));
    }

    #[test]
    fn rejects_token_not_yet_valid() {
        let key = SigningKey::generate("k1");
        let mut claims = test_support::id_token_claims(ISSUER, "chat-client", "Alice");
        claims["nbf"] = json!(test_support::now() + 3600);

        let err = verifier_for(&key).verify(&key.sign(&claims)).unwrap_err();
        assert!(err.to_string().contains("token not yet valid"));
    }

    #[test]
    fn tolerates_nbf_within_leeway() {
        let key = SigningKey::generate("k1");
        let mut claims = test_support::id_token_claims(ISSUER, "chat-client", "Alice");
        claims["nbf"] = json!(test_support::now() + 30);

        assert!(verifier_for(&key).verify(&key.sign(&claims)).is_ok());
    }

    #[test]
    fn rejects_token_without_subject() {
        let key = SigningKey::generate("k1");
        let mut claims = test_support::id_token_claims(ISSUER, "chat-client", "Alice");
        claims.as_object_mut().unwrap().remove("sub");

        let err = verifier_for(&key).verify(&key.sign(&claims)).unwrap_err();
        assert!(err.to_string().contains("missing claim: sub"));
    }

    #[test]
    fn rejects_garbage() {
        let key = SigningKey::generate("k1");
        assert!(matches!(
            verifier_for(&key).verify("not-a-jwt"),
            Err(Error::Token(_))
        ));
    }

    #[test]
    fn claims_decode_failure_is_distinct() {
        let key = SigningKey::generate("k1");
        let mut claims = test_support::id_token_claims(ISSUER, "chat-client", "Alice");
        claims["name"] = json!({"given": "Alice"});

        let verified = verifier_for(&key).verify(&key.sign(&claims)).unwrap();
        assert!(matches!(verified.claims(), Err(Error::Claims(_))));
    }

    #[test]
    fn display_name_falls_back() {
        let key = SigningKey::generate("k1");
        let mut claims = test_support::id_token_claims(ISSUER, "chat-client", "Alice");
        claims.as_object_mut().unwrap().remove("name");
        claims["preferred_username"] = json!("alice");

        let verified = verifier_for(&key).verify(&key.sign(&claims)).unwrap();
        assert_eq!(verified.claims().unwrap().display_name(), "alice");
    }

    #[test]
    fn unsupported_key_type_is_rejected() {
        let jwk: Jwk = serde_json::from_value(json!({"kty": "oct", "k": "c2VjcmV0"})).unwrap();
        assert!(decoding_key(&jwk).is_err());
    }
}
