//! Fixtures shared by unit tests: a provider signing key, provider metadata
//! pointing at a mock server, and sealed cookies.

use axum::response::IntoResponse;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, Key};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{Value, json};

use crate::discovery::{DiscoveryDocument, Jwk, JwkSet, ProviderMetadata};
use crate::middleware::{GatewayConfig, GatewayState};
use crate::oauth::OAuthConfig;
use crate::pages::Pages;

/// Ed25519 provider key that signs test ID tokens.
pub(crate) struct SigningKey {
    kid: String,
    encoding: EncodingKey,
    public_x: String,
}

impl SigningKey {
    pub(crate) fn generate(kid: &str) -> Self {
        let rng = ring::rand::SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        Self {
            kid: kid.to_string(),
            encoding: EncodingKey::from_ed_der(pkcs8.as_ref()),
            public_x: URL_SAFE_NO_PAD.encode(pair.public_key().as_ref()),
        }
    }

    pub(crate) fn jwk(&self) -> Jwk {
        serde_json::from_value(json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "alg": "EdDSA",
            "use": "sig",
            "kid": self.kid,
            "x": self.public_x,
        }))
        .unwrap()
    }

    pub(crate) fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(&header, claims, &self.encoding).unwrap()
    }
}

pub(crate) fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Claims of a fresh ID token for Alice's account.
pub(crate) fn id_token_claims(issuer: &str, audience: &str, name: &str) -> Value {
    json!({
        "iss": issuer,
        "aud": audience,
        "sub": "alice-sub",
        "name": name,
        "email": "alice@example.com",
        "iat": now(),
        "exp": now() + 300,
    })
}

/// Metadata for a provider at `base` whose key set holds only `key`.
pub(crate) fn metadata(base: &str, key: &SigningKey) -> ProviderMetadata {
    let document: DiscoveryDocument = serde_json::from_value(json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/authorize"),
        "token_endpoint": format!("{base}/token"),
        "jwks_uri": format!("{base}/jwks"),
    }))
    .unwrap();
    ProviderMetadata::new(
        base.parse().unwrap(),
        document,
        JwkSet {
            keys: vec![key.jwk()],
        },
    )
}

pub(crate) fn gateway_state(base: &str, key: &SigningKey, cookie_key: Key) -> GatewayState {
    let config = GatewayConfig::new(
        base.parse().unwrap(),
        OAuthConfig::new(
            "chat-client",
            "s3cret",
            "http://localhost:8080/auth/callback/oidc".parse().unwrap(),
        ),
    )
    .with_cookie_key(cookie_key)
    .with_secure_cookies(false);

    GatewayState::from_metadata(
        config,
        &metadata(base, key),
        Pages::new().unwrap(),
        reqwest::Client::new(),
    )
}

/// `name=value` for a cookie sealed with `key`, as a browser would send it back.
pub(crate) fn sealed_cookie(key: &Key, name: &str, value: String) -> String {
    let response = PrivateCookieJar::new(key.clone())
        .add(Cookie::new(name.to_string(), value))
        .into_response();
    let header = response.headers()[axum::http::header::SET_COOKIE]
        .to_str()
        .unwrap();
    header.split(';').next().unwrap().to_string()
}
