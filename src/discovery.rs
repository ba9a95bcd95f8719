//! Provider metadata: the OIDC discovery document and the signing key set.
//!
//! Resolved once before the gateway starts serving and never mutated afterwards.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Upper bound for discovery and JWKS response bodies.
const MAX_DOCUMENT_BYTES: usize = 512 * 1024;

/// Subset of `/.well-known/openid-configuration` the gateway relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    #[serde(default)]
    pub userinfo_endpoint: Option<Url>,
    pub jwks_uri: Url,
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

/// JSON Web Key Set (RFC 7517).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Picks the verification key for a token header.
    ///
    /// With a `kid`, only an exact match is accepted. Without one, the set must
    /// hold a single key.
    #[must_use]
    pub fn find(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)),
            None if self.keys.len() == 1 => self.keys.first(),
            None => None,
        }
    }
}

/// Individual public key. Only the members needed for signature checks are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,
    /// RSA exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,
    /// EC / OKP curve name.
    #[serde(default)]
    pub crv: Option<String>,
    /// EC X coordinate or OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,
    /// EC Y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

/// Resolved identity provider: endpoints plus trusted signing keys.
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    issuer: Url,
    issuer_claim: String,
    authorization_endpoint: Url,
    token_endpoint: Url,
    userinfo_endpoint: Option<Url>,
    jwks_uri: Url,
    keys: JwkSet,
}

impl ProviderMetadata {
    /// Assemble metadata from an already-fetched document and key set.
    #[must_use]
    pub fn new(issuer: Url, document: DiscoveryDocument, keys: JwkSet) -> Self {
        Self {
            issuer,
            issuer_claim: document.issuer,
            authorization_endpoint: document.authorization_endpoint,
            token_endpoint: document.token_endpoint,
            userinfo_endpoint: document.userinfo_endpoint,
            jwks_uri: document.jwks_uri,
            keys,
        }
    }

    /// Fetch the discovery document and key set for `issuer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] if either document cannot be fetched or parsed,
    /// if the advertised issuer differs from `issuer`, or if the key set is empty.
    #[tracing::instrument(skip(http, issuer), fields(issuer = %issuer))]
    pub async fn discover(http: &reqwest::Client, issuer: &Url) -> Result<Self, Error> {
        let fail = |message: String| Error::Discovery {
            issuer: issuer.to_string(),
            message,
        };

        let document: DiscoveryDocument = fetch_json(http, well_known_url(issuer)?)
            .await
            .map_err(|e| fail(format!("discovery document: {e}")))?;

        if !same_issuer(&document.issuer, issuer.as_str()) {
            return Err(fail(format!(
                "document advertises issuer '{}'",
                document.issuer
            )));
        }

        let keys: JwkSet = fetch_json(http, document.jwks_uri.clone())
            .await
            .map_err(|e| fail(format!("key set: {e}")))?;

        if keys.keys.is_empty() {
            return Err(fail("key set is empty".into()));
        }

        tracing::info!(
            authorization_endpoint = %document.authorization_endpoint,
            token_endpoint = %document.token_endpoint,
            key_count = keys.keys.len(),
            "Resolved OIDC provider metadata"
        );

        Ok(Self::new(issuer.clone(), document, keys))
    }

    /// Issuer URL the gateway was configured with.
    #[must_use]
    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    /// Issuer exactly as advertised by the provider; ID tokens must carry it in `iss`.
    #[must_use]
    pub fn issuer_claim(&self) -> &str {
        &self.issuer_claim
    }

    /// Where browsers are sent to sign in.
    #[must_use]
    pub fn authorization_endpoint(&self) -> &Url {
        &self.authorization_endpoint
    }

    /// Where authorization codes are exchanged.
    #[must_use]
    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    /// `UserInfo` endpoint, if the provider advertises one.
    #[must_use]
    pub fn userinfo_endpoint(&self) -> Option<&Url> {
        self.userinfo_endpoint.as_ref()
    }

    /// Location of the provider's key set.
    #[must_use]
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// Signing keys fetched at resolution time.
    #[must_use]
    pub fn keys(&self) -> &JwkSet {
        &self.keys
    }
}

/// `{issuer}/.well-known/openid-configuration`, keeping any issuer path.
///
/// # Errors
///
/// Returns [`Error::Discovery`] if the issuer cannot serve as a base URL.
pub fn well_known_url(issuer: &Url) -> Result<Url, Error> {
    let base = format!(
        "{}/.well-known/openid-configuration",
        issuer.as_str().trim_end_matches('/')
    );
    base.parse().map_err(|e| Error::Discovery {
        issuer: issuer.to_string(),
        message: format!("invalid well-known URL: {e}"),
    })
}

fn same_issuer(advertised: &str, configured: &str) -> bool {
    advertised.trim_end_matches('/') == configured.trim_end_matches('/')
}

async fn fetch_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    url: Url,
) -> Result<T, String> {
    let mut response = http
        .get(url)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }

    let too_large = |len: u64| format!("body too large: {len} bytes (max {MAX_DOCUMENT_BYTES})");
    if let Some(len) = response
        .content_length()
        .filter(|&len| len > MAX_DOCUMENT_BYTES as u64)
    {
        return Err(too_large(len));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| format!("failed to read body: {e}"))?
    {
        if body.len() + chunk.len() > MAX_DOCUMENT_BYTES {
            return Err(too_large((body.len() + chunk.len()) as u64));
        }
        body.extend_from_slice(&chunk);
    }

    serde_json::from_slice(&body).map_err(|e| format!("invalid JSON: {e}"))
}
