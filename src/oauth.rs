use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::discovery::ProviderMetadata;
use crate::error::Error;
use crate::flow::PendingLogin;

/// Relying-party registration with the identity provider.
///
/// Required fields are constructor parameters; endpoints come from
/// [`ProviderMetadata`] rather than from configuration.
///
/// ```rust,ignore
/// use oidc_gateway::OAuthConfig;
///
/// let config = OAuthConfig::new(
///     "chat-client",
///     "s3cret",
///     "http://localhost:8080/auth/callback/oidc".parse()?,
/// );
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl OAuthConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            scopes: vec!["openid".into(), "profile".into(), "email".into()],
        }
    }

    /// Override the requested scopes (default: `["openid", "profile", "email"]`).
    ///
    /// `openid` is added if missing; without it the provider issues no ID token.
    #[must_use]
    pub fn with_scopes(mut self, mut scopes: Vec<String>) -> Self {
        if !scopes.iter().any(|s| s == "openid") {
            scopes.insert(0, "openid".into());
        }
        self.scopes = scopes;
        self
    }

    /// `OAuth2` client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Callback URL registered with the provider.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Scopes requested at login.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Authorization URL plus the pending-login record to keep until the callback.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: Url,
    pub pending: PendingLogin,
}

/// Token endpoint response. Unknown members, `id_token` among them, land in `extra`.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenResponse {
    /// Raw ID token from the extension fields, if the provider sent one.
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.extra
            .get("id_token")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Authorization-code client bound to one provider.
pub struct AuthClient {
    config: OAuthConfig,
    authorization_endpoint: Url,
    token_endpoint: Url,
    http: reqwest::Client,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig, metadata: &ProviderMetadata) -> Self {
        Self {
            config,
            authorization_endpoint: metadata.authorization_endpoint().clone(),
            token_endpoint: metadata.token_endpoint().clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Use a shared HTTP client (connection pooling, timeouts, tests).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Client registration this client was built with.
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the provider authorization URL for a fresh login attempt.
    #[must_use]
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let pending = PendingLogin::start();
        let scope = self.config.scopes.join(" ");

        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", &pending.state)
            .append_pair("code_challenge", &pending.code_challenge())
            .append_pair("code_challenge_method", "S256");

        AuthorizationRequest { url, pending }
    }

    /// Exchange an authorization code at the token endpoint.
    ///
    /// The client authenticates with HTTP Basic (`client_secret_basic`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or an unparsable body, and
    /// [`Error::OAuth`] if the token endpoint answers with an error status.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http
            .post(self.token_endpoint.clone())
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> OAuthConfig {
        OAuthConfig::new(
            "chat-client",
            "s3cret",
            "http://localhost:8080/auth/callback/oidc".parse().unwrap(),
        )
    }

    fn client_for(server: &MockServer) -> AuthClient {
        let metadata = test_support::metadata(&server.uri(), &test_support::SigningKey::generate("k1"));
        AuthClient::new(test_config(), &metadata)
    }

    #[tokio::test]
    async fn authorization_url_carries_client_and_state() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let req = client.authorization_url();

        let query: HashMap<_, _> = req.url.query_pairs().into_owned().collect();
        assert!(req.url.as_str().starts_with(&format!("{}/authorize?", server.uri())));
        assert_eq!(query["client_id"], "chat-client");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["scope"], "openid profile email");
        assert_eq!(query["redirect_uri"], "http://localhost:8080/auth/callback/oidc");
        assert_eq!(query["state"], req.pending.state);
        assert_eq!(query["code_challenge"], req.pending.code_challenge());
        assert_eq!(query["code_challenge_method"], "S256");
        assert!(!req.pending.state.is_empty());
    }

    #[tokio::test]
    async fn authorization_url_unique_per_call() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let first = client.authorization_url();
        let second = client.authorization_url();

        assert_ne!(first.pending.state, second.pending.state);
        assert_ne!(first.pending.code_verifier, second.pending.code_verifier);
    }

    #[test]
    fn scopes_always_include_openid() {
        let config = test_config().with_scopes(vec!["profile".into()]);
        assert_eq!(config.scopes(), &["openid", "profile"]);
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn id_token_read_from_extension_fields() {
        let response: TokenResponse = serde_json::from_value(json!({
            "access_token": "at",
            "token_type": "Bearer",
            "id_token": "header.payload.signature"
        }))
        .unwrap();
        assert_eq!(response.id_token(), Some("header.payload.signature"));

        let response: TokenResponse =
            serde_json::from_value(json!({"access_token": "at", "token_type": "Bearer"})).unwrap();
        assert_eq!(response.id_token(), None);
    }

    #[tokio::test]
    async fn exchange_code_posts_grant_with_verifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("code_verifier=verifier-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at",
                "token_type": "Bearer",
                "expires_in": 300,
                "refresh_token": "rt",
                "id_token": "x.y.z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = client_for(&server)
            .exchange_code("abc", "verifier-123")
            .await
            .unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.id_token(), Some("x.y.z"));
    }

    #[tokio::test]
    async fn exchange_code_reports_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "The authorization code has expired"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .exchange_code("stale", "verifier")
            .await
            .unwrap_err();
        match err {
            Error::OAuth { status, detail, .. } => {
                assert_eq!(status, Some(400));
                assert!(detail.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
