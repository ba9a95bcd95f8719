use std::time::Duration;

use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::AuthError;
use crate::oauth::OAuthConfig;
use crate::types::ProviderName;

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) provider: ProviderName,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl: Option<time::Duration>,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) login_path: String,
    pub(crate) landing_path: String,
    pub(crate) http_timeout: Duration,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            provider: ProviderName("oidc".into()),
            session_cookie_name: "auth".into(),
            session_ttl: None,
            secure_cookies: true,
            auth_path: "/auth".into(),
            login_path: "/login".into(),
            landing_path: "/".into(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

/// Gateway configuration: provider location, client registration, cookie policy.
///
/// Required values are constructor parameters. Use
/// [`from_env()`](GatewayConfig::from_env) for deployment, or
/// [`new()`](GatewayConfig::new) with `with_*` methods in code and tests.
pub struct GatewayConfig {
    pub(crate) issuer: Url,
    pub(crate) oauth: OAuthConfig,
    pub(crate) settings: AuthSettings,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(issuer: Url, oauth: OAuthConfig) -> Self {
        Self {
            issuer,
            oauth,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `OIDC_ISSUER_URL`: provider issuer (discovery base URL)
    /// - `OIDC_CLIENT_ID`, `OIDC_CLIENT_SECRET`: client registration
    /// - `OIDC_REDIRECT_URL`: callback URL registered with the provider
    ///
    /// # Optional env vars
    /// - `OIDC_PROVIDER`: provider name used in `/auth/*/{provider}` routes (default `oidc`)
    /// - `OIDC_SCOPES`: comma-separated scopes
    /// - `OIDC_HTTP_TIMEOUT_SECS`: timeout for calls to the provider (default 10)
    /// - `GATEWAY_COOKIE_KEY`: cookie encryption key, at least 64 bytes
    /// - `GATEWAY_SESSION_TTL_HOURS`: session cookie lifetime (default: browser session)
    /// - `GATEWAY_DEV`: `"1"` or `"true"` drops the `Secure` cookie flag for plain-HTTP development
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// [`from_env()`](GatewayConfig::from_env) over an arbitrary variable lookup.
    pub(crate) fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let issuer = parse_url_var(&var, "OIDC_ISSUER_URL")?;
        let client_id = required_var(&var, "OIDC_CLIENT_ID")?;
        let client_secret = required_var(&var, "OIDC_CLIENT_SECRET")?;
        let redirect_uri = parse_url_var(&var, "OIDC_REDIRECT_URL")?;

        let mut oauth = OAuthConfig::new(client_id, client_secret, redirect_uri);
        if let Some(scopes) = var("OIDC_SCOPES") {
            oauth = oauth.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        let mut config = Self::new(issuer, oauth);

        if let Some(provider) = var("OIDC_PROVIDER") {
            config = config.with_provider(provider);
        }
        if let Some(secs) = var("OIDC_HTTP_TIMEOUT_SECS") {
            let secs: u64 = parse_positive("OIDC_HTTP_TIMEOUT_SECS", &secs)?;
            config = config.with_http_timeout(Duration::from_secs(secs));
        }
        if let Some(hours) = var("GATEWAY_SESSION_TTL_HOURS") {
            let hours: u32 = parse_positive("GATEWAY_SESSION_TTL_HOURS", &hours)?;
            config = config.with_session_ttl(time::Duration::hours(i64::from(hours)));
        }

        let dev = matches!(var("GATEWAY_DEV").as_deref(), Some("1" | "true"));

        let cookie_key = match var("GATEWAY_COOKIE_KEY") {
            Some(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "GATEWAY_COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            None => {
                tracing::warn!("GATEWAY_COOKIE_KEY not set; sessions will not survive a restart");
                Key::generate()
            }
        };

        Ok(config.with_cookie_key(cookie_key).with_secure_cookies(!dev))
    }

    /// Provider issuer used for discovery.
    #[must_use]
    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    /// Client registration.
    #[must_use]
    pub fn oauth(&self) -> &OAuthConfig {
        &self.oauth
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_provider(mut self, name: impl Into<String>) -> Self {
        self.settings.provider = ProviderName(name.into());
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    /// Session cookie lifetime; without one the cookie lasts for the browser session.
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: time::Duration) -> Self {
        self.settings.session_ttl = Some(ttl);
        self
    }

    /// `false` only for plain-HTTP development.
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.settings.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.settings.landing_path = path.into();
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.settings.http_timeout = timeout;
        self
    }
}

fn required_var(var: impl Fn(&str) -> Option<String>, name: &str) -> Result<String, AuthError> {
    var(name).ok_or_else(|| AuthError::Config(format!("{name} is required")))
}

fn parse_url_var(var: impl Fn(&str) -> Option<String>, name: &str) -> Result<Url, AuthError> {
    required_var(var, name)?
        .parse()
        .map_err(|e| AuthError::Config(format!("{name}: {e}")))
}

/// Unsigned, non-zero integer setting.
fn parse_positive<T>(name: &str, value: &str) -> Result<T, AuthError>
where
    T: std::str::FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    let parsed: T = value
        .trim()
        .parse()
        .map_err(|e| AuthError::Config(format!("{name}: {e}")))?;
    if parsed == T::default() {
        return Err(AuthError::Config(format!("{name} must be greater than zero")));
    }
    Ok(parsed)
}
