use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::{AuthSettings, GatewayConfig};
use crate::discovery::ProviderMetadata;
use crate::error::Error;
use crate::oauth::AuthClient;
use crate::pages::Pages;
use crate::token::TokenVerifier;

/// Shared, read-only state for every request.
///
/// Built once before the listener starts; nothing in it changes afterwards.
#[derive(Clone)]
pub struct GatewayState {
    pub(crate) client: Arc<AuthClient>,
    pub(crate) verifier: Arc<TokenVerifier>,
    pub(crate) pages: Arc<Pages>,
    pub(crate) settings: AuthSettings,
}

impl GatewayState {
    /// Resolve the provider and assemble the state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] if the provider metadata cannot be resolved,
    /// or [`Error::Http`] if the HTTP client cannot be built.
    pub async fn initialize(config: GatewayConfig, pages: Pages) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.settings.http_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let metadata = ProviderMetadata::discover(&http, &config.issuer).await?;
        Ok(Self::from_metadata(config, &metadata, pages, http))
    }

    /// Assemble the state from already-resolved metadata.
    #[must_use]
    pub fn from_metadata(
        config: GatewayConfig,
        metadata: &ProviderMetadata,
        pages: Pages,
        http: reqwest::Client,
    ) -> Self {
        let verifier = TokenVerifier::new(metadata, config.oauth.client_id());
        let client = AuthClient::new(config.oauth, metadata).with_http_client(http);
        Self {
            client: Arc::new(client),
            verifier: Arc::new(verifier),
            pages: Arc::new(pages),
            settings: config.settings,
        }
    }

    /// Where unauthenticated browsers are sent.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.settings.login_path
    }

    /// Where a completed login lands.
    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.settings.landing_path
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<GatewayState> for Key {
    fn from_ref(state: &GatewayState) -> Self {
        state.settings.cookie_key.clone()
    }
}
