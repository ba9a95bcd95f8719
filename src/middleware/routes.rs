use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::{Json, Redirect};
use axum::routing::get;
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use serde::Deserialize;
use time::OffsetDateTime;

use super::cookies;
use super::error::AuthError;
use super::extractor::AuthUser;
use super::state::GatewayState;
use crate::flow::PendingLogin;
use crate::session::Session;

/// Login, callback, logout and session routes under the configured auth path.
///
/// The router still needs [`GatewayState`]; merge it into the app router
/// before calling `with_state`.
pub fn auth_routes(state: &GatewayState) -> Router<GatewayState> {
    let auth_path = &state.settings.auth_path;

    Router::new()
        .route(&format!("{auth_path}/login/{{provider}}"), get(login))
        .route(&format!("{auth_path}/callback/{{provider}}"), get(callback))
        .route(&format!("{auth_path}/logout"), get(logout).post(logout))
        .route(&format!("{auth_path}/session"), get(current_session))
}

fn ensure_provider(state: &GatewayState, provider: &str) -> Result<(), AuthError> {
    if state.settings.provider.as_str() == provider {
        Ok(())
    } else {
        Err(AuthError::UnknownProvider(provider.to_string()))
    }
}

// ── Login ──────────────────────────────────────────────────────────

async fn login(
    State(state): State<GatewayState>,
    Path(provider): Path<String>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    ensure_provider(&state, &provider)?;

    let auth_req = state.client.authorization_url();
    let flow = cookies::flow_cookie(
        auth_req.pending.to_cookie_value()?,
        state.settings.secure_cookies,
        &state.settings.auth_path,
    );

    tracing::debug!(provider = %provider, "Redirecting to identity provider");

    Ok((jar.add(flow), Redirect::to(auth_req.url.as_str())))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(state): State<GatewayState>,
    Path(provider): Path<String>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), (PrivateCookieJar, AuthError)> {
    tracing::info!(provider = %provider, "Handling callback from identity provider");

    // Another provider's callback must not consume this login's flow cookie.
    if let Err(e) = ensure_provider(&state, &provider) {
        return Err((jar, e));
    }

    // The flow cookie is single use: removed whether or not the login completes.
    let pending = cookies::pending_login(&jar);
    let jar = jar.remove(cookies::clear_flow_cookie(&state.settings.auth_path));

    let session = match complete_login(&state, params, pending).await {
        Ok(session) => session,
        Err(e) => return Err((jar, e)),
    };

    let value = match session.encode() {
        Ok(value) => value,
        Err(e) => return Err((jar, e.into())),
    };
    let cookie = cookies::session_cookie(
        &state.settings.session_cookie_name,
        value,
        state.settings.session_ttl,
        state.settings.secure_cookies,
    );

    tracing::info!(sub = %session.sub, name = %session.name, "OIDC login successful");

    Ok((jar.add(cookie), Redirect::temporary(&state.settings.landing_path)))
}

/// State check, code exchange, ID token verification and claim decoding, in that order.
async fn complete_login(
    state: &GatewayState,
    params: CallbackParams,
    pending: Option<PendingLogin>,
) -> Result<Session, AuthError> {
    let returned_state = params.state.as_deref().unwrap_or_default();
    let pending = pending
        .filter(|p| p.accepts(returned_state, OffsetDateTime::now_utc()))
        .ok_or_else(|| {
            tracing::warn!("OAuth state mismatch");
            AuthError::StateMismatch
        })?;

    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "Identity provider returned an error");
        return Err(AuthError::AccessDenied(error.clone()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(AuthError::MissingCode)?;

    let tokens = state
        .client
        .exchange_code(&code, &pending.code_verifier)
        .await
        .map_err(|e| AuthError::ExchangeFailure(e.to_string()))?;

    let raw_id_token = tokens.id_token().ok_or(AuthError::MissingIdToken)?;

    let verified = state
        .verifier
        .verify(raw_id_token)
        .map_err(|e| AuthError::TokenInvalid(e.to_string()))?;

    let claims = verified
        .claims()
        .map_err(|e| AuthError::ClaimsDecodeFailure(e.to_string()))?;

    Ok(Session::from_claims(&claims))
}

// ── Logout ─────────────────────────────────────────────────────────

/// Always sends the removal, so a cookie sealed under a previous key is cleared too.
async fn logout(State(state): State<GatewayState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let clear = cookies::clear_session_cookie(&state.settings.session_cookie_name);
    (jar.add(clear), Redirect::to(&state.settings.login_path))
}

// ── Session ────────────────────────────────────────────────────────

async fn current_session(AuthUser(session): AuthUser) -> Json<Session> {
    Json(session)
}
