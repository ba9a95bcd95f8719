use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{CookieJar, Key};
use axum_extra::extract::PrivateCookieJar;

use super::config::AuthSettings;
use super::error::AuthError;
use super::state::GatewayState;
use crate::session::Session;

/// Signed-in user, decoded from the `auth` cookie.
///
/// Behind [`require_session`](super::require_session) the session is taken
/// from the request extensions; elsewhere the cookie is read directly.
///
/// # Example
///
/// ```rust,ignore
/// async fn whoami(AuthUser(session): AuthUser) -> String {
///     format!("Hello, {}", session.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Session);

impl FromRequestParts<GatewayState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(Self(session.clone()));
        }

        read_session(&state.settings, &parts.headers, Key::from_ref(state))?
            .map(Self)
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Reads the session cookie.
///
/// `Ok(None)` means no cookie was sent. A cookie that fails to unseal or
/// decode is an error, never treated as absent.
pub(crate) fn read_session(
    settings: &AuthSettings,
    headers: &HeaderMap,
    key: Key,
) -> Result<Option<Session>, AuthError> {
    let name = settings.session_cookie_name.as_str();

    let sent = CookieJar::from_headers(headers)
        .get(name)
        .is_some_and(|c| !c.value().is_empty());
    if !sent {
        return Ok(None);
    }

    let cookie = PrivateCookieJar::from_headers(headers, key)
        .get(name)
        .ok_or_else(|| AuthError::CookieDecodeFailure("cookie failed authentication".into()))?;

    Session::decode(cookie.value())
        .map(Some)
        .map_err(|e| AuthError::CookieDecodeFailure(e.to_string()))
}
