use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::flow::{PENDING_LOGIN_TTL, PendingLogin};

pub(super) const FLOW_COOKIE_NAME: &str = "auth_flow";

/// Encrypted cookie holding the outstanding state and PKCE verifier.
pub(super) fn flow_cookie(value: String, secure: bool, auth_path: &str) -> Cookie<'static> {
    Cookie::build((FLOW_COOKIE_NAME, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(auth_path.to_string())
        .max_age(PENDING_LOGIN_TTL)
        .build()
}

pub(super) fn clear_flow_cookie(auth_path: &str) -> Cookie<'static> {
    Cookie::build((FLOW_COOKIE_NAME, ""))
        .path(auth_path.to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Pending login from the flow cookie; `None` if absent, unreadable or forged.
pub(super) fn pending_login(jar: &PrivateCookieJar) -> Option<PendingLogin> {
    let cookie = jar.get(FLOW_COOKIE_NAME)?;
    PendingLogin::from_cookie_value(cookie.value())
        .inspect_err(|e| tracing::warn!(error = %e, "Unreadable login flow cookie"))
        .ok()
}

/// Session cookie scoped to the site root. Without a TTL it lasts for the browser session.
pub(super) fn session_cookie(
    name: &str,
    value: String,
    ttl: Option<Duration>,
    secure: bool,
) -> Cookie<'static> {
    let builder = Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string());
    match ttl {
        Some(ttl) => builder.max_age(ttl).build(),
        None => builder.build(),
    }
}

pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}
