use axum::extract::{FromRef, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::Key;

use super::extractor::read_session;
use super::state::GatewayState;

/// Session gate for protected routes.
///
/// - no session cookie: `307` to the login page, the inner handler never runs;
/// - unreadable cookie: `500`;
/// - valid cookie: the decoded [`Session`](crate::Session) is added to the
///   request extensions and the request is forwarded unchanged.
///
/// ```rust,ignore
/// let protected = Router::new()
///     .route("/", get(chat))
///     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_session));
/// ```
pub async fn require_session(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    match read_session(&state.settings, request.headers(), Key::from_ref(&state)) {
        Ok(Some(session)) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Ok(None) => {
            tracing::debug!(path = %request.uri().path(), "No session, redirecting to login");
            Redirect::temporary(&state.settings.login_path).into_response()
        }
        Err(e) => e.into_response(),
    }
}
