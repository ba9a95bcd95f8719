//! Gateway router: login page, auth routes, and gated chat pages.

use axum::Router;
use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::http::header::HOST;
use axum::response::Html;
use axum::routing::get;

use crate::middleware::{AuthError, GatewayState, auth_routes, require_session};
use crate::pages::{CHAT_PAGE, ChatContext, LOGIN_PAGE, LoginContext};
use crate::session::Session;

/// Full application router with state applied.
pub fn router(state: GatewayState) -> Router {
    let login_path = state.login_path().to_owned();
    let protected = Router::new()
        .route("/", get(chat_page))
        .route("/chat", get(chat_page))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .merge(protected)
        .route(&login_path, get(login_page))
        .merge(auth_routes(&state))
        .with_state(state)
}

fn host(headers: &HeaderMap) -> &str {
    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn login_page(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Html<String>, AuthError> {
    let ctx = LoginContext {
        host: host(&headers),
        provider: state.settings.provider.as_str(),
    };
    state
        .pages
        .render(LOGIN_PAGE, &ctx)
        .map(Html)
        .map_err(|e| AuthError::Render(e.to_string()))
}

async fn chat_page(
    State(state): State<GatewayState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> Result<Html<String>, AuthError> {
    let ctx = ChatContext {
        host: host(&headers),
        user_data: Some(&session),
    };
    state
        .pages
        .render(CHAT_PAGE, &ctx)
        .map(Html)
        .map_err(|e| AuthError::Render(e.to_string()))
}
