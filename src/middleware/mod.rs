//! OIDC login middleware for Axum.
//!
//! Routes for the authorization-code flow, plus a gate that keeps
//! unauthenticated browsers away from protected pages.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use oidc_gateway::middleware::{GatewayConfig, GatewayState, auth_routes, require_session};
//!
//! // 1. Configure from environment
//! let config = GatewayConfig::from_env()?;
//!
//! // 2. Resolve the provider before serving (fails on an unreachable provider)
//! let state = GatewayState::initialize(config, Pages::new()?).await?;
//!
//! // 3. Mount auth routes and gate the rest
//! let app = axum::Router::new()
//!     .route("/", get(chat))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_session))
//!     .merge(auth_routes(&state))
//!     .with_state(state);
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod gate;
mod routes;
mod state;

pub use config::GatewayConfig;
pub use error::AuthError;
pub use extractor::AuthUser;
pub use gate::require_session;
pub use routes::auth_routes;
pub use state::GatewayState;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
