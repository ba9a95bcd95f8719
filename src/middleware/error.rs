use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Authentication errors for the HTTP layer.
///
/// Client errors carry a short fixed message. Server-side failures are logged
/// with their detail and answered with a generic body.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session cookie.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Callback state absent, expired, or different from the one issued.
    #[error("state did not match")]
    StateMismatch,

    /// Callback without an authorization code.
    #[error("missing authorization code")]
    MissingCode,

    /// The provider reported an error instead of a code.
    #[error("login was not completed: {0}")]
    AccessDenied(String),

    /// `{provider}` route segment names no configured provider.
    #[error("unknown auth provider: {0}")]
    UnknownProvider(String),

    /// Code exchange at the token endpoint failed.
    #[error("token exchange failed: {0}")]
    ExchangeFailure(String),

    /// Token response carried no ID token.
    #[error("no id_token in token response")]
    MissingIdToken,

    /// ID token signature or claims were rejected.
    #[error("ID token rejected: {0}")]
    TokenInvalid(String),

    /// Verified token did not contain usable identity claims.
    #[error("ID token claims unusable: {0}")]
    ClaimsDecodeFailure(String),

    /// Session cookie present but unreadable.
    #[error("session cookie unreadable: {0}")]
    CookieDecodeFailure(String),

    /// Page template failed to render.
    #[error("render error: {0}")]
    Render(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::StateMismatch | Self::MissingCode | Self::AccessDenied(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UnknownProvider(_) => StatusCode::NOT_FOUND,
            Self::ExchangeFailure(_)
            | Self::MissingIdToken
            | Self::TokenInvalid(_)
            | Self::ClaimsDecodeFailure(_)
            | Self::CookieDecodeFailure(_)
            | Self::Render(_)
            | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Unauthenticated | Self::StateMismatch | Self::MissingCode => {
                (status, self.to_string()).into_response()
            }
            Self::AccessDenied(_) => (status, "login was not completed").into_response(),
            Self::UnknownProvider(ref name) => {
                (status, format!("Auth provider {name} not supported")).into_response()
            }
            _ => {
                tracing::error!(error = %self, "Auth internal error");
                (status, "Internal error").into_response()
            }
        }
    }
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        use crate::error::Error;
        match e {
            Error::OAuth { .. } | Error::Http(_) => Self::ExchangeFailure(e.to_string()),
            Error::MissingIdToken => Self::MissingIdToken,
            Error::Token(detail) => Self::TokenInvalid(detail),
            Error::Claims(detail) => Self::ClaimsDecodeFailure(detail),
            Error::Session(detail) => Self::CookieDecodeFailure(detail),
            other => Self::Config(other.to_string()),
        }
    }
}
