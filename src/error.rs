#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("OIDC discovery failed for {issuer}: {message}")]
    Discovery { issuer: String, message: String },
    #[error("{operation} failed (status {status:?}): {detail}")]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ID token verification error: {0}")]
    Token(String),
    #[error("token response has no id_token field")]
    MissingIdToken,
    #[error("ID token claims could not be decoded: {0}")]
    Claims(String),
    #[error("session could not be decoded: {0}")]
    Session(String),
}
