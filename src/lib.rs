#![doc = include_str!("../README.md")]

pub mod app;
pub mod discovery;
pub mod error;
pub mod flow;
pub mod middleware;
pub mod oauth;
pub mod pages;
pub mod session;
pub mod token;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use discovery::{DiscoveryDocument, Jwk, JwkSet, ProviderMetadata};
pub use error::Error;
pub use flow::{PendingLogin, code_challenge, generate_code_verifier, generate_state};
pub use oauth::{AuthClient, AuthorizationRequest, OAuthConfig, TokenResponse};
pub use pages::Pages;
pub use session::Session;
pub use token::{IdTokenClaims, TokenVerifier, VerifiedToken};
pub use types::{Audience, ProviderName, Subject};
