//! Bearer token acquisition for the Business Central API.
//!
//! The request pipeline only needs one capability from the authentication
//! layer: "give me a bearer token, or fail". That capability is the
//! [`TokenProvider`] trait. Caching, refresh and scoping are the provider's
//! own concern.
//!
//! # Overview
//!
//! - [`TokenProvider`]: The async trait the transport calls before every request
//! - [`AccessToken`]: A bearer token with masked debug output
//! - [`StaticTokenProvider`]: Hands out a fixed, pre-acquired token
//! - [`ClientSecretCredential`]: OAuth 2.0 client credentials grant against
//!   Microsoft Entra ID, with in-memory caching
//!
//! # Example
//!
//! ```rust
//! use bc_api::auth::{StaticTokenProvider, TokenProvider};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let provider = StaticTokenProvider::new("eyJ0eXAi...");
//! let token = provider.token(&CancellationToken::new()).await.unwrap();
//! assert_eq!(token.secret(), "eyJ0eXAi...");
//! # });
//! ```

mod client_credentials;
mod errors;

pub use client_credentials::{
    ClientSecretCredential, ClientSecretCredentialBuilder, DEFAULT_AUTHORITY, DEFAULT_SCOPE,
    DEFAULT_TOKEN_TIMEOUT,
};
pub use errors::AuthError;

use async_trait::async_trait;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// A bearer access token.
///
/// # Security
///
/// The `Debug` implementation masks the token, displaying only
/// `AccessToken(*****)`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token string.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(*****)")
    }
}

/// Source of bearer tokens for outgoing requests.
///
/// Implementations must be cheap to call repeatedly; the transport asks for
/// a token on every request. The cancellation token is the caller's, and a
/// provider that performs network I/O should abort when it fires.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtains a bearer-eligible access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if no token can be obtained.
    async fn token(&self, cancel: &CancellationToken) -> Result<AccessToken, AuthError>;
}

/// A token provider that always returns the same token.
#[derive(Clone, Debug)]
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    /// Creates a provider for a pre-acquired token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, cancel: &CancellationToken) -> Result<AccessToken, AuthError> {
        if cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        Ok(self.token.clone())
    }
}

// Verify provider types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AccessToken>();
    assert_send_sync::<StaticTokenProvider>();
};
