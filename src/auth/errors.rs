//! Authentication error types.
//!
//! A token provider failure always surfaces as [`AuthError`], wrapped in
//! [`Error::Auth`](crate::Error::Auth) by the transport layer. It is never
//! reported as a transport or remote-service error.
//!
//! # Example
//!
//! ```rust
//! use bc_api::auth::AuthError;
//!
//! let error = AuthError::TokenEndpoint {
//!     status: 401,
//!     error: "invalid_client".to_string(),
//!     description: None,
//! };
//! assert!(error.to_string().contains("invalid_client"));
//! ```

use thiserror::Error;

/// Errors that can occur while obtaining an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The caller's cancellation token fired while the token was requested.
    #[error("Token acquisition was cancelled")]
    Cancelled,

    /// The token endpoint could not be reached.
    #[error("Token request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The token endpoint did not answer within the configured timeout.
    #[error("Token request timed out after {}ms", .after.as_millis())]
    Timeout {
        /// The timeout that elapsed.
        after: std::time::Duration,
    },

    /// The token endpoint rejected the request.
    #[error("Token endpoint returned {status}: {error}{}", parenthesized(.description.as_deref()))]
    TokenEndpoint {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// OAuth error code, e.g. `invalid_client`.
        error: String,
        /// Human readable description, if provided.
        description: Option<String>,
    },

    /// The token endpoint answered with a body that is not a token response.
    #[error("Invalid token response: {reason}")]
    InvalidResponse {
        /// What was wrong with the response.
        reason: String,
    },

    /// A custom [`TokenProvider`](super::TokenProvider) failed.
    #[error("Token provider failed: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuthError {
    /// Wraps an arbitrary error from a custom token provider.
    pub fn provider(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Provider(error.into())
    }
}

fn parenthesized(description: Option<&str>) -> String {
    description.map(|d| format!(" ({d})")).unwrap_or_default()
}
