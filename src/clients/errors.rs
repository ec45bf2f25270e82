//! Error types for the request/response pipeline.
//!
//! Every failed operation returns exactly one [`Error`] value. Callers match
//! on its variants (or on [`Error::kind`]) to tell the categories apart
//! without parsing strings:
//!
//! - [`Error::Config`]: invalid construction parameters
//! - [`Error::InvalidRequest`]: a request failed local validation before any I/O
//! - [`Error::Auth`]: the token provider failed
//! - [`Error::Transport`]: network failure, timeout or cancellation
//! - [`Error::Api`]: a well-formed error envelope from the service
//! - [`Error::MalformedErrorBody`]: an error status with a body that breaks protocol
//! - [`Error::Decode`]: a success status with a body that does not decode
//! - [`Error::Invalid`]: a success body that decoded but failed self-validation
//!
//! # Example
//!
//! ```rust,ignore
//! use bc_api::{Error, ErrorKind};
//!
//! match page.get(id, &GetOptions::default()).await {
//!     Ok(customer) => println!("{}", customer.display_name),
//!     Err(Error::Api(e)) if e.status_code == 404 => println!("not found"),
//!     Err(e) if e.is_cancelled() => println!("cancelled"),
//!     Err(e) => eprintln!("{:?}: {e}", e.kind()),
//! }
//! ```

use crate::auth::AuthError;
use crate::error::ConfigError;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// A well-formed error returned by the Business Central service.
///
/// Constructed once from a single failed response and never mutated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{status_code} {code}: {message}{}", correlation_suffix(.correlation_id))]
pub struct ApiError {
    /// Machine-readable error code, e.g. `BadRequest_ResourceNotFound`.
    pub code: String,
    /// Human readable message with any correlation id removed.
    pub message: String,
    /// The HTTP status code of the response.
    pub status_code: u16,
    /// Correlation id extracted from the message, if present.
    pub correlation_id: Option<Uuid>,
    /// Value of the `request-id` response header, if present.
    pub request_id: Option<String>,
}

#[allow(clippy::ref_option)]
fn correlation_suffix(correlation_id: &Option<Uuid>) -> String {
    correlation_id
        .map(|id| format!(" (correlation id {id})"))
        .unwrap_or_default()
}

/// Error returned when a request fails local validation.
///
/// These checks run before any network call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidRequestError {
    /// The request has no entity set.
    #[error("Entity set is required.")]
    MissingEntitySet,

    /// A body was attached to a method that does not accept one.
    #[error("Cannot send a body with {method}.")]
    BodyNotAllowed {
        /// The HTTP method that rejects a body.
        method: String,
    },

    /// `$filter` was supplied on a method other than GET.
    #[error("$filter is only allowed on GET, not {method}.")]
    FilterNotAllowed {
        /// The HTTP method the filter was attached to.
        method: String,
    },

    /// A PATCH request was built without a record id.
    #[error("PATCH requires a record id.")]
    MissingRecordId,

    /// The body could not be serialized to JSON.
    #[error("Failed to serialize request body: {reason}")]
    InvalidBody {
        /// The serializer's message.
        reason: String,
    },

    /// A header name or value is not valid HTTP.
    #[error("Invalid header '{name}'.")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },

    /// The target URL could not be parsed.
    #[error("Invalid request URL '{url}'.")]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
    },
}

/// Network-level failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The caller's cancellation token fired.
    #[error("Request was cancelled")]
    Cancelled,

    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection, TLS or protocol failure from reqwest.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Failure reported by a custom [`Transport`](super::Transport).
    #[error("Transport error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(error)
        }
    }
}

/// A validation failure reported by [`Validate`](crate::Validate).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}{message}", .field.as_deref().map(|f| format!("{f}: ")).unwrap_or_default())]
pub struct ValidationError {
    /// The field that failed validation, if any.
    pub field: Option<String>,
    /// What was wrong.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error that is not tied to a field.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

/// Error category, matching the pipeline's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid construction parameters or request combinations.
    Configuration,
    /// The token provider failed.
    Authentication,
    /// Network failure, timeout or cancellation.
    Transport,
    /// A structured error from the remote service.
    RemoteApi,
    /// An error status whose body is not a valid error envelope.
    MalformedErrorBody,
    /// A success body that failed to decode or validate.
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::Transport => "transport",
            Self::RemoteApi => "remote api",
            Self::MalformedErrorBody => "malformed error body",
            Self::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// The single error type returned by client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request failed local validation.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequestError),

    /// The token provider failed.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Network failure, timeout or cancellation.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service returned a structured error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The service returned an error status with a body that is not a valid
    /// error envelope.
    #[error("Malformed error body for status {status}: {source}")]
    MalformedErrorBody {
        /// The HTTP status code.
        status: u16,
        /// The raw response body.
        body: Vec<u8>,
        /// Why the envelope did not parse.
        #[source]
        source: serde_json::Error,
    },

    /// A success body could not be decoded into the expected type.
    #[error("Failed to decode {type_name}: {source}")]
    Decode {
        /// The Rust type the body was decoded into.
        type_name: &'static str,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A success body decoded but failed self-validation.
    #[error("Decoded {type_name} is invalid: {source}")]
    Invalid {
        /// The Rust type that failed validation.
        type_name: &'static str,
        /// The validation failure.
        #[source]
        source: ValidationError,
    },
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::InvalidRequest(_) => ErrorKind::Configuration,
            Self::Auth(_) => ErrorKind::Authentication,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Api(_) => ErrorKind::RemoteApi,
            Self::MalformedErrorBody { .. } => ErrorKind::MalformedErrorBody,
            Self::Decode { .. } | Self::Invalid { .. } => ErrorKind::Decode,
        }
    }

    /// Returns the structured service error, if this is one.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the HTTP status code for errors that came from a response.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api(e) => Some(e.status_code),
            Self::MalformedErrorBody { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the call stopped because its cancellation token fired.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::Cancelled) | Self::Auth(AuthError::Cancelled)
        )
    }
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
    assert_send_sync::<ApiError>();
};
