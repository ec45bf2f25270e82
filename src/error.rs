//! Configuration error types for the Business Central API client.
//!
//! All configuration constructors return `Result<T, ConfigError>` so that a
//! misconfigured client is rejected before any request is built. Nothing in
//! this crate panics on bad configuration.
//!
//! # Example
//!
//! ```rust
//! use bc_api::{ConfigError, EnvironmentName};
//!
//! let result = EnvironmentName::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyEnvironment)));
//! ```

use thiserror::Error;

/// Errors that can occur while configuring a client or resource page.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value that must be a GUID could not be parsed as one.
    #[error("Invalid {field} '{value}'. Expected a GUID such as '00000000-0000-0000-0000-000000000000'.")]
    InvalidGuid {
        /// The name of the offending field (e.g. `tenant_id`).
        field: &'static str,
        /// The value that was provided.
        value: String,
    },

    /// Environment name cannot be empty.
    #[error("Environment cannot be empty. Please provide an environment name such as 'Production'.")]
    EmptyEnvironment,

    /// API route is neither `v2.0` nor a `publisher/group/version` path.
    #[error("Invalid API route '{route}'. Expected 'v2.0' or three path segments 'publisher/group/version'.")]
    InvalidRoute {
        /// The invalid route that was provided.
        route: String,
    },

    /// Root URL is not an absolute http(s) URL.
    #[error("Invalid root URL '{url}'. Please provide a URL with scheme (e.g., 'https://api.businesscentral.dynamics.com').")]
    InvalidRootUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A resource page was created without an entity set name.
    #[error("Entity set name cannot be empty.")]
    EmptyEntitySet,

    /// A credential was created without a client secret.
    #[error("Client secret cannot be empty.")]
    EmptyClientSecret,

    /// The user agent suffix is not a valid header value.
    #[error("Invalid user agent '{value}'.")]
    InvalidUserAgent {
        /// The rendered user agent.
        value: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// The underlying HTTP client could not be created.
    #[error("Failed to create HTTP client: {reason}")]
    HttpClient {
        /// Why construction failed.
        reason: String,
    },
}
