//! Error classification and body decoding.
//!
//! Business Central reports failures with a fixed envelope:
//!
//! ```json
//! {"error": {"code": "BadRequest", "message": "Oops.  CorrelationId:  0f8fad5b-d9cb-469f-a165-70867728950e."}}
//! ```
//!
//! The envelope is parsed strictly: an unknown field anywhere in it means
//! the service broke protocol, and [`classify`] reports
//! [`Error::MalformedErrorBody`] with the raw bytes instead of an
//! [`ApiError`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::clients::errors::{ApiError, Error, ValidationError};

/// Self-validation hook run after a successful decode.
///
/// The default implementation accepts everything, so most entity types only
/// need an empty `impl Validate for MyEntity {}`.
///
/// # Example
///
/// ```rust
/// use bc_api::{Validate, ValidationError};
///
/// struct Item {
///     number: String,
/// }
///
/// impl Validate for Item {
///     fn validate(&self) -> Result<(), ValidationError> {
///         if self.number.is_empty() {
///             return Err(ValidationError::field("number", "must not be empty"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validate {
    /// Checks invariants of a decoded value.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] describing the first violated invariant.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        self.iter().try_for_each(Validate::validate)
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        self.as_ref().map_or(Ok(()), Validate::validate)
    }
}

impl Validate for serde_json::Value {}

impl Validate for () {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ErrorBody {
    code: String,
    message: String,
}

const GUID_LEN: usize = 36;

/// Splits an embedded correlation id off an error message.
///
/// Messages look like `"<text>  CorrelationId:  <guid>."`. When splitting on
/// the double space yields exactly three segments and the third (up to the
/// first `.`) is a 36-character GUID, returns the first segment and the id.
/// Otherwise the message is returned unmodified with no id.
///
/// # Example
///
/// ```rust
/// use bc_api::clients::extract_correlation_id;
///
/// let (message, id) = extract_correlation_id(
///     "Record not found.  CorrelationId:  0f8fad5b-d9cb-469f-a165-70867728950e.",
/// );
/// assert_eq!(message, "Record not found.");
/// assert!(id.is_some());
///
/// let (message, id) = extract_correlation_id("Plain message");
/// assert_eq!(message, "Plain message");
/// assert!(id.is_none());
/// ```
#[must_use]
pub fn extract_correlation_id(message: &str) -> (String, Option<Uuid>) {
    let segments: Vec<&str> = message.split("  ").collect();
    if segments.len() != 3 {
        return (message.to_string(), None);
    }

    let candidate = segments[2].split('.').next().unwrap_or_default();
    if candidate.len() != GUID_LEN {
        return (message.to_string(), None);
    }

    match Uuid::parse_str(candidate) {
        Ok(id) => (segments[0].to_string(), Some(id)),
        Err(_) => (message.to_string(), None),
    }
}

/// Turns a failed response into a typed error.
///
/// Returns [`Error::Api`] for a well-formed envelope and
/// [`Error::MalformedErrorBody`] for anything else.
#[must_use]
pub fn classify(status: u16, body: &[u8], request_id: Option<&str>) -> Error {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let (message, correlation_id) = extract_correlation_id(&envelope.error.message);
            tracing::debug!(
                status,
                code = %envelope.error.code,
                correlation_id = ?correlation_id,
                request_id = ?request_id,
                "classified error response"
            );
            Error::Api(ApiError {
                code: envelope.error.code,
                message,
                status_code: status,
                correlation_id,
                request_id: request_id.map(str::to_string),
            })
        }
        Err(source) => {
            tracing::warn!(
                status,
                body = %String::from_utf8_lossy(body),
                error = %source,
                "error response body does not match the error envelope"
            );
            Error::MalformedErrorBody {
                status,
                body: body.to_vec(),
                source,
            }
        }
    }
}

/// Decodes a success body into `T` and runs its [`Validate`] hook.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the JSON does not match `T` and
/// [`Error::Invalid`] if validation fails.
pub fn decode<T>(body: &[u8]) -> Result<T, Error>
where
    T: DeserializeOwned + Validate,
{
    let type_name = std::any::type_name::<T>();
    let value: T =
        serde_json::from_slice(body).map_err(|source| Error::Decode { type_name, source })?;
    value
        .validate()
        .map_err(|source| Error::Invalid { type_name, source })?;
    Ok(value)
}
