//! HTTP response types for the Business Central API.
//!
//! A [`Response`] owns the fully read body, the status and the headers of a
//! single round trip. The underlying connection has already been released by
//! the time a `Response` exists, so the body can be decoded any number of
//! times, or never.

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::clients::decode::{classify, decode, Validate};
use crate::clients::errors::Error;

/// Header carrying the service's request identifier.
pub const REQUEST_ID_HEADER: &str = "request-id";

/// The raw result of a transport round trip.
///
/// This is what a [`Transport`](super::Transport) produces. The body must be
/// read completely before it is returned.
#[derive(Clone, Debug, Default)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// The complete response body.
    pub body: Vec<u8>,
}

/// A response envelope with deferred, repeatable decoding.
///
/// # Example
///
/// ```rust
/// use bc_api::clients::{RawResponse, Response};
///
/// let response = Response::from(RawResponse {
///     status: 200,
///     headers: Default::default(),
///     body: br#"{"value":[]}"#.to_vec(),
/// });
///
/// assert!(response.is_success());
/// let first: serde_json::Value = response.decode().unwrap();
/// let second: serde_json::Value = response.decode().unwrap();
/// assert_eq!(first, second);
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    request_id: Option<String>,
}

impl From<RawResponse> for Response {
    fn from(raw: RawResponse) -> Self {
        let request_id = raw
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            request_id,
        }
    }
}

impl Response {
    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns the `request-id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns all response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the raw response body.
    #[must_use]
    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the classified error for a non-2xx response, if any.
    #[must_use]
    pub fn error(&self) -> Option<Error> {
        if self.is_success() {
            None
        } else {
            Some(classify(self.status, &self.body, self.request_id()))
        }
    }

    /// Converts a non-2xx response into its classified error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] or [`Error::MalformedErrorBody`] for a failure
    /// status.
    pub fn error_for_status(self) -> Result<Self, Error> {
        match self.error() {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }

    /// Decodes the body into `T`.
    ///
    /// A failure status is classified instead of decoded.
    ///
    /// # Errors
    ///
    /// Returns the classified error for a failure status, otherwise
    /// [`Error::Decode`] or [`Error::Invalid`].
    pub fn decode<T>(&self) -> Result<T, Error>
    where
        T: DeserializeOwned + Validate,
    {
        if let Some(error) = self.error() {
            return Err(error);
        }
        decode(&self.body)
    }

    /// Checks a response that is expected to carry no content.
    ///
    /// # Errors
    ///
    /// Returns the classified error for a failure status.
    pub fn decode_no_content(&self) -> Result<(), Error> {
        self.error().map_or(Ok(()), Err)
    }
}
