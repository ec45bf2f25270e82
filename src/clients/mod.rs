//! HTTP client types for Business Central API communication.
//!
//! This module provides the request/response pipeline every resource call
//! goes through:
//!
//! ```text
//! RequestBuilder -> Request -> AuthTransport -> Transport -> RawResponse -> Response
//!                                                                              |
//!                                              classify (failure) / decode (success)
//! ```
//!
//! # Overview
//!
//! - [`Client`]: The shared, cloneable client handle
//! - [`Request`] and [`RequestBuilder`]: Request construction and local validation
//! - [`Transport`], [`ReqwestTransport`], [`AuthTransport`]: The network seam
//! - [`Response`]: The response envelope with repeatable decoding
//! - [`classify`] and [`extract_correlation_id`]: Error body handling
//! - [`Error`]: The single error type returned by every operation

mod decode;
mod errors;
mod http_client;
mod http_request;
mod http_response;
mod transport;

pub use decode::{classify, decode, extract_correlation_id, Validate};
pub use errors::{ApiError, Error, ErrorKind, InvalidRequestError, TransportError, ValidationError};
pub use http_client::{Client, SDK_VERSION};
pub use http_request::{
    is_opaque_url, HttpMethod, Request, RequestBuilder, ACCEPT_JSON_NO_METADATA,
    CONTENT_TYPE_JSON, DATA_ACCESS_INTENT, DATA_ACCESS_READ_ONLY, IF_MATCH_ANY, PREFER,
};
pub use http_response::{RawResponse, Response, REQUEST_ID_HEADER};
pub use transport::{user_agent, AuthTransport, ReqwestTransport, Transport, USER_AGENT_PRODUCT};
