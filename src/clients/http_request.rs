//! HTTP request types for the Business Central API.
//!
//! This module provides the [`Request`] type and the [`RequestBuilder`] that
//! turns an entity set (or a server-issued continuation link) plus OData
//! query options into a transport-level request.
//!
//! # URL construction
//!
//! - A target that starts with `http://` or `https://` is an opaque URL
//!   (typically `@odata.nextLink`). It is used verbatim; record id and query
//!   options are ignored so the embedded continuation token is never
//!   corrupted.
//! - Any other target is an entity set. It is joined to the company base URL,
//!   the record id is appended as `(<id>)`, and the query string is added.
//!
//! # Default headers
//!
//! | Header               | When                                            |
//! |----------------------|-------------------------------------------------|
//! | `Accept`             | always, `application/json;odata.metadata=none`  |
//! | `Content-Type`       | only when a body is present                     |
//! | `Data-Access-Intent` | GET, unless a live-replica read is requested    |
//! | `If-Match`           | PATCH, PUT, DELETE; the ETag or `*`             |
//! | `Prefer`             | `odata.maxpagesize=<n>` and any extra preference |

use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, IF_MATCH};
use serde::Serialize;
use uuid::Uuid;

use crate::clients::errors::InvalidRequestError;
use crate::rest::ODataQuery;

/// `application/json`
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Accept header value that suppresses OData metadata in responses.
pub const ACCEPT_JSON_NO_METADATA: &str = "application/json;odata.metadata=none";

/// Header asking the service to serve a GET from a read-only replica.
pub const DATA_ACCESS_INTENT: &str = "data-access-intent";

/// The only `Data-Access-Intent` value this client sends.
pub const DATA_ACCESS_READ_ONLY: &str = "ReadOnly";

/// Concurrency token that matches any version of a record.
pub const IF_MATCH_ANY: &str = "*";

/// `Prefer` header name.
pub const PREFER: &str = "prefer";

/// HTTP methods supported by the Business Central API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Retrieve a record or collection.
    Get,
    /// Create a record.
    Post,
    /// Replace a record.
    Put,
    /// Partially update a record.
    Patch,
    /// Delete a record.
    Delete,
}

impl HttpMethod {
    /// Returns the upper-case wire name of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Methods that carry an `If-Match` precondition.
    #[must_use]
    pub const fn requires_if_match(&self) -> bool {
        matches!(self, Self::Patch | Self::Put | Self::Delete)
    }

    /// Methods that must not carry a body.
    #[must_use]
    pub const fn forbids_body(&self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Patch => Self::PATCH,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// Returns `true` if `target` is an absolute URL rather than an entity set.
#[must_use]
pub fn is_opaque_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// A fully built request, ready to be handed to a transport.
///
/// Requests are built fresh for every call. `Clone` produces an independent
/// deep copy, so a transport decorator can modify its copy without touching
/// the caller's request.
#[derive(Clone, Debug)]
pub struct Request {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The absolute target URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// The serialized JSON body, if any.
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Creates a new builder.
    ///
    /// `base_url` is the company-scoped base URL (see
    /// [`ClientConfig::base_url`](crate::ClientConfig::base_url)); `target` is
    /// an entity set name or an opaque absolute URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bc_api::clients::{HttpMethod, Request};
    /// use bc_api::ODataQuery;
    ///
    /// let next_link = "https://api.example.com/v2.0/customers?$skiptoken=abc";
    /// let request = Request::builder("https://api.example.com/base", HttpMethod::Get, next_link)
    ///     .query(ODataQuery { top: 10, ..Default::default() })
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(request.url, next_link);
    /// ```
    #[must_use]
    pub fn builder(
        base_url: impl Into<String>,
        method: HttpMethod,
        target: impl Into<String>,
    ) -> RequestBuilder {
        RequestBuilder::new(base_url, method, target)
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Builder for constructing [`Request`] instances.
///
/// All validation runs in [`build`](Self::build), before any network call.
#[derive(Debug)]
pub struct RequestBuilder {
    base_url: String,
    method: HttpMethod,
    target: String,
    record_id: Option<Uuid>,
    query: Option<ODataQuery>,
    body: Option<Vec<u8>>,
    etag: Option<String>,
    use_live_replica: bool,
    max_page_size: u32,
    preferences: Vec<String>,
    extra_headers: Vec<(String, String)>,
    error: Option<InvalidRequestError>,
}

impl RequestBuilder {
    fn new(base_url: impl Into<String>, method: HttpMethod, target: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            method,
            target: target.into(),
            record_id: None,
            query: None,
            body: None,
            etag: None,
            use_live_replica: false,
            max_page_size: 0,
            preferences: Vec::new(),
            extra_headers: Vec::new(),
            error: None,
        }
    }

    /// Addresses a single record: `<entitySet>(<id>)`.
    #[must_use]
    pub const fn record_id(mut self, id: Uuid) -> Self {
        self.record_id = Some(id);
        self
    }

    /// Sets the OData query options. Ignored for opaque URLs.
    #[must_use]
    pub fn query(mut self, query: ODataQuery) -> Self {
        self.query = Some(query);
        self
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// A serialization failure is reported by [`build`](Self::build).
    #[must_use]
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.body = Some(bytes),
            Err(e) => {
                self.error.get_or_insert(InvalidRequestError::InvalidBody {
                    reason: e.to_string(),
                });
            }
        }
        self
    }

    /// Uses an explicit concurrency token instead of `If-Match: *`.
    ///
    /// An empty token is ignored.
    #[must_use]
    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        let etag = etag.into();
        self.etag = if etag.is_empty() { None } else { Some(etag) };
        self
    }

    /// Forces a GET to read from the primary store.
    #[must_use]
    pub const fn use_live_replica(mut self, live: bool) -> Self {
        self.use_live_replica = live;
        self
    }

    /// Requests a server-side page size. `0` keeps the server default.
    #[must_use]
    pub const fn max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }

    /// Adds an OData preference to the `Prefer` header.
    #[must_use]
    pub fn prefer(mut self, preference: impl Into<String>) -> Self {
        self.preferences.push(preference.into());
        self
    }

    /// Adds an extra header. Later headers with the same name override
    /// earlier ones, including the defaults.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Validates the options and builds the [`Request`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestError`] if:
    /// - the target is empty
    /// - a body is attached to GET or DELETE
    /// - `$filter` is set on a method other than GET
    /// - PATCH has neither a record id nor an opaque URL
    /// - the resulting URL does not parse
    /// - the body failed to serialize, or a header is invalid
    pub fn build(self) -> Result<Request, InvalidRequestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.verify()?;

        let url = if is_opaque_url(&self.target) {
            self.target.clone()
        } else {
            self.resource_url()
        };
        if reqwest::Url::parse(&url).is_err() {
            return Err(InvalidRequestError::InvalidUrl { url });
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON_NO_METADATA));

        if self.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        }

        if self.method == HttpMethod::Get && !self.use_live_replica {
            headers.insert(
                HeaderName::from_static(DATA_ACCESS_INTENT),
                HeaderValue::from_static(DATA_ACCESS_READ_ONLY),
            );
        }

        if self.method.requires_if_match() {
            let value = match &self.etag {
                Some(etag) => header_value(IF_MATCH.as_str(), etag)?,
                None => HeaderValue::from_static(IF_MATCH_ANY),
            };
            headers.insert(IF_MATCH, value);
        }

        let prefer = HeaderName::from_static(PREFER);
        if self.max_page_size > 0 {
            let value = format!("odata.maxpagesize={}", self.max_page_size);
            headers.append(prefer.clone(), header_value(PREFER, &value)?);
        }
        for preference in &self.preferences {
            headers.append(prefer.clone(), header_value(PREFER, preference)?);
        }

        for (name, value) in &self.extra_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| InvalidRequestError::InvalidHeader { name: name.clone() })?;
            headers.insert(header_name, header_value(name, value)?);
        }

        Ok(Request {
            method: self.method,
            url,
            headers,
            body: self.body,
        })
    }

    fn verify(&self) -> Result<(), InvalidRequestError> {
        if self.target.trim().is_empty() {
            return Err(InvalidRequestError::MissingEntitySet);
        }

        if self.body.is_some() && self.method.forbids_body() {
            return Err(InvalidRequestError::BodyNotAllowed {
                method: self.method.to_string(),
            });
        }

        let has_filter = self
            .query
            .as_ref()
            .is_some_and(|q| !q.filter.is_empty());
        if has_filter && self.method != HttpMethod::Get {
            return Err(InvalidRequestError::FilterNotAllowed {
                method: self.method.to_string(),
            });
        }

        if self.method == HttpMethod::Patch
            && self.record_id.is_none()
            && !is_opaque_url(&self.target)
        {
            return Err(InvalidRequestError::MissingRecordId);
        }

        Ok(())
    }

    fn resource_url(&self) -> String {
        let mut url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.target.trim_start_matches('/')
        );
        if let Some(id) = self.record_id {
            url.push('(');
            url.push_str(&id.hyphenated().to_string());
            url.push(')');
        }
        if let Some(query) = &self.query {
            let query_string = query.to_query_string();
            if !query_string.is_empty() {
                url.push('?');
                url.push_str(&query_string);
            }
        }
        url
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, InvalidRequestError> {
    HeaderValue::from_str(value).map_err(|_| InvalidRequestError::InvalidHeader {
        name: name.to_string(),
    })
}

// Verify Request is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Request>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://api.businesscentral.dynamics.com/v2.0/t/Production/api/v2.0/companies(c)";

    fn id() -> Uuid {
        Uuid::parse_str("5f6a7b8c-9d0e-4f1a-8b2c-3d4e5f6a7b8c").unwrap()
    }

    #[test]
    fn test_http_method_display() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert_eq!(reqwest::Method::from(HttpMethod::Delete), reqwest::Method::DELETE);
    }

    #[test]
    fn test_get_joins_entity_set_and_query() {
        let request = Request::builder(BASE, HttpMethod::Get, "customers")
            .query(ODataQuery {
                filter: "number eq '10000'".to_string(),
                top: 5,
                ..Default::default()
            })
            .build()
            .unwrap();

        assert_eq!(
            request.url,
            format!("{BASE}/customers?$filter=number%20eq%20%2710000%27&$top=5&$skip=0")
        );
    }

    #[test]
    fn test_record_id_is_appended_in_parentheses() {
        let request = Request::builder(BASE, HttpMethod::Get, "/customers")
            .record_id(id())
            .build()
            .unwrap();
        assert_eq!(
            request.url,
            format!("{BASE}/customers(5f6a7b8c-9d0e-4f1a-8b2c-3d4e5f6a7b8c)")
        );
    }

    #[test]
    fn test_empty_query_adds_no_question_mark() {
        let request = Request::builder(BASE, HttpMethod::Get, "items")
            .query(ODataQuery::default())
            .build()
            .unwrap();
        assert_eq!(request.url, format!("{BASE}/items"));
    }

    #[test]
    fn test_opaque_url_ignores_query_and_record_id() {
        let next = "https://api.businesscentral.dynamics.com/v2.0/x/items?aid=FIN&$skiptoken=%27abc%27";
        let request = Request::builder(BASE, HttpMethod::Get, next)
            .record_id(id())
            .query(ODataQuery {
                filter: "a eq 1".to_string(),
                top: 3,
                ..Default::default()
            })
            .build()
            .unwrap();
        assert_eq!(request.url, next);
    }

    #[test]
    fn test_get_headers() {
        let request = Request::builder(BASE, HttpMethod::Get, "items")
            .build()
            .unwrap();
        assert_eq!(request.header("accept"), Some(ACCEPT_JSON_NO_METADATA));
        assert_eq!(request.header(DATA_ACCESS_INTENT), Some("ReadOnly"));
        assert!(request.header("content-type").is_none());
        assert!(request.header("if-match").is_none());
    }

    #[test]
    fn test_live_replica_omits_read_intent() {
        let request = Request::builder(BASE, HttpMethod::Get, "items")
            .use_live_replica(true)
            .build()
            .unwrap();
        assert!(request.header(DATA_ACCESS_INTENT).is_none());
    }

    #[test]
    fn test_patch_headers_default_to_match_any() {
        let request = Request::builder(BASE, HttpMethod::Patch, "items")
            .record_id(id())
            .json(&json!({"displayName": "Desk"}))
            .build()
            .unwrap();
        assert_eq!(request.header("if-match"), Some("*"));
        assert_eq!(request.header("content-type"), Some(CONTENT_TYPE_JSON));
        assert!(request.header(DATA_ACCESS_INTENT).is_none());
        assert_eq!(request.body.as_deref(), Some(br#"{"displayName":"Desk"}"#.as_slice()));
    }

    #[test]
    fn test_explicit_etag_is_used_verbatim() {
        let request = Request::builder(BASE, HttpMethod::Delete, "items")
            .record_id(id())
            .etag("W/\"JzQ0O0VnQUFBQUo3\"")
            .build()
            .unwrap();
        assert_eq!(request.header("if-match"), Some("W/\"JzQ0O0VnQUFBQUo3\""));
    }

    #[test]
    fn test_post_has_no_if_match() {
        let request = Request::builder(BASE, HttpMethod::Post, "items")
            .json(&json!({}))
            .build()
            .unwrap();
        assert!(request.header("if-match").is_none());
    }

    #[test]
    fn test_prefer_header_is_additive() {
        let request = Request::builder(BASE, HttpMethod::Get, "items")
            .max_page_size(2)
            .prefer("odata.include-annotations=\"*\"")
            .build()
            .unwrap();
        let values: Vec<&str> = request
            .headers
            .get_all(PREFER)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(
            values,
            vec!["odata.maxpagesize=2", "odata.include-annotations=\"*\""]
        );
    }

    #[test]
    fn test_zero_page_size_sends_no_preference() {
        let request = Request::builder(BASE, HttpMethod::Get, "items")
            .max_page_size(0)
            .build()
            .unwrap();
        assert!(request.headers.get(PREFER).is_none());
    }

    #[test]
    fn test_rejects_empty_entity_set() {
        let result = Request::builder(BASE, HttpMethod::Get, "").build();
        assert!(matches!(result, Err(InvalidRequestError::MissingEntitySet)));
    }

    #[test]
    fn test_rejects_body_on_get_and_delete() {
        for method in [HttpMethod::Get, HttpMethod::Delete] {
            let result = Request::builder(BASE, method, "items")
                .record_id(id())
                .json(&json!({"a": 1}))
                .build();
            assert!(matches!(
                result,
                Err(InvalidRequestError::BodyNotAllowed { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_filter_on_non_get() {
        let result = Request::builder(BASE, HttpMethod::Post, "items")
            .query(ODataQuery {
                filter: "a eq 1".to_string(),
                ..Default::default()
            })
            .json(&json!({}))
            .build();
        assert!(matches!(
            result,
            Err(InvalidRequestError::FilterNotAllowed { method }) if method == "POST"
        ));
    }

    #[test]
    fn test_rejects_patch_without_record_id() {
        let result = Request::builder(BASE, HttpMethod::Patch, "items")
            .json(&json!({}))
            .build();
        assert!(matches!(result, Err(InvalidRequestError::MissingRecordId)));
    }

    #[test]
    fn test_rejects_invalid_header() {
        let result = Request::builder(BASE, HttpMethod::Get, "items")
            .header("bad header", "x")
            .build();
        assert!(matches!(
            result,
            Err(InvalidRequestError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_rejects_unparseable_opaque_url() {
        let result = Request::builder(BASE, HttpMethod::Get, "http://").build();
        assert!(matches!(
            result,
            Err(InvalidRequestError::InvalidUrl { url }) if url == "http://"
        ));
    }

    #[test]
    fn test_rejects_unparseable_base_url() {
        let result = Request::builder("not a url", HttpMethod::Get, "items").build();
        assert!(matches!(
            result,
            Err(InvalidRequestError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Request::builder(BASE, HttpMethod::Get, "items")
            .build()
            .unwrap();
        let mut copy = original.clone();
        copy.headers
            .insert("authorization", HeaderValue::from_static("Bearer x"));
        assert!(original.header("authorization").is_none());
    }
}
