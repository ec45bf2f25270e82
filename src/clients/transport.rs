//! Transports: the seam between the request pipeline and the network.
//!
//! - [`Transport`]: sends one [`Request`] and returns the fully read
//!   [`RawResponse`]
//! - [`ReqwestTransport`]: the default network transport
//! - [`AuthTransport`]: decorates another transport with the bearer token
//!   and the client's `User-Agent`
//!
//! `AuthTransport` never touches the caller's request. It adds its headers
//! to a copy, so a retry layer above it can resend the original.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, USER_AGENT};
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthError, TokenProvider};
use crate::clients::errors::{Error, InvalidRequestError, TransportError};
use crate::clients::http_request::Request;
use crate::clients::http_response::RawResponse;
use crate::error::ConfigError;

/// Product token sent in every `User-Agent` header.
pub const USER_AGENT_PRODUCT: &str = concat!("bc-api-rust/", env!("CARGO_PKG_VERSION"));

/// Sends requests over the network.
///
/// Implementations must read the whole body before returning and must stop
/// promptly with [`TransportError::Cancelled`] when `cancel` fires.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the raw response for any status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] for network failures, timeouts and
    /// cancellation. Decorators may return other categories.
    async fn send(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, Error>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, Error> {
        (**self).send(request, cancel).await
    }
}

/// The default transport, backed by a [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing reqwest client, keeping its timeout and proxy
    /// settings.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn exchange(&self, request: &Request) -> Result<RawResponse, Error> {
        let url = reqwest::Url::parse(&request.url).map_err(|_| InvalidRequestError::InvalidUrl {
            url: request.url.clone(),
        })?;

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(TransportError::from)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(TransportError::from)?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, Error> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TransportError::Cancelled.into()),
            result = self.exchange(request) => result,
        }
    }
}

/// Adds `Authorization` and `User-Agent` to every request, then delegates.
///
/// A token failure aborts the call with [`Error::Auth`] before the inner
/// transport is invoked.
pub struct AuthTransport<T> {
    inner: T,
    tokens: Arc<dyn TokenProvider>,
    user_agent: HeaderValue,
}

impl<T: Transport> AuthTransport<T> {
    /// Wraps `inner`. The `User-Agent` is `bc-api-rust/<version>`, followed
    /// by `suffix` when given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUserAgent`] if the suffix is not a valid
    /// header value.
    pub fn new(
        inner: T,
        tokens: Arc<dyn TokenProvider>,
        suffix: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let user_agent = user_agent(suffix);
        let user_agent = HeaderValue::from_str(&user_agent)
            .map_err(|_| ConfigError::InvalidUserAgent { value: user_agent })?;
        Ok(Self {
            inner,
            tokens,
            user_agent,
        })
    }

    /// Returns the wrapped transport.
    pub const fn inner(&self) -> &T {
        &self.inner
    }
}

/// Renders the `User-Agent` value for an optional suffix.
#[must_use]
pub fn user_agent(suffix: Option<&str>) -> String {
    match suffix.map(str::trim).filter(|s| !s.is_empty()) {
        Some(suffix) => format!("{USER_AGENT_PRODUCT} {suffix}"),
        None => USER_AGENT_PRODUCT.to_string(),
    }
}

#[async_trait]
impl<T: Transport> Transport for AuthTransport<T> {
    async fn send(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, Error> {
        let token = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransportError::Cancelled.into()),
            result = self.tokens.token(cancel) => match result {
                Ok(token) => token,
                Err(AuthError::Cancelled) => return Err(TransportError::Cancelled.into()),
                Err(e) => return Err(Error::Auth(e)),
            },
        };

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.secret())).map_err(|_| {
            Error::Auth(AuthError::InvalidResponse {
                reason: "access token is not a valid header value".to_string(),
            })
        })?;
        bearer.set_sensitive(true);

        let mut authorized = request.clone();
        authorized.headers.insert(AUTHORIZATION, bearer);
        authorized.headers.insert(USER_AGENT, self.user_agent.clone());

        self.inner.send(&authorized, cancel).await
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for AuthTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTransport")
            .field("inner", &self.inner)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, StaticTokenProvider};
    use crate::clients::http_request::HttpMethod;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Spy {
        seen: Mutex<Vec<Request>>,
    }

    #[async_trait]
    impl Transport for Spy {
        async fn send(
            &self,
            request: &Request,
            _cancel: &CancellationToken,
        ) -> Result<RawResponse, Error> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(RawResponse {
                status: 204,
                ..Default::default()
            })
        }
    }

    struct FailingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for FailingProvider {
        async fn token(&self, _cancel: &CancellationToken) -> Result<AccessToken, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AuthError::provider("credential expired"))
        }
    }

    fn request() -> Request {
        Request::builder("https://example.com/base", HttpMethod::Get, "items")
            .build()
            .unwrap()
    }

    #[test]
    fn test_user_agent_with_and_without_suffix() {
        assert_eq!(user_agent(None), USER_AGENT_PRODUCT);
        assert_eq!(user_agent(Some("  ")), USER_AGENT_PRODUCT);
        assert_eq!(
            user_agent(Some("sync-job/2.1")),
            format!("{USER_AGENT_PRODUCT} sync-job/2.1")
        );
        assert!(USER_AGENT_PRODUCT.starts_with("bc-api-rust/"));
    }

    #[tokio::test]
    async fn test_auth_transport_sets_headers_on_copy() {
        let spy = Arc::new(Spy::default());
        let transport = AuthTransport::new(
            Arc::clone(&spy),
            Arc::new(StaticTokenProvider::new("tok")),
            Some("tests"),
        )
        .unwrap();

        let original = request();
        transport
            .send(&original, &CancellationToken::new())
            .await
            .unwrap();

        assert!(original.header("authorization").is_none());
        assert!(original.header("user-agent").is_none());

        let seen = spy.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].header("authorization"), Some("Bearer tok"));
        assert_eq!(
            seen[0].header("user-agent"),
            Some(format!("{USER_AGENT_PRODUCT} tests").as_str())
        );
        assert_eq!(seen[0].url, original.url);
    }

    #[tokio::test]
    async fn test_token_failure_never_reaches_inner_transport() {
        let spy = Arc::new(Spy::default());
        let provider = Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
        });
        let transport = AuthTransport::new(Arc::clone(&spy), provider.clone(), None).unwrap();

        let result = transport.send(&request(), &CancellationToken::new()).await;

        assert!(matches!(result, Err(Error::Auth(AuthError::Provider(_)))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(spy.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_surfaces_as_transport_cancellation() {
        let spy = Arc::new(Spy::default());
        let transport = AuthTransport::new(
            Arc::clone(&spy),
            Arc::new(StaticTokenProvider::new("tok")),
            None,
        )
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = transport.send(&request(), &cancel).await.unwrap_err();

        assert!(matches!(error, Error::Transport(TransportError::Cancelled)));
        assert!(error.is_cancelled());
        assert!(spy.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_suffix_is_rejected() {
        let result = AuthTransport::new(
            Spy::default(),
            Arc::new(StaticTokenProvider::new("tok")),
            Some("bad\nsuffix"),
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidUserAgent { .. })
        ));
    }

    #[tokio::test]
    async fn test_reqwest_transport_rejects_unparseable_url() {
        let transport = ReqwestTransport::new(Duration::from_secs(1)).unwrap();
        let mut bad = request();
        bad.url = "http://".to_string();
        let result = transport.send(&bad, &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(Error::InvalidRequest(InvalidRequestError::InvalidUrl { .. }))
        ));
    }
}
