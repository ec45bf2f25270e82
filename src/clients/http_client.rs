//! The shared client handle for Business Central API communication.
//!
//! This module provides the [`Client`] type. A client binds one
//! [`ClientConfig`] (tenant, environment, company and route) to a transport
//! stack, and is shared read-only by every [`ResourcePage`](crate::ResourcePage)
//! built on it.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::TokenProvider;
use crate::clients::errors::Error;
use crate::clients::http_request::{HttpMethod, Request, RequestBuilder};
use crate::clients::http_response::Response;
use crate::clients::transport::{AuthTransport, ReqwestTransport, Transport};
use crate::config::ClientConfig;
use crate::error::ConfigError;

/// Crate version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A cheaply cloneable handle to a configured Business Central client.
///
/// The client handles:
/// - Rendering the company-scoped base URL once
/// - Attaching the bearer token and `User-Agent` to every request
/// - Executing requests and capturing the response envelope
///
/// # Thread Safety
///
/// `Client` is `Send + Sync`; clones share the same configuration and
/// transport.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use bc_api::{Client, ClientConfig, HttpMethod};
/// use bc_api::auth::StaticTokenProvider;
/// use tokio_util::sync::CancellationToken;
///
/// let client = Client::new(config, Arc::new(StaticTokenProvider::new(token)))?;
///
/// let request = client.new_request(HttpMethod::Get, "companies").build()?;
/// let response = client.execute(&request, &CancellationToken::new()).await?;
/// println!("{} {:?}", response.status(), response.request_id());
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    base_url: String,
    transport: Box<dyn Transport>,
}

// Verify Client is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Client>();
};

impl Client {
    /// Creates a client that sends requests over the network with reqwest.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be created or the
    /// configured user agent suffix is invalid.
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Self::with_transport(config, tokens, transport)
    }

    /// Creates a client on top of a custom underlying transport.
    ///
    /// The transport is still wrapped in an [`AuthTransport`], so it receives
    /// requests that already carry `Authorization` and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUserAgent`] if the configured user agent
    /// suffix is invalid.
    pub fn with_transport<T>(
        config: ClientConfig,
        tokens: Arc<dyn TokenProvider>,
        transport: T,
    ) -> Result<Self, ConfigError>
    where
        T: Transport + 'static,
    {
        let transport = AuthTransport::new(transport, tokens, config.user_agent_suffix())?;
        let base_url = config.base_url();
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                base_url,
                transport: Box::new(transport),
            }),
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the company-scoped base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Starts building a request against this client's base URL.
    ///
    /// `path` is an entity set name or an opaque absolute URL such as an
    /// `@odata.nextLink`.
    #[must_use]
    pub fn new_request(&self, method: HttpMethod, path: impl Into<String>) -> RequestBuilder {
        Request::builder(self.inner.base_url.clone(), method, path)
    }

    /// Sends a request and returns the response envelope for any status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if no token could be obtained and
    /// [`Error::Transport`] for network failures, timeouts and cancellation.
    pub async fn execute(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Response, Error> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let raw = self.inner.transport.send(request, cancel).await?;
        let response = Response::from(raw);
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status(),
            request_id = ?response.request_id(),
            "received response"
        );
        Ok(response)
    }

    /// Builds and executes a request in one step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the request fails validation,
    /// otherwise the errors of [`execute`](Self::execute).
    pub async fn do_request(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<Response, Error> {
        let request = request.build()?;
        self.execute(&request, cancel).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}
