//! OAuth 2.0 client credentials grant against Microsoft Entra ID.
//!
//! Business Central service-to-service integrations authenticate as an
//! Entra application registration. [`ClientSecretCredential`] posts the
//! application's id and secret to the tenant's token endpoint and caches the
//! returned access token in memory until shortly before it expires.
//!
//! # Example
//!
//! ```rust,ignore
//! use bc_api::auth::ClientSecretCredential;
//! use bc_api::TenantId;
//!
//! let credential = ClientSecretCredential::builder()
//!     .tenant_id(TenantId::new("8a4e2f4c-1d2b-4c5a-9f7e-0b3c6d1e2f3a")?)
//!     .client_id("5d2f7a1e-3c4b-4e6f-8a9b-1c2d3e4f5a6b")
//!     .client_secret(std::env::var("BC_CLIENT_SECRET")?)
//!     .build()?;
//! ```

use super::{AccessToken, AuthError, TokenProvider};
use crate::config::TenantId;
use crate::error::ConfigError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration as StdDuration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Default Entra authority host.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoft.com";

/// Default scope granting access to the Business Central API.
pub const DEFAULT_SCOPE: &str = "https://api.businesscentral.dynamics.com/.default";

const CLIENT_CREDENTIALS_GRANT_TYPE: &str = "client_credentials";

/// Default bound on a single token request.
pub const DEFAULT_TOKEN_TIMEOUT: StdDuration = StdDuration::from_secs(20);

/// Tokens are refreshed this long before their reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Clone)]
struct CachedToken {
    token: AccessToken,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// A [`TokenProvider`] using the OAuth 2.0 client credentials grant.
///
/// The token endpoint is `<authority>/<tenant>/oauth2/v2.0/token`. Concurrent
/// callers share a single in-flight refresh, which is bounded by the
/// credential's timeout so a hung endpoint cannot hold the cache lock
/// indefinitely.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    timeout: StdDuration,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cache: Mutex<Option<CachedToken>>,
}

impl ClientSecretCredential {
    /// Creates a new builder for constructing a `ClientSecretCredential`.
    #[must_use]
    pub fn builder() -> ClientSecretCredentialBuilder {
        ClientSecretCredentialBuilder::default()
    }

    /// Returns the token endpoint this credential posts to.
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Returns the bound on a single token request.
    #[must_use]
    pub const fn timeout(&self) -> StdDuration {
        self.timeout
    }

    fn network_error(&self, error: reqwest::Error) -> AuthError {
        if error.is_timeout() {
            AuthError::Timeout {
                after: self.timeout,
            }
        } else {
            AuthError::Network(error)
        }
    }

    async fn request_token(&self) -> Result<CachedToken, AuthError> {
        let body = TokenRequest {
            grant_type: CLIENT_CREDENTIALS_GRANT_TYPE,
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            scope: &self.scope,
        };

        tracing::debug!(token_url = %self.token_url, "requesting access token");

        let requested_at = Utc::now();
        let response = self
            .http
            .post(&self.token_url)
            .form(&body)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.network_error(e))?;

        if !status.is_success() {
            let (error, description) =
                match serde_json::from_slice::<TokenErrorResponse>(&bytes) {
                    Ok(parsed) => (parsed.error, parsed.error_description),
                    Err(_) => (String::from_utf8_lossy(&bytes).into_owned(), None),
                };
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                error,
                description,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidResponse {
                reason: e.to_string(),
            })?;
        if parsed.access_token.is_empty() {
            return Err(AuthError::InvalidResponse {
                reason: "access_token is empty".to_string(),
            });
        }

        Ok(CachedToken {
            token: AccessToken::new(parsed.access_token),
            expires_at: requested_at + Duration::seconds(parsed.expires_in.max(0)),
        })
    }
}

#[async_trait]
impl TokenProvider for ClientSecretCredential {
    async fn token(&self, cancel: &CancellationToken) -> Result<AccessToken, AuthError> {
        let mut cache = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AuthError::Cancelled),
            guard = self.cache.lock() => guard,
        };

        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh(Utc::now())) {
            return Ok(cached.token.clone());
        }

        let fresh = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AuthError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.request_token()) => {
                result.map_err(|_| AuthError::Timeout { after: self.timeout })??
            }
        };
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("token_url", &self.token_url)
            .field("timeout", &self.timeout)
            .field("client_id", &self.client_id)
            .field("client_secret", &"*****")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ClientSecretCredential`].
///
/// Required fields are `tenant_id`, `client_id` and `client_secret`.
///
/// # Defaults
///
/// - `authority`: `https://login.microsoft.com`
/// - `scope`: `https://api.businesscentral.dynamics.com/.default`
/// - `timeout`: 20 seconds per token request
#[derive(Default)]
pub struct ClientSecretCredentialBuilder {
    tenant_id: Option<TenantId>,
    client_id: Option<String>,
    client_secret: Option<String>,
    authority: Option<String>,
    scope: Option<String>,
    timeout: Option<StdDuration>,
    http: Option<reqwest::Client>,
}

impl ClientSecretCredentialBuilder {
    /// Sets the directory tenant (required).
    #[must_use]
    pub const fn tenant_id(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Sets the application (client) id (required, must be a GUID).
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the client secret (required).
    #[must_use]
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Overrides the authority host.
    #[must_use]
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// Overrides the requested scope.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Bounds each token request, including reading the response body.
    #[must_use]
    pub const fn timeout(mut self, timeout: StdDuration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses an existing reqwest client for token requests.
    ///
    /// The credential's timeout still applies on top of the client's own.
    #[must_use]
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Builds the credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] for unset fields,
    /// [`ConfigError::InvalidGuid`] if the client id is not a GUID, and
    /// [`ConfigError::EmptyClientSecret`] for a blank secret, and
    /// [`ConfigError::HttpClient`] if the default HTTP client cannot be
    /// created.
    pub fn build(self) -> Result<ClientSecretCredential, ConfigError> {
        let tenant_id = self
            .tenant_id
            .ok_or(ConfigError::MissingRequiredField { field: "tenant_id" })?;
        let client_id = self
            .client_id
            .ok_or(ConfigError::MissingRequiredField { field: "client_id" })?;
        let client_id = Uuid::parse_str(client_id.trim())
            .map_err(|_| ConfigError::InvalidGuid {
                field: "client_id",
                value: client_id.clone(),
            })?
            .hyphenated()
            .to_string();
        let client_secret = self.client_secret.ok_or(ConfigError::MissingRequiredField {
            field: "client_secret",
        })?;
        if client_secret.trim().is_empty() {
            return Err(ConfigError::EmptyClientSecret);
        }

        let authority = self
            .authority
            .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string());
        let token_url = format!(
            "{}/{tenant_id}/oauth2/v2.0/token",
            authority.trim_end_matches('/')
        );

        let timeout = self.timeout.unwrap_or(DEFAULT_TOKEN_TIMEOUT);
        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| ConfigError::HttpClient {
                    reason: e.to_string(),
                })?,
        };

        Ok(ClientSecretCredential {
            http,
            timeout,
            token_url,
            client_id,
            client_secret,
            scope: self.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            cache: Mutex::new(None),
        })
    }
}

impl fmt::Debug for ClientSecretCredentialBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredentialBuilder")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("authority", &self.authority)
            .field("scope", &self.scope)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// Verify ClientSecretCredential is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientSecretCredential>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TENANT: &str = "8a4e2f4c-1d2b-4c5a-9f7e-0b3c6d1e2f3a";
    const CLIENT: &str = "5d2f7a1e-3c4b-4e6f-8a9b-1c2d3e4f5a6b";

    fn credential(authority: &str) -> ClientSecretCredential {
        ClientSecretCredential::builder()
            .tenant_id(TenantId::new(TENANT).unwrap())
            .client_id(CLIENT)
            .client_secret("s3cret")
            .authority(authority)
            .build()
            .unwrap()
    }

    fn token_path() -> String {
        format!("/{TENANT}/oauth2/v2.0/token")
    }

    #[test]
    fn test_build_renders_token_url() {
        let credential = credential("https://login.example.com/");
        assert_eq!(
            credential.token_url(),
            format!("https://login.example.com/{TENANT}/oauth2/v2.0/token")
        );
    }

    #[test]
    fn test_build_rejects_invalid_client_id() {
        let result = ClientSecretCredential::builder()
            .tenant_id(TenantId::new(TENANT).unwrap())
            .client_id("my-app")
            .client_secret("s3cret")
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidGuid {
                field: "client_id",
                ..
            })
        ));
    }

    #[test]
    fn test_build_rejects_blank_secret() {
        let result = ClientSecretCredential::builder()
            .tenant_id(TenantId::new(TENANT).unwrap())
            .client_id(CLIENT)
            .client_secret("  ")
            .build();
        assert!(matches!(result, Err(ConfigError::EmptyClientSecret)));
    }

    #[test]
    fn test_debug_masks_secret() {
        let output = format!("{:?}", credential("https://login.example.com"));
        assert!(!output.contains("s3cret"));
        assert!(output.contains("*****"));
    }

    #[tokio::test]
    async fn test_token_is_fetched_once_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(token_path()))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains(
                "scope=https%3A%2F%2Fapi.businesscentral.dynamics.com%2F.default",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "access_token": "token-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = credential(&server.uri());
        let cancel = CancellationToken::new();
        let first = credential.token(&cancel).await.unwrap();
        let second = credential.token(&cancel).await.unwrap();

        assert_eq!(first.secret(), "token-1");
        assert_eq!(second.secret(), "token-1");
    }

    #[tokio::test]
    async fn test_token_near_expiry_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(token_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "expires_in": 30,
                "access_token": "short-lived"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let credential = credential(&server.uri());
        let cancel = CancellationToken::new();
        credential.token(&cancel).await.unwrap();
        credential.token(&cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_token_endpoint_error_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(token_path()))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .mount(&server)
            .await;

        let result = credential(&server.uri())
            .token(&CancellationToken::new())
            .await;

        match result {
            Err(AuthError::TokenEndpoint {
                status,
                error,
                description,
            }) => {
                assert_eq!(status, 401);
                assert_eq!(error, "invalid_client");
                assert!(description.unwrap().starts_with("AADSTS7000215"));
            }
            other => panic!("expected TokenEndpoint error, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout_defaults_and_overrides() {
        assert_eq!(
            credential("https://login.example.com").timeout(),
            DEFAULT_TOKEN_TIMEOUT
        );
        let credential = ClientSecretCredential::builder()
            .tenant_id(TenantId::new(TENANT).unwrap())
            .client_id(CLIENT)
            .client_secret("s3cret")
            .timeout(StdDuration::from_millis(300))
            .build()
            .unwrap();
        assert_eq!(credential.timeout(), StdDuration::from_millis(300));
    }

    #[tokio::test]
    async fn test_hung_token_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(token_path()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(StdDuration::from_secs(4))
                    .set_body_json(serde_json::json!({
                        "expires_in": 3599,
                        "access_token": "late"
                    })),
            )
            .mount(&server)
            .await;

        let credential = ClientSecretCredential::builder()
            .tenant_id(TenantId::new(TENANT).unwrap())
            .client_id(CLIENT)
            .client_secret("s3cret")
            .authority(server.uri())
            .timeout(StdDuration::from_millis(300))
            .build()
            .unwrap();

        let started = std::time::Instant::now();
        let result = credential.token(&CancellationToken::new()).await;

        assert!(matches!(result, Err(AuthError::Timeout { .. })));
        assert!(started.elapsed() < StdDuration::from_secs(2));
    }

    #[tokio::test]
    async fn test_timeout_applies_to_custom_http_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(StdDuration::from_secs(4)))
            .mount(&server)
            .await;

        let credential = ClientSecretCredential::builder()
            .tenant_id(TenantId::new(TENANT).unwrap())
            .client_id(CLIENT)
            .client_secret("s3cret")
            .authority(server.uri())
            .http_client(reqwest::Client::new())
            .timeout(StdDuration::from_millis(300))
            .build()
            .unwrap();

        let result = credential.token(&CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(AuthError::Timeout { after }) if after == StdDuration::from_millis(300)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = credential(&server.uri()).token(&cancel).await;
        assert!(matches!(result, Err(AuthError::Cancelled)));
    }
}
