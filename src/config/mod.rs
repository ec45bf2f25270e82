//! Configuration types for the Business Central API client.
//!
//! This module provides the configuration used to address a single
//! Business Central company through the OData REST API.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`ClientConfig`]: The endpoint and HTTP settings shared by every call
//! - [`ClientConfigBuilder`]: A builder for constructing [`ClientConfig`] instances
//! - [`TenantId`] and [`CompanyId`]: Validated GUID newtypes
//! - [`EnvironmentName`]: A validated environment name
//! - [`ApiRoute`]: The standard `v2.0` route or a custom `publisher/group/version` route
//! - [`RootUrl`]: The API root, overridable for testing
//!
//! # Example
//!
//! ```rust
//! use bc_api::{ApiRoute, ClientConfig, CompanyId, EnvironmentName, TenantId};
//!
//! let config = ClientConfig::builder()
//!     .tenant_id(TenantId::new("8a4e2f4c-1d2b-4c5a-9f7e-0b3c6d1e2f3a").unwrap())
//!     .environment(EnvironmentName::new("Production").unwrap())
//!     .company_id(CompanyId::new("2b1c9e3d-5f6a-4b7c-8d9e-0f1a2b3c4d5e").unwrap())
//!     .route(ApiRoute::standard())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     config.base_url(),
//!     "https://api.businesscentral.dynamics.com/v2.0/8a4e2f4c-1d2b-4c5a-9f7e-0b3c6d1e2f3a/Production/api/v2.0/companies(2b1c9e3d-5f6a-4b7c-8d9e-0f1a2b3c4d5e)"
//! );
//! ```

mod newtypes;

pub use newtypes::{ApiRoute, CompanyId, EnvironmentName, RootUrl, TenantId};

use crate::error::ConfigError;
use std::time::Duration;

/// Configuration for a Business Central API client.
///
/// This struct holds everything needed to render resource URLs and to
/// configure the underlying HTTP client.
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`, making it safe to share
/// across threads and async tasks.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    tenant_id: TenantId,
    environment: EnvironmentName,
    company_id: CompanyId,
    route: ApiRoute,
    root_url: RootUrl,
    timeout: Duration,
    user_agent_suffix: Option<String>,
}

impl ClientConfig {
    /// Default timeout applied to each HTTP round trip.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the tenant id.
    #[must_use]
    pub const fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the environment name.
    #[must_use]
    pub const fn environment(&self) -> &EnvironmentName {
        &self.environment
    }

    /// Returns the company id.
    #[must_use]
    pub const fn company_id(&self) -> &CompanyId {
        &self.company_id
    }

    /// Returns the API route.
    #[must_use]
    pub const fn route(&self) -> &ApiRoute {
        &self.route
    }

    /// Returns the API root URL.
    #[must_use]
    pub const fn root_url(&self) -> &RootUrl {
        &self.root_url
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the user agent suffix, if configured.
    #[must_use]
    pub fn user_agent_suffix(&self) -> Option<&str> {
        self.user_agent_suffix.as_deref()
    }

    /// Renders the company-scoped base URL every resource path is joined to.
    ///
    /// The shape is
    /// `<root>/v2.0/<tenant>/<environment>/api/<route>/companies(<companyId>)`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!(
            "{}/v2.0/{}/{}/api/{}/companies({})",
            self.root_url.as_ref(),
            self.tenant_id,
            self.environment.as_ref(),
            self.route.as_ref(),
            self.company_id
        )
    }
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
///
/// Required fields are `tenant_id`, `environment`, `company_id` and `route`.
///
/// # Defaults
///
/// - `root_url`: `https://api.businesscentral.dynamics.com`
/// - `timeout`: 20 seconds
/// - `user_agent_suffix`: `None`
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    tenant_id: Option<TenantId>,
    environment: Option<EnvironmentName>,
    company_id: Option<CompanyId>,
    route: Option<ApiRoute>,
    root_url: Option<RootUrl>,
    timeout: Option<Duration>,
    user_agent_suffix: Option<String>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tenant id (required).
    #[must_use]
    pub const fn tenant_id(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Sets the environment name (required).
    #[must_use]
    pub fn environment(mut self, environment: EnvironmentName) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Sets the company id (required).
    #[must_use]
    pub const fn company_id(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    /// Sets the API route (required).
    #[must_use]
    pub fn route(mut self, route: ApiRoute) -> Self {
        self.route = Some(route);
        self
    }

    /// Overrides the API root URL.
    #[must_use]
    pub fn root_url(mut self, root_url: RootUrl) -> Self {
        self.root_url = Some(root_url);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Appends a suffix to the `User-Agent` header, e.g. `my-app/1.2`.
    #[must_use]
    pub fn user_agent_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.user_agent_suffix = Some(suffix.into());
        self
    }

    /// Builds the [`ClientConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if any required field
    /// is not set.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let tenant_id = self
            .tenant_id
            .ok_or(ConfigError::MissingRequiredField { field: "tenant_id" })?;
        let environment = self
            .environment
            .ok_or(ConfigError::MissingRequiredField {
                field: "environment",
            })?;
        let company_id = self
            .company_id
            .ok_or(ConfigError::MissingRequiredField {
                field: "company_id",
            })?;
        let route = self
            .route
            .ok_or(ConfigError::MissingRequiredField { field: "route" })?;

        Ok(ClientConfig {
            tenant_id,
            environment,
            company_id,
            route,
            root_url: self.root_url.unwrap_or_default(),
            timeout: self.timeout.unwrap_or(ClientConfig::DEFAULT_TIMEOUT),
            user_agent_suffix: self.user_agent_suffix.filter(|s| !s.trim().is_empty()),
        })
    }
}
