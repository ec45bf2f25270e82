//! # Business Central API Rust SDK
//!
//! A typed client for the Microsoft Dynamics 365 Business Central OData REST
//! API, providing validated configuration, bearer-token authentication and
//! typed CRUD access to API pages.
//!
//! ## Overview
//!
//! This SDK provides:
//! - Type-safe configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - Validated newtypes for tenant, environment, company and API route
//! - Pluggable token acquisition via [`auth::TokenProvider`], with an Entra ID
//!   client credentials implementation in [`auth::ClientSecretCredential`]
//! - A request pipeline that applies the service's header conventions
//! - Error classification that extracts the service correlation id
//! - [`ResourcePage<T>`] for get, list, create, update and delete
//! - Lazy auto-pagination over `@odata.nextLink` via [`Pages<T>`]
//!
//! ## Quick Start
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
//! assert!(config.base_url().ends_with(
//!     "/v2.0/8a4e2f4c-1d2b-4c5a-9f7e-0b3c6d1e2f3a/Production/api/v2.0/companies(2b1c9e3d-5f6a-4b7c-8d9e-0f1a2b3c4d5e)"
//! ));
//! ```
//!
//! ## Authentication
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bc_api::Client;
//! use bc_api::auth::ClientSecretCredential;
//!
//! let credential = ClientSecretCredential::builder()
//!     .tenant_id(*config.tenant_id())
//!     .client_id("3f2b1a0c-9d8e-4f7a-8b6c-5d4e3f2a1b0c")
//!     .client_secret(std::env::var("BC_CLIENT_SECRET")?)
//!     .build()?;
//!
//! let client = Client::new(config, Arc::new(credential))?;
//! ```
//!
//! ## Working With Records
//!
//! ```rust,ignore
//! use bc_api::{GetOptions, ListOptions, ResourcePage, Validate, ValidationError};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Item {
//!     id: uuid::Uuid,
//!     number: String,
//!     unit_price: f64,
//! }
//!
//! impl Validate for Item {
//!     fn validate(&self) -> Result<(), ValidationError> {
//!         if self.unit_price < 0.0 {
//!             return Err(ValidationError::field("unitPrice", "must not be negative"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let items = ResourcePage::<Item>::new(&client, "items")?;
//! let item = items.get(id, &GetOptions::default()).await?;
//! let all = items.list_all(ListOptions::default()).await?;
//! ```
//!
//! ## Errors
//!
//! Every operation returns [`Error`]. Use [`Error::kind`] to branch on the
//! failure category and [`Error::api_error`] to read the service's code,
//! message and correlation id.
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: All newtypes validate on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Designed for use with Tokio async runtime
//! - **Cancellable**: Every network call observes a `CancellationToken`

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod rest;

// Re-export public types at crate root for convenience
pub use config::{
    ApiRoute, ClientConfig, ClientConfigBuilder, CompanyId, EnvironmentName, RootUrl, TenantId,
};
pub use error::ConfigError;

// Re-export HTTP client types
pub use clients::{
    ApiError, Client, Error, ErrorKind, HttpMethod, InvalidRequestError, Request, RequestBuilder,
    Response, TransportError, Validate, ValidationError,
};

// Re-export resource types
pub use rest::{
    DeleteOptions, GetOptions, ListOptions, ODataQuery, Pages, ResourceDefaults, ResourcePage,
    WriteOptions,
};
