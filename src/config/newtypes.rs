//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around the identifiers that make
//! up a Business Central endpoint. Each wrapper validates its contents on
//! construction, so an invalid tenant or route is rejected before any URL is
//! rendered.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

fn parse_guid(field: &'static str, value: &str) -> Result<Uuid, ConfigError> {
    let trimmed = value.trim();
    // Uuid::parse_str also accepts the simple and urn forms; only the
    // hyphenated 36-character form is a valid path segment here.
    if trimmed.len() != 36 {
        return Err(ConfigError::InvalidGuid {
            field,
            value: value.to_string(),
        });
    }
    Uuid::parse_str(trimmed).map_err(|_| ConfigError::InvalidGuid {
        field,
        value: value.to_string(),
    })
}

/// A validated Microsoft Entra tenant identifier.
///
/// # Example
///
/// ```rust
/// use bc_api::TenantId;
///
/// let tenant = TenantId::new("8a4e2f4c-1d2b-4c5a-9f7e-0b3c6d1e2f3a").unwrap();
/// assert_eq!(tenant.to_string(), "8a4e2f4c-1d2b-4c5a-9f7e-0b3c6d1e2f3a");
///
/// assert!(TenantId::new("contoso").is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Creates a new validated tenant id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGuid`] if the value is not a GUID.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ConfigError> {
        parse_guid("tenant_id", value.as_ref()).map(Self)
    }

    /// Returns the underlying GUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for TenantId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// A validated Business Central company identifier.
///
/// The company id appears in every resource URL as `companies(<id>)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompanyId(Uuid);

impl CompanyId {
    /// Creates a new validated company id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGuid`] if the value is not a GUID.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ConfigError> {
        parse_guid("company_id", value.as_ref()).map(Self)
    }

    /// Returns the underlying GUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for CompanyId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// A validated environment name such as `Production` or `Sandbox`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Creates a new validated environment name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyEnvironment`] if the name is empty or
    /// whitespace only.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyEnvironment);
        }
        Ok(Self(name.to_string()))
    }
}

impl AsRef<str> for EnvironmentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The API route segment of a Business Central URL.
///
/// Either the standard route `v2.0`, or a custom API route made of exactly
/// three segments `publisher/group/version`.
///
/// # Serialization
///
/// `ApiRoute` serializes to and deserializes from its path form, so it can be
/// read straight out of a configuration file:
///
/// ```rust
/// use bc_api::ApiRoute;
///
/// let route: ApiRoute = serde_json::from_str(r#""contoso/sales/v1.0""#).unwrap();
/// assert_eq!(route.as_ref(), "contoso/sales/v1.0");
/// assert!(!route.is_standard());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRoute(String);

impl ApiRoute {
    /// The standard v2.0 API route.
    pub const STANDARD: &'static str = "v2.0";

    /// Creates a new validated API route.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRoute`] if the route is neither `v2.0`
    /// nor three non-empty slash-separated segments.
    pub fn new(route: impl Into<String>) -> Result<Self, ConfigError> {
        let route = route.into();
        let route = route.trim().trim_matches('/').to_string();

        if route == Self::STANDARD {
            return Ok(Self(route));
        }

        let segments: Vec<&str> = route.split('/').collect();
        let valid = segments.len() == 3
            && segments
                .iter()
                .all(|s| !s.is_empty() && !s.contains(char::is_whitespace));
        if !valid {
            return Err(ConfigError::InvalidRoute { route });
        }

        Ok(Self(route))
    }

    /// Returns the standard `v2.0` route.
    #[must_use]
    pub fn standard() -> Self {
        Self(Self::STANDARD.to_string())
    }

    /// Returns `true` for the standard `v2.0` route.
    #[must_use]
    pub fn is_standard(&self) -> bool {
        self.0 == Self::STANDARD
    }
}

impl Default for ApiRoute {
    fn default() -> Self {
        Self::standard()
    }
}

impl AsRef<str> for ApiRoute {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ApiRoute {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ApiRoute {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}

/// A validated API root URL.
///
/// Defaults to `https://api.businesscentral.dynamics.com`; tests point it at
/// a local mock server instead. Trailing slashes are trimmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootUrl(String);

impl RootUrl {
    /// The public Business Central API root.
    pub const DEFAULT: &'static str = "https://api.businesscentral.dynamics.com";

    /// Creates a new validated root URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRootUrl`] if the URL has no `http` or
    /// `https` scheme or no host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let url = url.trim().trim_end_matches('/').to_string();

        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| ConfigError::InvalidRootUrl { url: url.clone() })?;

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || host.starts_with(':') {
            return Err(ConfigError::InvalidRootUrl { url });
        }

        Ok(Self(url))
    }
}

impl Default for RootUrl {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl AsRef<str> for RootUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
