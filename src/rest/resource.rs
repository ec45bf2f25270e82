//! Typed CRUD access to a Business Central API page.
//!
//! A [`ResourcePage<T>`] addresses one entity set (e.g. `customers`) on a
//! shared [`Client`] and decodes records into `T`. It owns the resource-level
//! [`ResourceDefaults`], which are merged into every call and never mutated
//! by one.
//!
//! # Expand after writes
//!
//! The service never inlines expanded sub-resources in a PATCH or POST
//! response. When a write asks for any expand (resource default or per
//! call), the record is re-read with a GET against the primary store right
//! after the write, so the caller receives the expanded data.
//!
//! # Example
//!
//! ```rust,ignore
//! use bc_api::{GetOptions, ListOptions, ResourcePage, Validate};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Customer {
//!     id: uuid::Uuid,
//!     number: String,
//!     display_name: String,
//! }
//!
//! impl Validate for Customer {}
//!
//! let customers = ResourcePage::<Customer>::new(&client, "customers")?
//!     .with_default_filter("blocked eq ' '");
//!
//! let one = customers.get(id, &GetOptions::default()).await?;
//! let all = customers.list_all(ListOptions::default()).await?;
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::clients::{Client, Error, HttpMethod, Validate};
use crate::error::ConfigError;
use crate::rest::pagination::Pages;
use crate::rest::query::{
    build, merge_expand, merge_select, ListOptions, ODataQuery, ResourceDefaults,
};

/// Options for [`ResourcePage::get`].
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    /// Expand targets, appended after the resource default.
    pub expand: Vec<String>,
    /// Properties to return. Empty uses the resource default.
    pub select: Vec<String>,
    /// Read from the primary store instead of a read-only replica.
    pub use_live_replica: bool,
    /// Cancels the call when fired.
    pub cancel: Option<CancellationToken>,
}

/// Options for [`ResourcePage::create`] and [`ResourcePage::update`].
#[derive(Clone, Debug, Default)]
pub struct WriteOptions {
    /// Expand targets for the returned record.
    pub expand: Vec<String>,
    /// Concurrency token for updates. `None` sends `If-Match: *`.
    /// Ignored by `create`.
    pub etag: Option<String>,
    /// Cancels the call when fired.
    pub cancel: Option<CancellationToken>,
}

/// Options for [`ResourcePage::delete`].
#[derive(Clone, Debug, Default)]
pub struct DeleteOptions {
    /// Concurrency token. `None` sends `If-Match: *`.
    pub etag: Option<String>,
    /// Cancels the call when fired.
    pub cancel: Option<CancellationToken>,
}

/// The system id every Business Central record returns as `id`.
#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: Uuid,
}

impl Validate for CreatedRecord {}

/// Typed CRUD operations on one entity set.
pub struct ResourcePage<T> {
    client: Client,
    entity_set: String,
    defaults: ResourceDefaults,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourcePage<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            entity_set: self.entity_set.clone(),
            defaults: self.defaults.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ResourcePage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePage")
            .field("entity_set", &self.entity_set)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

// Verify ResourcePage is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourcePage<serde_json::Value>>();
};

impl<T> ResourcePage<T>
where
    T: DeserializeOwned + Validate,
{
    /// Creates a resource page for `entity_set` on a shared client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyEntitySet`] if the name is blank.
    pub fn new(client: &Client, entity_set: impl Into<String>) -> Result<Self, ConfigError> {
        let entity_set = entity_set.into().trim().trim_matches('/').to_string();
        if entity_set.is_empty() {
            return Err(ConfigError::EmptyEntitySet);
        }
        Ok(Self {
            client: client.clone(),
            entity_set,
            defaults: ResourceDefaults::default(),
            _record: PhantomData,
        })
    }

    /// Sets a filter that every list call is narrowed by.
    #[must_use]
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.defaults.filter = filter.into();
        self
    }

    /// Sets expand targets included in every call.
    #[must_use]
    pub fn with_default_expand<I, S>(mut self, expand: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults.expand = expand.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the properties returned when a call does not name its own.
    #[must_use]
    pub fn with_default_select<I, S>(mut self, select: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults.select = select.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the entity set name.
    #[must_use]
    pub fn entity_set(&self) -> &str {
        &self.entity_set
    }

    /// Returns the resource defaults.
    #[must_use]
    pub const fn defaults(&self) -> &ResourceDefaults {
        &self.defaults
    }

    /// Returns the shared client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches one record by id.
    ///
    /// # Errors
    ///
    /// Returns the classified [`Error`] for any failure.
    pub async fn get(&self, id: Uuid, options: &GetOptions) -> Result<T, Error> {
        let query = ODataQuery {
            select: merge_select(&self.defaults.select, &options.select),
            expand: merge_expand(&self.defaults.expand, &options.expand),
            ..ODataQuery::default()
        };
        let builder = self
            .client
            .new_request(HttpMethod::Get, self.entity_set.as_str())
            .record_id(id)
            .query(query)
            .use_live_replica(options.use_live_replica);

        let cancel = options.cancel.clone().unwrap_or_default();
        self.client.do_request(builder, &cancel).await?.decode()
    }

    /// Lists records lazily across all pages.
    ///
    /// No request is sent until the returned [`Pages`] is polled.
    #[must_use]
    pub fn list(&self, options: ListOptions) -> Pages<T> {
        let query = build(&self.defaults, &options);
        Pages::new(
            self.client.clone(),
            self.entity_set.clone(),
            query,
            options.max_page_size,
            options.use_live_replica,
            options.cancel.unwrap_or_default(),
        )
    }

    /// Lists every record into a `Vec`.
    ///
    /// # Errors
    ///
    /// Returns the first error from any page.
    pub async fn list_all(&self, options: ListOptions) -> Result<Vec<T>, Error> {
        self.list(options).collect_all().await
    }

    /// Creates a record.
    ///
    /// With no expand requested the POST response is the result. Otherwise
    /// the new record is re-read by the `id` in the POST response.
    ///
    /// # Errors
    ///
    /// Returns the classified [`Error`] of the POST or the follow-up GET.
    pub async fn create<B>(&self, body: &B, options: &WriteOptions) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
    {
        let builder = self
            .client
            .new_request(HttpMethod::Post, self.entity_set.as_str())
            .json(body);

        let cancel = options.cancel.clone().unwrap_or_default();
        let response = self.client.do_request(builder, &cancel).await?;

        if !self.needs_reread(options) {
            return response.decode();
        }

        let created: CreatedRecord = response.decode()?;
        tracing::debug!(
            entity_set = %self.entity_set,
            id = %created.id,
            "re-reading created record to apply expand"
        );
        self.reread(created.id, options, cancel).await
    }

    /// Partially updates a record.
    ///
    /// With no expand requested the PATCH response is the result. Otherwise
    /// the record is re-read after the update.
    ///
    /// # Errors
    ///
    /// Returns the classified [`Error`] of the PATCH or the follow-up GET.
    pub async fn update<B>(&self, id: Uuid, body: &B, options: &WriteOptions) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
    {
        let mut builder = self
            .client
            .new_request(HttpMethod::Patch, self.entity_set.as_str())
            .record_id(id)
            .json(body);
        if let Some(etag) = &options.etag {
            builder = builder.etag(etag.as_str());
        }

        let cancel = options.cancel.clone().unwrap_or_default();
        let response = self.client.do_request(builder, &cancel).await?;

        if !self.needs_reread(options) {
            return response.decode();
        }

        response.decode_no_content()?;
        tracing::debug!(
            entity_set = %self.entity_set,
            id = %id,
            "re-reading updated record to apply expand"
        );
        self.reread(id, options, cancel).await
    }

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns the classified [`Error`] for any failure.
    pub async fn delete(&self, id: Uuid, options: &DeleteOptions) -> Result<(), Error> {
        let mut builder = self
            .client
            .new_request(HttpMethod::Delete, self.entity_set.as_str())
            .record_id(id);
        if let Some(etag) = &options.etag {
            builder = builder.etag(etag.as_str());
        }

        let cancel = options.cancel.clone().unwrap_or_default();
        self.client
            .do_request(builder, &cancel)
            .await?
            .decode_no_content()
    }

    fn needs_reread(&self, options: &WriteOptions) -> bool {
        self.defaults.expand.iter().any(|e| !e.is_empty())
            || options.expand.iter().any(|e| !e.is_empty())
    }

    async fn reread(
        &self,
        id: Uuid,
        options: &WriteOptions,
        cancel: CancellationToken,
    ) -> Result<T, Error> {
        let get_options = GetOptions {
            expand: options.expand.clone(),
            select: Vec::new(),
            use_live_replica: true,
            cancel: Some(cancel),
        };
        self.get(id, &get_options).await
    }
}
