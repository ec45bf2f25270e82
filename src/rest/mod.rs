//! Resource page infrastructure for the Business Central API.
//!
//! This module provides typed access to API pages (entity sets) with:
//!
//! - **[`ODataQuery`]**: The canonical OData system query options
//! - **[`build`]**: Merges [`ResourceDefaults`] with per-call [`ListOptions`]
//! - **[`ResourcePage<T>`]**: Get, list, create, update and delete for one entity set
//! - **[`Pages<T>`]**: A lazy iterator that follows `@odata.nextLink`
//!
//! # Example
//!
//! ```rust,ignore
//! use bc_api::rest::{ListOptions, ResourcePage, WriteOptions};
//!
//! let customers = ResourcePage::<Customer>::new(&client, "customers")?
//!     .with_default_filter("blocked eq ' '")
//!     .with_default_expand(["paymentTerm"]);
//!
//! // Iterate lazily; only the pages actually consumed are fetched
//! let mut pages = customers.list(ListOptions {
//!     filter: "balanceDue gt 0".to_string(),
//!     max_page_size: 200,
//!     ..Default::default()
//! });
//! while let Some(customer) = pages.next().await {
//!     println!("{}", customer?.display_name);
//! }
//!
//! // Update with an etag and get the expanded record back
//! let updated = customers
//!     .update(id, &json!({"displayName": "Adatum"}), &WriteOptions {
//!         etag: Some(etag),
//!         ..Default::default()
//!     })
//!     .await?;
//! ```

mod pagination;
mod query;
mod resource;

pub use pagination::Pages;
pub use query::{
    build, merge_expand, merge_filter, merge_select, ListOptions, ODataQuery, QueryParseError,
    ResourceDefaults,
};
pub use resource::{DeleteOptions, GetOptions, ResourcePage, WriteOptions};
