//! Lazy auto-pagination over OData collections.
//!
//! Business Central returns collections as
//! `{"value": [...], "@odata.nextLink": "<absolute URL>"}`. [`Pages`] walks
//! that chain one page at a time:
//!
//! 1. The first page is fetched from the entity set with the built query.
//! 2. Every later page is fetched from the server-issued `@odata.nextLink`,
//!    used verbatim.
//! 3. Items are handed out in server order. Nothing is fetched until the
//!    buffered page is drained and the consumer asks for more.
//! 4. A failed fetch or decode yields one error, after which the iterator
//!    is exhausted.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut pages = customers.list(ListOptions {
//!     max_page_size: 100,
//!     ..Default::default()
//! });
//!
//! while let Some(customer) = pages.next().await {
//!     let customer = customer?;
//!     println!("{}", customer.display_name);
//! }
//! ```

use std::collections::VecDeque;
use std::fmt;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::clients::{Client, Error, HttpMethod, Validate, ValidationError};
use crate::rest::ODataQuery;

/// The collection response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ListEnvelope<T> {
    pub(crate) value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub(crate) next_link: Option<String>,
}

impl<T: Validate> Validate for ListEnvelope<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        self.value.validate()
    }
}

#[derive(Debug, Default)]
struct PageState {
    next_link: Option<String>,
    page_number: u32,
    total_yielded: u64,
}

/// A lazy sequence of records spanning every page of a listing.
///
/// Each call to [`ResourcePage::list`](crate::ResourcePage::list) returns a
/// fresh `Pages` with its own state, so concurrent listings never interfere.
pub struct Pages<T> {
    client: Client,
    entity_set: String,
    query: ODataQuery,
    max_page_size: u32,
    use_live_replica: bool,
    cancel: CancellationToken,
    state: PageState,
    buffer: VecDeque<T>,
    done: bool,
}

impl<T> Pages<T>
where
    T: DeserializeOwned + Validate,
{
    pub(crate) fn new(
        client: Client,
        entity_set: String,
        query: ODataQuery,
        max_page_size: u32,
        use_live_replica: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            entity_set,
            query,
            max_page_size,
            use_live_replica,
            cancel,
            state: PageState::default(),
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Returns the next record, fetching the next page if needed.
    ///
    /// Returns `None` once the collection is exhausted or after an error has
    /// been returned.
    #[allow(clippy::should_implement_trait)]
    pub async fn next(&mut self) -> Option<Result<T, Error>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                self.state.total_yielded += 1;
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Err(error) = self.fetch_page().await {
                self.done = true;
                return Some(Err(error));
            }
        }
    }

    /// Drains every remaining page into a `Vec`.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. Records already read are dropped.
    pub async fn collect_all(mut self) -> Result<Vec<T>, Error> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Converts the iterator into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<T, Error>> {
        futures::stream::unfold(self, |mut pages| async move {
            pages.next().await.map(|item| (item, pages))
        })
    }

    /// Number of pages fetched so far.
    #[must_use]
    pub const fn page_number(&self) -> u32 {
        self.state.page_number
    }

    /// Number of records handed to the consumer so far.
    #[must_use]
    pub const fn items_yielded(&self) -> u64 {
        self.state.total_yielded
    }

    async fn fetch_page(&mut self) -> Result<(), Error> {
        // The first page is the only one without a continuation link; once a
        // page arrives without one, `done` is set and no fetch follows.
        let builder = match self.state.next_link.take() {
            Some(link) => self.client.new_request(HttpMethod::Get, link),
            None => self
                .client
                .new_request(HttpMethod::Get, self.entity_set.as_str())
                .query(self.query.clone()),
        };
        let builder = builder
            .max_page_size(self.max_page_size)
            .use_live_replica(self.use_live_replica);

        let response = self.client.do_request(builder, &self.cancel).await?;
        let page: ListEnvelope<T> = response.decode()?;

        self.state.page_number += 1;
        tracing::debug!(
            entity_set = %self.entity_set,
            page_number = self.state.page_number,
            items = page.value.len(),
            has_next = page.next_link.is_some(),
            "fetched page"
        );

        self.buffer.extend(page.value);
        match page.next_link.filter(|link| !link.is_empty()) {
            Some(link) => self.state.next_link = Some(link),
            None => self.done = true,
        }
        Ok(())
    }
}

impl<T> fmt::Debug for Pages<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pages")
            .field("entity_set", &self.entity_set)
            .field("page_number", &self.state.page_number)
            .field("items_yielded", &self.state.total_yielded)
            .field("buffered", &self.buffer.len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
