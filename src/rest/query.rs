//! OData query options and the merge rules for resource defaults.
//!
//! [`build`] combines a resource's [`ResourceDefaults`] with per-call
//! [`ListOptions`] into an [`ODataQuery`]. The query renders to a query
//! string with a fixed parameter order, so identical inputs always produce
//! byte-identical output.
//!
//! # Merge rules
//!
//! - `$filter`: `(<default>) and (<call>)` when both are set, otherwise
//!   whichever one is set. A per-call filter can only narrow the default.
//! - `$expand`: default targets followed by per-call targets, in order,
//!   duplicates kept.
//! - `$top`/`$skip`: emitted only when `top != 0`; `$skip` is then always
//!   emitted, even as `0`.
//! - Empty values never produce a parameter.
//!
//! # Example
//!
//! ```rust
//! use bc_api::rest::{build, ListOptions, ResourceDefaults};
//!
//! let defaults = ResourceDefaults {
//!     filter: "blocked eq ' '".to_string(),
//!     expand: vec!["paymentTerm".to_string()],
//!     ..Default::default()
//! };
//! let options = ListOptions {
//!     filter: "balance gt 0".to_string(),
//!     expand: vec!["currency".to_string()],
//!     ..Default::default()
//! };
//!
//! let query = build(&defaults, &options);
//! assert_eq!(query.filter, "(blocked eq ' ') and (balance gt 0)");
//! assert_eq!(query.expand, vec!["paymentTerm", "currency"]);
//! ```

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The OData system query options supported by Business Central.
///
/// The zero value renders no query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ODataQuery {
    /// A pre-formed filter expression. Not parsed or validated.
    pub filter: String,
    /// Properties to return.
    pub select: Vec<String>,
    /// Related entities to inline.
    pub expand: Vec<String>,
    /// A pre-formatted, comma-separated order expression.
    pub order_by: String,
    /// Maximum number of records. `0` means no limit.
    pub top: u32,
    /// Records to skip. Only emitted together with `top`.
    pub skip: u32,
    /// Ask the service to include a total count.
    pub count: bool,
}

impl ODataQuery {
    /// Returns the query parameters in their canonical order.
    ///
    /// Values are not percent-encoded.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.filter.is_empty() {
            pairs.push(("$filter", self.filter.clone()));
        }
        if let Some(select) = join_non_empty(&self.select) {
            pairs.push(("$select", select));
        }
        if let Some(expand) = join_non_empty(&self.expand) {
            pairs.push(("$expand", expand));
        }
        if !self.order_by.is_empty() {
            pairs.push(("$orderby", self.order_by.clone()));
        }
        if self.top != 0 {
            pairs.push(("$top", self.top.to_string()));
            pairs.push(("$skip", self.skip.to_string()));
        }
        if self.count {
            pairs.push(("$count", "true".to_string()));
        }
        pairs
    }

    /// Renders the percent-encoded query string, without a leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.to_pairs()
            .into_iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parses a query string produced by [`to_query_string`](Self::to_query_string).
    ///
    /// Parameters that are not OData system query options are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`QueryParseError`] if a value is not valid percent-encoded
    /// UTF-8, or `$top`, `$skip` or `$count` has an invalid value.
    pub fn from_query_string(query: &str) -> Result<Self, QueryParseError> {
        let mut parsed = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(raw)
                .map_err(|_| QueryParseError::Encoding {
                    key: key.to_string(),
                })?
                .into_owned();

            match key {
                "$filter" => parsed.filter = value,
                "$select" => parsed.select = split_list(&value),
                "$expand" => parsed.expand = split_list(&value),
                "$orderby" => parsed.order_by = value,
                "$top" => parsed.top = parse_number(key, &value)?,
                "$skip" => parsed.skip = parse_number(key, &value)?,
                "$count" => {
                    parsed.count = value.parse().map_err(|_| QueryParseError::InvalidValue {
                        key: key.to_string(),
                        value: value.clone(),
                    })?;
                }
                _ => {}
            }
        }

        Ok(parsed)
    }
}

/// Error returned by [`ODataQuery::from_query_string`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryParseError {
    /// A value is not valid percent-encoded UTF-8.
    #[error("Query parameter '{key}' is not valid percent-encoded UTF-8.")]
    Encoding {
        /// The parameter name.
        key: String,
    },

    /// A value has the wrong type.
    #[error("Query parameter '{key}' has invalid value '{value}'.")]
    InvalidValue {
        /// The parameter name.
        key: String,
        /// The offending value.
        value: String,
    },
}

fn parse_number(key: &str, value: &str) -> Result<u32, QueryParseError> {
    value.parse().map_err(|_| QueryParseError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_non_empty(items: &[String]) -> Option<String> {
    let joined = items
        .iter()
        .filter(|s| !s.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Filter and expand applied to every call on a resource page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceDefaults {
    /// Filter combined with every per-call filter.
    pub filter: String,
    /// Expand targets prepended to every per-call expand list.
    pub expand: Vec<String>,
    /// Properties returned when a call does not name its own.
    pub select: Vec<String>,
}

/// Per-call options for listing a collection.
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    /// Filter expression, combined with the resource default.
    pub filter: String,
    /// Order expressions such as `displayName desc`, joined with commas.
    pub order_by: Vec<String>,
    /// Properties to return.
    pub select: Vec<String>,
    /// Expand targets, appended after the resource default.
    pub expand: Vec<String>,
    /// Maximum number of records. `0` means no limit.
    pub top: u32,
    /// Records to skip. Only sent together with `top`.
    pub skip: u32,
    /// Ask the service to include a total count.
    pub count: bool,
    /// Server-side page size preference. `0` uses the server default.
    pub max_page_size: u32,
    /// Read from the primary store instead of a read-only replica.
    pub use_live_replica: bool,
    /// Cancels in-flight page fetches when fired.
    pub cancel: Option<CancellationToken>,
}

/// Combines a default filter with a per-call filter.
///
/// Both non-empty gives `(<default>) and (<call>)`; otherwise the non-empty
/// one is returned unmodified.
#[must_use]
pub fn merge_filter(default: &str, call: &str) -> String {
    match (default.is_empty(), call.is_empty()) {
        (false, false) => format!("({default}) and ({call})"),
        (false, true) => default.to_string(),
        (true, false) => call.to_string(),
        (true, true) => String::new(),
    }
}

/// Concatenates default and per-call expand targets, in that order.
#[must_use]
pub fn merge_expand(default: &[String], call: &[String]) -> Vec<String> {
    default.iter().chain(call).cloned().collect()
}

/// Picks the per-call select list, falling back to the default.
///
/// A projection is replaced, not merged, so a call can narrow the default.
#[must_use]
pub fn merge_select(default: &[String], call: &[String]) -> Vec<String> {
    if call.iter().any(|s| !s.is_empty()) {
        call.to_vec()
    } else {
        default.to_vec()
    }
}

/// Builds the query for a list call.
#[must_use]
pub fn build(defaults: &ResourceDefaults, options: &ListOptions) -> ODataQuery {
    ODataQuery {
        filter: merge_filter(&defaults.filter, &options.filter),
        select: merge_select(&defaults.select, &options.select),
        expand: merge_expand(&defaults.expand, &options.expand),
        order_by: options
            .order_by
            .iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(","),
        top: options.top,
        skip: options.skip,
        count: options.count,
    }
}
