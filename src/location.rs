//! Location codec.
//!
//! Only the **top** view of a stack is visible in the address bar: its full
//! path becomes the pathname and its query the query string. Every other
//! view's query lives in history state. This module is the single place that
//! turns a stack into a location, so that rule is never re-implemented inline.
//!
//! Address bars have a practical length ceiling. When the full location is
//! longer than [`MAX_LOCATION_LEN`], the URL written to history is the
//! pathname followed by the reserved query `?T` ([`TRUNCATION_MARKER`]), and
//! the real location is recovered from the `href` stored in history state.
//!
//! ```
//! use stacked_navigator::location::{join_location, TRUNCATION_MARKER};
//!
//! assert_eq!(join_location("/membroj", ""), "/membroj");
//! assert_eq!(join_location("/membroj", "q=1"), "/membroj?q=1");
//! assert_eq!(TRUNCATION_MARKER, "T");
//! ```

use crate::error::NavigationError;
use crate::stack::NavigationStack;
use url::Url;

/// Longest full location written to the address bar verbatim.
pub const MAX_LOCATION_LEN: usize = 1887;

/// Reserved query value marking a truncated address bar entry.
pub const TRUNCATION_MARKER: &str = "T";

/// Canonical and address-bar forms of the current location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Full path of the top view.
    pub pathname: String,
    /// Query of the top view, without the leading `?`.
    pub query: String,
    /// `pathname` plus `?query` when the query is non-empty.
    pub full_location: String,
    /// What the address bar shows: `full_location`, or `pathname?T` if too long.
    pub url_location: String,
}

impl Location {
    /// `true` if the address bar form had to be truncated.
    pub fn is_truncated(&self) -> bool {
        self.url_location != self.full_location
    }
}

/// `pathname` followed by `?query` when the query is non-empty.
pub fn join_location(pathname: &str, query: &str) -> String {
    if query.is_empty() {
        pathname.to_string()
    } else {
        format!("{pathname}?{query}")
    }
}

/// Length of a location as an address bar counts it (UTF-16 code units).
pub fn location_len(location: &str) -> usize {
    location.encode_utf16().count()
}

/// `true` if `query` is exactly the truncation marker.
pub fn is_truncated_query(query: &str) -> bool {
    query == TRUNCATION_MARKER
}

/// Compute the location for `stack`, truncating beyond `max_len`.
pub fn compute_location(stack: &NavigationStack, max_len: usize) -> Location {
    let (pathname, query) = match stack.top() {
        Some(top) => (top.full_path(), top.query.clone()),
        None => ("/".to_string(), String::new()),
    };
    let full_location = join_location(&pathname, &query);
    let url_location = if location_len(&full_location) > max_len {
        crate::debug_log!(
            "Location of {} units exceeds {}; truncating",
            location_len(&full_location),
            max_len
        );
        join_location(&pathname, TRUNCATION_MARKER)
    } else {
        full_location.clone()
    };

    Location {
        pathname,
        query,
        full_location,
        url_location,
    }
}

/// Pathname and query of a resolved href.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedHref {
    /// Path component, percent-encoded as a browser would report it.
    pub pathname: String,
    /// Query component without the leading `?`.
    pub query: String,
}

impl ResolvedHref {
    /// `pathname?query`.
    pub fn full_location(&self) -> String {
        join_location(&self.pathname, &self.query)
    }
}

/// Resolve `href` the way a browser resolves a link on the page at `base`.
///
/// `base` is a full location (`/path?query`) on `origin`. Absolute URLs,
/// absolute paths, relative paths and query-only hrefs are all accepted; the
/// fragment is dropped.
///
/// Like a browser, the result is percent-encoded: `/membroj?q=a b` resolves
/// to pathname `/membroj` and query `q=a%20b`. Queries stay encoded, since
/// they are opaque to the navigator. Path segments are decoded again by
/// [`split_path`](crate::matching::split_path) before matching.
pub fn resolve_href(origin: &str, base: &str, href: &str) -> Result<ResolvedHref, NavigationError> {
    let origin_url = Url::parse(origin).map_err(|e| NavigationError::invalid_href(origin, e))?;
    let base_url = origin_url
        .join(base)
        .map_err(|e| NavigationError::invalid_href(base, e))?;
    let url = base_url
        .join(href)
        .map_err(|e| NavigationError::invalid_href(href, e))?;

    Ok(ResolvedHref {
        pathname: url.path().to_string(),
        query: url.query().unwrap_or_default().to_string(),
    })
}
