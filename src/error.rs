//! Error types.
//!
//! Not-found and forbidden routes are **not** errors: the matcher represents
//! them as synthetic terminal views (see [`RouteTree::NOT_FOUND`] and
//! [`RouteTree::FORBIDDEN`]). The types here cover everything else:
//!
//! - [`NavigationError`]: returned by [`Navigator`](crate::Navigator)
//!   operations. Only [`NavigationError::Internal`] is a *fault*; it flips the
//!   navigator into its sticky error state. The remaining variants are caller
//!   errors and are raised before any state is touched.
//! - [`RouteTreeError`]: raised while building the route descriptor tree.
//! - [`HistoryError`]: raised by a [`HistoryBackend`](crate::HistoryBackend);
//!   the persistence layer logs and swallows these.
//!
//! [`RouteTree::NOT_FOUND`]: crate::RouteTree::NOT_FOUND
//! [`RouteTree::FORBIDDEN`]: crate::RouteTree::FORBIDDEN
//!
//! # Examples
//!
//! ```
//! use stacked_navigator::NavigationError;
//!
//! let err = NavigationError::InvalidStackIndex { index: 4, len: 2 };
//! assert!(!err.is_fault());
//! assert_eq!(err.to_string(), "stack index 4 out of range (stack length 2)");
//! ```

use thiserror::Error;

/// Errors returned by navigator operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The href could not be resolved against the current location.
    #[error("invalid href '{href}': {reason}")]
    InvalidHref { href: String, reason: String },

    /// A stack index did not address a live view.
    #[error("stack index {index} out of range (stack length {len})")]
    InvalidStackIndex { index: usize, len: usize },

    /// The operation would remove the root view.
    #[error("cannot pop the root view")]
    CannotPopRoot,

    /// The navigator has not parsed a location yet.
    #[error("navigator has not been started")]
    NotStarted,

    /// The navigator is in its sticky error state; only a reload recovers.
    #[error("navigator is faulted: {message}")]
    Faulted { message: String },

    /// An internal invariant was violated.
    #[error("internal navigation fault: {message}")]
    Internal { message: String },
}

impl NavigationError {
    /// Whether this error must move the navigator into its error state.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_href(href: &str, reason: impl ToString) -> Self {
        Self::InvalidHref {
            href: href.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while building a [`RouteTree`](crate::RouteTree).
#[derive(Debug, Error)]
pub enum RouteTreeError {
    /// A segment pattern is not a valid regular expression.
    #[error("invalid segment pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Failures reported by a history backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// The serialized state exceeded the backend's storage quota.
    #[error("history quota exceeded")]
    QuotaExceeded,

    /// The backend refused the write (e.g. cross-origin URL).
    #[error("history write rejected: {0}")]
    Security(String),

    /// Any other backend failure.
    #[error("history backend failure: {0}")]
    Backend(String),
}
