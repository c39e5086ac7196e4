//! History state payload and the backend seam.
//!
//! Every history entry the navigator writes carries a [`HistoryState`]:
//!
//! ```json
//! { "stack": [ { "data": ..., "query": "..." }, ... ], "href": "/full/location?with=query" }
//! ```
//!
//! `stack` has one entry per view, root first, so views below the top keep
//! their queries and caller data across back/forward. `href` is always the
//! *untruncated* location; it is how a truncated address bar entry is
//! recovered.
//!
//! The browser itself sits behind [`HistoryBackend`]. [`MemoryHistory`] is an
//! in-memory implementation that behaves like a session history (push drops
//! the forward entries, back/forward return the popstate payload).

use crate::error::HistoryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Payload
// ============================================================================

/// Per-view slice of the history payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Caller data of the view.
    #[serde(default)]
    pub data: Value,
    /// Query of the view, without the leading `?`.
    #[serde(default)]
    pub query: String,
}

/// Payload stored with each history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
    /// One entry per view, root first.
    #[serde(default)]
    pub stack: Vec<HistoryEntry>,
    /// The full, untruncated location.
    #[serde(default)]
    pub href: String,
}

impl HistoryState {
    /// Build a payload.
    pub fn new(stack: Vec<HistoryEntry>, href: impl Into<String>) -> Self {
        Self {
            stack,
            href: href.into(),
        }
    }

    /// Entry for the view at `depth`.
    pub fn entry(&self, depth: usize) -> Option<&HistoryEntry> {
        self.stack.get(depth)
    }

    /// Serialize to JSON, as handed to `history.pushState`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a JSON payload.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Interpret an arbitrary popstate value.
    ///
    /// Entries written by other code (or by an older build) are treated as
    /// absent rather than as errors.
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value.clone()) {
            Ok(state) => Some(state),
            Err(err) => {
                crate::debug_log!("Ignoring foreign history state: {}", err);
                None
            }
        }
    }
}

// ============================================================================
// Backend
// ============================================================================

/// The browser history API, as far as the navigator needs it.
pub trait HistoryBackend {
    /// Add a new entry (`history.pushState`).
    fn push_state(&mut self, state: &HistoryState, url: &str) -> Result<(), HistoryError>;

    /// Overwrite the current entry (`history.replaceState`).
    fn replace_state(&mut self, state: &HistoryState, url: &str) -> Result<(), HistoryError>;
}

impl<H: HistoryBackend + ?Sized> HistoryBackend for Box<H> {
    fn push_state(&mut self, state: &HistoryState, url: &str) -> Result<(), HistoryError> {
        (**self).push_state(state, url)
    }

    fn replace_state(&mut self, state: &HistoryState, url: &str) -> Result<(), HistoryError> {
        (**self).replace_state(state, url)
    }
}

/// One entry of a [`MemoryHistory`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    /// Address bar content.
    pub url: String,
    /// Stored payload.
    pub state: HistoryState,
}

/// In-memory session history.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    entries: Vec<MemoryEntry>,
    cursor: usize,
    pushes: usize,
    replaces: usize,
}

impl MemoryHistory {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entry.
    pub fn current(&self) -> Option<&MemoryEntry> {
        self.entries.get(self.cursor)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing was written yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful push writes.
    pub fn push_count(&self) -> usize {
        self.pushes
    }

    /// Number of successful replace writes.
    pub fn replace_count(&self) -> usize {
        self.replaces
    }

    /// Step back; returns the entry a `popstate` would deliver.
    pub fn back(&mut self) -> Option<&MemoryEntry> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    /// Step forward; returns the entry a `popstate` would deliver.
    pub fn forward(&mut self) -> Option<&MemoryEntry> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }
}

impl HistoryBackend for MemoryHistory {
    fn push_state(&mut self, state: &HistoryState, url: &str) -> Result<(), HistoryError> {
        let entry = MemoryEntry {
            url: url.to_string(),
            state: state.clone(),
        };
        if self.entries.is_empty() {
            self.entries.push(entry);
        } else {
            self.entries.truncate(self.cursor + 1);
            self.entries.push(entry);
            self.cursor += 1;
        }
        self.pushes += 1;
        Ok(())
    }

    fn replace_state(&mut self, state: &HistoryState, url: &str) -> Result<(), HistoryError> {
        let entry = MemoryEntry {
            url: url.to_string(),
            state: state.clone(),
        };
        match self.entries.get_mut(self.cursor) {
            Some(current) => *current = entry,
            None => self.entries.push(entry),
        }
        self.replaces += 1;
        Ok(())
    }
}
