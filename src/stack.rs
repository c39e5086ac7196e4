//! Navigation stack model and state-preserving reconciliation.
//!
//! A [`NavigationStack`] is the ordered list of [`ViewRecord`]s currently
//! shown: index 0 is the root (a bottom route, or a synthetic not-found /
//! forbidden view) and every later entry is a stacked view. State-kind
//! segments never get their own record; they are folded into the record
//! below them.
//!
//! Records are rebuilt from scratch on every parse. [`reconcile`] carries
//! view-local state (caller data, queries, render metadata) from the previous
//! stack into the fresh one wherever both stacks agree on route identity and
//! full path:
//!
//! ```text
//! old: [ membroj (data=d1) ][ membroj/42 (data=d2) ]
//! new: [ membroj           ][ membroj/42           ][ membroj/42/notoj ]
//!        ^ same route+path    ^ same route+path       ^ fresh
//! ```
//!
//! The stack is backed by a persistent vector, so cloning the current stack
//! before mutating it is cheap and the old/new comparison never aliases.

use crate::history::HistoryEntry;
use crate::route::{RouteId, RouteTree};
use crate::trace_log;
use im::Vector;
use indexmap::IndexMap;
use serde_json::Value;

// ============================================================================
// View records
// ============================================================================

/// A state-kind segment attached to a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedState {
    /// The state descriptor that matched.
    pub route: RouteId,
    /// The raw segment value.
    pub segment: String,
}

/// Transient, UI-supplied data about how a view is presented.
///
/// Never persisted; rebuilt on every render and carried across re-parses
/// only by [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderMetadata {
    /// Page title.
    pub title: Option<String>,
    /// Identifiers of the actions the view currently offers.
    pub actions: Vec<String>,
}

impl RenderMetadata {
    /// `true` if nothing has been rendered into this metadata yet.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.actions.is_empty()
    }
}

/// One matched stack or bottom route.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRecord {
    /// Matched descriptor (or a synthetic one).
    pub route: RouteId,
    /// Path prefix ending at this view's own segment.
    pub view_path: String,
    /// Suffix contributed by attached state segments (e.g. `/historio`).
    pub state_path: String,
    /// Values captured by the segment matcher.
    pub captures: Vec<String>,
    /// State key → attached segment, in path order.
    pub attached_state: IndexMap<String, AttachedState>,
    /// Query string owned by this view, without the leading `?`.
    pub query: String,
    /// Opaque UI payload, round-tripped through history state.
    pub data: Value,
    /// Transient render metadata.
    pub render_metadata: RenderMetadata,
}

impl ViewRecord {
    /// A fresh record with no query, data, state or metadata.
    pub fn new(route: RouteId, view_path: impl Into<String>) -> Self {
        Self {
            route,
            view_path: view_path.into(),
            state_path: String::new(),
            captures: Vec::new(),
            attached_state: IndexMap::new(),
            query: String::new(),
            data: Value::Null,
            render_metadata: RenderMetadata::default(),
        }
    }

    /// Set the matcher captures.
    pub fn with_captures(mut self, captures: Vec<String>) -> Self {
        self.captures = captures;
        self
    }

    /// `view_path` followed by `state_path`.
    pub fn full_path(&self) -> String {
        if self.state_path.is_empty() {
            self.view_path.clone()
        } else if self.view_path == "/" {
            self.state_path.clone()
        } else {
            format!("{}{}", self.view_path, self.state_path)
        }
    }

    /// Attach a state segment under `key`.
    ///
    /// Re-attaching an existing key replaces its value but keeps its position.
    pub fn attach_state(&mut self, key: impl Into<String>, route: RouteId, segment: &str) {
        self.state_path.push('/');
        self.state_path.push_str(segment);
        self.attached_state.insert(
            key.into(),
            AttachedState {
                route,
                segment: segment.to_string(),
            },
        );
    }

    /// State attached under `key`.
    pub fn attached(&self, key: &str) -> Option<&AttachedState> {
        self.attached_state.get(key)
    }

    /// `true` for not-found and forbidden records.
    pub fn is_synthetic(&self) -> bool {
        RouteTree::is_synthetic(self.route)
    }
}

// ============================================================================
// Navigation stack
// ============================================================================

/// Ordered, persistent sequence of view records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationStack {
    views: Vector<ViewRecord>,
}

impl NavigationStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// `true` before the first parse.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// The topmost view.
    pub fn top(&self) -> Option<&ViewRecord> {
        self.views.back()
    }

    /// The topmost view, mutably.
    pub fn top_mut(&mut self) -> Option<&mut ViewRecord> {
        self.views.back_mut()
    }

    /// The root view.
    pub fn root(&self) -> Option<&ViewRecord> {
        self.views.front()
    }

    /// View at `index`.
    pub fn get(&self, index: usize) -> Option<&ViewRecord> {
        self.views.get(index)
    }

    /// View at `index`, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut ViewRecord> {
        self.views.get_mut(index)
    }

    /// Iterate from root to top.
    pub fn iter(&self) -> impl Iterator<Item = &ViewRecord> + '_ {
        self.views.iter()
    }

    /// Push a view on top.
    pub fn push(&mut self, view: ViewRecord) {
        self.views.push_back(view);
    }

    /// Remove and return the top view.
    pub fn pop(&mut self) -> Option<ViewRecord> {
        self.views.pop_back()
    }

    /// Keep only the first `len` views.
    pub fn truncate(&mut self, len: usize) {
        if len < self.views.len() {
            self.views.truncate(len);
        }
    }

    /// Remove every view.
    pub fn clear(&mut self) {
        self.views.clear();
    }

    /// Route identities from root to top.
    pub fn route_ids(&self) -> Vec<RouteId> {
        self.views.iter().map(|v| v.route).collect()
    }

    /// Index of the topmost view satisfying `predicate`.
    pub fn rposition<F>(&self, mut predicate: F) -> Option<usize>
    where
        F: FnMut(&ViewRecord) -> bool,
    {
        (0..self.views.len())
            .rev()
            .find(|&i| self.views.get(i).is_some_and(&mut predicate))
    }

    /// The per-view part of the history payload.
    pub fn to_history_entries(&self) -> Vec<HistoryEntry> {
        self.views
            .iter()
            .map(|v| HistoryEntry {
                data: v.data.clone(),
                query: v.query.clone(),
            })
            .collect()
    }
}

impl FromIterator<ViewRecord> for NavigationStack {
    fn from_iter<I: IntoIterator<Item = ViewRecord>>(iter: I) -> Self {
        Self {
            views: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Copy view-local state from `old` into the freshly parsed `new` stack.
///
/// Walks both stacks from the root and stops at the first index where the
/// route identity or the full path differs; nothing deeper is copied even if
/// it would match again. For each agreeing index, caller data and render
/// metadata are copied. The query is copied too, except for the top of `new`
/// when `preserve_query` is `false`: that query belongs to the location just
/// parsed.
///
/// Returns the number of reconciled views.
pub fn reconcile(old: &NavigationStack, new: &mut NavigationStack, preserve_query: bool) -> usize {
    let new_len = new.len();
    let shared = old.len().min(new_len);
    let mut reconciled = 0;

    for index in 0..shared {
        let (Some(prev), Some(next)) = (old.get(index), new.get_mut(index)) else {
            break;
        };
        if prev.route != next.route || prev.full_path() != next.full_path() {
            trace_log!(
                "Reconcile stopped at index {}: {} '{}' vs {} '{}'",
                index,
                prev.route,
                prev.full_path(),
                next.route,
                next.full_path()
            );
            break;
        }

        next.data = prev.data.clone();
        if preserve_query || index + 1 != new_len {
            next.query = prev.query.clone();
        }
        next.render_metadata = prev.render_metadata.clone();
        reconciled += 1;
    }

    reconciled
}
