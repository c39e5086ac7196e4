//! Path matcher.
//!
//! Turns the segments of a pathname into a stack of view records by walking
//! the [`RouteTree`] one segment at a time.
//!
//! # Algorithm
//!
//! The cursor starts at the top-level routes. For each segment:
//!
//! 1. Take the first candidate whose matcher accepts the segment. If nothing
//!    at the top level accepts the *first* segment, the index route (one that
//!    accepts `""`) is tried instead and the segment is retried among its
//!    children.
//! 2. A failed permission check replaces everything with a single forbidden
//!    view and stops.
//! 3. `Bottom` clears the stack and pushes, `Stack` pushes, `State` attaches
//!    the segment to the current top view (or is dropped if there is none).
//! 4. The cursor moves to the matched route's children.
//! 5. A segment nothing accepts replaces everything with a single not-found
//!    view and stops.
//!
//! Both synthetic views are anchored at the full input path, so the address
//! bar keeps showing what the user asked for.
//!
//! Matching is split in two so the permission-dependent part can be cached:
//! [`match_segments`] produces the bare "skeleton" records, and [`hydrate`]
//! fills in history data and the location query.
//!
//! # Example
//!
//! ```
//! use stacked_navigator::matching::{match_location, split_path};
//! use stacked_navigator::{Permissions, Route, RouteTree};
//!
//! let tree = RouteTree::builder()
//!     .route(Route::bottom("membroj").child(Route::stack_pattern(r"\d+").unwrap()))
//!     .build();
//!
//! let stack = match_location(
//!     &tree,
//!     &split_path("/membroj/42"),
//!     None,
//!     &Permissions::unrestricted(),
//!     "tab=notes",
//! );
//! assert_eq!(stack.len(), 2);
//! assert_eq!(stack.top().unwrap().view_path, "/membroj/42");
//! assert_eq!(stack.top().unwrap().query, "tab=notes");
//! ```

use crate::history::HistoryState;
use crate::permissions::PermissionSet;
use crate::route::{RouteId, RouteKind, RouteTree};
use crate::stack::{NavigationStack, ViewRecord};
use crate::{debug_log, trace_log};

/// Split a pathname into its non-empty segments.
///
/// An empty path yields a single empty segment so the index route can match.
/// Segments are percent-decoded, so `%C4%89efa` matches a `ĉefa` route. A
/// segment that decodes to invalid UTF-8 or to something containing `/` is
/// kept encoded.
///
/// ```
/// use stacked_navigator::matching::split_path;
///
/// assert_eq!(split_path("/membroj//42/"), vec!["membroj", "42"]);
/// assert_eq!(split_path("/%C4%89efa"), vec!["ĉefa"]);
/// assert_eq!(split_path("/"), vec![""]);
/// ```
pub fn split_path(pathname: &str) -> Vec<String> {
    let segments: Vec<String> = pathname
        .split('/')
        .filter(|s| !s.is_empty())
        .map(decode_segment)
        .collect();
    if segments.is_empty() {
        vec![String::new()]
    } else {
        segments
    }
}

fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) if !decoded.contains('/') => decoded.into_owned(),
        _ => segment.to_string(),
    }
}

/// `/`-joined path of the non-empty `segments`.
fn join_segments<'a, I>(segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut path = String::from("/");
    for segment in segments.into_iter().filter(|s| !s.is_empty()) {
        if path.len() > 1 {
            path.push('/');
        }
        path.push_str(segment);
    }
    path
}

/// First candidate under `cursor` accepting `segment`, with its captures.
fn find_candidate(
    tree: &RouteTree,
    cursor: Option<RouteId>,
    segment: &str,
) -> Option<(RouteId, Vec<String>)> {
    tree.candidates(cursor).iter().find_map(|&id| {
        tree.node(id)
            .matcher()
            .match_segment(segment)
            .map(|captures| (id, captures))
    })
}

/// Match `segments` against `tree`, without history data or query.
///
/// The result is never empty.
pub fn match_segments(
    tree: &RouteTree,
    segments: &[String],
    permissions: &dyn PermissionSet,
) -> Vec<ViewRecord> {
    let full_path = join_segments(segments.iter().map(String::as_str));
    let mut views: Vec<ViewRecord> = Vec::new();
    let mut consumed: Vec<&str> = Vec::new();
    let mut cursor: Option<RouteId> = None;
    let mut index = 0;

    while let Some(segment) = segments.get(index) {
        let (id, captures, pseudo) = match find_candidate(tree, cursor, segment) {
            Some((id, captures)) => (id, captures, false),
            None => {
                let index_route = if index == 0 && cursor.is_none() && !segment.is_empty() {
                    find_candidate(tree, None, "")
                } else {
                    None
                };
                match index_route {
                    Some((id, captures)) => {
                        trace_log!("Segment '{}' falls back to index route {}", segment, id);
                        (id, captures, true)
                    }
                    None => {
                        debug_log!("No route for segment '{}' of '{}'", segment, full_path);
                        return vec![ViewRecord::new(RouteTree::NOT_FOUND, full_path)];
                    }
                }
            }
        };

        let node = tree.node(id);
        if let Some(permission) = node.permission() {
            if !permission.is_satisfied_by(permissions) {
                debug_log!("Route {} forbidden for '{}'", id, full_path);
                return vec![ViewRecord::new(RouteTree::FORBIDDEN, full_path)];
            }
        }

        let matched_segment = if pseudo { "" } else { segment.as_str() };
        if !matched_segment.is_empty() {
            consumed.push(matched_segment);
        }

        match node.kind() {
            RouteKind::Bottom => {
                views.clear();
                let view_path = join_segments(consumed.iter().copied());
                views.push(ViewRecord::new(id, view_path).with_captures(captures));
            }
            RouteKind::Stack => {
                let view_path = join_segments(consumed.iter().copied());
                views.push(ViewRecord::new(id, view_path).with_captures(captures));
            }
            RouteKind::State { key } => match views.last_mut() {
                Some(top) => top.attach_state(key.clone(), id, matched_segment),
                None => {
                    trace_log!("Dropping state segment '{}' with no view below", segment);
                }
            },
        }

        cursor = Some(id);
        if !pseudo {
            index += 1;
        }
    }

    if views.is_empty() {
        // Only state segments matched.
        return vec![ViewRecord::new(RouteTree::NOT_FOUND, full_path)];
    }
    views
}

/// Fill a matched skeleton with history data and the location query.
///
/// Record *i* takes `data` and `query` from history entry *i* (synthetic
/// records take nothing); the top record's query is then overwritten with
/// `query`, the query of the location being parsed.
pub fn hydrate(
    skeleton: Vec<ViewRecord>,
    prior: Option<&HistoryState>,
    query: &str,
) -> NavigationStack {
    let mut stack: NavigationStack = skeleton
        .into_iter()
        .enumerate()
        .map(|(depth, mut view)| {
            if !view.is_synthetic() {
                if let Some(entry) = prior.and_then(|h| h.entry(depth)) {
                    view.data = entry.data.clone();
                    view.query = entry.query.clone();
                }
            }
            view
        })
        .collect();

    if let Some(top) = stack.top_mut() {
        top.query = query.to_string();
    }
    stack
}

/// Match a location into a navigation stack.
pub fn match_location(
    tree: &RouteTree,
    segments: &[String],
    prior: Option<&HistoryState>,
    permissions: &dyn PermissionSet,
    query: &str,
) -> NavigationStack {
    hydrate(match_segments(tree, segments, permissions), prior, query)
}

/// Render a stack as `name(path) → name(path)` for logs and test failures.
pub fn describe(tree: &RouteTree, stack: &NavigationStack) -> String {
    stack
        .iter()
        .map(|view| {
            let name = tree
                .get(view.route)
                .and_then(|n| n.name())
                .map_or_else(|| view.route.to_string(), str::to_string);
            format!("{}({})", name, view.full_path())
        })
        .collect::<Vec<_>>()
        .join(" → ")
}
