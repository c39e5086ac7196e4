//! # stacked-navigator
//!
//! A hierarchical navigation state machine for single-page admin interfaces.
//!
//! The address bar is treated as a serialisation of a *stack* of views. A
//! location such as `/membroj/42/historio` is matched against a tree of route
//! descriptors and becomes:
//!
//! ```text
//! [ membroj (member list) ][ membroj/42 (member detail, state history=historio) ]
//! ```
//!
//! Lower views stay alive underneath the top one. Their queries and
//! caller-supplied data are stored in the history entry's state object, so a
//! reload or a back/forward step restores the whole stack, not only the
//! address bar.
//!
//! ## Building blocks
//!
//! - [`route`]: route descriptors ([`Route`], [`RouteTree`]) with bottom,
//!   stack and state kinds, exact or pattern segment matchers, permissions.
//! - [`matching`]: the path matcher, location to [`NavigationStack`].
//! - [`stack`]: view records and [`reconcile`], which carries view-local
//!   state across re-parses.
//! - [`location`]: canonical location computation with the `T`
//!   truncation marker for over-long addresses.
//! - [`history`] and [`persistence`]: the history state payload, backends,
//!   and the debounced write controller.
//! - [`navigator`]: the [`Navigator`] that ties everything together.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use stacked_navigator::{
//!     HistoryState, MemoryHistory, Navigator, NavigatorConfig, Permissions, Route, RouteTree,
//! };
//!
//! let tree = Arc::new(
//!     RouteTree::builder()
//!         .route(Route::bottom("").name("home"))
//!         .route(
//!             Route::bottom("membroj").name("members").child(
//!                 Route::stack_pattern(r"\d+")
//!                     .unwrap()
//!                     .name("member")
//!                     .child(Route::state("historio", "history")),
//!             ),
//!         )
//!         .build(),
//! );
//!
//! let mut nav = Navigator::new(
//!     tree,
//!     NavigatorConfig::default(),
//!     Arc::new(Permissions::unrestricted()),
//!     MemoryHistory::new(),
//! );
//!
//! nav.start("/membroj?filter=active", None).unwrap();
//! nav.push("42").unwrap();
//! nav.push("historio").unwrap();
//!
//! let top = nav.state().stack().top().unwrap();
//! assert_eq!(nav.state().stack().len(), 2);
//! assert!(top.attached("history").is_some());
//!
//! // The member list keeps its query underneath the detail view.
//! let stored: &HistoryState = &nav.backend().current().unwrap().state;
//! assert_eq!(stored.stack[0].query, "filter=active");
//! ```
//!
//! ## Feature flags
//!
//! - `log` (default): log through the [`log`](https://docs.rs/log) facade.
//! - `tracing`: log through [`tracing`](https://docs.rs/tracing) instead.
//! - `cache` (default): memoise path matching in an LRU ([`cache`]).

#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "cache")]
pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod location;
pub mod logging;
pub mod matching;
pub mod navigator;
pub mod permissions;
pub mod persistence;
pub mod route;
pub mod stack;

#[cfg(feature = "cache")]
pub use cache::{CacheStats, MatchCache};
pub use config::NavigatorConfig;
pub use error::{HistoryError, NavigationError, RouteTreeError};
pub use history::{HistoryBackend, HistoryEntry, HistoryState, MemoryEntry, MemoryHistory};
pub use location::{
    compute_location, resolve_href, Location, ResolvedHref, MAX_LOCATION_LEN, TRUNCATION_MARKER,
};
pub use matching::{describe, hydrate, match_location, match_segments, split_path};
pub use navigator::{
    FaultReport, NavigateOptions, NavigationState, Navigator, NavigatorStatus, PopStateOutcome,
    WriteIntent,
};
pub use permissions::{Permission, PermissionFn, PermissionSet, Permissions};
pub use persistence::{
    Clock, DebounceTimer, ManualClock, PendingWrite, PersistenceController, SystemClock,
};
pub use route::{
    Route, RouteCategory, RouteId, RouteKind, RouteNode, RouteTree, RouteTreeBuilder,
    SegmentMatcher,
};
pub use stack::{reconcile, AttachedState, NavigationStack, RenderMetadata, ViewRecord};
