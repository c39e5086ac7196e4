//! The navigator: orchestration of parsing, reconciliation and persistence.
//!
//! [`Navigator`] owns the single [`NavigationState`] and is the only thing
//! that mutates it. Every entry point follows the same pipeline:
//!
//! ```text
//! href ─▶ resolve ─▶ (truncated? use history href) ─▶ match ─▶ hydrate
//!      ─▶ reconcile with current stack ─▶ compute location ─▶ persist
//! ```
//!
//! Persistence depends on why the state changed:
//!
//! | Trigger | History write |
//! |---------|---------------|
//! | [`navigate`](Navigator::navigate) / [`push`](Navigator::push) / [`pop`](Navigator::pop) / [`pop_stack_at`](Navigator::pop_stack_at) | push, immediately |
//! | [`replace`](Navigator::replace), popstate, permission change, caller data | replace, debounced |
//! | [`on_query_change`](Navigator::on_query_change) on the top view | caller's [`WriteIntent`] |
//! | [`on_query_change`](Navigator::on_query_change) below the top | replace, debounced |
//!
//! # Error state
//!
//! A fault (an internal invariant violation, or a render failure reported
//! through [`report_fault`](Navigator::report_fault)) moves the navigator into
//! [`NavigatorStatus::Error`]. The state is sticky: mutating operations fail
//! with [`NavigationError::Faulted`], the pending history write is dropped, and
//! the next popstate asks the host for a full reload. Recovering in place
//! would re-run against the state that just faulted.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use stacked_navigator::{
//!     MemoryHistory, Navigator, NavigatorConfig, Permissions, Route, RouteTree,
//! };
//!
//! let tree = Arc::new(
//!     RouteTree::builder()
//!         .route(Route::bottom("membroj").child(Route::stack_pattern(r"\d+").unwrap()))
//!         .build(),
//! );
//! let mut nav = Navigator::new(
//!     tree,
//!     NavigatorConfig::default(),
//!     Arc::new(Permissions::unrestricted()),
//!     MemoryHistory::new(),
//! );
//!
//! nav.start("/membroj", None).unwrap();
//! nav.push("42").unwrap();
//! assert_eq!(nav.state().stack().len(), 2);
//! assert_eq!(nav.state().full_location(), "/membroj/42");
//!
//! nav.pop().unwrap();
//! assert_eq!(nav.state().full_location(), "/membroj");
//! ```

#[cfg(feature = "cache")]
use crate::cache::{CacheStats, MatchCache};
use crate::config::NavigatorConfig;
use crate::error::NavigationError;
use crate::history::{HistoryBackend, HistoryState};
use crate::location::{
    compute_location, is_truncated_query, join_location, resolve_href, Location,
};
use crate::matching::{describe, hydrate, match_segments, split_path};
use crate::permissions::PermissionSet;
use crate::persistence::{Clock, PersistenceController, SystemClock};
use crate::route::{RouteId, RouteTree};
use crate::stack::{reconcile, NavigationStack, RenderMetadata, ViewRecord};
use crate::{debug_log, error_log, info_log, warn_log};
use serde_json::Value;
use std::sync::Arc;

// ============================================================================
// NavigationState
// ============================================================================

/// What is currently shown, and where the address bar points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    stack: NavigationStack,
    location: Location,
}

impl NavigationState {
    fn from_stack(stack: NavigationStack, max_len: usize) -> Self {
        let location = compute_location(&stack, max_len);
        Self { stack, location }
    }

    /// The view stack, root first.
    pub fn stack(&self) -> &NavigationStack {
        &self.stack
    }

    /// Canonical and address-bar locations.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Full path of the top view.
    pub fn pathname(&self) -> &str {
        &self.location.pathname
    }

    /// Query of the top view.
    pub fn query(&self) -> &str {
        &self.location.query
    }

    /// Untruncated location.
    pub fn full_location(&self) -> &str {
        &self.location.full_location
    }

    /// Location as written to the address bar.
    pub fn url_location(&self) -> &str {
        &self.location.url_location
    }

    /// Route of the top view.
    pub fn top_route(&self) -> Option<RouteId> {
        self.stack.top().map(|v| v.route)
    }
}

// ============================================================================
// Status and options
// ============================================================================

/// Diagnostics captured when the navigator faulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    /// Short description for the error page.
    pub message: String,
    /// Optional diagnostic details (stack trace, state dump, ...).
    pub details: Option<String>,
}

/// Navigator state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NavigatorStatus {
    /// The last operation succeeded.
    #[default]
    Normal,
    /// A fault occurred; only a full reload recovers.
    Error(FaultReport),
}

/// How a state change should reach the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteIntent {
    /// New history entry, written immediately.
    #[default]
    Push,
    /// Overwrite the current entry, debounced.
    Replace,
}

/// Options for [`Navigator::navigate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// History write to perform.
    pub intent: WriteIntent,
    /// Append the target view onto the current stack instead of replacing it.
    pub out_of_tree: bool,
}

impl NavigateOptions {
    /// Push navigation (the default).
    pub fn push() -> Self {
        Self::default()
    }

    /// Replace navigation.
    pub fn replace() -> Self {
        Self {
            intent: WriteIntent::Replace,
            out_of_tree: false,
        }
    }

    /// Keep the current stack and append the target's top view to it.
    pub fn out_of_tree(mut self) -> Self {
        self.out_of_tree = true;
        self
    }
}

/// Result of delivering a popstate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopStateOutcome {
    /// The location was parsed and applied.
    Applied,
    /// The navigator is faulted; the host should reload the page.
    ReloadRequired,
    /// The navigator is faulted and reloads are disabled; nothing happened.
    Ignored,
}

// ============================================================================
// Navigator
// ============================================================================

/// Owner of the navigation state.
pub struct Navigator<H: HistoryBackend> {
    tree: Arc<RouteTree>,
    config: NavigatorConfig,
    permissions: Arc<dyn PermissionSet>,
    permission_epoch: u64,
    state: NavigationState,
    persistence: PersistenceController<H>,
    clock: Box<dyn Clock>,
    status: NavigatorStatus,
    #[cfg(feature = "cache")]
    cache: MatchCache,
}

impl<H: HistoryBackend> Navigator<H> {
    /// Create a navigator. Call [`start`](Self::start) with the initial location.
    pub fn new(
        tree: Arc<RouteTree>,
        config: NavigatorConfig,
        permissions: Arc<dyn PermissionSet>,
        backend: H,
    ) -> Self {
        let persistence = PersistenceController::new(backend, config.replace_delay());
        Self {
            #[cfg(feature = "cache")]
            cache: MatchCache::new(config.cache_capacity),
            tree,
            config,
            permissions,
            permission_epoch: 0,
            state: NavigationState::default(),
            persistence,
            clock: Box::new(SystemClock),
            status: NavigatorStatus::Normal,
        }
    }

    /// Use `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Parse the initial location.
    ///
    /// `history` is the state stored with the current history entry (after a
    /// reload it still holds the lower views' queries and data).
    pub fn start(
        &mut self,
        href: &str,
        history: Option<HistoryState>,
    ) -> Result<&NavigationState, NavigationError> {
        self.ensure_operational()?;
        let result = self.apply(href, history.as_ref(), false);
        self.boundary(result)?;
        info_log!("Navigator started at '{}'", self.state.full_location());
        self.persist(WriteIntent::Replace);
        Ok(&self.state)
    }

    /// Deliver a browser popstate event.
    pub fn on_pop_state(
        &mut self,
        href: &str,
        history: Option<HistoryState>,
    ) -> Result<PopStateOutcome, NavigationError> {
        if let NavigatorStatus::Error(report) = &self.status {
            if self.config.force_reload_on_fault {
                warn_log!("Popstate while faulted ({}); requesting reload", report.message);
                return Ok(PopStateOutcome::ReloadRequired);
            }
            return Ok(PopStateOutcome::Ignored);
        }
        let result = self.apply(href, history.as_ref(), false);
        self.boundary(result)?;
        self.persist(WriteIntent::Replace);
        Ok(PopStateOutcome::Applied)
    }

    /// Navigate to `href`, resolved against the current location.
    pub fn navigate(
        &mut self,
        href: &str,
        options: NavigateOptions,
    ) -> Result<&NavigationState, NavigationError> {
        self.ensure_operational()?;
        let result = self.apply(href, None, options.out_of_tree);
        self.boundary(result)?;
        self.persist(options.intent);
        Ok(&self.state)
    }

    /// Navigate to `href`, replacing the current history entry.
    pub fn replace(&mut self, href: &str) -> Result<&NavigationState, NavigationError> {
        self.navigate(href, NavigateOptions::replace())
    }

    /// Append `component` to the current pathname and navigate there.
    pub fn push(&mut self, component: &str) -> Result<&NavigationState, NavigationError> {
        self.ensure_started()?;
        let base = self.state.pathname().trim_end_matches('/');
        let component = component.trim_start_matches('/');
        let href = format!("{base}/{component}");
        self.navigate(&href, NavigateOptions::push())
    }

    /// Remove the last pathname segment and navigate there.
    ///
    /// If a lower view owns the resulting path, its query comes along. At the
    /// root this does nothing.
    pub fn pop(&mut self) -> Result<&NavigationState, NavigationError> {
        self.ensure_started()?;
        let pathname = self.state.pathname().trim_end_matches('/');
        let Some(cut) = pathname.rfind('/') else {
            return Ok(&self.state);
        };
        let parent = if cut == 0 { "/" } else { &pathname[..cut] };
        let query = self
            .state
            .stack
            .iter()
            .filter(|v| v.full_path() == parent)
            .last()
            .map(|v| v.query.clone())
            .unwrap_or_default();
        let href = join_location(parent, &query);
        self.navigate(&href, NavigateOptions::push())
    }

    /// Change the query of the view at `index`.
    ///
    /// On the top view the address bar changes, written per `intent`. Below
    /// the top only history state changes, so a debounced replace is used.
    pub fn on_query_change(
        &mut self,
        index: usize,
        query: &str,
        intent: WriteIntent,
    ) -> Result<&NavigationState, NavigationError> {
        self.ensure_operational()?;
        let len = self.state.stack.len();
        let view = self
            .state
            .stack
            .get_mut(index)
            .ok_or(NavigationError::InvalidStackIndex { index, len })?;
        view.query = query.to_string();
        self.refresh_location();

        let intent = if index + 1 == len {
            intent
        } else {
            WriteIntent::Replace
        };
        debug_log!("Query of view {} changed; writing {:?}", index, intent);
        self.persist(intent);
        Ok(&self.state)
    }

    /// Replace the caller data of the view at `index` (debounced replace write).
    pub fn set_caller_data(&mut self, index: usize, data: Value) -> Result<(), NavigationError> {
        self.ensure_operational()?;
        let view = self.view_mut(index)?;
        view.data = data;
        self.persist(WriteIntent::Replace);
        Ok(())
    }

    /// Replace the render metadata of the view at `index` (never persisted).
    pub fn set_render_metadata(
        &mut self,
        index: usize,
        metadata: RenderMetadata,
    ) -> Result<(), NavigationError> {
        self.ensure_operational()?;
        self.view_mut(index)?.render_metadata = metadata;
        Ok(())
    }

    /// Truncate the stack to `index` views.
    pub fn pop_stack_at(&mut self, index: usize) -> Result<&NavigationState, NavigationError> {
        self.ensure_started()?;
        let len = self.state.stack.len();
        if index == 0 {
            return Err(NavigationError::CannotPopRoot);
        }
        if index > len {
            return Err(NavigationError::InvalidStackIndex { index, len });
        }
        if index == len {
            return Ok(&self.state);
        }

        self.state.stack.truncate(index);
        self.refresh_location();
        info_log!(
            "Popped stack to {} views at '{}'",
            index,
            self.state.full_location()
        );
        self.persist(WriteIntent::Push);
        Ok(&self.state)
    }

    /// Pop from the top down to and including the first view matching
    /// `predicate`. Returns `false` if no view matched.
    pub fn pop_stack_until_including<F>(&mut self, predicate: F) -> Result<bool, NavigationError>
    where
        F: FnMut(&ViewRecord) -> bool,
    {
        self.ensure_operational()?;
        match self.state.stack.rposition(predicate) {
            Some(index) => {
                self.pop_stack_at(index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Swap the permission set.
    ///
    /// A different set (by identity) bumps the permission epoch and re-parses
    /// the current location, so forbidden views can be upgraded. Returns
    /// whether anything changed.
    pub fn set_permissions(
        &mut self,
        permissions: Arc<dyn PermissionSet>,
    ) -> Result<bool, NavigationError> {
        self.ensure_operational()?;
        let same = Arc::as_ptr(&self.permissions).cast::<()>()
            == Arc::as_ptr(&permissions).cast::<()>();
        if same {
            return Ok(false);
        }

        self.permissions = permissions;
        self.permission_epoch += 1;
        #[cfg(feature = "cache")]
        self.cache.clear();
        info_log!("Permission set changed (epoch {})", self.permission_epoch);

        if self.state.stack.is_empty() {
            return Ok(true);
        }
        let href = self.state.full_location().to_string();
        // A synthetic root's only entry carries the location query, which
        // must not land on the upgraded root view.
        let history = self
            .state
            .stack
            .root()
            .filter(|root| !root.is_synthetic())
            .map(|_| self.history_state());
        let result = self.apply(&href, history.as_ref(), false);
        self.boundary(result)?;
        self.persist(WriteIntent::Replace);
        Ok(true)
    }

    /// Fire the pending replace write if it is due.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        self.persistence.poll(now)
    }

    /// Record a fault raised while rendering from the navigation state.
    pub fn report_fault(&mut self, message: impl Into<String>, details: Option<String>) {
        self.enter_error(FaultReport {
            message: message.into(),
            details,
        });
    }

    /// Drop the pending history write (component teardown).
    pub fn teardown(&mut self) {
        if self.persistence.cancel().is_some() {
            debug_log!("Teardown dropped a pending history write");
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current navigation state.
    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// State machine status.
    pub fn status(&self) -> &NavigatorStatus {
        &self.status
    }

    /// `true` once a fault occurred.
    pub fn is_faulted(&self) -> bool {
        matches!(self.status, NavigatorStatus::Error(_))
    }

    /// Diagnostics of the fault, if any.
    pub fn fault(&self) -> Option<&FaultReport> {
        match &self.status {
            NavigatorStatus::Error(report) => Some(report),
            NavigatorStatus::Normal => None,
        }
    }

    /// Route of the top view, for titles and analytics.
    pub fn current_route(&self) -> Option<RouteId> {
        self.state.top_route()
    }

    /// Name of the top view's route.
    pub fn current_route_name(&self) -> Option<&str> {
        self.tree.get(self.current_route()?)?.name()
    }

    /// The route tree.
    pub fn tree(&self) -> &Arc<RouteTree> {
        &self.tree
    }

    /// The configuration.
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// The active permission set.
    pub fn permissions(&self) -> &Arc<dyn PermissionSet> {
        &self.permissions
    }

    /// History payload describing the current state.
    pub fn history_state(&self) -> HistoryState {
        HistoryState::new(
            self.state.stack.to_history_entries(),
            self.state.full_location(),
        )
    }

    /// The persistence controller.
    pub fn persistence(&self) -> &PersistenceController<H> {
        &self.persistence
    }

    /// The history backend.
    pub fn backend(&self) -> &H {
        self.persistence.backend()
    }

    /// The history backend, mutably.
    pub fn backend_mut(&mut self) -> &mut H {
        self.persistence.backend_mut()
    }

    /// Path-match cache counters.
    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Parse `href` and make it the current state. Mutates nothing on error.
    fn apply(
        &mut self,
        href: &str,
        history: Option<&HistoryState>,
        out_of_tree: bool,
    ) -> Result<(), NavigationError> {
        let mut fresh = self.parse(href, history)?;
        let old = self.state.stack.clone();

        let tail = fresh.top().filter(|v| !v.is_synthetic()).cloned();
        match tail {
            Some(tail) if out_of_tree && !old.is_empty() => {
                let mut combined = old.clone();
                combined.push(tail);
                reconcile(&old, &mut combined, true);
                fresh = combined;
            }
            _ => {
                let kept = reconcile(&old, &mut fresh, false);
                debug_log!("Reconciled {} of {} views", kept, fresh.len());
            }
        }

        self.state = NavigationState::from_stack(fresh, self.config.max_location_len);
        info_log!(
            "Navigated to '{}': {}",
            self.state.full_location(),
            describe(&self.tree, &self.state.stack)
        );
        Ok(())
    }

    /// Resolve and match `href` into a fresh stack.
    fn parse(
        &mut self,
        href: &str,
        history: Option<&HistoryState>,
    ) -> Result<NavigationStack, NavigationError> {
        let origin = &self.config.origin;
        let mut resolved = resolve_href(origin, self.state.full_location(), href)?;

        if is_truncated_query(&resolved.query) {
            match history.filter(|h| !h.href.is_empty()) {
                Some(h) => resolved = resolve_href(origin, "/", &h.href)?,
                None => {
                    warn_log!(
                        "Truncated location '{}' without stored href; dropping query",
                        href
                    );
                    resolved.query.clear();
                }
            }
        }

        let segments = split_path(&resolved.pathname);
        let skeleton = self.match_skeleton(&segments);
        let stack = hydrate(skeleton, history, &resolved.query);
        if stack.is_empty() {
            return Err(NavigationError::internal(format!(
                "matcher produced an empty stack for '{}'",
                resolved.pathname
            )));
        }
        Ok(stack)
    }

    fn match_skeleton(&mut self, segments: &[String]) -> Vec<ViewRecord> {
        #[cfg(feature = "cache")]
        {
            if let Some(hit) = self.cache.get(segments, self.permission_epoch) {
                return hit;
            }
        }
        let skeleton = match_segments(&self.tree, segments, self.permissions.as_ref());
        #[cfg(feature = "cache")]
        self.cache
            .insert(segments, self.permission_epoch, skeleton.clone());
        skeleton
    }

    fn refresh_location(&mut self) {
        self.state.location = compute_location(&self.state.stack, self.config.max_location_len);
    }

    fn persist(&mut self, intent: WriteIntent) {
        let state = self.history_state();
        let url = self.state.url_location().to_string();
        match intent {
            WriteIntent::Push => self.persistence.write_immediate(&state, &url),
            WriteIntent::Replace => {
                let now = self.clock.now();
                self.persistence.schedule_write(now, state, url);
            }
        }
    }

    fn view_mut(&mut self, index: usize) -> Result<&mut ViewRecord, NavigationError> {
        let len = self.state.stack.len();
        self.state
            .stack
            .get_mut(index)
            .ok_or(NavigationError::InvalidStackIndex { index, len })
    }

    fn ensure_operational(&self) -> Result<(), NavigationError> {
        match &self.status {
            NavigatorStatus::Normal => Ok(()),
            NavigatorStatus::Error(report) => Err(NavigationError::Faulted {
                message: report.message.clone(),
            }),
        }
    }

    fn ensure_started(&self) -> Result<(), NavigationError> {
        self.ensure_operational()?;
        if self.state.stack.is_empty() {
            return Err(NavigationError::NotStarted);
        }
        Ok(())
    }

    /// The single place faults are caught.
    fn boundary<T>(&mut self, result: Result<T, NavigationError>) -> Result<T, NavigationError> {
        if let Err(err) = &result {
            if err.is_fault() {
                self.enter_error(FaultReport {
                    message: err.to_string(),
                    details: None,
                });
            }
        }
        result
    }

    fn enter_error(&mut self, report: FaultReport) {
        error_log!("Navigator faulted: {}", report.message);
        self.persistence.cancel();
        self.status = NavigatorStatus::Error(report);
    }
}

impl<H: HistoryBackend> std::fmt::Debug for Navigator<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("location", &self.state.location)
            .field("stack_len", &self.state.stack.len())
            .field("status", &self.status)
            .field("permission_epoch", &self.permission_epoch)
            .finish_non_exhaustive()
    }
}
