//! Test utilities for navigator integration tests
//!
//! Provides the admin-client route tree fixture, navigator constructors with
//! a manual clock, and stack inspection helpers.

#![allow(dead_code)]

use stacked_navigator::*;
use std::sync::Arc;
use std::time::Duration;

/// Default replace delay used by the fixtures.
pub const REPLACE_DELAY: Duration = Duration::from_millis(100);

/// Initialise `env_logger` once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Admin-client route tree:
///
/// ```text
/// ""            bottom  home
/// membroj       bottom  members          (category "members")
///   \d+         stack   member
///     historio  state   key "history"
///     notoj     stack   notes
///   sekreta     stack   secret-files     requires "secret"
/// kongresoj     bottom  congresses       (category "congresses")
///   \d+         stack   congress
/// administrado  bottom  admin            requires "admin"
///   agordoj     stack   settings
/// ```
pub fn admin_tree() -> Arc<RouteTree> {
    let member = Route::stack_pattern(r"\d+")
        .unwrap()
        .name("member")
        .child(Route::state("historio", "history"))
        .child(Route::stack("notoj").name("notes"));

    Arc::new(
        RouteTree::builder()
            .route(Route::bottom("").name("home"))
            .category(RouteCategory::new(
                "members",
                vec![Route::bottom("membroj").name("members").children([
                    member,
                    Route::stack("sekreta")
                        .name("secret-files")
                        .permission(Permission::named("secret")),
                ])],
            ))
            .category(RouteCategory::new(
                "congresses",
                vec![Route::bottom("kongresoj")
                    .name("congresses")
                    .child(Route::stack_pattern(r"\d+").unwrap().name("congress"))],
            ))
            .route(
                Route::bottom("administrado")
                    .name("admin")
                    .permission(Permission::named("admin"))
                    .child(Route::stack("agordoj").name("settings")),
            )
            .build(),
    )
}

/// Navigator over [`admin_tree`] with a manual clock and in-memory history.
pub fn navigator_with(
    config: NavigatorConfig,
    permissions: Permissions,
) -> (Navigator<MemoryHistory>, ManualClock) {
    init_logging();
    let clock = ManualClock::new();
    let nav = Navigator::new(
        admin_tree(),
        config,
        Arc::new(permissions),
        MemoryHistory::new(),
    )
    .with_clock(clock.clone());
    (nav, clock)
}

/// Navigator with default config and every permission granted.
pub fn navigator() -> (Navigator<MemoryHistory>, ManualClock) {
    navigator_with(NavigatorConfig::default(), Permissions::unrestricted())
}

/// Let the pending replace write fire.
pub fn settle(nav: &mut Navigator<MemoryHistory>, clock: &ManualClock) {
    clock.advance(REPLACE_DELAY);
    nav.poll();
}

/// Route names of a stack, bottom first (`#n` for unnamed routes).
pub fn route_names(tree: &RouteTree, stack: &NavigationStack) -> Vec<String> {
    stack
        .iter()
        .map(|view| {
            tree.get(view.route)
                .and_then(|node| node.name())
                .map_or_else(|| view.route.to_string(), str::to_string)
        })
        .collect()
}

/// Route names of the navigator's current stack.
pub fn current_names(nav: &Navigator<MemoryHistory>) -> Vec<String> {
    route_names(nav.tree(), nav.state().stack())
}

/// Parse a location with the matcher alone.
pub fn parse(
    tree: &RouteTree,
    location: &str,
    prior: Option<&HistoryState>,
    permissions: &Permissions,
) -> NavigationStack {
    let resolved = resolve_href("http://localhost", "/", location).unwrap();
    let segments = split_path(&resolved.pathname);
    match_location(tree, &segments, prior, permissions, &resolved.query)
}

/// Look up a route by name, panicking if the fixture lacks it.
pub fn route_id(tree: &RouteTree, name: &str) -> RouteId {
    tree.find_by_name(name)
        .unwrap_or_else(|| panic!("fixture has no route named '{}'", name))
}
