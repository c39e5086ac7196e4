//! Navigator scenarios: push/pop, state overlays, popstate, persistence
//! timing, permissions and the fault state.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use stacked_navigator::*;
use std::sync::Arc;

// ---- push / pop ----

#[test]
fn test_push_then_pop_member_detail() {
    let (mut nav, _) = navigator();
    nav.start("/membroj", None).unwrap();

    nav.push("42").unwrap();
    assert_eq!(nav.state().stack().len(), 2);
    assert_eq!(nav.state().full_location(), "/membroj/42");
    assert_eq!(nav.current_route_name(), Some("member"));

    nav.set_caller_data(1, json!({"draft": "notes"})).unwrap();

    nav.pop().unwrap();
    assert_eq!(nav.state().stack().len(), 1);
    assert_eq!(nav.state().full_location(), "/membroj");

    // Popped views are not retained.
    nav.push("42").unwrap();
    assert!(nav.state().stack().top().unwrap().data.is_null());
}

#[test]
fn test_pop_restores_lower_query() {
    let (mut nav, _) = navigator();
    nav.start("/membroj?filter=active", None).unwrap();
    nav.push("42").unwrap();
    assert_eq!(nav.state().query(), "");

    nav.pop().unwrap();
    assert_eq!(nav.state().full_location(), "/membroj?filter=active");
}

#[test]
fn test_lower_view_data_survives_push() {
    let (mut nav, _) = navigator();
    nav.start("/membroj", None).unwrap();
    nav.set_caller_data(0, json!({"scroll": 300})).unwrap();
    nav.push("42").unwrap();
    nav.push("notoj").unwrap();

    assert_eq!(current_names(&nav), vec!["members", "member", "notes"]);
    assert_eq!(
        nav.state().stack().get(0).unwrap().data,
        json!({"scroll": 300})
    );
}

// ---- state overlay ----

#[test]
fn test_history_overlay_attaches_to_detail() {
    let (mut nav, _) = navigator();
    nav.start("/membroj/42", None).unwrap();
    nav.push("historio").unwrap();

    let stack = nav.state().stack();
    assert_eq!(stack.len(), 2);
    let detail = stack.get(1).unwrap();
    assert_eq!(detail.state_path, "/historio");
    assert_eq!(detail.attached("history").unwrap().segment, "historio");
    assert_eq!(nav.state().full_location(), "/membroj/42/historio");

    nav.pop().unwrap();
    assert_eq!(nav.state().stack().len(), 2);
    assert!(nav.state().stack().top().unwrap().attached_state.is_empty());
}

// ---- popstate ----

#[test]
fn test_back_restores_stored_stack() {
    let (mut nav, clock) = navigator();
    nav.start("/membroj?filter=active", None).unwrap();
    settle(&mut nav, &clock);

    nav.push("42").unwrap();
    nav.set_caller_data(1, json!({"tab": 2})).unwrap();
    settle(&mut nav, &clock);
    nav.push("notoj").unwrap();
    assert_eq!(nav.backend().len(), 3);

    let entry = nav.backend_mut().back().cloned().unwrap();
    assert_eq!(entry.url, "/membroj/42");
    let outcome = nav.on_pop_state(&entry.url, Some(entry.state)).unwrap();

    assert_eq!(outcome, PopStateOutcome::Applied);
    assert_eq!(current_names(&nav), vec!["members", "member"]);
    assert_eq!(nav.state().stack().get(0).unwrap().query, "filter=active");
    assert_eq!(nav.state().stack().get(1).unwrap().data, json!({"tab": 2}));
    assert!(nav.persistence().pending().is_some());
}

#[test]
fn test_reload_restores_lower_views() {
    let (mut nav, _) = navigator();
    nav.start("/membroj?filter=active", None).unwrap();
    nav.set_caller_data(0, json!({"scroll": 12})).unwrap();
    nav.push("42").unwrap();
    let entry = nav.backend().current().unwrap().clone();

    let (mut reloaded, _) = navigator();
    reloaded.start(&entry.url, Some(entry.state)).unwrap();
    assert_eq!(reloaded.state().stack(), nav.state().stack());
}

#[test]
fn test_foreign_history_state_is_ignored() {
    let stored = HistoryState::from_value(&json!({"stack": "not-a-list"}));
    assert!(stored.is_none());

    let (mut nav, _) = navigator();
    nav.on_pop_state("/membroj/42", stored).unwrap();
    assert_eq!(current_names(&nav), vec!["members", "member"]);
}

// ---- query changes and persistence timing ----

#[test]
fn test_query_change_on_top_pushes() {
    let (mut nav, _) = navigator();
    nav.start("/membroj", None).unwrap();
    nav.on_query_change(0, "filter=x", WriteIntent::Push).unwrap();
    assert_eq!(nav.backend().push_count(), 1);
    assert_eq!(nav.backend().current().unwrap().url, "/membroj?filter=x");
}

#[test]
fn test_query_change_below_top_only_replaces() {
    let (mut nav, clock) = navigator();
    nav.start("/membroj", None).unwrap();
    nav.push("42").unwrap();

    nav.on_query_change(0, "filter=y", WriteIntent::Push).unwrap();
    assert_eq!(nav.backend().push_count(), 1);
    assert_eq!(nav.state().url_location(), "/membroj/42");

    settle(&mut nav, &clock);
    let current = nav.backend().current().unwrap();
    assert_eq!(current.url, "/membroj/42");
    assert_eq!(current.state.stack[0].query, "filter=y");
}

#[test]
fn test_rapid_replaces_coalesce() {
    let (mut nav, clock) = navigator();
    nav.start("/membroj", None).unwrap();
    for query in ["q=a", "q=ab", "q=abc"] {
        nav.on_query_change(0, query, WriteIntent::Replace).unwrap();
        clock.advance(REPLACE_DELAY / 2);
        assert!(!nav.poll());
    }
    clock.advance(REPLACE_DELAY);
    assert!(nav.poll());
    assert_eq!(nav.backend().replace_count(), 1);
    assert_eq!(nav.backend().current().unwrap().url, "/membroj?q=abc");
}

#[test]
fn test_push_cancels_stale_replace() {
    let (mut nav, clock) = navigator();
    nav.start("/membroj", None).unwrap();
    nav.on_query_change(0, "q=stale", WriteIntent::Replace).unwrap();
    nav.push("42").unwrap();

    clock.advance(REPLACE_DELAY * 10);
    assert!(!nav.poll());
    assert_eq!(nav.backend().replace_count(), 0);
    assert_eq!(nav.backend().current().unwrap().url, "/membroj/42");
    assert_eq!(
        nav.backend().current().unwrap().state.stack[0].query,
        "q=stale"
    );
}

#[test]
fn test_throttled_history_waits_longer() {
    let config = NavigatorConfig::default().with_throttled_history(true);
    let (mut nav, clock) = navigator_with(config, Permissions::unrestricted());
    nav.start("/membroj", None).unwrap();

    settle(&mut nav, &clock);
    assert!(nav.backend().is_empty());
    clock.advance(REPLACE_DELAY * 9);
    assert!(nav.poll());
}

// ---- stack truncation ----

#[test]
fn test_pop_stack_until_including() {
    let (mut nav, _) = navigator();
    nav.start("/membroj/42/notoj", None).unwrap();
    let member = route_id(nav.tree(), "member");

    assert!(nav.pop_stack_until_including(|v| v.route == member).unwrap());
    assert_eq!(nav.state().full_location(), "/membroj");

    let congress = route_id(nav.tree(), "congress");
    assert!(!nav.pop_stack_until_including(|v| v.route == congress).unwrap());
    assert_eq!(
        nav.pop_stack_until_including(|_| true).unwrap_err(),
        NavigationError::CannotPopRoot
    );
}

#[test]
fn test_pop_stack_at_pushes_history() {
    let (mut nav, _) = navigator();
    nav.start("/membroj/42/notoj", None).unwrap();
    nav.pop_stack_at(2).unwrap();
    assert_eq!(nav.backend().current().unwrap().url, "/membroj/42");
    assert!(nav.pop_stack_at(2).is_ok());
    assert_eq!(nav.backend().push_count(), 1);
}

// ---- out-of-tree push ----

#[test]
fn test_out_of_tree_push_keeps_ancestors() {
    let (mut nav, _) = navigator();
    nav.start("/membroj/42", None).unwrap();
    nav.set_caller_data(1, json!("kept")).unwrap();

    nav.navigate("/kongresoj/7", NavigateOptions::push().out_of_tree())
        .unwrap();
    assert_eq!(current_names(&nav), vec!["members", "member", "congress"]);
    assert_eq!(nav.state().full_location(), "/kongresoj/7");
    assert_eq!(nav.state().stack().get(1).unwrap().data, json!("kept"));
}

// ---- permissions ----

#[test]
fn test_permission_upgrade_reparses() {
    let (mut nav, _) = navigator_with(NavigatorConfig::default(), Permissions::none());
    nav.start("/administrado/agordoj", None).unwrap();
    assert_eq!(nav.current_route(), Some(RouteTree::FORBIDDEN));
    assert_eq!(nav.state().full_location(), "/administrado/agordoj");

    let changed = nav
        .set_permissions(Arc::new(Permissions::granted(["admin"])))
        .unwrap();
    assert!(changed);
    assert_eq!(current_names(&nav), vec!["admin", "settings"]);
    assert_eq!(nav.state().full_location(), "/administrado/agordoj");
    assert!(nav.persistence().pending().is_some());
}

#[test]
fn test_permission_upgrade_keeps_query_on_top() {
    let (mut nav, _) = navigator_with(NavigatorConfig::default(), Permissions::none());
    nav.start("/administrado/agordoj?tab=2", None).unwrap();
    assert_eq!(nav.current_route(), Some(RouteTree::FORBIDDEN));

    nav.set_permissions(Arc::new(Permissions::granted(["admin"])))
        .unwrap();
    assert_eq!(current_names(&nav), vec!["admin", "settings"]);
    assert_eq!(nav.state().stack().get(0).unwrap().query, "");
    assert_eq!(nav.state().query(), "tab=2");

    nav.pop().unwrap();
    assert_eq!(nav.state().full_location(), "/administrado");
}

#[test]
fn test_permission_change_keeps_caller_data() {
    let (mut nav, _) = navigator_with(
        NavigatorConfig::default(),
        Permissions::granted(["admin"]),
    );
    nav.start("/membroj/42", None).unwrap();
    nav.set_caller_data(1, json!({"draft": "unsaved"})).unwrap();

    assert!(nav
        .set_permissions(Arc::new(Permissions::granted(["admin", "secret"])))
        .unwrap());
    assert_eq!(
        nav.state().stack().get(1).unwrap().data,
        json!({"draft": "unsaved"})
    );
    let pending = nav.persistence().pending().unwrap();
    assert_eq!(pending.state.stack[1].data, json!({"draft": "unsaved"}));
}

#[test]
fn test_encoded_location_round_trips_through_navigator() {
    let (mut nav, _) = navigator();
    nav.start("/membroj?q=a b", None).unwrap();
    assert_eq!(nav.state().full_location(), "/membroj?q=a%20b");
    assert_eq!(current_names(&nav), vec!["members"]);
}

#[test]
fn test_permission_downgrade_forbids() {
    let (mut nav, _) = navigator_with(
        NavigatorConfig::default(),
        Permissions::granted(["admin"]),
    );
    nav.start("/administrado", None).unwrap();
    nav.set_permissions(Arc::new(Permissions::none())).unwrap();
    assert_eq!(nav.current_route(), Some(RouteTree::FORBIDDEN));
}

#[cfg(feature = "cache")]
#[test]
fn test_match_cache_is_invalidated_by_permissions() {
    let (mut nav, _) = navigator_with(NavigatorConfig::default(), Permissions::none());
    nav.start("/membroj", None).unwrap();
    nav.replace("/membroj?x=1").unwrap();
    assert_eq!(nav.cache_stats().hits, 1);

    nav.set_permissions(Arc::new(Permissions::unrestricted()))
        .unwrap();
    assert_eq!(nav.cache_stats().invalidations, 1);
}

// ---- faults ----

#[test]
fn test_fault_is_sticky_until_reload() {
    let (mut nav, clock) = navigator();
    nav.start("/membroj", None).unwrap();
    nav.report_fault("member list failed to render", None);

    assert!(nav.is_faulted());
    assert!(matches!(
        nav.push("42"),
        Err(NavigationError::Faulted { .. })
    ));
    assert!(matches!(
        nav.set_permissions(Arc::new(Permissions::none())),
        Err(NavigationError::Faulted { .. })
    ));
    assert!(matches!(
        nav.pop_stack_at(1),
        Err(NavigationError::Faulted { .. })
    ));
    assert_eq!(
        nav.on_pop_state("/membroj", None).unwrap(),
        PopStateOutcome::ReloadRequired
    );

    // The pending replace from start was dropped.
    settle(&mut nav, &clock);
    assert!(nav.backend().is_empty());
}

#[test]
fn test_caller_errors_do_not_fault() {
    let (mut nav, _) = navigator();
    nav.start("/membroj", None).unwrap();
    let before = nav.state().clone();

    assert!(nav.pop_stack_at(0).is_err());
    assert!(nav.set_caller_data(9, json!(null)).is_err());
    assert!(nav.navigate("http://[::1", NavigateOptions::push()).is_err());

    assert!(!nav.is_faulted());
    assert_eq!(nav.state(), &before);
}
