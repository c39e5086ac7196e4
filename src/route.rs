//! Route descriptor tree.
//!
//! Routes are declared with the [`Route`] builder and frozen into a
//! [`RouteTree`] arena. Each descriptor gets a stable [`RouteId`], so "same
//! route" checks during reconciliation are plain integer comparisons and a
//! stack can be compared or serialized without aliasing concerns.
//!
//! Every descriptor matches exactly one path segment and has a [`RouteKind`]:
//!
//! | Kind | Effect on the view stack |
//! |------|--------------------------|
//! | [`RouteKind::Bottom`] | clears the stack, pushes a root view |
//! | [`RouteKind::Stack`] | pushes a view on top |
//! | [`RouteKind::State`] | attaches state to the current top view |
//!
//! # Example
//!
//! ```
//! use stacked_navigator::{Permission, Route, RouteCategory, RouteTree};
//!
//! let tree = RouteTree::builder()
//!     .route(Route::bottom("").name("home"))
//!     .category(RouteCategory::new(
//!         "members",
//!         vec![Route::bottom("membroj")
//!             .name("members")
//!             .permission(Permission::named("codeholders.read"))
//!             .child(
//!                 Route::stack_pattern(r"(\d+)")
//!                     .unwrap()
//!                     .name("member")
//!                     .child(Route::state("historio", "history")),
//!             )],
//!     ))
//!     .build();
//!
//! assert_eq!(tree.top_level().len(), 2);
//! assert!(tree.find_by_name("member").is_some());
//! ```

use crate::error::RouteTreeError;
use crate::permissions::Permission;
use regex::Regex;
use std::fmt;

// ============================================================================
// Identity and kind
// ============================================================================

/// Stable handle of a descriptor inside its [`RouteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(u32);

impl RouteId {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Arena index of this descriptor.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stack effect of a matched segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// Push a new view.
    Stack,
    /// Attach state to the current top view under `key`.
    State { key: String },
    /// Clear the stack and push a root view.
    Bottom,
}

impl RouteKind {
    /// Whether a match of this kind produces its own view record.
    pub fn pushes_view(&self) -> bool {
        !matches!(self, Self::State { .. })
    }
}

// ============================================================================
// Segment matching
// ============================================================================

/// How a descriptor recognises its path segment.
#[derive(Clone)]
pub enum SegmentMatcher {
    /// Exact string equality.
    Exact(String),
    /// Regular expression anchored to the whole segment.
    Pattern(Regex),
}

impl SegmentMatcher {
    /// Match a literal segment.
    pub fn exact(segment: impl Into<String>) -> Self {
        Self::Exact(segment.into())
    }

    /// Match segments against `pattern`. The pattern is anchored at both ends.
    pub fn pattern(pattern: &str) -> Result<Self, RouteTreeError> {
        Regex::new(&format!("^(?:{pattern})$"))
            .map(Self::Pattern)
            .map_err(|source| RouteTreeError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Try to match `segment`, returning its captures.
    ///
    /// Exact matches capture nothing. Patterns capture their groups in order
    /// (unmatched optional groups become empty strings); a pattern without
    /// groups captures the whole segment.
    pub fn match_segment(&self, segment: &str) -> Option<Vec<String>> {
        match self {
            Self::Exact(s) => (s == segment).then(Vec::new),
            Self::Pattern(re) => {
                let caps = re.captures(segment)?;
                if caps.len() <= 1 {
                    return Some(vec![segment.to_string()]);
                }
                Some(
                    caps.iter()
                        .skip(1)
                        .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                        .collect(),
                )
            }
        }
    }
}

impl From<&str> for SegmentMatcher {
    fn from(segment: &str) -> Self {
        Self::exact(segment)
    }
}

impl From<String> for SegmentMatcher {
    fn from(segment: String) -> Self {
        Self::Exact(segment)
    }
}

impl fmt::Debug for SegmentMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
        }
    }
}

// ============================================================================
// Route builder
// ============================================================================

/// Declarative route descriptor, frozen into a [`RouteTree`] on build.
#[derive(Debug, Clone)]
pub struct Route {
    matcher: SegmentMatcher,
    kind: RouteKind,
    permission: Option<Permission>,
    name: Option<String>,
    children: Vec<Route>,
}

impl Route {
    /// Create a descriptor of any kind.
    pub fn new(kind: RouteKind, matcher: impl Into<SegmentMatcher>) -> Self {
        Self {
            matcher: matcher.into(),
            kind,
            permission: None,
            name: None,
            children: Vec::new(),
        }
    }

    /// A root-level view that clears everything below it.
    pub fn bottom(matcher: impl Into<SegmentMatcher>) -> Self {
        Self::new(RouteKind::Bottom, matcher)
    }

    /// A view pushed on top of the current stack.
    pub fn stack(matcher: impl Into<SegmentMatcher>) -> Self {
        Self::new(RouteKind::Stack, matcher)
    }

    /// Sub-state attached to the current top view under `key`.
    pub fn state(matcher: impl Into<SegmentMatcher>, key: impl Into<String>) -> Self {
        Self::new(RouteKind::State { key: key.into() }, matcher)
    }

    /// [`Route::stack`] with a pattern matcher.
    pub fn stack_pattern(pattern: &str) -> Result<Self, RouteTreeError> {
        Ok(Self::stack(SegmentMatcher::pattern(pattern)?))
    }

    /// [`Route::bottom`] with a pattern matcher.
    pub fn bottom_pattern(pattern: &str) -> Result<Self, RouteTreeError> {
        Ok(Self::bottom(SegmentMatcher::pattern(pattern)?))
    }

    /// Append children matched after this segment.
    pub fn children(mut self, children: impl IntoIterator<Item = Route>) -> Self {
        self.children.extend(children);
        self
    }

    /// Append one child.
    pub fn child(mut self, child: Route) -> Self {
        self.children.push(child);
        self
    }

    /// Gate this route behind a permission predicate.
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Name the route, for titles and lookups.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A named group of top-level routes without a path segment of its own.
///
/// Categories only exist for organisation (e.g. sidebar sections); the
/// matcher sees their routes as ordinary top-level entries.
#[derive(Debug, Clone)]
pub struct RouteCategory {
    name: String,
    routes: Vec<Route>,
}

impl RouteCategory {
    /// Create a category.
    pub fn new(name: impl Into<String>, routes: Vec<Route>) -> Self {
        Self {
            name: name.into(),
            routes,
        }
    }
}

// ============================================================================
// Frozen tree
// ============================================================================

/// A descriptor inside a [`RouteTree`].
#[derive(Debug, Clone)]
pub struct RouteNode {
    id: RouteId,
    matcher: SegmentMatcher,
    kind: RouteKind,
    permission: Option<Permission>,
    name: Option<String>,
    category: Option<String>,
    parent: Option<RouteId>,
    children: Vec<RouteId>,
}

impl RouteNode {
    /// Identity of this descriptor.
    pub fn id(&self) -> RouteId {
        self.id
    }

    /// Segment matcher.
    pub fn matcher(&self) -> &SegmentMatcher {
        &self.matcher
    }

    /// Stack effect.
    pub fn kind(&self) -> &RouteKind {
        &self.kind
    }

    /// Permission predicate, if gated.
    pub fn permission(&self) -> Option<&Permission> {
        self.permission.as_ref()
    }

    /// Route name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Top-level category this route was declared in.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Parent descriptor; `None` for top-level and synthetic routes.
    pub fn parent(&self) -> Option<RouteId> {
        self.parent
    }

    /// Child descriptors in declaration order.
    pub fn children(&self) -> &[RouteId] {
        &self.children
    }
}

/// Immutable arena of route descriptors.
///
/// Build once and share as `Arc<RouteTree>`; the navigator never mutates it.
#[derive(Debug, Clone)]
pub struct RouteTree {
    nodes: Vec<RouteNode>,
    top_level: Vec<RouteId>,
}

impl RouteTree {
    /// Synthetic descriptor bound to unmatched paths.
    pub const NOT_FOUND: RouteId = RouteId(0);
    /// Synthetic descriptor bound to paths the caller may not see.
    pub const FORBIDDEN: RouteId = RouteId(1);

    /// Start declaring a tree.
    pub fn builder() -> RouteTreeBuilder {
        RouteTreeBuilder::new()
    }

    /// Look up a descriptor.
    pub fn get(&self, id: RouteId) -> Option<&RouteNode> {
        self.nodes.get(id.index())
    }

    /// Descriptor for an id handed out by this tree.
    pub(crate) fn node(&self, id: RouteId) -> &RouteNode {
        &self.nodes[id.index()]
    }

    /// Top-level descriptors, categories flattened, in declaration order.
    pub fn top_level(&self) -> &[RouteId] {
        &self.top_level
    }

    /// Candidates for the segment after `cursor` (`None` = top level).
    pub fn candidates(&self, cursor: Option<RouteId>) -> &[RouteId] {
        match cursor {
            None => &self.top_level,
            Some(id) => match self.get(id) {
                Some(node) => &node.children,
                None => &[],
            },
        }
    }

    /// First descriptor registered under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<RouteId> {
        self.nodes
            .iter()
            .find(|n| n.name.as_deref() == Some(name))
            .map(|n| n.id)
    }

    /// `true` for the not-found and forbidden descriptors.
    pub fn is_synthetic(id: RouteId) -> bool {
        id == Self::NOT_FOUND || id == Self::FORBIDDEN
    }

    /// Number of descriptors, synthetic ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if no real routes were declared.
    pub fn is_empty(&self) -> bool {
        self.top_level.is_empty()
    }
}

/// Builder returned by [`RouteTree::builder`].
#[derive(Debug)]
pub struct RouteTreeBuilder {
    tree: RouteTree,
}

impl RouteTreeBuilder {
    fn new() -> Self {
        let synthetic = |id: RouteId, name: &str| RouteNode {
            id,
            matcher: SegmentMatcher::exact(""),
            kind: RouteKind::Bottom,
            permission: None,
            name: Some(name.to_string()),
            category: None,
            parent: None,
            children: Vec::new(),
        };
        Self {
            tree: RouteTree {
                nodes: vec![
                    synthetic(RouteTree::NOT_FOUND, "not-found"),
                    synthetic(RouteTree::FORBIDDEN, "forbidden"),
                ],
                top_level: Vec::new(),
            },
        }
    }

    /// Add an uncategorised top-level route.
    pub fn route(mut self, route: Route) -> Self {
        let id = self.insert(route, None, None);
        self.tree.top_level.push(id);
        self
    }

    /// Add a category; its routes become top-level entries.
    pub fn category(mut self, category: RouteCategory) -> Self {
        for route in category.routes {
            let id = self.insert(route, None, Some(&category.name));
            self.tree.top_level.push(id);
        }
        self
    }

    /// Freeze the tree.
    pub fn build(self) -> RouteTree {
        crate::debug_log!(
            "Built route tree: {} descriptors, {} top-level",
            self.tree.nodes.len(),
            self.tree.top_level.len()
        );
        self.tree
    }

    fn insert(&mut self, route: Route, parent: Option<RouteId>, category: Option<&str>) -> RouteId {
        #[allow(clippy::cast_possible_truncation)]
        let id = RouteId(self.tree.nodes.len() as u32);
        self.tree.nodes.push(RouteNode {
            id,
            matcher: route.matcher,
            kind: route.kind,
            permission: route.permission,
            name: route.name,
            category: category.map(str::to_string),
            parent,
            children: Vec::new(),
        });
        let children: Vec<RouteId> = route
            .children
            .into_iter()
            .map(|child| self.insert(child, Some(id), category))
            .collect();
        self.tree.nodes[id.index()].children = children;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RouteTree {
        RouteTree::builder()
            .route(Route::bottom("").name("home"))
            .category(RouteCategory::new(
                "members",
                vec![Route::bottom("membroj").name("members").child(
                    Route::stack_pattern(r"\d+")
                        .unwrap()
                        .name("member")
                        .child(Route::state("historio", "history")),
                )],
            ))
            .build()
    }

    #[test]
    fn test_synthetic_ids_are_reserved() {
        let tree = sample();
        assert_eq!(tree.get(RouteTree::NOT_FOUND).unwrap().name(), Some("not-found"));
        assert_eq!(tree.get(RouteTree::FORBIDDEN).unwrap().name(), Some("forbidden"));
        assert!(!tree.top_level().contains(&RouteTree::NOT_FOUND));
        assert!(RouteTree::is_synthetic(RouteTree::FORBIDDEN));
    }

    #[test]
    fn test_categories_are_flattened() {
        let tree = sample();
        let names: Vec<_> = tree
            .top_level()
            .iter()
            .map(|id| tree.get(*id).unwrap().name().unwrap())
            .collect();
        assert_eq!(names, vec!["home", "members"]);
        let members = tree.find_by_name("members").unwrap();
        assert_eq!(tree.get(members).unwrap().category(), Some("members"));
    }

    #[test]
    fn test_parent_links() {
        let tree = sample();
        let member = tree.find_by_name("member").unwrap();
        let node = tree.get(member).unwrap();
        assert_eq!(node.parent(), tree.find_by_name("members"));
        let history = node.children()[0];
        assert_eq!(
            tree.get(history).unwrap().kind(),
            &RouteKind::State {
                key: "history".into()
            }
        );
        assert_eq!(tree.candidates(Some(member)), &[history]);
    }

    #[test]
    fn test_exact_matcher() {
        let m = SegmentMatcher::from("membroj");
        assert_eq!(m.match_segment("membroj"), Some(vec![]));
        assert_eq!(m.match_segment("membro"), None);
    }

    #[test]
    fn test_pattern_is_anchored() {
        let m = SegmentMatcher::pattern(r"\d+").unwrap();
        assert_eq!(m.match_segment("42"), Some(vec!["42".to_string()]));
        assert_eq!(m.match_segment("42a"), None);
        assert_eq!(m.match_segment("a42"), None);
    }

    #[test]
    fn test_pattern_groups() {
        let m = SegmentMatcher::pattern(r"(\d+)(?:-(\w+))?").unwrap();
        assert_eq!(
            m.match_segment("7-draft"),
            Some(vec!["7".to_string(), "draft".to_string()])
        );
        assert_eq!(
            m.match_segment("7"),
            Some(vec!["7".to_string(), String::new()])
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Route::stack_pattern("(").unwrap_err();
        assert!(matches!(err, RouteTreeError::InvalidPattern { .. }));
    }
}
