//! Permission gating for route descriptors.
//!
//! A route may carry a [`Permission`] predicate. While matching, the predicate
//! is evaluated against the caller's [`PermissionSet`]; a failed check turns
//! the rest of the path into a synthetic forbidden view.
//!
//! Before the real permission set has loaded, hosts pass an *unrestricted*
//! set ([`Permissions::unrestricted`]). It bypasses every check so the first
//! paint never flashes a forbidden page. Replacing it with the real set
//! re-parses the location (see [`Navigator::set_permissions`]).
//!
//! [`Navigator::set_permissions`]: crate::Navigator::set_permissions
//!
//! # Example
//!
//! ```
//! use stacked_navigator::{Permission, Permissions, PermissionSet};
//!
//! let perms = Permissions::granted(["codeholders.read"]);
//! assert!(Permission::named("codeholders.read").is_satisfied_by(&perms));
//! assert!(!Permission::named("codeholders.update").is_satisfied_by(&perms));
//!
//! // The boot-time sentinel lets everything through.
//! assert!(Permissions::unrestricted().is_unrestricted());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// PermissionSet trait
// ============================================================================

/// The caller's permissions, as seen by the matcher.
pub trait PermissionSet: fmt::Debug {
    /// Membership test for a single permission string.
    fn has_permission(&self, permission: &str) -> bool;

    /// `true` for the boot-time sentinel that bypasses all checks.
    fn is_unrestricted(&self) -> bool {
        false
    }
}

/// Function type for custom permission predicates.
pub type PermissionFn = Arc<dyn Fn(&dyn PermissionSet) -> bool + Send + Sync>;

// ============================================================================
// Permission predicate
// ============================================================================

/// Predicate attached to a route descriptor.
#[derive(Clone)]
pub enum Permission {
    /// Requires one named permission.
    Named(String),
    /// Requires at least one of the listed permissions.
    AnyOf(Vec<String>),
    /// Requires every listed permission.
    AllOf(Vec<String>),
    /// Arbitrary predicate over the permission set.
    Custom(PermissionFn),
}

impl Permission {
    /// Require a single named permission.
    pub fn named(permission: impl Into<String>) -> Self {
        Self::Named(permission.into())
    }

    /// Require at least one of `permissions`.
    pub fn any_of<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(permissions.into_iter().map(Into::into).collect())
    }

    /// Require all of `permissions`.
    pub fn all_of<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllOf(permissions.into_iter().map(Into::into).collect())
    }

    /// Build a predicate from a closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&dyn PermissionSet) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Evaluate the predicate. The unrestricted sentinel always passes.
    pub fn is_satisfied_by(&self, permissions: &dyn PermissionSet) -> bool {
        if permissions.is_unrestricted() {
            return true;
        }
        match self {
            Self::Named(p) => permissions.has_permission(p),
            Self::AnyOf(ps) => ps.iter().any(|p| permissions.has_permission(p)),
            Self::AllOf(ps) => ps.iter().all(|p| permissions.has_permission(p)),
            Self::Custom(f) => f(permissions),
        }
    }
}

impl fmt::Debug for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(p) => f.debug_tuple("Named").field(p).finish(),
            Self::AnyOf(ps) => f.debug_tuple("AnyOf").field(ps).finish(),
            Self::AllOf(ps) => f.debug_tuple("AllOf").field(ps).finish(),
            Self::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

// ============================================================================
// Permissions
// ============================================================================

/// A plain set of granted permission strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    granted: HashSet<String>,
    unrestricted: bool,
}

impl Permissions {
    /// The boot-time sentinel: every check passes.
    pub fn unrestricted() -> Self {
        Self {
            granted: HashSet::new(),
            unrestricted: true,
        }
    }

    /// An empty set: every gated route is forbidden.
    pub fn none() -> Self {
        Self::default()
    }

    /// A set holding exactly `permissions`.
    pub fn granted<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: permissions.into_iter().map(Into::into).collect(),
            unrestricted: false,
        }
    }

    /// Add a permission.
    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.granted.insert(permission.into());
        self
    }

    /// Number of granted permissions.
    pub fn len(&self) -> usize {
        self.granted.len()
    }

    /// `true` if nothing is granted.
    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }
}

impl PermissionSet for Permissions {
    fn has_permission(&self, permission: &str) -> bool {
        self.unrestricted || self.granted.contains(permission)
    }

    fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_permission() {
        let perms = Permissions::granted(["codeholders.read"]);
        assert!(Permission::named("codeholders.read").is_satisfied_by(&perms));
        assert!(!Permission::named("codeholders.delete").is_satisfied_by(&perms));
    }

    #[test]
    fn test_any_and_all_of() {
        let perms = Permissions::none().grant("a").grant("b");
        assert!(Permission::any_of(["x", "b"]).is_satisfied_by(&perms));
        assert!(!Permission::any_of(["x", "y"]).is_satisfied_by(&perms));
        assert!(Permission::all_of(["a", "b"]).is_satisfied_by(&perms));
        assert!(!Permission::all_of(["a", "c"]).is_satisfied_by(&perms));
    }

    #[test]
    fn test_unrestricted_bypasses_custom() {
        let deny_all = Permission::custom(|_| false);
        assert!(deny_all.is_satisfied_by(&Permissions::unrestricted()));
        assert!(!deny_all.is_satisfied_by(&Permissions::none()));
    }

    #[test]
    fn test_custom_sees_the_set() {
        let either = Permission::custom(|p| p.has_permission("admin") || p.has_permission("ok"));
        assert!(either.is_satisfied_by(&Permissions::granted(["ok"])));
        assert!(!either.is_satisfied_by(&Permissions::granted(["nope"])));
    }

    #[test]
    fn test_debug_hides_closure() {
        let p = Permission::custom(|_| true);
        assert_eq!(format!("{:?}", p), "Custom(<fn>)");
    }
}
