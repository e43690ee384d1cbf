use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::Result;
use crate::permission::Permission;

/// A collection of permissions with an `implies` query.
///
/// Order is irrelevant and duplicates are ignored. An empty set implies nothing.
/// Iteration order is stable (sorted), which keeps snapshots and log output
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    permissions: BTreeSet<Permission>,
}

impl PermissionSet {
    /// Creates a new empty permission set
    pub fn new() -> Self {
        Self {
            permissions: BTreeSet::new(),
        }
    }

    /// Parses every textual permission into a new set
    pub fn parse_all<I, S>(inputs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        inputs
            .into_iter()
            .map(|input| Permission::parse(input.as_ref()))
            .collect()
    }

    /// Adds a permission, returning false if an equal one was already present
    pub fn add(&mut self, permission: Permission) -> bool {
        self.permissions.insert(permission)
    }

    /// Adds every permission of another set
    pub fn add_all(&mut self, other: &PermissionSet) {
        self.permissions.extend(other.permissions.iter().cloned());
    }

    /// Returns true if any member implies the given permission
    pub fn implies(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
            || self.permissions.iter().any(|held| held.implies(permission))
    }

    /// Returns true if an equal permission is a member
    pub fn contains(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// Removes every permission
    pub fn clear(&mut self) {
        self.permissions.clear();
    }

    /// Iterates over the members in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    /// Gets the number of permissions in this set
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns true if this set is empty
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }
}

impl Extend<Permission> for PermissionSet {
    fn extend<I: IntoIterator<Item = Permission>>(&mut self, iter: I) {
        self.permissions.extend(iter);
    }
}

impl IntoIterator for PermissionSet {
    type Item = Permission;
    type IntoIter = std::collections::btree_set::IntoIter<Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.permissions.into_iter()
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::collections::btree_set::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.permissions.iter()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, permission) in self.permissions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", permission)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(inputs: &[&str]) -> PermissionSet {
        PermissionSet::parse_all(inputs).unwrap()
    }

    #[test]
    fn test_empty_set_implies_nothing() {
        let empty = PermissionSet::new();
        assert!(empty.is_empty());
        assert!(!empty.implies(&Permission::parse("*:*:*").unwrap()));
    }

    #[test]
    fn test_implies_through_any_member() {
        let perms = set(&["file:read:/tmp/*", "net:connect:example.com"]);
        assert!(perms.implies(&Permission::parse("file:read:/tmp/a").unwrap()));
        assert!(perms.implies(&Permission::parse("net:connect:example.com").unwrap()));
        assert!(!perms.implies(&Permission::parse("file:write:/tmp/a").unwrap()));
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let mut perms = PermissionSet::new();
        assert!(perms.add(Permission::parse("read:public").unwrap()));
        assert!(!perms.add(Permission::parse("basic:read:public").unwrap()));
        assert_eq!(perms.len(), 1);
    }

    #[test]
    fn test_add_all_and_clear() {
        let mut perms = set(&["read:a"]);
        perms.add_all(&set(&["read:b", "read:a"]));
        assert_eq!(perms.len(), 2);

        perms.clear();
        assert!(perms.is_empty());
    }

    #[test]
    fn test_parse_all_reports_first_error() {
        assert!(PermissionSet::parse_all(["read:a", "broken"]).is_err());
    }

    #[test]
    fn test_display_is_sorted() {
        let perms = set(&["write:b", "read:a"]);
        assert_eq!(perms.to_string(), "{basic:read:a, basic:write:b}");
    }
}
