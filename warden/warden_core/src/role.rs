//! Identity-to-role mapping.
//!
//! A [`RoleMapper`] turns the identity claims of a requester into the role names a
//! policy context grants permissions to. Mappers are injected; a context without
//! one resolves every requester to no roles at all.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::trace;

use crate::error::Result;
use crate::identity::Identity;

/// Maps identity claims to role names.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use warden_core::{Identity, Result, RoleMapper};
///
/// #[derive(Debug)]
/// struct Everyone;
///
/// impl RoleMapper for Everyone {
///     fn roles(&self, _identities: &[Identity]) -> Result<HashSet<String>> {
///         Ok(["everyone".to_string()].into_iter().collect())
///     }
/// }
///
/// let roles = Everyone.roles(&[Identity::principal("alice")]).unwrap();
/// assert!(roles.contains("everyone"));
/// ```
pub trait RoleMapper: Send + Sync + fmt::Debug {
    /// Returns the roles bound to the given identities.
    ///
    /// Implementations return an empty set when nothing maps; an error means the
    /// mapping itself failed and the caller must not treat it as "no roles".
    fn roles(&self, identities: &[Identity]) -> Result<HashSet<String>>;
}

/// Treats the names of all non-group identities as role names.
///
/// Groups contribute the names of their members (recursively) rather than their
/// own name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameRoleMapper;

impl NameRoleMapper {
    /// Create a new name role mapper
    pub fn new() -> Self {
        Self
    }

    fn collect(identity: &Identity, roles: &mut HashSet<String>) {
        match identity {
            Identity::Principal(name) => {
                if !name.is_empty() {
                    roles.insert(name.clone());
                }
            }
            Identity::Group { members, .. } => {
                for member in members {
                    Self::collect(member, roles);
                }
            }
        }
    }
}

impl RoleMapper for NameRoleMapper {
    fn roles(&self, identities: &[Identity]) -> Result<HashSet<String>> {
        let mut roles = HashSet::new();
        for identity in identities {
            Self::collect(identity, &mut roles);
        }
        trace!(?identities, ?roles, "Identity names mapped to roles");
        Ok(roles)
    }
}

/// Maps identity names to roles through an explicit table.
///
/// Both principal names and group names are looked up; members of groups are
/// visited as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticRoleMapper {
    bindings: HashMap<String, HashSet<String>>,
}

impl StaticRoleMapper {
    /// Create an empty mapper
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an identity name to a role
    pub fn bind(mut self, identity: impl Into<String>, role: impl Into<String>) -> Self {
        self.insert(identity, role);
        self
    }

    /// Bind an identity name to a role in place
    pub fn insert(&mut self, identity: impl Into<String>, role: impl Into<String>) {
        self.bindings
            .entry(identity.into())
            .or_default()
            .insert(role.into());
    }

    /// Number of identity names with at least one binding
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn collect(&self, identity: &Identity, roles: &mut HashSet<String>) {
        if let Some(bound) = self.bindings.get(identity.name()) {
            roles.extend(bound.iter().cloned());
        }
        for member in identity.members() {
            self.collect(member, roles);
        }
    }
}

impl RoleMapper for StaticRoleMapper {
    fn roles(&self, identities: &[Identity]) -> Result<HashSet<String>> {
        let mut roles = HashSet::new();
        for identity in identities {
            self.collect(identity, &mut roles);
        }
        trace!(?identities, ?roles, "Role bindings resolved");
        Ok(roles)
    }
}

impl FromIterator<(String, String)> for StaticRoleMapper {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut mapper = Self::new();
        for (identity, role) in iter {
            mapper.insert(identity, role);
        }
        mapper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(roles: HashSet<String>) -> Vec<String> {
        let mut roles: Vec<_> = roles.into_iter().collect();
        roles.sort();
        roles
    }

    #[test]
    fn test_name_mapper_uses_principal_names() {
        let roles = NameRoleMapper
            .roles(&[Identity::principal("admin"), Identity::principal("auditor")])
            .unwrap();
        assert_eq!(sorted(roles), vec!["admin", "auditor"]);
    }

    #[test]
    fn test_name_mapper_flattens_groups() {
        let nested = Identity::group(
            "staff",
            vec![
                Identity::principal("alice"),
                Identity::group("ops", vec![Identity::principal("bob")]),
            ],
        );
        let roles = NameRoleMapper.roles(&[nested]).unwrap();
        assert_eq!(sorted(roles), vec!["alice", "bob"]);
    }

    #[test]
    fn test_name_mapper_empty_input() {
        assert!(NameRoleMapper.roles(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_static_mapper_bindings() {
        let mapper = StaticRoleMapper::new()
            .bind("alice", "admin")
            .bind("alice", "auditor")
            .bind("ops", "operator");

        let roles = mapper.roles(&[Identity::principal("alice")]).unwrap();
        assert_eq!(sorted(roles), vec!["admin", "auditor"]);

        let group = Identity::group("ops", vec![Identity::principal("alice")]);
        let roles = mapper.roles(&[group]).unwrap();
        assert_eq!(sorted(roles), vec!["admin", "auditor", "operator"]);

        let roles = mapper.roles(&[Identity::principal("mallory")]).unwrap();
        assert!(roles.is_empty());
    }
}
