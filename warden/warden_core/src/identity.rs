//! Requester identities.
//!
//! Identities are supplied by the caller after authentication has happened
//! elsewhere; Warden only reads them. A [`Subject`] bundles the identities of one
//! requester with the permissions its execution domain already carries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::permission::Permission;
use crate::permission_set::PermissionSet;

/// An identity claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    /// A single named principal
    Principal(String),

    /// A named group of identities
    Group {
        /// Group name
        name: String,

        /// Member identities (may contain nested groups)
        members: Vec<Identity>,
    },
}

impl Identity {
    /// Create a principal identity
    pub fn principal(name: impl Into<String>) -> Self {
        Self::Principal(name.into())
    }

    /// Create a group identity
    pub fn group(name: impl Into<String>, members: Vec<Identity>) -> Self {
        Self::Group {
            name: name.into(),
            members,
        }
    }

    /// The name of this identity
    pub fn name(&self) -> &str {
        match self {
            Self::Principal(name) => name,
            Self::Group { name, .. } => name,
        }
    }

    /// Whether this identity is a group
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }

    /// Group members; empty for principals
    pub fn members(&self) -> &[Identity] {
        match self {
            Self::Principal(_) => &[],
            Self::Group { members, .. } => members,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Principal(name) => write!(f, "{}", name),
            Self::Group { name, members } => {
                write!(f, "{}[", name)?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", member)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// The requester of a permission check.
///
/// Carries the requester's identity claims and the permissions its execution
/// domain holds on its own account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Identity claims
    #[serde(default)]
    identities: Vec<Identity>,

    /// Permissions held by the requester's domain
    #[serde(default)]
    permissions: PermissionSet,
}

impl Subject {
    /// Create a subject with no identities and no permissions
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a subject with a single principal identity
    pub fn principal(name: impl Into<String>) -> Self {
        Self::new().with_identity(Identity::principal(name))
    }

    /// Add an identity claim
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identities.push(identity);
        self
    }

    /// Add several identity claims
    pub fn with_identities(mut self, identities: impl IntoIterator<Item = Identity>) -> Self {
        self.identities.extend(identities);
        self
    }

    /// Add a permission held by the requester's domain
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.add(permission);
        self
    }

    /// Identity claims
    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    /// Permissions held by the requester's domain
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Whether the subject carries no identity claims
    pub fn is_anonymous(&self) -> bool {
        self.identities.is_empty()
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subject(")?;
        for (i, identity) in self.identities.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", identity)?;
        }
        write!(f, ")")
    }
}
