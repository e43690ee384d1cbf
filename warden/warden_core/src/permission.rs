//! The permission value type.
//!
//! A permission is a `(kind, actions, target)` triple. Permissions form a partial
//! order through [`Permission::implies`]: `a` implies `b` when `a` grants at least
//! everything `b` asks for.
//!
//! # Textual form
//!
//! ```text
//! kind:actions:target     file:read,write:/var/log/*
//! actions:target          read:public            (kind defaults to "basic")
//! ```
//!
//! `actions` is a comma-separated list or `*`. The target is everything after the
//! last separator that is consumed, so it may itself contain `:`.
//!
//! # Examples
//!
//! ```
//! use warden_core::Permission;
//!
//! let broad: Permission = "file:*:/secrets/*".parse().unwrap();
//! let narrow: Permission = "file:read:/secrets/key".parse().unwrap();
//!
//! assert!(broad.implies(&narrow));
//! assert!(!narrow.implies(&broad));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Kind assigned to permissions written in the two-segment `actions:target` form.
pub const DEFAULT_KIND: &str = "basic";

/// The wildcard token for kinds, actions and targets.
pub const WILDCARD: &str = "*";

/// The set of actions a permission covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionSet {
    /// Every action, written `*`.
    All,

    /// Exactly the listed actions.
    Only(BTreeSet<String>),
}

impl ActionSet {
    /// An action set covering every action.
    pub fn all() -> Self {
        Self::All
    }

    /// An action set covering exactly the given actions.
    ///
    /// A `*` among the actions widens the set to [`ActionSet::All`].
    pub fn of<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for action in actions {
            let action = action.into();
            let action = action.trim();
            if action == WILDCARD {
                return Self::All;
            }
            if !action.is_empty() {
                set.insert(action.to_string());
            }
        }
        Self::Only(set)
    }

    /// Parse a comma-separated action list.
    ///
    /// Returns `None` when the list names no action at all.
    pub fn parse(list: &str) -> Option<Self> {
        let set = Self::of(list.split(','));
        if set.is_empty() {
            None
        } else {
            Some(set)
        }
    }

    /// Whether this set names no action.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::All => false,
            Self::Only(actions) => actions.is_empty(),
        }
    }

    /// Whether this set covers every action in `other`.
    pub fn covers(&self, other: &ActionSet) -> bool {
        match (self, other) {
            (Self::All, _) => true,
            (Self::Only(_), Self::All) => false,
            (Self::Only(mine), Self::Only(theirs)) => theirs.is_subset(mine),
        }
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "{}", WILDCARD),
            Self::Only(actions) => {
                for (i, action) in actions.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", action)?;
                }
                Ok(())
            }
        }
    }
}

/// A concrete capability request or grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission {
    kind: String,
    actions: ActionSet,
    target: String,
}

impl Permission {
    /// Create a new permission.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPermission`] if the kind or the target is blank, or
    /// if the action set is empty.
    pub fn new(
        kind: impl Into<String>,
        actions: ActionSet,
        target: impl Into<String>,
    ) -> Result<Self> {
        let kind = kind.into();
        let target = target.into();
        let permission = Self {
            kind: kind.trim().to_string(),
            actions,
            target: target.trim().to_string(),
        };

        if permission.kind.is_empty() {
            return Err(permission.invalid("kind must not be empty"));
        }
        if permission.target.is_empty() {
            return Err(permission.invalid("target must not be empty"));
        }
        if permission.actions.is_empty() {
            return Err(permission.invalid("at least one action is required"));
        }

        Ok(permission)
    }

    /// Parse a permission from its textual form.
    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }

    /// The permission kind, such as `file` or `net`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The actions this permission covers.
    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    /// The target this permission applies to.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns true if this permission grants everything `other` asks for.
    ///
    /// The kinds must match (or this kind is `*`), this action set must cover the
    /// other one, and this target must cover the other target.
    pub fn implies(&self, other: &Permission) -> bool {
        (self.kind == WILDCARD || self.kind == other.kind)
            && self.actions.covers(&other.actions)
            && target_covers(&self.target, &other.target)
    }

    fn invalid(&self, reason: &str) -> Error {
        Error::InvalidPermission {
            input: self.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Checks whether a target pattern covers another target.
///
/// Handles the bare wildcard, trailing-`*` prefixes and exact matches. A pattern
/// covers any narrower pattern that shares its prefix, so `/var/*` covers
/// `/var/log/*` as well as `/var/log/syslog`.
pub fn target_covers(pattern: &str, target: &str) -> bool {
    if pattern == WILDCARD || pattern == target {
        return true;
    }

    match pattern.strip_suffix('*') {
        Some(prefix) => target.starts_with(prefix),
        None => false,
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.actions, self.target)
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPermission {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = input.trim().splitn(3, ':').collect();
        let (kind, actions, target) = match segments.as_slice() {
            [kind, actions, target] => (*kind, *actions, *target),
            [actions, target] => (DEFAULT_KIND, *actions, *target),
            _ => return Err(invalid("expected 'kind:actions:target' or 'actions:target'")),
        };

        let actions = ActionSet::parse(actions).ok_or_else(|| invalid("no actions given"))?;

        Permission::new(kind, actions, target).map_err(|_| invalid("empty kind or target"))
    }
}

impl TryFrom<String> for Permission {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.to_string()
    }
}
