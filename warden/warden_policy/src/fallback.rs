//! Fallback decisions.
//!
//! When no evaluator reaches a verdict, the arbiter defers to the platform's own
//! decision mechanism through a [`FallbackDecision`].

use serde::{Deserialize, Serialize};

use warden_core::error::Result;
use warden_core::{Permission, PermissionSet, Subject};

/// The decision mechanism consulted when evaluation is inconclusive.
pub trait FallbackDecision: Send + Sync {
    /// Whether the subject holds the permission.
    fn is_allowed(&self, subject: &Subject, permission: &Permission) -> Result<bool>;

    /// The permissions the subject holds according to this mechanism.
    fn permissions(&self, _subject: &Subject) -> Result<PermissionSet> {
        Ok(PermissionSet::new())
    }
}

/// A fallback that gives the same answer to every request.
///
/// An allowing fallback may additionally carry a set of permissions it reports
/// for every subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticFallback {
    allow: bool,
    #[serde(default)]
    permissions: PermissionSet,
}

impl StaticFallback {
    /// A fallback that allows everything.
    pub fn allow() -> Self {
        Self {
            allow: true,
            permissions: PermissionSet::new(),
        }
    }

    /// A fallback that denies everything.
    pub fn deny() -> Self {
        Self::default()
    }

    /// Report these permissions for every subject.
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    /// The verdict given to every request.
    pub fn allows(&self) -> bool {
        self.allow
    }
}

impl FallbackDecision for StaticFallback {
    fn is_allowed(&self, _subject: &Subject, _permission: &Permission) -> Result<bool> {
        Ok(self.allow)
    }

    fn permissions(&self, _subject: &Subject) -> Result<PermissionSet> {
        Ok(self.permissions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_fallback() {
        let subject = Subject::principal("alice");
        let permission = Permission::parse("read:x").unwrap();

        assert!(StaticFallback::allow().is_allowed(&subject, &permission).unwrap());
        assert!(!StaticFallback::deny().is_allowed(&subject, &permission).unwrap());
        assert!(StaticFallback::deny().permissions(&subject).unwrap().is_empty());

        let reported = PermissionSet::parse_all(["read:x"]).unwrap();
        let fallback = StaticFallback::allow().with_permissions(reported.clone());
        assert_eq!(fallback.permissions(&subject).unwrap(), reported);
    }
}
