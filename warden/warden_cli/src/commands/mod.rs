//! Command implementations for the Warden CLI
//!
//! Every command starts from a policy document on disk. The helpers here load
//! it into a fresh registry and build the requester and arbiter the commands
//! share.

pub mod check;
pub mod permissions;
pub mod validate;

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use warden_core::{Identity, Permission, Subject};
use warden_policy::{FixedContextSelector, PolicyArbiter, PolicyContextRegistry, PolicyDocument};

/// A policy document loaded into its own registry
pub struct LoadedPolicy {
    pub document: PolicyDocument,
    pub registry: PolicyContextRegistry,
}

/// Read, validate and apply a policy document
pub fn load_policy(path: &Path) -> Result<LoadedPolicy> {
    let document = PolicyDocument::from_path(path)
        .with_context(|| format!("Failed to load policy document {}", path.display()))?;

    let registry = document.registry();
    document
        .apply(&registry)
        .with_context(|| format!("Failed to apply policy document {}", path.display()))?;
    debug!(contexts = registry.len(), "Policy document applied");

    Ok(LoadedPolicy { document, registry })
}

impl LoadedPolicy {
    /// An arbiter pinned to `context`, with the document's fallback
    pub fn arbiter(&self, context: &str) -> Result<PolicyArbiter> {
        if !self.registry.contains(context) {
            bail!("Policy context '{}' is not defined", context);
        }

        Ok(PolicyArbiter::builder(self.registry.clone())
            .selector(Arc::new(FixedContextSelector::new(context)))
            .fallback(Arc::new(self.document.fallback()))
            .build())
    }
}

/// Build a requester from principal names and textual domain permissions
pub fn subject(identities: &[String], grants: &[String]) -> Result<Subject> {
    let mut subject = Subject::new().with_identities(identities.iter().map(Identity::principal));
    for grant in grants {
        let permission = Permission::parse(grant)
            .with_context(|| format!("Invalid --grant permission '{}'", grant))?;
        subject = subject.with_permission(permission);
    }
    Ok(subject)
}
