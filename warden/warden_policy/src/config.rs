//! Declarative policy documents.
//!
//! A [`PolicyDocument`] lists materialized permissions per context in TOML and
//! loads them into a [`PolicyContextRegistry`]:
//!
//! ```toml
//! [settings]
//! fallback = "deny"
//!
//! [role_mapping]
//! alice = ["admin"]
//!
//! [[context]]
//! id = "app"
//! excluded = ["file:*:/secrets/*"]
//! unchecked = ["read:public"]
//!
//! [context.roles]
//! admin = ["write:any"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use warden_core::{NameRoleMapper, PermissionSet, RoleMapper, StaticRoleMapper};

use crate::context::PolicyContext;
use crate::fallback::StaticFallback;
use crate::registry::PolicyContextRegistry;

/// Errors that can occur while loading a policy document
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document file could not be read
    #[error("Failed to read policy document {path}: {source}")]
    Read {
        /// The path that was read
        path: PathBuf,

        /// The underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid TOML for this schema
    #[error("Failed to parse policy document: {0}")]
    Parse(#[from] toml::de::Error),

    /// The document parsed but breaks a structural rule
    #[error("Invalid policy document: {0}")]
    Invalid(String),

    /// A textual permission in a context entry is malformed
    #[error("Invalid permission in context '{context}': {source}")]
    Permission {
        /// The context entry holding the permission
        context: String,

        /// Why the permission was rejected
        #[source]
        source: warden_core::Error,
    },

    /// Applying the document to a registry failed
    #[error(transparent)]
    Policy(#[from] warden_core::Error),
}

impl From<ConfigError> for warden_core::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Policy(inner) => inner,
            other => warden_core::Error::Config(other.to_string()),
        }
    }
}

/// Verdict of the static fallback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Allow requests no evaluator decided
    Allow,

    /// Deny requests no evaluator decided
    #[default]
    Deny,
}

/// Document-wide settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Fallback verdict
    #[serde(default)]
    pub fallback: FallbackMode,
}

/// One policy context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDocument {
    /// Context identifier
    pub id: String,

    /// Excluded permissions
    #[serde(default)]
    pub excluded: Vec<String>,

    /// Unchecked permissions
    #[serde(default)]
    pub unchecked: Vec<String>,

    /// Role name to granted permissions
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,

    /// Linked context identifiers
    #[serde(default)]
    pub linked: Vec<String>,

    /// Whether to put the context in service after loading
    #[serde(default = "default_commit")]
    pub commit: bool,
}

fn default_commit() -> bool {
    true
}

impl ContextDocument {
    fn parse(&self, inputs: &[String]) -> Result<PermissionSet, ConfigError> {
        PermissionSet::parse_all(inputs).map_err(|source| ConfigError::Permission {
            context: self.id.clone(),
            source,
        })
    }

    /// Configure an open context from this document
    fn load_into(&self, context: &PolicyContext) -> Result<(), ConfigError> {
        context.add_excluded_all(&self.parse(&self.excluded)?)?;
        context.add_unchecked_all(&self.parse(&self.unchecked)?)?;
        for (role, permissions) in &self.roles {
            context.add_all_to_role(role.as_str(), &self.parse(permissions)?)?;
        }
        for linked in &self.linked {
            context.link_configuration(linked.as_str())?;
        }
        if self.commit {
            context.commit()?;
        }
        Ok(())
    }
}

/// A declarative policy document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Document-wide settings
    #[serde(default)]
    pub settings: Settings,

    /// Identity name to roles; absent means identity names are roles
    #[serde(default)]
    pub role_mapping: Option<BTreeMap<String, Vec<String>>>,

    /// Contexts, in document order
    #[serde(default, rename = "context")]
    pub contexts: Vec<ContextDocument>,
}

impl PolicyDocument {
    /// Parse and validate a document from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let document: Self = toml::from_str(input)?;
        document.validate()?;
        Ok(document)
    }

    /// Read, parse and validate a document from a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading policy document from {}", path.display());

        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Check identifiers and permissions without touching any registry
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for context in &self.contexts {
            if context.id.is_empty() {
                return Err(ConfigError::Invalid(
                    "context id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(context.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "context '{}' is defined more than once",
                    context.id
                )));
            }

            context.parse(&context.excluded)?;
            context.parse(&context.unchecked)?;
            for permissions in context.roles.values() {
                context.parse(permissions)?;
            }
        }
        Ok(())
    }

    /// The fallback described by the settings
    pub fn fallback(&self) -> StaticFallback {
        match self.settings.fallback {
            FallbackMode::Allow => StaticFallback::allow(),
            FallbackMode::Deny => StaticFallback::deny(),
        }
    }

    /// The role mapper described by `[role_mapping]`
    pub fn role_mapper(&self) -> Arc<dyn RoleMapper> {
        match &self.role_mapping {
            Some(mapping) => Arc::new(
                mapping
                    .iter()
                    .flat_map(|(identity, roles)| {
                        roles.iter().map(move |role| (identity.clone(), role.clone()))
                    })
                    .collect::<StaticRoleMapper>(),
            ),
            None => Arc::new(NameRoleMapper),
        }
    }

    /// A fresh registry whose contexts use this document's role mapper
    pub fn registry(&self) -> PolicyContextRegistry {
        PolicyContextRegistry::with_role_mapper(self.role_mapper())
    }

    /// Load every context into a registry.
    ///
    /// Each context is opened and cleared, populated, and committed unless the
    /// document says otherwise. A document with `[role_mapping]` also installs
    /// its mapper on every context it loads.
    pub fn apply(
        &self,
        registry: &PolicyContextRegistry,
    ) -> Result<Vec<Arc<PolicyContext>>, ConfigError> {
        let mapper = self.role_mapping.as_ref().map(|_| self.role_mapper());
        let mut loaded = Vec::with_capacity(self.contexts.len());

        for document in &self.contexts {
            let context = registry.get_or_create(&document.id, true)?;
            if let Some(mapper) = &mapper {
                context.set_role_mapper(Some(mapper.clone()));
            }
            document.load_into(&context)?;

            debug!(context = %document.id, state = %context.state(), "Loaded policy context");
            loaded.push(context);
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::State;
    use crate::fallback::FallbackDecision;
    use std::io::Write;
    use warden_core::{Identity, Permission, Subject};

    const DOCUMENT: &str = r#"
[settings]
fallback = "allow"

[role_mapping]
alice = ["admin"]

[[context]]
id = "app"
excluded = ["file:*:/secrets/*"]
unchecked = ["read:public"]

[context.roles]
admin = ["write:any"]

[[context]]
id = "staging"
commit = false
linked = ["app"]
"#;

    fn perm(input: &str) -> Permission {
        Permission::parse(input).unwrap()
    }

    #[test]
    fn test_parse_document() {
        let document = PolicyDocument::from_toml_str(DOCUMENT).unwrap();
        assert_eq!(document.settings.fallback, FallbackMode::Allow);
        assert_eq!(document.contexts.len(), 2);
        assert!(document.contexts[0].commit);
        assert!(!document.contexts[1].commit);
        assert_eq!(document.contexts[1].linked, vec!["app"]);
    }

    #[test]
    fn test_defaults() {
        let document = PolicyDocument::from_toml_str("[[context]]\nid = \"app\"\n").unwrap();
        assert_eq!(document.settings.fallback, FallbackMode::Deny);
        assert!(document.role_mapping.is_none());
        assert!(document.contexts[0].commit);
        assert!(!document
            .fallback()
            .is_allowed(&Subject::new(), &perm("read:x"))
            .unwrap());
    }

    #[test]
    fn test_apply() {
        let document = PolicyDocument::from_toml_str(DOCUMENT).unwrap();
        let registry = PolicyContextRegistry::new();
        let loaded = document.apply(&registry).unwrap();
        assert_eq!(loaded.len(), 2);

        let app = registry.lookup("app").unwrap();
        assert_eq!(app.state(), State::InService);
        assert!(app.excludes(&perm("file:read:/secrets/key")).unwrap());
        assert!(app.mandates(&perm("read:public")).unwrap());
        assert!(app
            .grants(&perm("write:any"), &[Identity::principal("alice")])
            .unwrap());
        assert!(!app
            .grants(&perm("write:any"), &[Identity::principal("admin")])
            .unwrap());

        let staging = registry.lookup("staging").unwrap();
        assert_eq!(staging.state(), State::Open);
        assert_eq!(staging.linked(), vec!["app"]);
    }

    #[test]
    fn test_apply_replaces_previous_content() {
        let registry = PolicyContextRegistry::new();
        PolicyDocument::from_toml_str(DOCUMENT)
            .unwrap()
            .apply(&registry)
            .unwrap();

        let smaller = PolicyDocument::from_toml_str("[[context]]\nid = \"app\"\n").unwrap();
        smaller.apply(&registry).unwrap();

        let app = registry.lookup("app").unwrap();
        assert!(!app.excludes(&perm("file:read:/secrets/key")).unwrap());
        assert!(!app.mandates(&perm("read:public")).unwrap());
    }

    #[test]
    fn test_name_mapper_without_role_mapping() {
        let document = PolicyDocument::from_toml_str(
            "[[context]]\nid = \"app\"\n[context.roles]\nadmin = [\"write:any\"]\n",
        )
        .unwrap();
        let registry = document.registry();
        document.apply(&registry).unwrap();

        let app = registry.lookup("app").unwrap();
        assert!(app
            .grants(&perm("write:any"), &[Identity::principal("admin")])
            .unwrap());
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            PolicyDocument::from_toml_str("[[context]]\nid = \"\"\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PolicyDocument::from_toml_str("[[context]]\nid = \"a\"\n[[context]]\nid = \"a\"\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PolicyDocument::from_toml_str("[[context]]\nid = \"a\"\nunchecked = [\"broken\"]\n"),
            Err(ConfigError::Permission { .. })
        ));
        assert!(matches!(
            PolicyDocument::from_toml_str("[settings]\nfallback = \"maybe\"\n"),
            Err(ConfigError::Parse(_))
        ));

        let err: warden_core::Error = ConfigError::Invalid("nope".to_string()).into();
        assert!(matches!(err, warden_core::Error::Config(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();

        let document = PolicyDocument::from_path(file.path()).unwrap();
        assert_eq!(document.contexts.len(), 2);

        assert!(matches!(
            PolicyDocument::from_path("/nonexistent/warden.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
