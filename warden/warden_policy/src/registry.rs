//! Policy context registry.
//!
//! This module maps context identifiers to their [`PolicyContext`]. There is
//! exactly one context instance per identifier for the life of the registry,
//! however many threads ask for it at once.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use warden_core::error::{PolicyError, Result};
use warden_core::RoleMapper;

use crate::context::PolicyContext;

/// A concurrent registry of policy contexts.
///
/// Cloning the registry yields another handle to the same contexts.
#[derive(Clone, Default)]
pub struct PolicyContextRegistry {
    /// The contexts, indexed by ID.
    contexts: Arc<DashMap<String, Arc<PolicyContext>>>,

    /// Role mapper given to every newly created context.
    role_mapper: Option<Arc<dyn RoleMapper>>,
}

impl PolicyContextRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry whose new contexts resolve roles through `mapper`.
    pub fn with_role_mapper(mapper: Arc<dyn RoleMapper>) -> Self {
        Self {
            contexts: Arc::new(DashMap::new()),
            role_mapper: Some(mapper),
        }
    }

    fn check_id(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(PolicyError::InvalidContextId(id.to_string()).into());
        }
        Ok(())
    }

    /// Get the context for `id` ready for configuration, creating it if needed.
    ///
    /// # Arguments
    ///
    /// * `id` - The context identifier.
    /// * `clear` - Whether to wipe an existing context before reopening it.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<PolicyContext>)` - The context, in the open state.
    /// * `Err` - If the id is empty or the context could not be opened.
    pub fn get_or_create(&self, id: &str, clear: bool) -> Result<Arc<PolicyContext>> {
        Self::check_id(id)?;

        let context = self
            .contexts
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(context = id, "Creating policy context");
                Arc::new(match &self.role_mapper {
                    Some(mapper) => PolicyContext::with_role_mapper(id, mapper.clone()),
                    None => PolicyContext::new(id),
                })
            })
            .clone();

        context.reopen(clear);

        // Another thread may have committed in between
        if !context.is_open() {
            return Err(PolicyError::Consistency(format!(
                "policy context '{}' is {} after being opened",
                id,
                context.state()
            ))
            .into());
        }

        Ok(context)
    }

    /// Whether a context exists for `id` and is in service.
    pub fn in_service(&self, id: &str) -> Result<bool> {
        Self::check_id(id)?;
        Ok(self
            .contexts
            .get(id)
            .map(|context| context.in_service())
            .unwrap_or(false))
    }

    /// The context for `id`, if one exists.
    pub fn get(&self, id: &str) -> Option<Arc<PolicyContext>> {
        self.contexts.get(id).map(|context| context.clone())
    }

    /// The context for `id`, or a not-found error.
    pub fn lookup(&self, id: &str) -> Result<Arc<PolicyContext>> {
        self.get(id)
            .ok_or_else(|| PolicyError::NotFound(id.to_string()).into())
    }

    /// Whether a context exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.contexts.contains_key(id)
    }

    /// Identifiers of every registered context, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.contexts.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of registered contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no contexts are registered.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl std::fmt::Debug for PolicyContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyContextRegistry")
            .field("contexts", &self.ids())
            .field("role_mapper", &self.role_mapper)
            .finish()
    }
}
