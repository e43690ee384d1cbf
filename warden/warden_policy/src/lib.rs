//! # Warden Policy
//!
//! `warden_policy` decides permission requests against named policy contexts.
//!
//! Key concepts:
//!
//! 1. **Policy Context**: A named container of excluded, unchecked and per-role
//!    permissions, with an open / in service / deleted lifecycle.
//!
//! 2. **Evaluator**: A strategy that turns a request into an
//!    [`EvaluationOutcome`]. Several evaluators are combined by a
//!    [`CompositeEvaluator`], where exclusion beats mandate, mandate beats
//!    everything else, and a denial next to a grant is inconclusive.
//!
//! 3. **Arbiter**: The entry point. It finds the active context, runs the
//!    evaluator with the context read-locked, and defers to a fallback when
//!    the outcome carries no decision. Errors deny.
//!
//! 4. **Policy Document**: A TOML file of materialized permissions that loads
//!    contexts into a registry.
//!
//! ```
//! use std::sync::Arc;
//! use warden_core::{NameRoleMapper, Permission, Subject};
//! use warden_policy::{FixedContextSelector, PolicyArbiter, PolicyContextRegistry};
//!
//! let registry = PolicyContextRegistry::with_role_mapper(Arc::new(NameRoleMapper));
//! let context = registry.get_or_create("app", false).unwrap();
//! context.add_to_role("admin", Permission::parse("write:*").unwrap()).unwrap();
//! context.commit().unwrap();
//!
//! let arbiter = PolicyArbiter::builder(registry)
//!     .selector(Arc::new(FixedContextSelector::new("app")))
//!     .build();
//!
//! let write = Permission::parse("write:report").unwrap();
//! assert!(arbiter.is_allowed(&Subject::principal("admin"), &write));
//! assert!(!arbiter.is_allowed(&Subject::principal("guest"), &write));
//! ```

pub mod arbiter;
pub mod config;
pub mod context;
pub mod evaluator;
pub mod fallback;
pub mod observer;
pub mod outcome;
pub mod registry;
pub mod selector;

// Re-export key types and traits for convenience
pub use arbiter::{Decision, DecisionSource, PolicyArbiter, PolicyArbiterBuilder};
pub use config::{ConfigError, FallbackMode, PolicyDocument};
pub use context::{PolicyContext, PolicyView, State};
pub use evaluator::{CompositeEvaluator, DefaultEvaluator, Evaluator};
pub use fallback::{FallbackDecision, StaticFallback};
pub use observer::DecisionObserver;
pub use outcome::{consolidate, EvaluationOutcome, OutcomeSet};
pub use registry::PolicyContextRegistry;
pub use selector::{ContextSelector, FixedContextSelector, ThreadContextSelector};
