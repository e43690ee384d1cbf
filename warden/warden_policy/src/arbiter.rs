//! The decision arbiter.
//!
//! [`PolicyArbiter`] is the entry point for permission checks. For each request
//! it:
//!
//! 1. short-circuits to *allow* when called from inside its own decision on the
//!    same thread,
//! 2. asks the [`ContextSelector`] for the active context and looks it up,
//! 3. runs the evaluator with the context read-locked,
//! 4. answers with the outcome's decision, or defers to the fallback when the
//!    outcome carries none.
//!
//! Any error along the way is a denial.

use parking_lot::RwLock;
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use thread_local::ThreadLocal;
use tracing::{debug, trace, warn};

use warden_core::error::Result;
use warden_core::{Permission, PermissionSet, Subject};

use crate::context::PolicyContext;
use crate::evaluator::{self, Evaluator};
use crate::fallback::FallbackDecision;
use crate::observer::DecisionObserver;
use crate::outcome::EvaluationOutcome;
use crate::registry::PolicyContextRegistry;
use crate::selector::{ContextSelector, ThreadContextSelector};

/// Where the answer of a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionSource {
    /// A nested request on a thread already deciding; allowed without evaluation
    Reentrant,

    /// The evaluator's outcome carried a decision
    Evaluation,

    /// The outcome carried no decision and the fallback answered
    Fallback,

    /// The outcome carried no decision and no fallback is configured
    NoFallback,
}

/// The answer to a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the permission is held
    pub allowed: bool,

    /// The evaluator's outcome; absent for reentrant requests
    pub outcome: Option<EvaluationOutcome>,

    /// Where the answer came from
    pub source: DecisionSource,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.allowed { "ALLOW" } else { "DENY" })?;
        if let Some(outcome) = self.outcome {
            write!(f, " {}", outcome)?;
        }
        match self.source {
            DecisionSource::Reentrant => write!(f, " (reentrant)"),
            DecisionSource::Fallback => write!(f, " (fallback)"),
            DecisionSource::NoFallback => write!(f, " (no fallback)"),
            DecisionSource::Evaluation => Ok(()),
        }
    }
}

/// Marks the current thread as deciding until dropped.
struct InProgress<'a>(&'a Cell<bool>);

impl<'a> InProgress<'a> {
    fn enter(flag: &'a ThreadLocal<Cell<bool>>) -> Option<Self> {
        let cell = flag.get_or(|| Cell::new(false));
        if cell.replace(true) {
            None
        } else {
            Some(Self(cell))
        }
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Builder for [`PolicyArbiter`].
pub struct PolicyArbiterBuilder {
    registry: PolicyContextRegistry,
    evaluators: Vec<Arc<dyn Evaluator>>,
    fallback: Option<Arc<dyn FallbackDecision>>,
    selector: Arc<dyn ContextSelector>,
    observers: Vec<Arc<dyn DecisionObserver>>,
}

impl PolicyArbiterBuilder {
    /// Add a discovered evaluator. Order is preserved.
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluators.push(evaluator);
        self
    }

    /// Add several discovered evaluators.
    pub fn evaluators(mut self, evaluators: impl IntoIterator<Item = Arc<dyn Evaluator>>) -> Self {
        self.evaluators.extend(evaluators);
        self
    }

    /// Set the fallback decision provider.
    pub fn fallback(mut self, fallback: Arc<dyn FallbackDecision>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Set the context selector. Defaults to [`ThreadContextSelector`].
    pub fn selector(mut self, selector: Arc<dyn ContextSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Add a decision observer.
    pub fn observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build the arbiter, assembling the discovered evaluators into one.
    pub fn build(self) -> PolicyArbiter {
        let evaluator = evaluator::assemble(self.evaluators);
        debug!(evaluator = evaluator.name(), "Assembled policy evaluator");

        PolicyArbiter {
            registry: self.registry,
            evaluator: RwLock::new(evaluator),
            fallback: self.fallback,
            selector: self.selector,
            observers: self.observers,
            in_progress: ThreadLocal::new(),
        }
    }
}

/// Decides permission requests against the active policy context.
pub struct PolicyArbiter {
    registry: PolicyContextRegistry,
    evaluator: RwLock<Arc<dyn Evaluator>>,
    fallback: Option<Arc<dyn FallbackDecision>>,
    selector: Arc<dyn ContextSelector>,
    observers: Vec<Arc<dyn DecisionObserver>>,
    in_progress: ThreadLocal<Cell<bool>>,
}

impl PolicyArbiter {
    /// Start building an arbiter over the given registry.
    pub fn builder(registry: PolicyContextRegistry) -> PolicyArbiterBuilder {
        PolicyArbiterBuilder {
            registry,
            evaluators: Vec::new(),
            fallback: None,
            selector: Arc::new(ThreadContextSelector),
            observers: Vec::new(),
        }
    }

    /// An arbiter with the default evaluator, no fallback and the thread selector.
    pub fn new(registry: PolicyContextRegistry) -> Self {
        Self::builder(registry).build()
    }

    /// The registry contexts are looked up in.
    pub fn registry(&self) -> &PolicyContextRegistry {
        &self.registry
    }

    /// The evaluator currently in use.
    pub fn evaluator(&self) -> Arc<dyn Evaluator> {
        self.evaluator.read().clone()
    }

    /// Replace the evaluator.
    pub fn set_evaluator(&self, evaluator: Arc<dyn Evaluator>) {
        debug!(evaluator = evaluator.name(), "Replacing policy evaluator");
        *self.evaluator.write() = evaluator;
    }

    /// The context active for the caller, if it exists in the registry.
    pub fn active_context(&self) -> Option<Arc<PolicyContext>> {
        let id = self.selector.current_context_id()?;
        let context = self.registry.get(&id);
        if context.is_none() {
            trace!(context = %id, "Active policy context is not registered");
        }
        context
    }

    /// Whether the subject holds the permission.
    ///
    /// Errors are logged and answered with a denial.
    pub fn is_allowed(&self, subject: &Subject, permission: &Permission) -> bool {
        match self.decide(subject, permission) {
            Ok(decision) => decision.allowed,
            Err(e) => {
                warn!(%subject, %permission, error = %e, "Policy decision failed; denying");
                false
            }
        }
    }

    /// Decide a request, reporting where the answer came from.
    ///
    /// # Arguments
    ///
    /// * `subject` - The requester.
    /// * `permission` - The requested permission.
    ///
    /// # Returns
    ///
    /// * `Ok(Decision)` - The decision.
    /// * `Err` - If the evaluator or the fallback failed. The request must be
    ///   treated as denied.
    pub fn decide(&self, subject: &Subject, permission: &Permission) -> Result<Decision> {
        let Some(_in_progress) = InProgress::enter(&self.in_progress) else {
            trace!(%subject, %permission, "Reentrant policy decision; allowing");
            return Ok(Decision {
                allowed: true,
                outcome: None,
                source: DecisionSource::Reentrant,
            });
        };

        for observer in &self.observers {
            observer.on_enter(subject, permission);
        }

        let result = self.resolve(subject, permission);

        let allowed = matches!(&result, Ok(decision) if decision.allowed);
        for observer in &self.observers {
            observer.on_decision(subject, permission, allowed);
        }

        result
    }

    fn resolve(&self, subject: &Subject, permission: &Permission) -> Result<Decision> {
        let context = self.active_context();
        let evaluator = self.evaluator();

        let outcome = match &context {
            Some(context) => {
                let view = context.read();
                evaluator.evaluate(subject, Some(&view), permission)?
            }
            None => evaluator.evaluate(subject, None, permission)?,
        };

        let decision = if let Some(allowed) = outcome.decision() {
            Decision {
                allowed,
                outcome: Some(outcome),
                source: DecisionSource::Evaluation,
            }
        } else if let Some(fallback) = &self.fallback {
            Decision {
                allowed: fallback.is_allowed(subject, permission)?,
                outcome: Some(outcome),
                source: DecisionSource::Fallback,
            }
        } else {
            Decision {
                allowed: false,
                outcome: Some(outcome),
                source: DecisionSource::NoFallback,
            }
        };

        debug!(
            context = context.as_ref().map(|c| c.id()),
            %subject,
            %permission,
            %decision,
            "Policy decision"
        );
        Ok(decision)
    }

    /// The permissions the subject holds.
    ///
    /// Without an active context this is what the fallback reports. Otherwise it
    /// is everything the active context resolves for the subject, including the
    /// fallback's permissions and the subject's own, minus exclusions. Errors are
    /// logged and answered with an empty set.
    pub fn permissions(&self, subject: &Subject) -> PermissionSet {
        match self.try_permissions(subject) {
            Ok(permissions) => permissions,
            Err(e) => {
                warn!(%subject, error = %e, "Permission resolution failed");
                PermissionSet::new()
            }
        }
    }

    /// Like [`PolicyArbiter::permissions`], but reporting errors.
    pub fn try_permissions(&self, subject: &Subject) -> Result<PermissionSet> {
        let delegate = match &self.fallback {
            Some(fallback) => Some(fallback.permissions(subject)?),
            None => None,
        };

        let Some(context) = self.active_context() else {
            return Ok(delegate.unwrap_or_default());
        };
        let view = context.read();
        view.resolved_permissions(
            delegate.as_ref(),
            Some(subject.permissions()),
            subject.identities(),
        )
    }
}

impl fmt::Debug for PolicyArbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyArbiter")
            .field("registry", &self.registry)
            .field("evaluator", &self.evaluator().name())
            .field("fallback", &self.fallback.is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}
