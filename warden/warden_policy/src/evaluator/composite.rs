//! The composite evaluator.
//!
//! Consults an ordered list of delegates and consolidates their verdicts:
//!
//! | Delegate outcomes               | Consolidated    |
//! |---------------------------------|-----------------|
//! | none                            | `Unsupported`   |
//! | any `Excluded`                  | `Excluded`      |
//! | any `Mandated`                  | `Mandated`      |
//! | `Denied` and `Granted`          | `Indeterminate` |
//! | `Denied`                        | `Denied`        |
//! | `Granted`                       | `Granted`       |
//! | anything else                   | `Indeterminate` |
//!
//! Rows are checked top to bottom. Delegates answering `EvaluatorRetired` are
//! dropped and never consulted again.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use warden_core::error::Result;
use warden_core::{Permission, Subject};

use super::Evaluator;
use crate::context::PolicyView;
use crate::outcome::{EvaluationOutcome, OutcomeSet};

/// An evaluator that consolidates the verdicts of several delegates.
#[derive(Default)]
pub struct CompositeEvaluator {
    delegates: RwLock<Vec<Arc<dyn Evaluator>>>,
}

impl CompositeEvaluator {
    /// Create a composite with no delegates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a composite over the given delegates, in order.
    pub fn from_delegates(delegates: impl IntoIterator<Item = Arc<dyn Evaluator>>) -> Self {
        let composite = Self::new();
        for delegate in delegates {
            composite.add(delegate);
        }
        composite
    }

    /// Append a delegate.
    ///
    /// Adding the composite to itself is ignored.
    pub fn add(&self, delegate: Arc<dyn Evaluator>) {
        let delegate_ptr = Arc::as_ptr(&delegate) as *const u8;
        let self_ptr = self as *const Self as *const u8;
        if std::ptr::eq(delegate_ptr, self_ptr) {
            debug!("Ignoring attempt to add a composite evaluator to itself");
            return;
        }
        self.delegates.write().push(delegate);
    }

    /// Number of live delegates.
    pub fn len(&self) -> usize {
        self.delegates.read().len()
    }

    /// Whether there are no live delegates.
    pub fn is_empty(&self) -> bool {
        self.delegates.read().is_empty()
    }
}

impl Evaluator for CompositeEvaluator {
    fn evaluate(
        &self,
        subject: &Subject,
        context: Option<&PolicyView<'_>>,
        permission: &Permission,
    ) -> Result<EvaluationOutcome> {
        // Snapshot so delegates run without holding the list lock
        let delegates = self.delegates.read().clone();
        if delegates.is_empty() {
            return Ok(EvaluationOutcome::Indeterminate);
        }

        let mut outcomes = OutcomeSet::empty();
        let mut retired = Vec::new();

        for delegate in &delegates {
            let outcome = delegate.evaluate(subject, context, permission)?;
            if outcome == EvaluationOutcome::EvaluatorRetired {
                warn!(evaluator = delegate.name(), "Evaluator retired; removing it");
                retired.push(delegate.clone());
            } else {
                outcomes.record(outcome);
            }
        }

        if !retired.is_empty() {
            self.delegates
                .write()
                .retain(|live| !retired.iter().any(|gone| Arc::ptr_eq(live, gone)));
        }

        let outcome = outcomes.consolidate();
        debug!(%permission, %outcome, "Composite evaluation");
        Ok(outcome)
    }

    fn name(&self) -> &str {
        "composite"
    }
}
