//! Permission evaluators.
//!
//! This module provides the evaluation strategies the arbiter consults.

mod composite;
mod default;

pub use composite::CompositeEvaluator;
pub use default::DefaultEvaluator;

use std::sync::Arc;

use warden_core::error::Result;
use warden_core::{Permission, Subject};

use crate::context::PolicyView;
use crate::outcome::EvaluationOutcome;

/// Trait for permission evaluators.
///
/// An evaluator turns a request into an [`EvaluationOutcome`]. It reads the active
/// policy context through a [`PolicyView`], which the caller keeps read-locked for
/// the duration of the call.
pub trait Evaluator: Send + Sync {
    /// Evaluate a permission request.
    ///
    /// # Arguments
    ///
    /// * `subject` - The requester.
    /// * `context` - The active policy context, if any.
    /// * `permission` - The requested permission.
    ///
    /// # Returns
    ///
    /// * `Ok(EvaluationOutcome)` - The verdict.
    /// * `Err` - If the evaluation could not be performed. Callers treat this as a denial.
    fn evaluate(
        &self,
        subject: &Subject,
        context: Option<&PolicyView<'_>>,
        permission: &Permission,
    ) -> Result<EvaluationOutcome>;

    /// A short name used in log output.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Assemble a single evaluator from a discovered list.
///
/// No evaluators yields a [`DefaultEvaluator`], one yields itself, and several are
/// wrapped in a [`CompositeEvaluator`] in the order given.
pub fn assemble(mut evaluators: Vec<Arc<dyn Evaluator>>) -> Arc<dyn Evaluator> {
    match evaluators.len() {
        0 => Arc::new(DefaultEvaluator::new()),
        1 => evaluators.remove(0),
        _ => Arc::new(CompositeEvaluator::from_delegates(evaluators)),
    }
}
