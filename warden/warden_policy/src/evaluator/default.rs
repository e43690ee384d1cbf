//! The default evaluator.

use tracing::debug;

use warden_core::error::Result;
use warden_core::{Permission, Subject};

use super::Evaluator;
use crate::context::PolicyView;
use crate::outcome::EvaluationOutcome;

/// Evaluates a request against the three tiers of the active context.
///
/// Exclusion is checked first, then the unchecked tier, then the subject's roles.
/// Without a context, or when nothing matches, the outcome is `Indeterminate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEvaluator;

impl DefaultEvaluator {
    /// Create a new default evaluator.
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for DefaultEvaluator {
    fn evaluate(
        &self,
        subject: &Subject,
        context: Option<&PolicyView<'_>>,
        permission: &Permission,
    ) -> Result<EvaluationOutcome> {
        let Some(context) = context else {
            return Ok(EvaluationOutcome::Indeterminate);
        };

        let outcome = if context.excludes(permission)? {
            EvaluationOutcome::Excluded
        } else if context.mandates(permission)? {
            EvaluationOutcome::Mandated
        } else if context.grants(permission, subject.identities())? {
            EvaluationOutcome::Granted
        } else {
            EvaluationOutcome::Indeterminate
        };

        debug!(
            context = %context.id(),
            %subject,
            %permission,
            %outcome,
            "Default evaluation"
        );
        Ok(outcome)
    }

    fn name(&self) -> &str {
        "default"
    }
}
