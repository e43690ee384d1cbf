//! Evaluation outcomes.
//!
//! An [`EvaluationOutcome`] is the verdict of one evaluator (or of consolidating
//! several) for a single permission check. Outcomes carry a decision and an
//! authoritative flag, and are ranked by [`EvaluationOutcome::precedence`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The verdict of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationOutcome {
    /// The permission is excluded; an absolute veto.
    Excluded,

    /// The permission is granted to every requester; an absolute grant.
    Mandated,

    /// The permission is granted, but a stricter evaluator may still override.
    Granted,

    /// The permission is denied, but a more lenient evaluator may disagree.
    Denied,

    /// No verdict could be reached.
    Indeterminate,

    /// No evaluator was able to consider the request.
    Unsupported,

    /// The evaluator has retired and must not be consulted again.
    EvaluatorRetired,
}

impl EvaluationOutcome {
    /// Every outcome, in descending precedence.
    pub const ALL: [EvaluationOutcome; 7] = [
        Self::Excluded,
        Self::Mandated,
        Self::Denied,
        Self::Granted,
        Self::Indeterminate,
        Self::Unsupported,
        Self::EvaluatorRetired,
    ];

    /// The boolean decision this outcome carries, if any.
    pub fn decision(self) -> Option<bool> {
        match self {
            Self::Excluded | Self::Denied => Some(false),
            Self::Mandated | Self::Granted => Some(true),
            Self::Indeterminate | Self::Unsupported | Self::EvaluatorRetired => None,
        }
    }

    /// Whether this outcome cannot be overridden by another evaluator.
    pub fn is_authoritative(self) -> bool {
        matches!(self, Self::Excluded | Self::Mandated)
    }

    /// Rank used when consolidating outcomes; higher wins.
    ///
    /// `Denied` ranks above `Granted`, but the two together consolidate to
    /// `Indeterminate` rather than to the higher rank.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Excluded => 6,
            Self::Mandated => 5,
            Self::Denied => 4,
            Self::Granted => 3,
            Self::Indeterminate => 2,
            Self::Unsupported => 1,
            Self::EvaluatorRetired => 0,
        }
    }

    fn flag(self) -> OutcomeSet {
        match self {
            Self::Excluded => OutcomeSet::EXCLUDED,
            Self::Mandated => OutcomeSet::MANDATED,
            Self::Granted => OutcomeSet::GRANTED,
            Self::Denied => OutcomeSet::DENIED,
            Self::Indeterminate => OutcomeSet::INDETERMINATE,
            Self::Unsupported => OutcomeSet::UNSUPPORTED,
            Self::EvaluatorRetired => OutcomeSet::RETIRED,
        }
    }
}

impl fmt::Display for EvaluationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Excluded => "EXCLUDED",
            Self::Mandated => "MANDATED",
            Self::Granted => "GRANTED",
            Self::Denied => "DENIED",
            Self::Indeterminate => "INDETERMINATE",
            Self::Unsupported => "UNSUPPORTED",
            Self::EvaluatorRetired => "EVALUATOR_RETIRED",
        };
        write!(f, "{}", name)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    /// A set of outcomes, used to consolidate the verdicts of several evaluators
    pub struct OutcomeSet: u8 {
        const EXCLUDED = 0b0000_0001;
        const MANDATED = 0b0000_0010;
        const GRANTED = 0b0000_0100;
        const DENIED = 0b0000_1000;
        const INDETERMINATE = 0b0001_0000;
        const UNSUPPORTED = 0b0010_0000;
        const RETIRED = 0b0100_0000;
    }
}

impl OutcomeSet {
    /// Add an outcome to the set
    pub fn record(&mut self, outcome: EvaluationOutcome) {
        self.insert(outcome.flag());
    }

    /// Whether the set holds the given outcome
    pub fn holds(&self, outcome: EvaluationOutcome) -> bool {
        self.contains(outcome.flag())
    }

    /// Resolve the set to a single outcome.
    ///
    /// 1. empty → `Unsupported`
    /// 2. any `Excluded` → `Excluded`
    /// 3. any `Mandated` → `Mandated`
    /// 4. any `Denied` → `Indeterminate` if any `Granted` too, else `Denied`
    /// 5. any `Granted` → `Granted`
    /// 6. otherwise → `Indeterminate`
    pub fn consolidate(&self) -> EvaluationOutcome {
        use EvaluationOutcome::*;

        if self.is_empty() {
            Unsupported
        } else if self.holds(Excluded) {
            Excluded
        } else if self.holds(Mandated) {
            Mandated
        } else if self.holds(Denied) {
            if self.holds(Granted) {
                Indeterminate
            } else {
                Denied
            }
        } else if self.holds(Granted) {
            Granted
        } else {
            Indeterminate
        }
    }
}

impl FromIterator<EvaluationOutcome> for OutcomeSet {
    fn from_iter<I: IntoIterator<Item = EvaluationOutcome>>(iter: I) -> Self {
        let mut set = OutcomeSet::empty();
        for outcome in iter {
            set.record(outcome);
        }
        set
    }
}

/// Consolidate a collection of outcomes into one.
pub fn consolidate<I>(outcomes: I) -> EvaluationOutcome
where
    I: IntoIterator<Item = EvaluationOutcome>,
{
    outcomes.into_iter().collect::<OutcomeSet>().consolidate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use EvaluationOutcome::*;

    #[test]
    fn test_decision_and_authority() {
        assert_eq!(Excluded.decision(), Some(false));
        assert_eq!(Denied.decision(), Some(false));
        assert_eq!(Mandated.decision(), Some(true));
        assert_eq!(Granted.decision(), Some(true));
        assert_eq!(Indeterminate.decision(), None);
        assert_eq!(Unsupported.decision(), None);
        assert_eq!(EvaluatorRetired.decision(), None);

        let authoritative: Vec<_> = EvaluationOutcome::ALL
            .iter()
            .copied()
            .filter(|o| o.is_authoritative())
            .collect();
        assert_eq!(authoritative, vec![Excluded, Mandated]);
    }

    #[test]
    fn test_precedence_is_strict_and_matches_all_order() {
        for pair in EvaluationOutcome::ALL.windows(2) {
            assert!(
                pair[0].precedence() > pair[1].precedence(),
                "{} should outrank {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_consolidation_table() {
        assert_eq!(consolidate([Excluded, Granted]), Excluded);
        assert_eq!(consolidate([Denied, Granted]), Indeterminate);
        assert_eq!(consolidate([Denied]), Denied);
        assert_eq!(consolidate(std::iter::empty()), Unsupported);
        assert_eq!(consolidate([Mandated, Denied]), Mandated);
        assert_eq!(consolidate([Excluded, Mandated]), Excluded);
        assert_eq!(consolidate([Granted, Indeterminate]), Granted);
        assert_eq!(consolidate([Indeterminate, Unsupported]), Indeterminate);
        assert_eq!(consolidate([Denied, Indeterminate]), Denied);
        assert_eq!(consolidate([Unsupported]), Indeterminate);
    }

    #[test]
    fn test_consolidation_over_every_pair() {
        // A winner that is not a denied/granted conflict always has the
        // highest precedence of the pair.
        for &a in EvaluationOutcome::ALL.iter().filter(|o| **o != EvaluatorRetired) {
            for &b in EvaluationOutcome::ALL.iter().filter(|o| **o != EvaluatorRetired) {
                let result = consolidate([a, b]);
                let conflict = matches!((a, b), (Denied, Granted) | (Granted, Denied));
                if conflict {
                    assert_eq!(result, Indeterminate);
                } else if a.precedence().max(b.precedence()) > Indeterminate.precedence() {
                    let top = if a.precedence() >= b.precedence() { a } else { b };
                    assert_eq!(result, top, "{} + {}", a, b);
                } else {
                    assert_eq!(result, Indeterminate, "{} + {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_outcome_set_records() {
        let mut set = OutcomeSet::empty();
        set.record(Granted);
        set.record(Granted);
        assert!(set.holds(Granted));
        assert!(!set.holds(Denied));
        assert_eq!(set.consolidate(), Granted);
    }
}
