//! Decision observers.

use warden_core::{Permission, Subject};

/// Receives notifications about arbiter decisions.
///
/// Observers see every top-level request and its final answer. They cannot
/// change the answer.
pub trait DecisionObserver: Send + Sync {
    /// Called when a top-level decision starts.
    fn on_enter(&self, _subject: &Subject, _permission: &Permission) {}

    /// Called with the final answer of a top-level decision.
    fn on_decision(&self, subject: &Subject, permission: &Permission, allowed: bool);
}
