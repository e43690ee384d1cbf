//! Error types for the Warden authorization engine.
//!
//! The errors are organized by subsystem. The root error type, `Error`, wraps
//! each subsystem error so callers can handle everything uniformly at the top
//! level while still matching on the precise cause.

use thiserror::Error;

/// Root error type for Warden.
#[derive(Debug, Error)]
pub enum Error {
    /// Policy context, evaluation and registry errors
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// A textual permission could not be parsed
    #[error("Invalid permission '{input}': {reason}")]
    InvalidPermission {
        /// The rejected input
        input: String,

        /// Why it was rejected
        reason: String,
    },

    /// Configuration documents that could not be read or decoded
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by policy contexts, evaluators and the context registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// A mutating call was made while the context was not open
    #[error("Policy context '{context}' cannot be configured while {state}")]
    Configuration {
        /// The context identifier
        context: String,

        /// The state the context was in
        state: String,
    },

    /// A state-gated read was made while the context was not in service
    #[error("Policy context '{context}' cannot be read while {state}")]
    State {
        /// The context identifier
        context: String,

        /// The state the context was in
        state: String,
    },

    /// Lookup of a context that does not exist
    #[error("Policy context not found: {0}")]
    NotFound(String),

    /// A delegate evaluator or role mapper failed
    #[error("Policy evaluation failed: {0}")]
    Evaluation(String),

    /// A registry postcondition was violated
    #[error("Policy registry inconsistency: {0}")]
    Consistency(String),

    /// A context identifier was empty
    #[error("Invalid policy context id: {0:?}")]
    InvalidContextId(String),
}

impl PolicyError {
    /// Whether this error was caused by calling an operation in the wrong lifecycle state.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::State { .. })
    }
}

/// Result type used throughout Warden.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let policy_err = PolicyError::NotFound("app".to_string());
        let error: Error = policy_err.into();
        assert!(matches!(error, Error::Policy(PolicyError::NotFound(_))));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: Error = io_err.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_display() {
        let err = PolicyError::Configuration {
            context: "app".to_string(),
            state: "in service".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Policy context 'app' cannot be configured while in service"
        );

        let err: Error = PolicyError::Evaluation("mapper exploded".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Policy error: Policy evaluation failed: mapper exploded"
        );
    }

    #[test]
    fn test_is_lifecycle() {
        assert!(PolicyError::State {
            context: "a".into(),
            state: "open".into()
        }
        .is_lifecycle());
        assert!(!PolicyError::Consistency("x".into()).is_lifecycle());
    }
}
