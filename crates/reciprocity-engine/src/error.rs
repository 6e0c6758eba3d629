//! Engine error types.
//!
//! Errors in this module are fatal to the caller: they are raised while
//! building attribute stores, participants and requests, or when an evaluation
//! has to be aborted. Failures local to a single rule (an undefined name in a
//! condition) are modelled separately by
//! [`ConditionError`](crate::condition::ConditionError) and never surface here.

use std::fmt;

use crate::attributes::AttributeValue;
use crate::config::ConfigError;

/// Errors that can occur while building or evaluating requests.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An attribute name was inserted twice into the same store.
    #[error("Duplicate attribute '{name}' (already bound to {existing})")]
    DuplicateAttribute {
        /// The conflicting attribute name.
        name: String,
        /// The value the name was already bound to.
        existing: AttributeValue,
    },

    /// The request is malformed, e.g. a party asking itself for a resource.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// A participant variant was used in a position that does not accept it.
    #[error("Participant '{participant}' is not allowed as {slot}")]
    InvalidParticipant {
        /// The position the participant was offered to.
        slot: &'static str,
        /// Rendering of the rejected participant.
        participant: String,
    },

    /// The recursive resolver went deeper than the configured ceiling.
    #[error("Recursion limit exceeded: depth {depth} > limit {limit}")]
    RecursionLimitExceeded {
        /// Depth at which the evaluation was aborted.
        depth: usize,
        /// The configured ceiling.
        limit: usize,
    },

    /// The engine configuration is invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl EngineError {
    /// Creates a new `DuplicateAttribute` error.
    #[must_use]
    pub fn duplicate_attribute(name: impl Into<String>, existing: AttributeValue) -> Self {
        Self::DuplicateAttribute {
            name: name.into(),
            existing,
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidParticipant` error.
    #[must_use]
    pub fn invalid_participant(slot: &'static str, participant: impl fmt::Display) -> Self {
        Self::InvalidParticipant {
            slot,
            participant: participant.to_string(),
        }
    }

    /// Creates a new `RecursionLimitExceeded` error.
    #[must_use]
    pub fn recursion_limit(depth: usize, limit: usize) -> Self {
        Self::RecursionLimitExceeded { depth, limit }
    }

    /// Returns `true` if the error was raised while building model values.
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateAttribute { .. }
                | Self::InvalidRequest { .. }
                | Self::InvalidParticipant { .. }
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DuplicateAttribute { .. } => ErrorCategory::Model,
            Self::InvalidRequest { .. } => ErrorCategory::Model,
            Self::InvalidParticipant { .. } => ErrorCategory::Model,
            Self::RecursionLimitExceeded { .. } => ErrorCategory::Evaluation,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Categories of engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid attribute stores, participants or requests.
    Model,
    /// Aborted evaluations.
    Evaluation,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Evaluation => write!(f, "evaluation"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
