//! Exchange obligations attached to rules.
//!
//! An exchange is a boolean tree of atomic counter-favours. A rule carrying an
//! exchange only grants access once the tree evaluates to true, which in turn
//! requires resolving the generated exchange requests against other policies.

use std::fmt;

use crate::attributes::AttributeStore;
use crate::participant::{ExchangeFrom, ExchangeTo};

/// A boolean tree of atomic exchange obligations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// `from` must hand `resource` over to `to`, presenting `credentials`.
    Single {
        /// Receiving party.
        to: ExchangeTo,
        /// Resource to hand over.
        resource: AttributeStore,
        /// Credentials attached to the generated request.
        credentials: AttributeStore,
        /// Giving party.
        from: ExchangeFrom,
    },
    /// Both obligations must hold. The right one is skipped when the left fails.
    And(Box<Exchange>, Box<Exchange>),
    /// Either obligation must hold. The right one is skipped when the left holds.
    Or(Box<Exchange>, Box<Exchange>),
}

impl Exchange {
    /// An atomic exchange.
    #[must_use]
    pub fn single(
        to: ExchangeTo,
        resource: AttributeStore,
        credentials: AttributeStore,
        from: ExchangeFrom,
    ) -> Self {
        Self::Single {
            to,
            resource,
            credentials,
            from,
        }
    }

    /// `self and other`
    #[must_use]
    pub fn and(self, other: Exchange) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// `self or other`
    #[must_use]
    pub fn or(self, other: Exchange) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single {
                to,
                resource,
                credentials,
                from,
            } => {
                write!(f, "{from} gives {resource} to {to}")?;
                if !credentials.is_empty() {
                    write!(f, " with credentials {credentials}")?;
                }
                Ok(())
            }
            Self::And(left, right) => write!(f, "({left} and {right})"),
            Self::Or(left, right) => write!(f, "({left} or {right})"),
        }
    }
}
