//! Rule conditions.
//!
//! A [`Condition`] is a boolean expression over attribute names and literal
//! values. Names are looked up through a [`NameResolver`], which reports
//! found/not-found rather than failing. Evaluation turns a missing name into
//! [`ConditionError::UndefinedName`]; the engine treats any condition error as
//! "this rule does not apply".
//!
//! # Usage
//!
//! ```ignore
//! use reciprocity_engine::condition::Condition;
//!
//! // city == "Prato" and not (floor > 3)
//! let condition = Condition::eq("city", "Prato")
//!     .and(Condition::gt("floor", 3).not());
//! let granted = condition.evaluate(&scope)?;
//! ```

use std::cmp::Ordering;
use std::fmt;

use crate::attributes::{AttributeStore, AttributeValue};

// =============================================================================
// Name Resolution
// =============================================================================

/// Source of attribute values for free names in a condition.
pub trait NameResolver {
    /// Look up `name`; `None` if no scope defines it.
    fn resolve(&self, name: &str) -> Option<&AttributeValue>;
}

impl NameResolver for AttributeStore {
    fn resolve(&self, name: &str) -> Option<&AttributeValue> {
        self.get(name)
    }
}

/// Errors local to the evaluation of one condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    /// A name is defined in none of the lookup scopes.
    #[error("Undefined name '{name}'")]
    UndefinedName {
        /// The unresolved name.
        name: String,
    },

    /// Ordering comparison between values that have no common order.
    #[error("Cannot apply '{operator}' to {left} and {right}")]
    TypeMismatch {
        /// The comparison operator.
        operator: Comparison,
        /// Kind of the left operand.
        left: &'static str,
        /// Kind of the right operand.
        right: &'static str,
    },
}

// =============================================================================
// Expression Tree
// =============================================================================

/// An operand of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A free name, resolved at evaluation time.
    Name(String),
    /// A constant.
    Literal(AttributeValue),
}

impl Term {
    fn value<'a>(&'a self, scope: &'a dyn NameResolver) -> Result<&'a AttributeValue, ConditionError> {
        match self {
            Self::Name(name) => scope
                .resolve(name)
                .ok_or_else(|| ConditionError::UndefinedName { name: name.clone() }),
            Self::Literal(value) => Ok(value),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Literal(value) => write!(f, "{value}"),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Comparison {
    fn apply(self, left: &AttributeValue, right: &AttributeValue) -> Result<bool, ConditionError> {
        match self {
            Self::Eq => return Ok(left == right),
            Self::Ne => return Ok(left != right),
            Self::Lt | Self::Le | Self::Gt | Self::Ge => {}
        }

        let ordering = match (left, right) {
            (AttributeValue::Integer(a), AttributeValue::Integer(b)) => a.cmp(b),
            (AttributeValue::Text(a), AttributeValue::Text(b)) => a.cmp(b),
            _ => {
                return Err(ConditionError::TypeMismatch {
                    operator: self,
                    left: left.kind(),
                    right: right.kind(),
                });
            }
        };

        Ok(match self {
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
        })
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}

/// Boolean guard of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// A constant outcome.
    Const(bool),
    /// Compare two terms.
    Compare {
        /// The operator.
        op: Comparison,
        /// Left operand.
        left: Term,
        /// Right operand.
        right: Term,
    },
    /// True when the name resolves in some scope. Never fails.
    Defined(String),
    /// Both hold. The right side is skipped when the left is false.
    And(Box<Condition>, Box<Condition>),
    /// Either holds. The right side is skipped when the left is true.
    Or(Box<Condition>, Box<Condition>),
    /// Negation.
    Not(Box<Condition>),
}

impl Default for Condition {
    fn default() -> Self {
        Self::Const(true)
    }
}

impl Condition {
    /// The condition that always holds.
    #[must_use]
    pub fn always() -> Self {
        Self::Const(true)
    }

    /// The condition that never holds.
    #[must_use]
    pub fn never() -> Self {
        Self::Const(false)
    }

    /// Compare the name `name` against a literal.
    #[must_use]
    pub fn compare(op: Comparison, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::Compare {
            op,
            left: Term::Name(name.into()),
            right: Term::Literal(value.into()),
        }
    }

    /// `name == value`
    #[must_use]
    pub fn eq(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::compare(Comparison::Eq, name, value)
    }

    /// `name != value`
    #[must_use]
    pub fn ne(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::compare(Comparison::Ne, name, value)
    }

    /// `name < value`
    #[must_use]
    pub fn lt(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::compare(Comparison::Lt, name, value)
    }

    /// `name > value`
    #[must_use]
    pub fn gt(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::compare(Comparison::Gt, name, value)
    }

    /// `defined(name)`
    #[must_use]
    pub fn defined(name: impl Into<String>) -> Self {
        Self::Defined(name.into())
    }

    /// `self and other`
    #[must_use]
    pub fn and(self, other: Condition) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// `self or other`
    #[must_use]
    pub fn or(self, other: Condition) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// `not self`
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluate against `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionError::UndefinedName`] for a name `scope` cannot
    /// resolve, and [`ConditionError::TypeMismatch`] for an ordering
    /// comparison between unrelated kinds.
    pub fn evaluate(&self, scope: &dyn NameResolver) -> Result<bool, ConditionError> {
        match self {
            Self::Const(value) => Ok(*value),
            Self::Compare { op, left, right } => op.apply(left.value(scope)?, right.value(scope)?),
            Self::Defined(name) => Ok(scope.resolve(name).is_some()),
            Self::And(left, right) => Ok(left.evaluate(scope)? && right.evaluate(scope)?),
            Self::Or(left, right) => Ok(left.evaluate(scope)? || right.evaluate(scope)?),
            Self::Not(inner) => Ok(!inner.evaluate(scope)?),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(value) => write!(f, "{value}"),
            Self::Compare { op, left, right } => write!(f, "{left} {op} {right}"),
            Self::Defined(name) => write!(f, "defined({name})"),
            Self::And(left, right) => write!(f, "({left} and {right})"),
            Self::Or(left, right) => write!(f, "({left} or {right})"),
            Self::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
