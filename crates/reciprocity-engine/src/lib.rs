//! # reciprocity-engine
//!
//! Decentralized authorization with exchanges.
//!
//! Every party owns a policy: an ordered list of rules granting its resources.
//! A rule may require an exchange, a counter-favour the requester (or parties
//! selected by attributes) must grant in return. Evaluating one request can
//! therefore recursively evaluate the exchange requests it generates, possibly
//! in cycles; a cycle ends as soon as a generated request complies with a
//! request already being resolved.
//!
//! ## Overview
//!
//! The caller builds [`Policies`], an optional [`ContextHandler`] and
//! optionally a custom [`ComplianceChecker`], then submits a [`Request`] to
//! an [`Evaluator`]. The result carries the decision, the requests it relied
//! on, and leaves an indented trace of the search for auditing.
//!
//! ## Modules
//!
//! - [`attributes`] - Attribute values and insertion-ordered stores
//! - [`matcher`] - Attribute pattern matching
//! - [`participant`] - Participants and their position-checked wrappers
//! - [`condition`] - Rule conditions and name resolution
//! - [`exchange`] - Exchange obligation trees
//! - [`policy`] - Rules, policies and the policy registry
//! - [`request`] - Requests and evaluation results
//! - [`context`] - Per-party context bindings
//! - [`compliance`] - In-flight request compliance
//! - [`trace`] - Indentation-aware evaluation trace
//! - [`engine`] - The recursive evaluator
//! - [`config`] - Engine configuration

pub mod attributes;
pub mod compliance;
pub mod condition;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod matcher;
pub mod participant;
pub mod policy;
pub mod request;
pub mod trace;

pub use attributes::{AttributeStore, AttributeValue};
pub use compliance::{ComplianceChecker, DefaultComplianceChecker};
pub use condition::{Comparison, Condition, ConditionError, NameResolver, Term};
pub use config::{ConfigError, EngineConfig, TraceConfig};
pub use context::{ConditionScope, ContextHandler};
pub use engine::{EvaluationReport, Evaluator};
pub use error::{EngineError, ErrorCategory};
pub use exchange::Exchange;
pub use participant::{ExchangeFrom, ExchangeTo, Participant, Quantifier, RequestFrom};
pub use policy::{Policies, Policy, Rule, Rules};
pub use request::{EvaluationResult, Request};
pub use trace::TraceRecorder;

/// Type alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use reciprocity_engine::prelude::*;
/// ```
pub mod prelude {
    pub use crate::EngineResult;
    pub use crate::attributes::{AttributeStore, AttributeValue};
    pub use crate::compliance::{ComplianceChecker, DefaultComplianceChecker};
    pub use crate::condition::Condition;
    pub use crate::config::{ConfigError, EngineConfig, TraceConfig};
    pub use crate::context::ContextHandler;
    pub use crate::engine::{EvaluationReport, Evaluator};
    pub use crate::error::{EngineError, ErrorCategory};
    pub use crate::exchange::Exchange;
    pub use crate::participant::{ExchangeFrom, ExchangeTo, Participant, Quantifier, RequestFrom};
    pub use crate::policy::{Policies, Policy, Rule};
    pub use crate::request::{EvaluationResult, Request};
}
