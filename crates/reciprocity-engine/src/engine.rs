//! Request evaluation engine.
//!
//! The [`Evaluator`] owns the policy registry, the context bindings, a
//! compliance checker and the configuration. Each call to
//! [`Evaluator::evaluate`] runs a depth-first search in a fresh [`Session`]
//! holding the call-scoped state: the in-flight request stack used for cycle
//! breaking, the trace and the statistics of the run.
//!
//! # Example
//!
//! ```ignore
//! use reciprocity_engine::prelude::*;
//!
//! let mut evaluator = Evaluator::new(policies).with_context(context);
//! let result = evaluator.evaluate(&request)?;
//! if result.is_permitted() {
//!     println!("granted, relying on {:?}", result.justifications);
//! }
//! println!("{}", evaluator.trace());
//! ```

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use time::OffsetDateTime;

use crate::EngineResult;
use crate::attributes::AttributeStore;
use crate::compliance::{ComplianceChecker, DefaultComplianceChecker};
use crate::config::EngineConfig;
use crate::context::{ConditionScope, ContextHandler};
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::matcher;
use crate::participant::{ExchangeFrom, ExchangeTo, Participant, Quantifier, RequestFrom};
use crate::policy::{Policies, Rule};
use crate::request::{EvaluationResult, Request};
use crate::trace::TraceRecorder;

// =============================================================================
// Evaluation Report
// =============================================================================

/// Result of one evaluation with audit information.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    /// The evaluated request.
    pub request: Request,

    /// The decision and its justifications.
    pub result: EvaluationResult,

    /// Rendered trace of the run.
    pub trace: String,

    /// Number of requests entering the resolver, the top-level one included.
    pub requests_evaluated: usize,

    /// Exchange requests satisfied by an in-flight request without recursion.
    pub compliance_shortcuts: usize,

    /// Deepest resolver nesting reached.
    pub max_depth_reached: usize,

    /// Wall-clock duration (milliseconds).
    pub evaluation_time_ms: f64,

    /// When the evaluation started.
    #[serde(with = "time::serde::rfc3339")]
    pub evaluated_at: OffsetDateTime,
}

impl EvaluationReport {
    /// Returns `true` if access was granted.
    #[must_use]
    pub fn is_permitted(&self) -> bool {
        self.result.permitted
    }

    /// Export the report as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the report cannot be represented.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// Exchange-aware request evaluator.
///
/// Policies and context are only read during evaluation. An evaluator runs
/// one evaluation at a time; the trace of the last [`evaluate`](Self::evaluate)
/// call is kept for [`trace`](Self::trace).
pub struct Evaluator {
    policies: Policies,
    context: ContextHandler,
    checker: Box<dyn ComplianceChecker>,
    config: EngineConfig,
    last_trace: String,
}

impl Evaluator {
    /// An evaluator over `policies` with the default configuration, no
    /// context bindings and the default compliance checker.
    #[must_use]
    pub fn new(policies: Policies) -> Self {
        Self {
            policies,
            context: ContextHandler::new(),
            checker: Box::new(DefaultComplianceChecker),
            config: EngineConfig::default(),
            last_trace: String::new(),
        }
    }

    /// An evaluator with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if `config` does not validate.
    pub fn with_config(policies: Policies, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let mut evaluator = Self::new(policies);
        evaluator.config = config;
        Ok(evaluator)
    }

    /// Replace the context bindings.
    #[must_use]
    pub fn with_context(mut self, context: ContextHandler) -> Self {
        self.context = context;
        self
    }

    /// Replace the compliance checker.
    #[must_use]
    pub fn with_compliance_checker(mut self, checker: impl ComplianceChecker + 'static) -> Self {
        self.checker = Box::new(checker);
        self
    }

    /// The policy registry.
    #[must_use]
    pub fn policies(&self) -> &Policies {
        &self.policies
    }

    /// The context bindings.
    #[must_use]
    pub fn context(&self) -> &ContextHandler {
        &self.context
    }

    /// Mutable access to the context bindings between evaluations.
    pub fn context_mut(&mut self) -> &mut ContextHandler {
        &mut self.context
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate `request` and keep its trace.
    ///
    /// The previous trace is discarded first. If the evaluation aborts, the
    /// trace holds the lines recorded up to that point.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RecursionLimitExceeded`] if the resolver nests
    /// deeper than `max_depth`.
    pub fn evaluate(&mut self, request: &Request) -> EngineResult<EvaluationResult> {
        self.last_trace.clear();
        let (outcome, trace) = {
            let (outcome, mut session) = self.run(request);
            (outcome, session.trace.take())
        };
        self.last_trace = trace;
        outcome
    }

    /// Evaluate `request` and return the decision with its audit record.
    ///
    /// Does not touch the trace kept by [`evaluate`](Self::evaluate).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RecursionLimitExceeded`] if the resolver nests
    /// deeper than `max_depth`.
    pub fn evaluate_with_audit(&self, request: &Request) -> EngineResult<EvaluationReport> {
        let evaluated_at = OffsetDateTime::now_utc();
        let (outcome, mut session) = self.run(request);
        let result = outcome?;

        Ok(EvaluationReport {
            request: request.clone(),
            result,
            trace: session.trace.take(),
            requests_evaluated: session.requests_evaluated,
            compliance_shortcuts: session.compliance_shortcuts,
            max_depth_reached: session.max_depth_reached,
            evaluation_time_ms: session.elapsed_ms(),
            evaluated_at,
        })
    }

    /// Trace of the last [`evaluate`](Self::evaluate) call.
    #[must_use]
    pub fn trace(&self) -> &str {
        &self.last_trace
    }

    fn run(&self, request: &Request) -> (EngineResult<EvaluationResult>, Session<'_>) {
        let mut session = Session::new(self);
        let outcome = session.resolve(request);

        match &outcome {
            Ok(result) => tracing::debug!(
                request = %request,
                permitted = result.permitted,
                justifications = result.justifications.len(),
                requests_evaluated = session.requests_evaluated,
                elapsed_ms = session.elapsed_ms(),
                "Request evaluated"
            ),
            Err(e) => tracing::debug!(
                request = %request,
                error = %e,
                category = %e.category(),
                "Request evaluation aborted"
            ),
        }

        (outcome, session)
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("policies", &self.policies)
            .field("context", &self.context)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Session
// =============================================================================

/// State of one top-level evaluation.
struct Session<'e> {
    engine: &'e Evaluator,
    in_flight: Vec<Request>,
    trace: TraceRecorder,
    depth: usize,
    max_depth_reached: usize,
    requests_evaluated: usize,
    compliance_shortcuts: usize,
    started: Instant,
}

impl<'e> Session<'e> {
    fn new(engine: &'e Evaluator) -> Self {
        Self {
            engine,
            in_flight: Vec::new(),
            trace: TraceRecorder::new(engine.config.trace.clone()),
            depth: 0,
            max_depth_reached: 0,
            requests_evaluated: 0,
            compliance_shortcuts: 0,
            started: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    // -------------------------------------------------------------------------
    // Request resolution
    // -------------------------------------------------------------------------

    fn resolve(&mut self, request: &Request) -> EngineResult<EvaluationResult> {
        self.depth += 1;
        let outcome = self.resolve_nested(request);
        self.depth -= 1;
        outcome
    }

    fn resolve_nested(&mut self, request: &Request) -> EngineResult<EvaluationResult> {
        let limit = self.engine.config.max_depth;
        if self.depth > limit {
            tracing::warn!(
                depth = self.depth,
                limit,
                request = %request,
                "Recursion limit exceeded"
            );
            self.trace.record(format!("recursion limit {limit} exceeded"));
            return Err(EngineError::recursion_limit(self.depth, limit));
        }
        self.requests_evaluated += 1;
        self.max_depth_reached = self.max_depth_reached.max(self.depth);

        self.trace.record_then_indent(format!("evaluating {request}"));
        let result = self.dispatch(request)?;
        self.trace
            .unindent_then_record(format!("result: {}", result.permitted));
        Ok(result)
    }

    fn dispatch(&mut self, request: &Request) -> EngineResult<EvaluationResult> {
        let source: &RequestFrom = request.source();
        if let Some(index) = source.index() {
            return self.evaluate_policy(index, request);
        }

        match (source.quantifier(), source.attributes()) {
            (Some(quantifier), Some(selector)) => {
                self.resolve_candidates(quantifier, selector, request)
            }
            _ => {
                self.trace.record("request addresses no policy");
                Ok(EvaluationResult::deny())
            }
        }
    }

    /// Resolve a request addressed to every policy matching `selector`.
    ///
    /// All candidates are evaluated; the justifications of the successful
    /// ones are aggregated.
    fn resolve_candidates(
        &mut self,
        quantifier: Quantifier,
        selector: &AttributeStore,
        request: &Request,
    ) -> EngineResult<EvaluationResult> {
        let requester = request.requester().index();
        let candidates: Vec<usize> = self
            .engine
            .policies
            .matching(selector)
            .into_iter()
            .filter(|candidate| Some(*candidate) != requester)
            .collect();

        if candidates.is_empty() {
            self.trace
                .record(format!("no candidate policy matches {selector}"));
            return Ok(EvaluationResult::deny());
        }

        let mut aggregated = EvaluationResult::permit();
        let mut successes = 0;
        for &candidate in &candidates {
            let sub = self.resolve(&request.addressed_to(candidate))?;
            if sub.permitted {
                successes += 1;
                aggregated.absorb(sub);
            }
        }

        let permitted = match quantifier {
            Quantifier::All => successes == candidates.len(),
            Quantifier::Any => successes > 0,
        };
        if permitted {
            Ok(aggregated)
        } else {
            Ok(EvaluationResult::deny())
        }
    }

    // -------------------------------------------------------------------------
    // Policies and rules
    // -------------------------------------------------------------------------

    /// First rule that grants wins.
    fn evaluate_policy(&mut self, index: usize, request: &Request) -> EngineResult<EvaluationResult> {
        let engine = self.engine;
        let Some(policy) = engine.policies.get(index) else {
            self.trace
                .record(format!("no policy is registered at index {index}"));
            return Ok(EvaluationResult::deny());
        };

        for (rule_index, rule) in policy.rules.iter() {
            let result = self.evaluate_rule(index, rule_index, rule, request)?;
            if result.permitted {
                return Ok(result);
            }
        }

        self.trace
            .record(format!("no rule of policy {index} grants the request"));
        Ok(EvaluationResult::deny())
    }

    fn evaluate_rule(
        &mut self,
        policy_index: usize,
        rule_index: usize,
        rule: &Rule,
        request: &Request,
    ) -> EngineResult<EvaluationResult> {
        let label = format!("rule {policy_index}.{rule_index}");

        if !matcher::matches(request.resource(), &rule.resource) {
            self.trace
                .record(format!("{label}: resource {} not matched", rule.resource));
            return Ok(EvaluationResult::deny());
        }

        let engine = self.engine;
        let requester_party = request
            .requester()
            .index()
            .and_then(|index| engine.policies.get(index))
            .map(|policy| &policy.party);
        let scope = ConditionScope::new(
            request.resource(),
            engine.context.store(policy_index),
            requester_party,
        );

        match rule.condition.evaluate(&scope) {
            Ok(true) => {}
            Ok(false) => {
                self.trace
                    .record(format!("{label}: condition {} is false", rule.condition));
                return Ok(EvaluationResult::deny());
            }
            Err(e) => {
                tracing::trace!(
                    policy = policy_index,
                    rule = rule_index,
                    error = %e,
                    "Condition not evaluable, rule skipped"
                );
                self.trace.record(format!(
                    "{label}: condition {} not evaluable: {e}",
                    rule.condition
                ));
                return Ok(EvaluationResult::deny());
            }
        }

        let Some(exchange) = &rule.exchange else {
            self.trace.record(format!("{label}: granted"));
            let mut result = EvaluationResult::permit();
            result.justify(request.clone());
            return Ok(result);
        };

        self.trace.record(format!(
            "{label}: condition {} holds, exchange required",
            rule.condition
        ));
        self.in_flight.push(request.clone());
        let outcome = self.evaluate_exchange(policy_index, exchange, request);
        self.in_flight.pop();
        let exchanged = outcome?;

        tracing::trace!(
            policy = policy_index,
            rule = rule_index,
            satisfied = exchanged.permitted,
            "Exchange evaluated"
        );
        if !exchanged.permitted {
            self.trace.record(format!("{label}: exchange not satisfied"));
            return Ok(EvaluationResult::deny());
        }

        self.trace.record(format!("{label}: granted"));
        let mut result = EvaluationResult::permit();
        result.absorb(exchanged);
        result.justify(request.clone());
        Ok(result)
    }

    // -------------------------------------------------------------------------
    // Exchanges
    // -------------------------------------------------------------------------

    fn evaluate_exchange(
        &mut self,
        policy_index: usize,
        exchange: &Exchange,
        request: &Request,
    ) -> EngineResult<EvaluationResult> {
        match exchange {
            Exchange::And(left, right) => {
                self.evaluate_composite(policy_index, Connective::And, left, right, request)
            }
            Exchange::Or(left, right) => {
                self.evaluate_composite(policy_index, Connective::Or, left, right, request)
            }
            Exchange::Single {
                to,
                resource,
                credentials,
                from,
            } => {
                self.trace.record_then_indent(format!("exchange {exchange}"));
                let result =
                    self.evaluate_single(policy_index, to, resource, credentials, from, request)?;
                self.trace
                    .unindent_then_record(format!("exchange satisfied: {}", result.permitted));
                Ok(result)
            }
        }
    }

    fn evaluate_composite(
        &mut self,
        policy_index: usize,
        connective: Connective,
        left: &Exchange,
        right: &Exchange,
        request: &Request,
    ) -> EngineResult<EvaluationResult> {
        self.trace.indent();
        let mut result = self.evaluate_exchange(policy_index, left, request)?;

        let decided = match connective {
            Connective::And => !result.permitted,
            Connective::Or => result.permitted,
        };
        if !decided {
            self.trace
                .unindent_then_insert_at_previous_level(connective.to_string());
            let other = self.evaluate_exchange(policy_index, right, request)?;
            result = match connective {
                Connective::And if other.permitted => {
                    result.absorb(other);
                    result
                }
                _ => other,
            };
        }

        self.trace.unindent();
        Ok(result)
    }

    /// Evaluate an atomic exchange for the policy at `policy_index`.
    fn evaluate_single(
        &mut self,
        policy_index: usize,
        to: &ExchangeTo,
        resource: &AttributeStore,
        credentials: &AttributeStore,
        from: &ExchangeFrom,
        request: &Request,
    ) -> EngineResult<EvaluationResult> {
        let from_indexes: Vec<usize> = if from.is_requester() {
            request.requester().index().into_iter().collect()
        } else {
            self.select(from)
        };
        let to_indexes: Vec<usize> = if to.is_me() {
            vec![policy_index]
        } else {
            self.select(to)
        };

        if to_indexes.is_empty() {
            self.trace.record(format!(
                "no party receives {resource}, exchange vacuously satisfied"
            ));
            return Ok(EvaluationResult::permit());
        }
        if from_indexes.is_empty() {
            self.trace
                .record(format!("no party can give {resource}, exchange unsatisfiable"));
            return Ok(EvaluationResult::deny());
        }

        let to_all = to.is_all();
        let mut executed = 0;

        if from.is_all() {
            let mut combined = EvaluationResult::permit();
            for from_index in from_indexes {
                let inner = self.exchange_with(
                    from_index,
                    &to_indexes,
                    to_all,
                    resource,
                    credentials,
                    &mut executed,
                )?;
                if !inner.permitted {
                    return Ok(EvaluationResult::deny());
                }
                combined.absorb(inner);
            }
            if executed == 0 {
                self.trace
                    .record("no exchange left once self-exchanges are excluded");
                return Ok(EvaluationResult::deny());
            }
            return Ok(combined);
        }

        for from_index in from_indexes {
            let inner = self.exchange_with(
                from_index,
                &to_indexes,
                to_all,
                resource,
                credentials,
                &mut executed,
            )?;
            if inner.permitted {
                return Ok(inner);
            }
        }
        Ok(EvaluationResult::deny())
    }

    /// Combine the exchange requests from `from_index` over `to_indexes`.
    fn exchange_with(
        &mut self,
        from_index: usize,
        to_indexes: &[usize],
        to_all: bool,
        resource: &AttributeStore,
        credentials: &AttributeStore,
        executed: &mut usize,
    ) -> EngineResult<EvaluationResult> {
        let mut combined = EvaluationResult::permit();
        for &to_index in to_indexes {
            if to_index == from_index {
                continue;
            }
            *executed += 1;

            let candidate = Request::new(
                to_index,
                resource.clone(),
                credentials.clone(),
                RequestFrom::policy(from_index),
            )?;
            let sub = self.exchange_request(candidate)?;

            if to_all {
                if !sub.permitted {
                    return Ok(EvaluationResult::deny());
                }
                combined.absorb(sub);
            } else if sub.permitted {
                return Ok(sub);
            }
        }

        if to_all {
            Ok(combined)
        } else {
            Ok(EvaluationResult::deny())
        }
    }

    /// Satisfy `candidate` from the in-flight stack, or resolve it.
    fn exchange_request(&mut self, candidate: Request) -> EngineResult<EvaluationResult> {
        let engine = self.engine;
        if let Some(existing) = self
            .in_flight
            .iter()
            .find(|existing| engine.checker.complies(&candidate, existing))
        {
            self.compliance_shortcuts += 1;
            self.trace.record(format!(
                "{candidate} complies with in-flight request {existing}"
            ));
            return Ok(EvaluationResult::permit());
        }
        self.resolve(&candidate)
    }

    fn select(&self, participant: &Participant) -> Vec<usize> {
        participant
            .attributes()
            .map(|selector| self.engine.policies.matching(selector))
            .unwrap_or_default()
    }
}

/// Composite exchange connective, as printed in the trace.
#[derive(Debug, Clone, Copy)]
enum Connective {
    And,
    Or,
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
