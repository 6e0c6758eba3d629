//! Per-party context bindings and condition lookup scopes.
//!
//! The [`ContextHandler`] holds caller-supplied attributes for each policy
//! index. It outlives single evaluations at the caller's discretion and is
//! only read by the engine.
//!
//! [`ConditionScope`] is the lookup used while evaluating a rule condition.
//! A free name is probed, in order, in:
//!
//! 1. the resource of the request,
//! 2. the context bindings of the policy being evaluated,
//! 3. the party attributes of the requester's own policy (when the requester
//!    has a concrete index).
//!
//! The first scope defining the name wins.

use std::collections::BTreeMap;

use crate::EngineResult;
use crate::attributes::{AttributeStore, AttributeValue};
use crate::condition::NameResolver;

// =============================================================================
// Context Handler
// =============================================================================

/// Context attributes scoped per policy index.
#[derive(Debug, Clone, Default)]
pub struct ContextHandler {
    stores: BTreeMap<usize, AttributeStore>,
}

impl ContextHandler {
    /// A handler with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The store of `index`, created empty on first access.
    pub fn store_mut(&mut self, index: usize) -> &mut AttributeStore {
        self.stores.entry(index).or_default()
    }

    /// The store of `index` without materializing it.
    ///
    /// `None` behaves as an empty store.
    #[must_use]
    pub fn store(&self, index: usize) -> Option<&AttributeStore> {
        self.stores.get(&index)
    }

    /// Bind `name` to `value` in the store of `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateAttribute`](crate::EngineError::DuplicateAttribute)
    /// if `name` is already bound for that index.
    pub fn bind(
        &mut self,
        index: usize,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> EngineResult<()> {
        self.store_mut(index).insert(name, value)
    }

    /// Builder-style [`bind`](Self::bind).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateAttribute`](crate::EngineError::DuplicateAttribute)
    /// if `name` is already bound for that index.
    pub fn with(
        mut self,
        index: usize,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> EngineResult<Self> {
        self.bind(index, name, value)?;
        Ok(self)
    }

    /// Number of materialized stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Returns `true` if no store was materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

// =============================================================================
// Condition Scope
// =============================================================================

/// Layered name lookup for one rule evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ConditionScope<'a> {
    resource: &'a AttributeStore,
    context: Option<&'a AttributeStore>,
    requester: Option<&'a AttributeStore>,
}

impl<'a> ConditionScope<'a> {
    /// Build a scope from its three layers, highest priority first.
    #[must_use]
    pub fn new(
        resource: &'a AttributeStore,
        context: Option<&'a AttributeStore>,
        requester: Option<&'a AttributeStore>,
    ) -> Self {
        Self {
            resource,
            context,
            requester,
        }
    }
}

impl NameResolver for ConditionScope<'_> {
    fn resolve(&self, name: &str) -> Option<&AttributeValue> {
        self.resource
            .get(name)
            .or_else(|| self.context.and_then(|store| store.get(name)))
            .or_else(|| self.requester.and_then(|store| store.get(name)))
    }
}

// =============================================================================
// Tests
// =============================================================================
