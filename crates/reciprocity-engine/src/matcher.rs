//! Attribute matching for resource patterns and party selection.
//!
//! Matching is one-directional: a `pattern` matches a `candidate` when every
//! binding of the pattern appears in the candidate with an equal value. Extra
//! candidate bindings are ignored, and the empty pattern matches anything.
//!
//! The same predicate is used by the engine to match request resources against
//! rule patterns, to select the parties named by quantified participants, and
//! by the default compliance check.

use crate::attributes::AttributeStore;

/// Check whether `pattern` matches `candidate`.
#[must_use]
pub fn matches(pattern: &AttributeStore, candidate: &AttributeStore) -> bool {
    pattern
        .iter()
        .all(|(name, value)| candidate.get(name).is_some_and(|found| found == value))
}

// =============================================================================
// Tests
// =============================================================================
