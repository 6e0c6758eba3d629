//! Policies, rules and the policy registry.
//!
//! A [`Policy`] belongs to one party, identified by its attributes, and holds
//! an ordered list of [`Rule`]s. Policies are registered in a [`Policies`]
//! registry; registration order fixes a stable 1-based index that requests
//! and exchanges use to name the party. Nothing is ever removed.
//!
//! # Usage
//!
//! ```ignore
//! use reciprocity_engine::policy::{Policies, Policy, Rule};
//!
//! let mut policies = Policies::new();
//! let rabbit = policies.register(
//!     Policy::new(rabbit_attributes).with_rule(Rule::new(lucca_address)),
//! );
//! assert_eq!(rabbit, 1);
//! println!("{}", policies.describe());
//! ```

use std::fmt;

use crate::attributes::AttributeStore;
use crate::condition::Condition;
use crate::exchange::Exchange;
use crate::matcher;

// =============================================================================
// Rule
// =============================================================================

/// A resource-matched, guarded grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Resources this rule is about.
    pub resource: AttributeStore,

    /// Guard evaluated against the request.
    pub condition: Condition,

    /// Counter-favour required before granting. `None` is trivially satisfied.
    pub exchange: Option<Exchange>,
}

impl Rule {
    /// An unconditional rule for `resource` with no exchange.
    #[must_use]
    pub fn new(resource: AttributeStore) -> Self {
        Self {
            resource,
            condition: Condition::always(),
            exchange: None,
        }
    }

    /// Guard the rule with `condition`.
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// Require `exchange` before granting.
    #[must_use]
    pub fn requiring(mut self, exchange: Exchange) -> Self {
        self.exchange = Some(exchange);
        self
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} if {}", self.resource, self.condition)?;
        if let Some(exchange) = &self.exchange {
            write!(f, " exchange {exchange}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Ordered rules of one policy, indexed from 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rules {
    rules: Vec<Rule>,
}

impl Rules {
    /// Append a rule and return its 1-based index.
    pub fn push(&mut self, rule: Rule) -> usize {
        self.rules.push(rule);
        self.rules.len()
    }

    /// The rule at 1-based `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Rule> {
        index.checked_sub(1).and_then(|i| self.rules.get(i))
    }

    /// Iterate as `(index, rule)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Rule)> {
        self.rules.iter().enumerate().map(|(i, rule)| (i + 1, rule))
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there is no rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Rule> for Rules {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Policy
// =============================================================================

/// A party and the rules it grants access by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Attributes identifying the owning party.
    pub party: AttributeStore,

    /// Rules, tried in order.
    pub rules: Rules,
}

impl Policy {
    /// A policy with no rules.
    #[must_use]
    pub fn new(party: AttributeStore) -> Self {
        Self {
            party,
            rules: Rules::default(),
        }
    }

    /// Append a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, rules=[", self.party)?;
        for (index, rule) in self.rules.iter() {
            if index > 1 {
                f.write_str(", ")?;
            }
            write!(f, "{rule}")?;
        }
        f.write_str("]")
    }
}

// =============================================================================
// Policies
// =============================================================================

/// Registry of policies indexed from 1. Index 0 is never assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policies {
    policies: Vec<Policy>,
}

impl Policies {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `policy` and return its index.
    pub fn register(&mut self, policy: Policy) -> usize {
        self.policies.push(policy);
        self.policies.len()
    }

    /// The policy at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Policy> {
        index.checked_sub(1).and_then(|i| self.policies.get(i))
    }

    /// Iterate as `(index, policy)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Policy)> {
        self.policies
            .iter()
            .enumerate()
            .map(|(i, policy)| (i + 1, policy))
    }

    /// Indices of the policies whose party attributes match `pattern`.
    #[must_use]
    pub fn matching(&self, pattern: &AttributeStore) -> Vec<usize> {
        self.iter()
            .filter(|(_, policy)| matcher::matches(pattern, &policy.party))
            .map(|(index, _)| index)
            .collect()
    }

    /// Number of registered policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Deterministic multi-line rendering, one `index = policy` line each.
    #[must_use]
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Policies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, policy) in self.iter() {
            writeln!(f, "{index} = {policy}")?;
        }
        Ok(())
    }
}

impl FromIterator<Policy> for Policies {
    fn from_iter<I: IntoIterator<Item = Policy>>(iter: I) -> Self {
        Self {
            policies: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::{ExchangeFrom, ExchangeTo};

    fn party(company: &str) -> AttributeStore {
        AttributeStore::from_pairs([("service", "delivery"), ("company", company)]).unwrap()
    }

    fn address(city: &str) -> AttributeStore {
        AttributeStore::from_pairs([("type", "addrInfo"), ("city", city)]).unwrap()
    }

    #[test]
    fn test_registration_is_one_based() {
        let mut policies = Policies::new();
        assert_eq!(policies.register(Policy::new(party("RabbitService"))), 1);
        assert_eq!(policies.register(Policy::new(party("FastAndFurious"))), 2);

        assert!(policies.get(0).is_none());
        assert_eq!(policies.get(1).unwrap().party, party("RabbitService"));
        assert_eq!(policies.get(2).unwrap().party, party("FastAndFurious"));
        assert!(policies.get(3).is_none());
        assert_eq!(policies.len(), 2);
    }

    #[test]
    fn test_iter_yields_indices_in_order() {
        let policies: Policies = [party("A"), party("B"), party("C")]
            .into_iter()
            .map(Policy::new)
            .collect();
        let indices: Vec<_> = policies.iter().map(|(index, _)| index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_matching() {
        let policies: Policies = [party("A"), party("B")]
            .into_iter()
            .map(Policy::new)
            .collect();
        let delivery = AttributeStore::from_pairs([("service", "delivery")]).unwrap();
        assert_eq!(policies.matching(&delivery), vec![1, 2]);
        assert_eq!(policies.matching(&party("B")), vec![2]);
        assert!(policies.matching(&party("Z")).is_empty());
        assert_eq!(policies.matching(&AttributeStore::new()), vec![1, 2]);
    }

    #[test]
    fn test_rules_are_one_based() {
        let policy = Policy::new(party("A"))
            .with_rule(Rule::new(address("Lucca")))
            .with_rule(Rule::new(address("Prato")).when(Condition::never()));
        assert!(policy.rules.get(0).is_none());
        assert_eq!(policy.rules.get(1).unwrap().resource, address("Lucca"));
        assert_eq!(policy.rules.get(2).unwrap().condition, Condition::never());
        let indices: Vec<_> = policy.rules.iter().map(|(index, _)| index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_describe() {
        let mut policies = Policies::new();
        policies.register(Policy::new(party("RabbitService")).with_rule(Rule::new(address("Lucca"))));
        policies.register(
            Policy::new(party("FastAndFurious")).with_rule(
                Rule::new(address("Prato")).requiring(Exchange::single(
                    ExchangeTo::me(),
                    address("Lucca"),
                    AttributeStore::new(),
                    ExchangeFrom::requester(),
                )),
            ),
        );
        policies.register(Policy::new(AttributeStore::new()));

        let expected = concat!(
            r#"1 = [service = "delivery", company = "RabbitService"], rules=[[type = "addrInfo", city = "Lucca"] if true]"#,
            "\n",
            r#"2 = [service = "delivery", company = "FastAndFurious"], rules=[[type = "addrInfo", city = "Prato"] if true exchange requester gives [type = "addrInfo", city = "Lucca"] to me]"#,
            "\n",
            "3 = [], rules=[]\n",
        );
        assert_eq!(policies.describe(), expected);
    }
}
