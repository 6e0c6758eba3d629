//! Access requests and evaluation results.

use std::fmt;

use serde::Serialize;

use crate::EngineResult;
use crate::attributes::AttributeStore;
use crate::error::EngineError;
use crate::participant::{Participant, RequestFrom};

// =============================================================================
// Request
// =============================================================================

/// "`requester` wants `resource` from `from`", presenting `credentials`.
///
/// Equality and hashing cover all four fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Request {
    requester: Participant,
    resource: AttributeStore,
    credentials: AttributeStore,
    from: RequestFrom,
}

impl Request {
    /// Create a request issued by the party at `requester`.
    ///
    /// `requester` may be 0 for a party that owns no policy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRequest`] if `requester` and `from` name
    /// the same concrete policy index.
    pub fn new(
        requester: usize,
        resource: AttributeStore,
        credentials: AttributeStore,
        from: RequestFrom,
    ) -> EngineResult<Self> {
        let requester = Participant::Index(requester);
        if let (Some(asker), Some(owner)) = (requester.index(), from.index())
            && asker == owner
        {
            return Err(EngineError::invalid_request(format!(
                "party {asker} cannot request a resource from itself"
            )));
        }
        Ok(Self {
            requester,
            resource,
            credentials,
            from,
        })
    }

    /// The same request addressed to the policy at `index`.
    ///
    /// Callers guarantee `index` differs from the requester index.
    pub(crate) fn addressed_to(&self, index: usize) -> Self {
        Self {
            requester: self.requester.clone(),
            resource: self.resource.clone(),
            credentials: self.credentials.clone(),
            from: RequestFrom::policy(index),
        }
    }

    /// Who is asking.
    #[must_use]
    pub fn requester(&self) -> &Participant {
        &self.requester
    }

    /// What is asked for.
    #[must_use]
    pub fn resource(&self) -> &AttributeStore {
        &self.resource
    }

    /// Credentials presented with the request.
    #[must_use]
    pub fn credentials(&self) -> &AttributeStore {
        &self.credentials
    }

    /// Who is asked.
    #[must_use]
    pub fn source(&self) -> &RequestFrom {
        &self.from
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} asks {} for {}", self.requester, self.from, self.resource)?;
        if !self.credentials.is_empty() {
            write!(f, " with credentials {}", self.credentials)?;
        }
        Ok(())
    }
}

// =============================================================================
// Evaluation Result
// =============================================================================

/// Outcome of resolving a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationResult {
    /// Whether access is granted.
    pub permitted: bool,

    /// Requests whose successful evaluation the decision relied upon.
    ///
    /// The same request may appear more than once when several branches
    /// depended on it.
    pub justifications: Vec<Request>,
}

impl EvaluationResult {
    /// A denial.
    #[must_use]
    pub fn deny() -> Self {
        Self::default()
    }

    /// A grant with no justification yet.
    #[must_use]
    pub fn permit() -> Self {
        Self {
            permitted: true,
            justifications: Vec::new(),
        }
    }

    /// Returns `true` if access was granted.
    #[must_use]
    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    /// Append the justifications of `other`.
    pub(crate) fn absorb(&mut self, other: EvaluationResult) {
        self.justifications.extend(other.justifications);
    }

    /// Record `request` as relied upon.
    pub(crate) fn justify(&mut self, request: Request) {
        self.justifications.push(request);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(city: &str) -> AttributeStore {
        AttributeStore::from_pairs([("type", "addrInfo"), ("city", city)]).unwrap()
    }

    #[test]
    fn test_self_request_is_rejected() {
        let err = Request::new(1, resource("Prato"), AttributeStore::new(), RequestFrom::policy(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest { .. }));
    }

    #[test]
    fn test_index_zero_is_not_concrete() {
        let request = Request::new(
            0,
            resource("Prato"),
            AttributeStore::new(),
            RequestFrom::policy(1),
        );
        assert!(request.is_ok());
    }

    #[test]
    fn test_quantified_source_never_conflicts() {
        let selector = AttributeStore::from_pairs([("service", "delivery")]).unwrap();
        let request = Request::new(
            1,
            resource("Prato"),
            AttributeStore::new(),
            RequestFrom::any_such_that(selector),
        );
        assert!(request.is_ok());
    }

    #[test]
    fn test_equality_covers_credentials() {
        let plain =
            Request::new(1, resource("Prato"), AttributeStore::new(), RequestFrom::policy(2))
                .unwrap();
        let signed = Request::new(
            1,
            resource("Prato"),
            AttributeStore::from_pairs([("badge", "gold")]).unwrap(),
            RequestFrom::policy(2),
        )
        .unwrap();
        assert_ne!(plain, signed);
        assert_eq!(plain, plain.clone());
    }

    #[test]
    fn test_addressed_to_rebinds_source() {
        let selector = AttributeStore::from_pairs([("service", "delivery")]).unwrap();
        let request = Request::new(
            1,
            resource("Prato"),
            AttributeStore::new(),
            RequestFrom::any_such_that(selector),
        )
        .unwrap();
        let rebound = request.addressed_to(2);
        assert_eq!(rebound.source().index(), Some(2));
        assert_eq!(rebound.resource(), request.resource());
    }

    #[test]
    fn test_display() {
        let request = Request::new(
            1,
            resource("Prato"),
            AttributeStore::from_pairs([("badge", "gold")]).unwrap(),
            RequestFrom::policy(2),
        )
        .unwrap();
        assert_eq!(
            request.to_string(),
            r#"1 asks 2 for [type = "addrInfo", city = "Prato"] with credentials [badge = "gold"]"#
        );
    }

    #[test]
    fn test_result_absorbs_justifications() {
        let request =
            Request::new(2, resource("Lucca"), AttributeStore::new(), RequestFrom::policy(1))
                .unwrap();
        let mut inner = EvaluationResult::permit();
        inner.justify(request.clone());

        let mut outer = EvaluationResult::permit();
        outer.absorb(inner);
        outer.justify(request.clone());

        assert!(outer.is_permitted());
        assert_eq!(outer.justifications, vec![request.clone(), request]);
        assert!(!EvaluationResult::deny().is_permitted());
    }
}
