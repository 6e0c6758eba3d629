//! Request compliance: recognizing that an in-flight request already covers a
//! newly generated exchange request.
//!
//! While the engine resolves the exchange of a rule, the triggering request is
//! kept on an in-flight stack. Each exchange request generated below it is
//! checked against that stack first; a compliant match is taken as satisfied
//! without recursing, which is what ends cyclic exchange chains.

use crate::matcher;
use crate::request::Request;

/// Decides whether `existing` discharges `new`.
pub trait ComplianceChecker {
    /// Returns `true` if the in-flight `existing` request covers `new`.
    fn complies(&self, new: &Request, existing: &Request) -> bool;
}

/// Same requester, same source, and the new resource matches the existing one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComplianceChecker;

impl ComplianceChecker for DefaultComplianceChecker {
    fn complies(&self, new: &Request, existing: &Request) -> bool {
        new.requester() == existing.requester()
            && new.source() == existing.source()
            && matcher::matches(new.resource(), existing.resource())
    }
}

impl<F> ComplianceChecker for F
where
    F: Fn(&Request, &Request) -> bool,
{
    fn complies(&self, new: &Request, existing: &Request) -> bool {
        self(new, existing)
    }
}
