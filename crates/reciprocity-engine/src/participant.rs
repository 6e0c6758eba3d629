//! Participants: who fills a role in a request or an exchange.
//!
//! [`Participant`] is the closed set of ways to name a party. Each syntactic
//! position only accepts a subset of the variants, enforced by a wrapper type
//! per position:
//!
//! | Position        | Type             | Accepted variants            |
//! |-----------------|------------------|------------------------------|
//! | request "from"  | [`RequestFrom`]  | `Index`, `Quantified`        |
//! | exchange "from" | [`ExchangeFrom`] | `Requester`, `Quantified`    |
//! | exchange "to"   | [`ExchangeTo`]   | `Me`, `Quantified`           |
//!
//! The typed constructors of the wrappers are infallible; converting an
//! arbitrary [`Participant`] goes through `TryFrom` and may fail with
//! [`EngineError::InvalidParticipant`].

use std::fmt;
use std::ops::Deref;

use serde::Serialize;

use crate::attributes::AttributeStore;
use crate::error::EngineError;

// =============================================================================
// Quantifier
// =============================================================================

/// How the parties selected by attributes are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantifier {
    /// At least one selected party must succeed.
    Any,
    /// Every selected party must succeed, and there must be at least one.
    All,
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "anySuchThat"),
            Self::All => write!(f, "allSuchThat"),
        }
    }
}

// =============================================================================
// Participant
// =============================================================================

/// A party reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Participant {
    /// The policy registered at a 1-based index. Index 0 names no policy.
    Index(usize),
    /// The party owning the rule being evaluated.
    Me,
    /// The requester of the request that triggered the exchange.
    Requester,
    /// Every party whose attributes match, combined by the quantifier.
    Quantified {
        /// ANY or ALL.
        quantifier: Quantifier,
        /// Attributes the selected parties must carry.
        attributes: AttributeStore,
    },
}

impl Participant {
    /// The concrete policy index, if this participant names one.
    ///
    /// Only `Index(i)` with `i > 0` is concrete.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Index(index) if *index > 0 => Some(*index),
            _ => None,
        }
    }

    /// Returns `true` for [`Participant::Me`].
    #[must_use]
    pub fn is_me(&self) -> bool {
        matches!(self, Self::Me)
    }

    /// Returns `true` for [`Participant::Requester`].
    #[must_use]
    pub fn is_requester(&self) -> bool {
        matches!(self, Self::Requester)
    }

    /// Returns `true` only for an ALL-quantified participant.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.quantifier() == Some(Quantifier::All)
    }

    /// The quantifier of a quantified participant.
    #[must_use]
    pub fn quantifier(&self) -> Option<Quantifier> {
        match self {
            Self::Quantified { quantifier, .. } => Some(*quantifier),
            _ => None,
        }
    }

    /// The selecting attributes of a quantified participant.
    #[must_use]
    pub fn attributes(&self) -> Option<&AttributeStore> {
        match self {
            Self::Quantified { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    fn quantified(quantifier: Quantifier, attributes: AttributeStore) -> Self {
        Self::Quantified {
            quantifier,
            attributes,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Me => write!(f, "me"),
            Self::Requester => write!(f, "requester"),
            Self::Quantified {
                quantifier,
                attributes,
            } => write!(f, "{quantifier} {attributes}"),
        }
    }
}

// =============================================================================
// Position Wrappers
// =============================================================================

macro_rules! participant_slot {
    ($(#[$meta:meta])* $name:ident, $slot:literal, $allowed:pat) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(Participant);

        impl $name {
            /// Select any party whose attributes match.
            #[must_use]
            pub fn any_such_that(attributes: AttributeStore) -> Self {
                Self(Participant::quantified(Quantifier::Any, attributes))
            }

            /// Select all parties whose attributes match.
            #[must_use]
            pub fn all_such_that(attributes: AttributeStore) -> Self {
                Self(Participant::quantified(Quantifier::All, attributes))
            }

            /// The wrapped participant.
            #[must_use]
            pub fn participant(&self) -> &Participant {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = Participant;

            fn deref(&self) -> &Participant {
                &self.0
            }
        }

        impl TryFrom<Participant> for $name {
            type Error = EngineError;

            fn try_from(participant: Participant) -> Result<Self, Self::Error> {
                match participant {
                    $allowed => Ok(Self(participant)),
                    other => Err(EngineError::invalid_participant($slot, other)),
                }
            }
        }

        impl From<$name> for Participant {
            fn from(slot: $name) -> Participant {
                slot.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

participant_slot!(
    /// The party a request is addressed to.
    RequestFrom,
    "request source",
    Participant::Index(_) | Participant::Quantified { .. }
);

participant_slot!(
    /// The party that must hand over the resource of an exchange.
    ExchangeFrom,
    "exchange source",
    Participant::Requester | Participant::Quantified { .. }
);

participant_slot!(
    /// The party that receives the resource of an exchange.
    ExchangeTo,
    "exchange target",
    Participant::Me | Participant::Quantified { .. }
);

impl RequestFrom {
    /// Address the policy registered at `index`.
    #[must_use]
    pub fn policy(index: usize) -> Self {
        Self(Participant::Index(index))
    }
}

impl ExchangeFrom {
    /// The requester of the triggering request.
    #[must_use]
    pub fn requester() -> Self {
        Self(Participant::Requester)
    }
}

impl ExchangeTo {
    /// The party owning the rule.
    #[must_use]
    pub fn me() -> Self {
        Self(Participant::Me)
    }
}

// =============================================================================
// Tests
// =============================================================================
