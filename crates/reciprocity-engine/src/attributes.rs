//! Attribute values and insertion-ordered attribute stores.
//!
//! Attribute stores describe parties, resources and credentials. A store never
//! binds the same name twice: insertion of an existing name is rejected with
//! [`EngineError::DuplicateAttribute`], reporting the value already bound.
//!
//! # Usage
//!
//! ```ignore
//! use reciprocity_engine::attributes::AttributeStore;
//!
//! let party = AttributeStore::from_pairs([
//!     ("service", "delivery"),
//!     ("company", "RabbitService"),
//! ])?;
//! assert_eq!(party.to_string(), r#"[service = "delivery", company = "RabbitService"]"#);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::Serialize;

use crate::EngineResult;
use crate::error::EngineError;

// =============================================================================
// Attribute Value
// =============================================================================

/// A comparable scalar bound to an attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Free text.
    Text(String),
}

impl AttributeValue {
    /// Name of the value kind, used in type mismatch messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// =============================================================================
// Attribute Store
// =============================================================================

/// Mapping from attribute name to value, iterated in insertion order.
///
/// Equality and hashing ignore insertion order; rendering follows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeStore {
    entries: IndexMap<String, AttributeValue>,
}

impl AttributeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateAttribute`] if a name appears twice.
    pub fn from_pairs<I, K, V>(pairs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        let mut store = Self::new();
        for (name, value) in pairs {
            store.insert(name, value)?;
        }
        Ok(store)
    }

    /// Bind `name` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateAttribute`] carrying the prior value if
    /// `name` is already bound.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> EngineResult<()> {
        let name = name.into();
        if let Some(existing) = self.entries.get(&name) {
            return Err(EngineError::duplicate_attribute(name, existing.clone()));
        }
        self.entries.insert(name, value.into());
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateAttribute`] if `name` is already bound.
    pub fn with(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> EngineResult<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Look up the value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.get(name)
    }

    /// Returns `true` if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of bound names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no name is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Hash for AttributeStore {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with the order-insensitive equality of IndexMap.
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries.len().hash(state);
        for (name, value) in entries {
            name.hash(state);
            value.hash(state);
        }
    }
}

impl fmt::Display for AttributeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (position, (name, value)) in self.entries.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name} = {value}")?;
        }
        f.write_str("]")
    }
}

impl<'a> IntoIterator for &'a AttributeStore {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = indexmap::map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
