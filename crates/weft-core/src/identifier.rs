//! Identifier management using string interning.
//!
//! Every semantic element handled by Weft is referred to by an [`Id`]. Ids are
//! cheap to copy, hash and compare, which matters because the interaction graph
//! keeps several element-keyed lookup tables and the diff builder compares
//! whole collections of them.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock, PoisonError},
};

use serde::{Deserialize, Deserializer};
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner backing every [`Id`].
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Interned identifier of a semantic element.
///
/// # Examples
///
/// ```
/// use weft_core::identifier::Id;
///
/// let lifeline = Id::new("client");
/// assert_eq!(lifeline, "client");
///
/// let message = Id::new("checkout").create_nested(Id::new("Message1"));
/// assert_eq!(message, "checkout::Message1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from a string, interning it on first use.
    pub fn new(name: &str) -> Self {
        Self(interner().get_or_intern(name))
    }

    /// Creates a nested ID by joining this ID and `child_id` with `::`.
    ///
    /// Used to derive ids for elements created on behalf of an owner, such as
    /// the messages an edit adds to an interaction.
    pub fn create_nested(&self, child_id: Id) -> Self {
        let mut interner = interner();
        let nested_name = match (interner.resolve(self.0), interner.resolve(child_id.0)) {
            (Some(parent), Some(child)) => format!("{parent}::{child}"),
            _ => String::new(),
        };
        Self(interner.get_or_intern(nested_name))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner();
        write!(f, "{}", interner.resolve(self.0).unwrap_or_default())
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        interner().resolve(self.0) == Some(other)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::new(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let id1 = Id::new("Lifeline_A");
        let id2 = Id::new("Lifeline_A");
        let id3 = Id::new("Lifeline_B");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1, "Lifeline_A");
    }

    #[test]
    fn test_create_nested() {
        let owner = Id::new("checkout");
        let first = owner.create_nested(Id::new("Message1"));
        let second = owner.create_nested(Id::new("Message2"));

        assert_ne!(first, second);
        assert_eq!(first, "checkout::Message1");
        assert_eq!(second.to_string(), "checkout::Message2");
    }

    #[test]
    fn test_partial_eq_str() {
        let id = Id::new("server");

        assert!(id == "server");
        assert!(id != "client");
        assert!(id == "server".to_string().as_str());
    }

    #[test]
    fn test_hash_and_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(Id::new("key1"), "value1");
        map.insert(Id::new("key2"), "value2");

        assert_eq!(map.get(&Id::new("key1")), Some(&"value1"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_deserialize() {
        let deserializer =
            serde::de::value::StrDeserializer::<serde::de::value::Error>::new("gate_in");
        let id = Id::deserialize(deserializer).expect("id should deserialize from a string");
        assert_eq!(id, "gate_in");
    }
}
