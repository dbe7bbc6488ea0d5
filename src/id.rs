//! Resource identifiers.
//!
//! An [`Id`] is a raw id value tagged with the description of the resource it
//! identifies, so ids of different resource types cannot be mixed up.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

/// A raw id type usable inside [`Id`].
pub trait RawId: Clone + Eq + Hash + fmt::Debug + Serialize + DeserializeOwned {
    /// False for [`Unidentified`]: no `id` member is read or written.
    const IDENTIFIED: bool = true;

    /// The id used when the schema carries no id on the wire.
    fn unidentified() -> Option<Self> {
        None
    }

    /// The string form used for identity comparisons between resources.
    fn wire_string(&self) -> String {
        match serde_json::to_value(self) {
            Ok(Value::String(s)) => s,
            Ok(other) => other.to_string(),
            Err(_) => format!("{self:?}"),
        }
    }
}

/// Raw id types that can produce a fresh, unique value.
pub trait CreatableRawId: RawId {
    fn unique() -> Self;
}

impl RawId for String {
    fn wire_string(&self) -> String {
        self.clone()
    }
}

impl RawId for Uuid {
    fn wire_string(&self) -> String {
        self.to_string()
    }
}

impl CreatableRawId for Uuid {
    fn unique() -> Self {
        Uuid::new_v4()
    }
}

/// Raw id of a resource whose id has not been assigned yet (client-created resources).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Unidentified;

impl RawId for Unidentified {
    const IDENTIFIED: bool = false;

    fn unidentified() -> Option<Self> {
        Some(Unidentified)
    }
}

/// A raw id tagged with the resource description `D` it identifies.
pub struct Id<Raw, D> {
    raw: Raw,
    _resource: PhantomData<fn() -> D>,
}

impl<Raw, D> Id<Raw, D> {
    pub fn new(raw: Raw) -> Self {
        Self {
            raw,
            _resource: PhantomData,
        }
    }

    pub fn raw(&self) -> &Raw {
        &self.raw
    }

    pub fn into_raw(self) -> Raw {
        self.raw
    }
}

impl<Raw: CreatableRawId, D> Id<Raw, D> {
    /// A new id with a freshly generated raw value.
    pub fn fresh() -> Self {
        Self::new(Raw::unique())
    }
}

impl<D> Id<Unidentified, D> {
    pub fn unidentified() -> Self {
        Self::new(Unidentified)
    }
}

impl<D> From<&str> for Id<String, D> {
    fn from(raw: &str) -> Self {
        Self::new(raw.to_string())
    }
}

impl<D> From<String> for Id<String, D> {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl<Raw: Clone, D> Clone for Id<Raw, D> {
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<Raw: PartialEq, D> PartialEq for Id<Raw, D> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<Raw: Eq, D> Eq for Id<Raw, D> {}

impl<Raw: PartialOrd, D> PartialOrd for Id<Raw, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.raw.partial_cmp(&other.raw)
    }
}

impl<Raw: Ord, D> Ord for Id<Raw, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<Raw: Hash, D> Hash for Id<Raw, D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<Raw: fmt::Debug, D> fmt::Debug for Id<Raw, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.raw).finish()
    }
}

impl<Raw: fmt::Display, D> fmt::Display for Id<Raw, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt(f)
    }
}

impl<Raw: Serialize, D> Serialize for Id<Raw, D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de, Raw: Deserialize<'de>, D> Deserialize<'de> for Id<Raw, D> {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        Raw::deserialize(deserializer).map(Self::new)
    }
}

/// Untyped `{ "type", "id" }` identity of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub jsonapi_type: String,
}

impl ResourceIdentifier {
    pub fn new(jsonapi_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            jsonapi_type: jsonapi_type.into(),
        }
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.jsonapi_type, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    struct Person;
    struct Dog;

    #[test]
    fn ids_compare_by_raw_value() {
        let a: Id<String, Person> = "1".into();
        let b: Id<String, Person> = Id::new("1".to_string());
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));
        assert_eq!(a.to_string(), "1");
    }

    #[test]
    fn fresh_uuid_ids_are_unique() {
        let a: Id<Uuid, Dog> = Id::fresh();
        let b: Id<Uuid, Dog> = Id::fresh();
        assert_ne!(a, b);
        assert_eq!(a.raw().wire_string(), a.raw().to_string());
    }

    #[test]
    fn unidentified_marker() {
        assert!(!Unidentified::IDENTIFIED);
        assert!(String::IDENTIFIED);
        assert_eq!(Unidentified::unidentified(), Some(Unidentified));
        assert_eq!(String::unidentified(), None);
        let _id: Id<Unidentified, Person> = Id::unidentified();
    }

    #[test]
    fn ids_serialize_as_raw() {
        let id: Id<String, Person> = "abc".into();
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("abc"));
        let back: Id<String, Person> = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn resource_identifier_wire_form() {
        let identifier = ResourceIdentifier::new("people", "9");
        assert_eq!(
            serde_json::to_value(&identifier).unwrap(),
            json!({ "id": "9", "type": "people" })
        );
        assert_eq!(identifier.to_string(), "people:9");
    }
}
