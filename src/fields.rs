//! Field-by-field access to the `attributes` and `relationships` sections.
//!
//! Schemas implement [`AttributeSet`] and [`RelationshipSet`] with hand-written
//! accessors over a [`FieldDecoder`] / [`FieldEncoder`]. Failures come back
//! already tagged with the field name and section.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{
    DecodingCause, EncodingError, Location, ResourceObjectDecodingError, ENTIRE_OBJECT,
};

/// A value that can sit under one key of `attributes` or `relationships`.
pub trait FieldValue: Sized {
    fn decode_field(value: &Value) -> Result<Self, DecodingCause>;

    fn encode_field(&self) -> Result<Value, EncodingError>;
}

/// Read access to one section's members.
#[derive(Debug, Clone, Copy)]
pub struct FieldDecoder<'a> {
    location: Location,
    fields: &'a Map<String, Value>,
    section_missing: bool,
}

impl<'a> FieldDecoder<'a> {
    /// `section_missing` marks a section that was omitted on the wire and is
    /// being read as an empty object.
    pub fn new(location: Location, fields: &'a Map<String, Value>, section_missing: bool) -> Self {
        Self {
            location,
            fields,
            section_missing,
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Member names present on the wire, in wire order.
    pub fn keys(&self) -> impl Iterator<Item = &'a str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }

    /// Decode a member that must be present.
    pub fn required<T: FieldValue>(&self, key: &str) -> Result<T, ResourceObjectDecodingError> {
        match self.fields.get(key) {
            None => Err(self.missing(key)),
            Some(value) => T::decode_field(value).map_err(|cause| self.error(key, cause)),
        }
    }

    /// Decode a member that may be omitted. An explicit `null` the field
    /// type cannot hold is read as omitted too.
    pub fn optional<T: FieldValue>(
        &self,
        key: &str,
    ) -> Result<Option<T>, ResourceObjectDecodingError> {
        let Some(value) = self.fields.get(key) else {
            return Ok(None);
        };
        match T::decode_field(value) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(DecodingCause::ValueNotFound) => Ok(None),
            Err(cause) => Err(self.error(key, cause)),
        }
    }

    pub fn error(&self, key: &str, cause: DecodingCause) -> ResourceObjectDecodingError {
        ResourceObjectDecodingError::new(key, self.location, cause)
    }

    fn missing(&self, key: &str) -> ResourceObjectDecodingError {
        if self.section_missing {
            ResourceObjectDecodingError::new(ENTIRE_OBJECT, self.location, DecodingCause::KeyNotFound)
        } else {
            self.error(key, DecodingCause::KeyNotFound)
        }
    }
}

/// Write access to one section's members, optionally limited to a sparse fieldset.
#[derive(Debug)]
pub struct FieldEncoder<'a> {
    fields: Map<String, Value>,
    allowed: Option<&'a BTreeSet<String>>,
}

impl<'a> FieldEncoder<'a> {
    pub fn new(allowed: Option<&'a BTreeSet<String>>) -> Self {
        Self {
            fields: Map::new(),
            allowed,
        }
    }

    /// Whether `key` survives the sparse fieldset (always true without one).
    pub fn allows(&self, key: &str) -> bool {
        self.allowed.map_or(true, |allowed| allowed.contains(key))
    }

    pub fn put<T: FieldValue>(&mut self, key: &str, value: &T) -> Result<(), EncodingError> {
        if !self.allows(key) {
            return Ok(());
        }
        let encoded = value.encode_field()?;
        self.fields.insert(key.to_string(), encoded);
        Ok(())
    }

    /// Like [`FieldEncoder::put`], leaving the member out when `value` is `None`.
    pub fn put_optional<T: FieldValue>(
        &mut self,
        key: &str,
        value: &Option<T>,
    ) -> Result<(), EncodingError> {
        match value {
            Some(value) => self.put(key, value),
            None => Ok(()),
        }
    }

    pub fn put_raw(&mut self, key: &str, value: Value) {
        if self.allows(key) {
            self.fields.insert(key.to_string(), value);
        }
    }

    pub fn finish(self) -> Map<String, Value> {
        self.fields
    }
}

/// The typed `attributes` section of a resource schema.
pub trait AttributeSet: Sized + Clone + PartialEq + fmt::Debug {
    /// False for [`NoAttributes`]: the section is never read or written.
    const PRESENT: bool = true;

    fn decode(fields: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError>;

    fn encode(&self, fields: &mut FieldEncoder<'_>) -> Result<(), EncodingError>;
}

/// The typed `relationships` section of a resource schema.
pub trait RelationshipSet: Sized + Clone + PartialEq + fmt::Debug {
    /// False for [`NoRelationships`]: the section is never read or written.
    const PRESENT: bool = true;

    fn decode(fields: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError>;

    fn encode(&self, fields: &mut FieldEncoder<'_>) -> Result<(), EncodingError>;
}

/// Schema marker: the resource has no attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NoAttributes;

impl AttributeSet for NoAttributes {
    const PRESENT: bool = false;

    fn decode(_: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError> {
        Ok(NoAttributes)
    }

    fn encode(&self, _: &mut FieldEncoder<'_>) -> Result<(), EncodingError> {
        Ok(())
    }
}

/// Schema marker: the resource has no relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NoRelationships;

impl RelationshipSet for NoRelationships {
    const PRESENT: bool = false;

    fn decode(_: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError> {
        Ok(NoRelationships)
    }

    fn encode(&self, _: &mut FieldEncoder<'_>) -> Result<(), EncodingError> {
        Ok(())
    }
}

/// Untyped attributes: every member is kept as-is.
impl AttributeSet for Map<String, Value> {
    fn decode(fields: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError> {
        Ok(fields
            .keys()
            .filter_map(|key| fields.raw(key).map(|value| (key.to_string(), value.clone())))
            .collect())
    }

    fn encode(&self, fields: &mut FieldEncoder<'_>) -> Result<(), EncodingError> {
        for (key, value) in self {
            fields.put_raw(key, value.clone());
        }
        Ok(())
    }
}
