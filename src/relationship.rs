//! Relationship linkage.
//!
//! ```json
//! to-one:  { "data": { "id": "...", "type": "..." } | null, "meta"?, "links"? }
//! to-many: { "data": [ { "id": "...", "type": "..." }, ... ], "meta"?, "links"? }
//! ```
//!
//! Every linkage identifier is checked against the JSON:API type of the
//! related resource description.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{DecodingCause, EncodingError, Quantity};
use crate::fields::FieldValue;
use crate::id::{Id, RawId, ResourceIdentifier};
use crate::resource::ResourceObjectDescription;
use crate::types::{decode_section, encode_section, json_type_name, NoLinks, NoMetadata, Section};

/// Split a resource identifier object into its `type` token and raw `id` value.
pub(crate) fn read_identifier(value: &Value) -> Result<(&str, &Value), DecodingCause> {
    let Value::Object(object) = value else {
        return Err(DecodingCause::type_mismatch(format!(
            "a resource identifier object (found {})",
            json_type_name(value)
        )));
    };
    // The relationship itself is present, so a malformed identifier is a shape error.
    let jsonapi_type = match object.get("type") {
        Some(Value::String(jsonapi_type)) => jsonapi_type.as_str(),
        None => {
            return Err(DecodingCause::type_mismatch(
                "a resource identifier with a `type` member",
            ))
        }
        Some(_) => return Err(DecodingCause::type_mismatch("a string type token")),
    };
    let id = object.get("id").ok_or_else(|| {
        DecodingCause::type_mismatch("a resource identifier with an `id` member")
    })?;
    Ok((jsonapi_type, id))
}

/// Read an untyped identifier, requiring a string id.
pub(crate) fn read_untyped_identifier(value: &Value) -> Result<ResourceIdentifier, DecodingCause> {
    let (jsonapi_type, id) = read_identifier(value)?;
    match id {
        Value::String(id) => Ok(ResourceIdentifier::new(jsonapi_type, id.as_str())),
        _ => Err(DecodingCause::type_mismatch("a string id")),
    }
}

fn decode_identifier<Raw, D>(value: &Value) -> Result<Id<Raw, D>, DecodingCause>
where
    Raw: RawId,
    D: ResourceObjectDescription,
{
    let (found, id) = read_identifier(value)?;
    if found != D::JSONAPI_TYPE {
        return Err(DecodingCause::JsonTypeMismatch {
            expected: D::JSONAPI_TYPE.to_string(),
            found: found.to_string(),
        });
    }
    serde_json::from_value(id.clone())
        .map(Id::new)
        .map_err(|err| DecodingCause::from_serde(id, &err))
}

fn encode_identifier<Raw, D>(id: &Id<Raw, D>) -> Result<Value, EncodingError>
where
    Raw: RawId,
    D: ResourceObjectDescription,
{
    let raw = serde_json::to_value(id.raw())
        .map_err(|source| EncodingError::serialization("relationship id", source))?;
    let mut object = Map::new();
    object.insert("id".to_string(), raw);
    object.insert("type".to_string(), Value::String(D::JSONAPI_TYPE.to_string()));
    Ok(Value::Object(object))
}

fn relationship_object(value: &Value) -> Result<&Map<String, Value>, DecodingCause> {
    match value {
        Value::Object(object) => Ok(object),
        Value::Null => Err(DecodingCause::ValueNotFound),
        _ => Err(DecodingCause::type_mismatch("a relationship object")),
    }
}

fn finish_relationship<M: Section, L: Section>(
    data: Option<Value>,
    meta: &M,
    links: &L,
) -> Result<Value, EncodingError> {
    let mut object = Map::new();
    if let Some(data) = data {
        object.insert("data".to_string(), data);
    }
    encode_section(meta, &mut object, "meta")?;
    encode_section(links, &mut object, "links")?;
    Ok(Value::Object(object))
}

/// Linkage to exactly one resource of description `D`.
pub struct ToOneRelationship<D, Raw = String, M = NoMetadata, L = NoLinks> {
    pub id: Id<Raw, D>,
    pub meta: M,
    pub links: L,
}

impl<D, Raw, M: Default, L: Default> ToOneRelationship<D, Raw, M, L> {
    pub fn new(id: impl Into<Id<Raw, D>>) -> Self {
        Self {
            id: id.into(),
            meta: M::default(),
            links: L::default(),
        }
    }
}

impl<D, Raw, M, L> ToOneRelationship<D, Raw, M, L> {
    pub fn with_meta_and_links(id: Id<Raw, D>, meta: M, links: L) -> Self {
        Self { id, meta, links }
    }

    pub fn id(&self) -> &Id<Raw, D> {
        &self.id
    }
}

impl<D, Raw, M, L> FieldValue for ToOneRelationship<D, Raw, M, L>
where
    D: ResourceObjectDescription,
    Raw: RawId,
    M: Section,
    L: Section,
{
    fn decode_field(value: &Value) -> Result<Self, DecodingCause> {
        let object = relationship_object(value)?;
        let id = match object.get("data").ok_or(DecodingCause::KeyNotFound)? {
            Value::Null => return Err(DecodingCause::ValueNotFound),
            Value::Array(_) => {
                return Err(DecodingCause::QuantityMismatch {
                    expected: Quantity::One,
                })
            }
            data => decode_identifier(data)?,
        };
        Ok(Self {
            id,
            meta: decode_section(object, "meta")?,
            links: decode_section(object, "links")?,
        })
    }

    fn encode_field(&self) -> Result<Value, EncodingError> {
        let data = encode_identifier(&self.id)?;
        finish_relationship(Some(data), &self.meta, &self.links)
    }
}

/// Linkage to zero or one resource of description `D` (`"data": null` allowed).
pub struct NullableToOneRelationship<D, Raw = String, M = NoMetadata, L = NoLinks> {
    pub id: Option<Id<Raw, D>>,
    pub meta: M,
    pub links: L,
}

impl<D, Raw, M: Default, L: Default> NullableToOneRelationship<D, Raw, M, L> {
    pub fn new(id: Option<Id<Raw, D>>) -> Self {
        Self {
            id,
            meta: M::default(),
            links: L::default(),
        }
    }

    pub fn null() -> Self {
        Self::new(None)
    }
}

impl<D, Raw, M, L> NullableToOneRelationship<D, Raw, M, L> {
    pub fn with_meta_and_links(id: Option<Id<Raw, D>>, meta: M, links: L) -> Self {
        Self { id, meta, links }
    }

    pub fn id(&self) -> Option<&Id<Raw, D>> {
        self.id.as_ref()
    }
}

impl<D, Raw, M, L> FieldValue for NullableToOneRelationship<D, Raw, M, L>
where
    D: ResourceObjectDescription,
    Raw: RawId,
    M: Section,
    L: Section,
{
    fn decode_field(value: &Value) -> Result<Self, DecodingCause> {
        let object = relationship_object(value)?;
        let id = match object.get("data").ok_or(DecodingCause::KeyNotFound)? {
            Value::Null => None,
            Value::Array(_) => {
                return Err(DecodingCause::QuantityMismatch {
                    expected: Quantity::One,
                })
            }
            data => Some(decode_identifier(data)?),
        };
        Ok(Self {
            id,
            meta: decode_section(object, "meta")?,
            links: decode_section(object, "links")?,
        })
    }

    fn encode_field(&self) -> Result<Value, EncodingError> {
        let data = match &self.id {
            Some(id) => encode_identifier(id)?,
            None => Value::Null,
        };
        finish_relationship(Some(data), &self.meta, &self.links)
    }
}

/// Linkage to any number of resources of description `D`.
pub struct ToManyRelationship<D, Raw = String, M = NoMetadata, L = NoLinks> {
    pub ids: Vec<Id<Raw, D>>,
    pub meta: M,
    pub links: L,
}

impl<D, Raw, M: Default, L: Default> ToManyRelationship<D, Raw, M, L> {
    pub fn new<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Id<Raw, D>>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            meta: M::default(),
            links: L::default(),
        }
    }

    pub fn none() -> Self {
        Self {
            ids: Vec::new(),
            meta: M::default(),
            links: L::default(),
        }
    }
}

impl<D, Raw, M, L> ToManyRelationship<D, Raw, M, L> {
    pub fn with_meta_and_links(ids: Vec<Id<Raw, D>>, meta: M, links: L) -> Self {
        Self { ids, meta, links }
    }

    pub fn ids(&self) -> &[Id<Raw, D>] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<D, Raw, M, L> FieldValue for ToManyRelationship<D, Raw, M, L>
where
    D: ResourceObjectDescription,
    Raw: RawId,
    M: Section,
    L: Section,
{
    fn decode_field(value: &Value) -> Result<Self, DecodingCause> {
        let object = relationship_object(value)?;
        let elements = match object.get("data").ok_or(DecodingCause::KeyNotFound)? {
            Value::Array(elements) => elements,
            Value::Null => return Err(DecodingCause::ValueNotFound),
            Value::Object(_) => {
                return Err(DecodingCause::QuantityMismatch {
                    expected: Quantity::Many,
                })
            }
            other => {
                return Err(DecodingCause::type_mismatch(format!(
                    "an array of resource identifiers (found {})",
                    json_type_name(other)
                )))
            }
        };
        // Every element is checked before the first failure is reported.
        let decoded: Vec<Result<Id<Raw, D>, DecodingCause>> =
            elements.iter().map(decode_identifier).collect();
        let ids = decoded.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            ids,
            meta: decode_section(object, "meta")?,
            links: decode_section(object, "links")?,
        })
    }

    fn encode_field(&self) -> Result<Value, EncodingError> {
        let data = self
            .ids
            .iter()
            .map(encode_identifier)
            .collect::<Result<Vec<_>, _>>()?;
        finish_relationship(Some(Value::Array(data)), &self.meta, &self.links)
    }
}

/// A relationship that carries only `meta` and/or `links`, never `data`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaRelationship<M = NoMetadata, L = NoLinks> {
    pub meta: M,
    pub links: L,
}

impl<M, L> MetaRelationship<M, L> {
    pub fn new(meta: M, links: L) -> Self {
        Self { meta, links }
    }
}

impl<M: Section, L: Section> FieldValue for MetaRelationship<M, L> {
    fn decode_field(value: &Value) -> Result<Self, DecodingCause> {
        let object = relationship_object(value)?;
        Ok(Self {
            meta: decode_section(object, "meta")?,
            links: decode_section(object, "links")?,
        })
    }

    fn encode_field(&self) -> Result<Value, EncodingError> {
        finish_relationship(None, &self.meta, &self.links)
    }
}

macro_rules! impl_linkage_traits {
    ($name:ident, $field:ident) => {
        impl<D, Raw: Clone, M: Clone, L: Clone> Clone for $name<D, Raw, M, L> {
            fn clone(&self) -> Self {
                Self {
                    $field: self.$field.clone(),
                    meta: self.meta.clone(),
                    links: self.links.clone(),
                }
            }
        }

        impl<D, Raw: PartialEq, M: PartialEq, L: PartialEq> PartialEq for $name<D, Raw, M, L> {
            fn eq(&self, other: &Self) -> bool {
                self.$field == other.$field && self.meta == other.meta && self.links == other.links
            }
        }

        impl<D, Raw: fmt::Debug, M: fmt::Debug, L: fmt::Debug> fmt::Debug for $name<D, Raw, M, L> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field(stringify!($field), &self.$field)
                    .field("meta", &self.meta)
                    .field("links", &self.links)
                    .finish()
            }
        }
    };
}

impl_linkage_traits!(ToOneRelationship, id);
impl_linkage_traits!(NullableToOneRelationship, id);
impl_linkage_traits!(ToManyRelationship, ids);
