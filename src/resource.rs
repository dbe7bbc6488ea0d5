//! Resource objects.
//!
//! ```json
//! { "type": "<schema-type>", "id": "<string>"?,
//!   "attributes": {...}?, "relationships": {...}?,
//!   "meta": {...}?, "links": {...}? }
//! ```
//!
//! A schema is a [`ResourceObjectDescription`]: the JSON:API type token plus
//! the attribute and relationship sets. Meta, links and the raw id type are
//! the remaining parameters of [`ResourceObject`].

use std::collections::BTreeSet;
use std::fmt;

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{
    DecodingCause, EncodingError, Location, ResourceDecodingError, ResourceObjectDecodingError,
    ENTIRE_OBJECT,
};
use crate::fields::{AttributeSet, FieldDecoder, FieldEncoder, RelationshipSet};
use crate::id::{CreatableRawId, Id, RawId, ResourceIdentifier, Unidentified};
use crate::relationship::ToOneRelationship;
use crate::types::{decode_section, encode_section, Fieldsets, NoLinks, NoMetadata, Section};

/// The schema of one resource type.
pub trait ResourceObjectDescription: 'static {
    /// The `type` token every resource of this schema carries.
    const JSONAPI_TYPE: &'static str;

    type Attributes: AttributeSet;
    type Relationships: RelationshipSet;
}

/// A resource type with a compile-time type token, usable as a sum-type variant.
pub trait ResourceObjectType: Sized {
    const JSONAPI_TYPE: &'static str;

    fn decode_object(value: &Value) -> Result<Self, ResourceObjectDecodingError>;
}

/// Anything that can be decoded in a resource position of a document.
pub trait DecodeResource: Sized {
    fn decode_resource(value: &Value) -> Result<Self, ResourceDecodingError>;

    /// The value for a `null` resource, or `None` when null is not allowed.
    fn decode_null() -> Option<Self> {
        None
    }
}

/// Anything that can be encoded in a resource position of a document.
pub trait EncodeResource {
    /// Encode, applying the sparse fieldset registered for this resource's type, if any.
    fn encode_resource(&self, fieldsets: Option<&Fieldsets>) -> Result<Value, EncodingError>;

    /// The `{type, id}` identity, or `None` for unidentified resources.
    fn resource_identifier(&self) -> Option<ResourceIdentifier>;
}

/// A typed resource object.
pub struct ResourceObject<D, M = NoMetadata, L = NoLinks, Raw = String>
where
    D: ResourceObjectDescription,
{
    pub id: Id<Raw, D>,
    pub attributes: D::Attributes,
    pub relationships: D::Relationships,
    pub meta: M,
    pub links: L,
}

impl<D, M, L, Raw> ResourceObject<D, M, L, Raw>
where
    D: ResourceObjectDescription,
{
    pub fn new(
        id: Id<Raw, D>,
        attributes: D::Attributes,
        relationships: D::Relationships,
        meta: M,
        links: L,
    ) -> Self {
        Self {
            id,
            attributes,
            relationships,
            meta,
            links,
        }
    }

    pub fn jsonapi_type(&self) -> &'static str {
        D::JSONAPI_TYPE
    }

    pub fn with_attributes(self, attributes: D::Attributes) -> Self {
        Self { attributes, ..self }
    }

    /// Return a copy with the attributes edited by `edit`.
    pub fn tapping_attributes(mut self, edit: impl FnOnce(&mut D::Attributes)) -> Self {
        edit(&mut self.attributes);
        self
    }

    pub fn with_relationships(self, relationships: D::Relationships) -> Self {
        Self {
            relationships,
            ..self
        }
    }

    /// Return a copy with the relationships edited by `edit`.
    pub fn tapping_relationships(mut self, edit: impl FnOnce(&mut D::Relationships)) -> Self {
        edit(&mut self.relationships);
        self
    }

    pub fn with_meta(self, meta: M) -> Self {
        Self { meta, ..self }
    }

    pub fn with_links(self, links: L) -> Self {
        Self { links, ..self }
    }
}

impl<D, M, L> ResourceObject<D, M, L, Unidentified>
where
    D: ResourceObjectDescription,
{
    /// Promote a client-created resource to an identified one.
    pub fn identified<Raw: RawId>(self, raw: Raw) -> ResourceObject<D, M, L, Raw> {
        ResourceObject {
            id: Id::new(raw),
            attributes: self.attributes,
            relationships: self.relationships,
            meta: self.meta,
            links: self.links,
        }
    }

    /// Promote a client-created resource using a freshly generated id.
    pub fn with_fresh_id<Raw: CreatableRawId>(self) -> ResourceObject<D, M, L, Raw> {
        self.identified(Raw::unique())
    }
}

impl<D, M, L, Raw> ResourceObject<D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: Section,
    L: Section,
    Raw: RawId,
{
    /// A to-one relationship pointing at this resource.
    pub fn pointer<RM: Default, RL: Default>(&self) -> ToOneRelationship<D, Raw, RM, RL> {
        ToOneRelationship::new(self.id.clone())
    }

    /// Decode in wire order: type, id, attributes, relationships, meta, links.
    pub fn decode(value: &Value) -> Result<Self, ResourceObjectDecodingError> {
        let Value::Object(object) = value else {
            return Err(ResourceObjectDecodingError::new(
                ENTIRE_OBJECT,
                Location::Type,
                DecodingCause::type_mismatch("a resource object"),
            ));
        };

        let found = read_type(object)?;
        if found != D::JSONAPI_TYPE {
            return Err(ResourceObjectDecodingError::new(
                "type",
                Location::Type,
                DecodingCause::JsonTypeMismatch {
                    expected: D::JSONAPI_TYPE.to_string(),
                    found: found.to_string(),
                },
            ));
        }

        let id = decode_id(object)?;

        let empty = Map::new();
        let (fields, missing) = if <D::Attributes as AttributeSet>::PRESENT {
            section_fields(object, Location::Attributes, &empty)?
        } else {
            (&empty, false)
        };
        let attributes = <D::Attributes as AttributeSet>::decode(&FieldDecoder::new(
            Location::Attributes,
            fields,
            missing,
        ))?;

        let (fields, missing) = if <D::Relationships as RelationshipSet>::PRESENT {
            section_fields(object, Location::Relationships, &empty)?
        } else {
            (&empty, false)
        };
        let relationships = <D::Relationships as RelationshipSet>::decode(&FieldDecoder::new(
            Location::Relationships,
            fields,
            missing,
        ))?;

        let meta = decode_section(object, "meta")
            .map_err(|cause| ResourceObjectDecodingError::new("meta", Location::Meta, cause))?;
        let links = decode_section(object, "links")
            .map_err(|cause| ResourceObjectDecodingError::new("links", Location::Links, cause))?;

        Ok(Self {
            id,
            attributes,
            relationships,
            meta,
            links,
        })
    }

    pub fn encode(&self) -> Result<Value, EncodingError> {
        self.encode_with(None)
    }

    /// Encode, emitting only the attribute keys in `allowed` when it is given.
    pub fn encode_with(&self, allowed: Option<&BTreeSet<String>>) -> Result<Value, EncodingError> {
        let mut object = Map::new();
        object.insert("type".to_string(), Value::String(D::JSONAPI_TYPE.to_string()));
        if Raw::IDENTIFIED {
            let id = serde_json::to_value(self.id.raw())
                .map_err(|source| EncodingError::serialization("id", source))?;
            object.insert("id".to_string(), id);
        }
        if <D::Attributes as AttributeSet>::PRESENT {
            let mut fields = FieldEncoder::new(allowed);
            self.attributes.encode(&mut fields)?;
            object.insert("attributes".to_string(), Value::Object(fields.finish()));
        }
        if <D::Relationships as RelationshipSet>::PRESENT {
            let mut fields = FieldEncoder::new(None);
            self.relationships.encode(&mut fields)?;
            object.insert("relationships".to_string(), Value::Object(fields.finish()));
        }
        encode_section(&self.meta, &mut object, "meta")?;
        encode_section(&self.links, &mut object, "links")?;
        Ok(Value::Object(object))
    }

    /// A view of this resource that encodes only the attribute keys in `fields`.
    pub fn sparse<I, K>(&self, fields: I) -> SparseFieldset<'_, D, M, L, Raw>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        SparseFieldset::new(self, fields)
    }
}

pub(crate) fn read_type(object: &Map<String, Value>) -> Result<&str, ResourceObjectDecodingError> {
    let cause = match object.get("type") {
        Some(Value::String(found)) => return Ok(found),
        None => DecodingCause::KeyNotFound,
        Some(Value::Null) => DecodingCause::ValueNotFound,
        Some(_) => DecodingCause::type_mismatch("a string"),
    };
    Err(ResourceObjectDecodingError::new("type", Location::Type, cause))
}

fn decode_id<Raw: RawId, D>(
    object: &Map<String, Value>,
) -> Result<Id<Raw, D>, ResourceObjectDecodingError> {
    let error = |cause| ResourceObjectDecodingError::new("id", Location::Id, cause);
    if !Raw::IDENTIFIED {
        return Raw::unidentified()
            .map(Id::new)
            .ok_or_else(|| error(DecodingCause::KeyNotFound));
    }
    let value = object
        .get("id")
        .ok_or_else(|| error(DecodingCause::KeyNotFound))?;
    serde_json::from_value(value.clone())
        .map(Id::new)
        .map_err(|err| error(DecodingCause::from_serde(value, &err)))
}

/// The members of section `location`, read as empty (and flagged missing) when omitted.
pub(crate) fn section_fields<'a>(
    object: &'a Map<String, Value>,
    location: Location,
    empty: &'a Map<String, Value>,
) -> Result<(&'a Map<String, Value>, bool), ResourceObjectDecodingError> {
    match object.get(location.section_name()) {
        None | Some(Value::Null) => Ok((empty, true)),
        Some(Value::Object(fields)) => Ok((fields, false)),
        Some(_) => Err(ResourceObjectDecodingError::new(
            ENTIRE_OBJECT,
            location,
            DecodingCause::type_mismatch("an object"),
        )),
    }
}

impl<D, M, L, Raw> ResourceObjectType for ResourceObject<D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: Section,
    L: Section,
    Raw: RawId,
{
    const JSONAPI_TYPE: &'static str = D::JSONAPI_TYPE;

    fn decode_object(value: &Value) -> Result<Self, ResourceObjectDecodingError> {
        Self::decode(value)
    }
}

impl<D, M, L, Raw> DecodeResource for ResourceObject<D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: Section,
    L: Section,
    Raw: RawId,
{
    fn decode_resource(value: &Value) -> Result<Self, ResourceDecodingError> {
        Ok(Self::decode(value)?)
    }
}

impl<D, M, L, Raw> EncodeResource for ResourceObject<D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: Section,
    L: Section,
    Raw: RawId,
{
    fn encode_resource(&self, fieldsets: Option<&Fieldsets>) -> Result<Value, EncodingError> {
        self.encode_with(fieldsets.and_then(|fieldsets| fieldsets.for_type(D::JSONAPI_TYPE)))
    }

    fn resource_identifier(&self) -> Option<ResourceIdentifier> {
        Raw::IDENTIFIED
            .then(|| ResourceIdentifier::new(D::JSONAPI_TYPE, self.id.raw().wire_string()))
    }
}

impl<R: DecodeResource> DecodeResource for Option<R> {
    fn decode_resource(value: &Value) -> Result<Self, ResourceDecodingError> {
        R::decode_resource(value).map(Some)
    }

    fn decode_null() -> Option<Self> {
        Some(None)
    }
}

impl<R: EncodeResource> EncodeResource for Option<R> {
    fn encode_resource(&self, fieldsets: Option<&Fieldsets>) -> Result<Value, EncodingError> {
        match self {
            Some(resource) => resource.encode_resource(fieldsets),
            None => Ok(Value::Null),
        }
    }

    fn resource_identifier(&self) -> Option<ResourceIdentifier> {
        self.as_ref().and_then(EncodeResource::resource_identifier)
    }
}

impl<D, M, L, Raw> Serialize for ResourceObject<D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: Section,
    L: Section,
    Raw: RawId,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encode()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, D, M, L, Raw> Deserialize<'de> for ResourceObject<D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: Section,
    L: Section,
    Raw: RawId,
{
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::decode(&value).map_err(De::Error::custom)
    }
}

impl<D, M, L, Raw> Clone for ResourceObject<D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: Clone,
    L: Clone,
    Raw: Clone,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            attributes: self.attributes.clone(),
            relationships: self.relationships.clone(),
            meta: self.meta.clone(),
            links: self.links.clone(),
        }
    }
}

impl<D, M, L, Raw> PartialEq for ResourceObject<D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: PartialEq,
    L: PartialEq,
    Raw: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.attributes == other.attributes
            && self.relationships == other.relationships
            && self.meta == other.meta
            && self.links == other.links
    }
}

impl<D, M, L, Raw> fmt::Debug for ResourceObject<D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: fmt::Debug,
    L: fmt::Debug,
    Raw: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceObject")
            .field("type", &D::JSONAPI_TYPE)
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("relationships", &self.relationships)
            .field("meta", &self.meta)
            .field("links", &self.links)
            .finish()
    }
}

/// An encode-only view of a resource object restricted to a set of attribute keys.
///
/// Type, id, relationships, meta and links are unaffected.
pub struct SparseFieldset<'a, D, M, L, Raw>
where
    D: ResourceObjectDescription,
{
    resource: &'a ResourceObject<D, M, L, Raw>,
    fields: BTreeSet<String>,
}

impl<'a, D, M, L, Raw> SparseFieldset<'a, D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: Section,
    L: Section,
    Raw: RawId,
{
    pub fn new<I, K>(resource: &'a ResourceObject<D, M, L, Raw>, fields: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            resource,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn resource(&self) -> &'a ResourceObject<D, M, L, Raw> {
        self.resource
    }

    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    pub fn encode(&self) -> Result<Value, EncodingError> {
        self.resource.encode_with(Some(&self.fields))
    }
}

impl<D, M, L, Raw> Serialize for SparseFieldset<'_, D, M, L, Raw>
where
    D: ResourceObjectDescription,
    M: Section,
    L: Section,
    Raw: RawId,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encode()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}
