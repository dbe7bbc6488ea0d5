//! Schema-less resources and documents.
//!
//! [`GenericResource`] accepts any well-formed resource object: the `type`
//! token is read at runtime and attributes stay untyped, while relationship
//! linkage is still checked member by member. [`GenericDocument`] is the
//! document built from it, used to inspect arbitrary payloads.

use std::collections::BTreeSet;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::document::{BasicJsonApiError, Document, ResourceBody};
use crate::error::{
    DecodingCause, DocumentDecodingError, DocumentSection, EncodingError, Location,
    ResourceDecodingError, ResourceObjectDecodingError, ENTIRE_OBJECT,
};
use crate::id::ResourceIdentifier;
use crate::includes::Include;
use crate::relationship::read_untyped_identifier;
use crate::resource::{read_type, section_fields, DecodeResource, EncodeResource};
use crate::types::{decode_section, json_type_name, ApiDescription, Fieldsets};

/// A resource object of any type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenericResource {
    pub jsonapi_type: String,
    pub id: Option<String>,
    pub attributes: Map<String, Value>,
    pub relationships: Map<String, Value>,
    pub meta: Map<String, Value>,
    pub links: Map<String, Value>,
}

impl GenericResource {
    pub fn new(jsonapi_type: impl Into<String>, id: Option<String>) -> Self {
        Self {
            jsonapi_type: jsonapi_type.into(),
            id,
            ..Self::default()
        }
    }

    pub fn decode(value: &Value) -> Result<Self, ResourceObjectDecodingError> {
        let Value::Object(object) = value else {
            return Err(ResourceObjectDecodingError::new(
                ENTIRE_OBJECT,
                Location::Type,
                DecodingCause::type_mismatch(format!(
                    "a resource object (found {})",
                    json_type_name(value)
                )),
            ));
        };

        let jsonapi_type = read_type(object)?.to_string();
        let id = match object.get("id") {
            None => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Null) => {
                return Err(ResourceObjectDecodingError::new(
                    "id",
                    Location::Id,
                    DecodingCause::ValueNotFound,
                ))
            }
            Some(_) => {
                return Err(ResourceObjectDecodingError::new(
                    "id",
                    Location::Id,
                    DecodingCause::type_mismatch("a string"),
                ))
            }
        };

        let empty = Map::new();
        let (attributes, _) = section_fields(object, Location::Attributes, &empty)?;
        let (relationships, _) = section_fields(object, Location::Relationships, &empty)?;
        for (name, relationship) in relationships {
            check_relationship(relationship)
                .map_err(|cause| ResourceObjectDecodingError::new(name, Location::Relationships, cause))?;
        }

        let meta = decode_section(object, "meta")
            .map_err(|cause| ResourceObjectDecodingError::new("meta", Location::Meta, cause))?;
        let links = decode_section(object, "links")
            .map_err(|cause| ResourceObjectDecodingError::new("links", Location::Links, cause))?;

        Ok(Self {
            jsonapi_type,
            id,
            attributes: attributes.clone(),
            relationships: relationships.clone(),
            meta,
            links,
        })
    }

    /// Encode, keeping only attribute keys in `allowed` when it is given.
    pub fn encode_with(&self, allowed: Option<&BTreeSet<String>>) -> Value {
        let mut object = Map::new();
        object.insert("type".to_string(), Value::String(self.jsonapi_type.clone()));
        if let Some(id) = &self.id {
            object.insert("id".to_string(), Value::String(id.clone()));
        }
        if !self.attributes.is_empty() {
            let attributes = self
                .attributes
                .iter()
                .filter(|(key, _)| allowed.map_or(true, |allowed| allowed.contains(*key)))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            object.insert("attributes".to_string(), Value::Object(attributes));
        }
        for (key, section) in [
            ("relationships", &self.relationships),
            ("meta", &self.meta),
            ("links", &self.links),
        ] {
            if !section.is_empty() {
                object.insert(key.to_string(), Value::Object(section.clone()));
            }
        }
        Value::Object(object)
    }

    /// Every resource this one links to, in relationship order.
    pub fn linkage(&self) -> Vec<ResourceIdentifier> {
        self.relationships
            .values()
            .filter_map(|relationship| relationship.get("data"))
            .flat_map(|data| match data {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                Value::Null => Vec::new(),
                item => vec![item],
            })
            .filter_map(|item| read_untyped_identifier(item).ok())
            .collect()
    }
}

/// A relationship object needs `data`, `links` or `meta`; `data` must be valid linkage.
fn check_relationship(relationship: &Value) -> Result<(), DecodingCause> {
    let Value::Object(object) = relationship else {
        return Err(if relationship.is_null() {
            DecodingCause::ValueNotFound
        } else {
            DecodingCause::type_mismatch("a relationship object")
        });
    };
    match object.get("data") {
        Some(Value::Null) => Ok(()),
        Some(Value::Array(items)) => items
            .iter()
            .try_for_each(|item| read_untyped_identifier(item).map(|_| ())),
        Some(item) => read_untyped_identifier(item).map(|_| ()),
        None if object.contains_key("links") || object.contains_key("meta") => Ok(()),
        None => Err(DecodingCause::KeyNotFound),
    }
}

impl DecodeResource for GenericResource {
    fn decode_resource(value: &Value) -> Result<Self, ResourceDecodingError> {
        Ok(Self::decode(value)?)
    }
}

impl EncodeResource for GenericResource {
    fn encode_resource(&self, fieldsets: Option<&Fieldsets>) -> Result<Value, EncodingError> {
        Ok(self.encode_with(fieldsets.and_then(|fieldsets| fieldsets.for_type(&self.jsonapi_type))))
    }

    fn resource_identifier(&self) -> Option<ResourceIdentifier> {
        self.id
            .as_ref()
            .map(|id| ResourceIdentifier::new(self.jsonapi_type.as_str(), id.as_str()))
    }
}

impl Include for GenericResource {}

impl Serialize for GenericResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encode_with(None).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GenericResource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::decode(&value).map_err(D::Error::custom)
    }
}

/// Primary data of any shape: one resource, `null`, or an array.
#[derive(Debug, Clone, PartialEq)]
pub enum GenericResourceBody {
    Single(Option<GenericResource>),
    Many(Vec<GenericResource>),
}

impl GenericResourceBody {
    pub fn resources(&self) -> Vec<&GenericResource> {
        match self {
            GenericResourceBody::Single(resource) => resource.iter().collect(),
            GenericResourceBody::Many(resources) => resources.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            GenericResourceBody::Single(resource) => usize::from(resource.is_some()),
            GenericResourceBody::Many(resources) => resources.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceBody for GenericResourceBody {
    fn decode_body(data: Option<&Value>) -> Result<Self, DocumentDecodingError> {
        match data {
            None => Err(DocumentDecodingError::Section {
                section: DocumentSection::Data,
                cause: DecodingCause::KeyNotFound,
            }),
            Some(Value::Null) => Ok(GenericResourceBody::Single(None)),
            Some(Value::Array(values)) => {
                let count = values.len();
                values
                    .iter()
                    .enumerate()
                    .map(|(index, value)| {
                        GenericResource::decode_resource(value).map_err(|source| {
                            DocumentDecodingError::PrimaryResource {
                                index: Some(index),
                                count,
                                source,
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(GenericResourceBody::Many)
            }
            Some(value) => GenericResource::decode_resource(value)
                .map(|resource| GenericResourceBody::Single(Some(resource)))
                .map_err(|source| DocumentDecodingError::PrimaryResource {
                    index: None,
                    count: 1,
                    source,
                }),
        }
    }

    fn encode_body(&self, fieldsets: Option<&Fieldsets>) -> Result<Option<Value>, EncodingError> {
        let data = match self {
            GenericResourceBody::Single(resource) => resource.encode_resource(fieldsets)?,
            GenericResourceBody::Many(resources) => Value::Array(
                resources
                    .iter()
                    .map(|resource| resource.encode_resource(fieldsets))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        Ok(Some(data))
    }
}

/// A document of any resource types, with untyped meta, links and `jsonapi` block.
pub type GenericDocument = Document<
    GenericResourceBody,
    GenericResource,
    Map<String, Value>,
    Map<String, Value>,
    BasicJsonApiError,
    Option<ApiDescription<Map<String, Value>>>,
>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_any_type() {
        let resource = GenericResource::decode(&json!({
            "type": "articles",
            "id": "1",
            "attributes": { "title": "Rust", "body": "..." },
            "relationships": {
                "author": { "data": { "type": "people", "id": "9" } },
                "tags": { "data": [{ "type": "tags", "id": "2" }] },
                "comments": { "links": { "related": "/articles/1/comments" } }
            }
        }))
        .unwrap();
        assert_eq!(resource.jsonapi_type, "articles");
        assert_eq!(
            resource.linkage(),
            vec![
                ResourceIdentifier::new("people", "9"),
                ResourceIdentifier::new("tags", "2")
            ]
        );
        assert_eq!(
            resource.resource_identifier(),
            Some(ResourceIdentifier::new("articles", "1"))
        );
    }

    #[test]
    fn rejects_malformed_linkage() {
        let err = GenericResource::decode(&json!({
            "type": "articles",
            "id": "1",
            "relationships": { "author": { "data": { "id": "9" } } }
        }))
        .unwrap_err();
        assert_eq!(err.subject_name, "author");
        assert_eq!(err.location, Location::Relationships);
        assert_eq!(
            err.cause,
            DecodingCause::type_mismatch("a resource identifier with a `type` member")
        );

        let err = GenericResource::decode(&json!({
            "type": "articles",
            "relationships": { "author": {} }
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "'author' relationship is required and missing");
    }

    #[test]
    fn rejects_non_string_id() {
        let err = GenericResource::decode(&json!({ "type": "articles", "id": 1 })).unwrap_err();
        assert_eq!(err.location, Location::Id);
    }

    #[test]
    fn sparse_encoding_filters_attributes() {
        let resource = GenericResource::decode(&json!({
            "type": "articles",
            "id": "1",
            "attributes": { "title": "Rust", "body": "..." }
        }))
        .unwrap();
        let fields = Fieldsets::new().with("articles", ["title"]);
        assert_eq!(
            resource.encode_resource(Some(&fields)).unwrap(),
            json!({ "type": "articles", "id": "1", "attributes": { "title": "Rust" } })
        );
    }

    #[test]
    fn generic_document_round_trips() {
        let wire = json!({
            "data": [{ "type": "articles", "id": "1", "attributes": { "title": "Rust" } }],
            "included": [{ "type": "people", "id": "9" }],
            "meta": { "count": 1 },
            "jsonapi": { "version": "1.1" }
        });
        let doc = GenericDocument::decode(&wire).unwrap();
        assert_eq!(doc.primary().unwrap().len(), 1);
        assert_eq!(doc.includes().unwrap().len(), 1);
        assert_eq!(doc.api_description().as_ref().unwrap().version, "1.1");
        assert_eq!(doc.encode().unwrap(), wire);
    }

    #[test]
    fn generic_document_accepts_null_data() {
        let doc = GenericDocument::decode(&json!({ "data": null })).unwrap();
        assert!(doc.primary().unwrap().is_empty());
        assert_eq!(
            doc.encode_sparse(&Fieldsets::new()).unwrap(),
            json!({ "data": null })
        );
    }
}
