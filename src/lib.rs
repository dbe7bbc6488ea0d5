//! JSON:API Codec
//!
//! Typed encoding and decoding of JSON:API documents.
//!
//! A resource schema is a [`ResourceObjectDescription`]: a `type` token plus
//! typed attribute and relationship sets. Documents combine a primary body,
//! optional includes (a [`Poly2`]-style sum of resource types), meta, links
//! and the `jsonapi` block. Decode failures are structured and name the field,
//! section, and position that failed.
//!
//! # Example
//!
//! ```
//! use jsonapi_codec::{
//!     Attribute, AttributeSet, Document, EncodingError, FieldDecoder, FieldEncoder,
//!     NoRelationships, ResourceObject, ResourceObjectDecodingError, ResourceObjectDescription,
//!     SingleResourceBody,
//! };
//! use serde_json::json;
//!
//! struct ArticleDescription;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct ArticleAttributes {
//!     title: Attribute<String>,
//! }
//!
//! impl AttributeSet for ArticleAttributes {
//!     fn decode(fields: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError> {
//!         Ok(Self {
//!             title: fields.required("title")?,
//!         })
//!     }
//!
//!     fn encode(&self, fields: &mut FieldEncoder<'_>) -> Result<(), EncodingError> {
//!         fields.put("title", &self.title)
//!     }
//! }
//!
//! impl ResourceObjectDescription for ArticleDescription {
//!     const JSONAPI_TYPE: &'static str = "articles";
//!     type Attributes = ArticleAttributes;
//!     type Relationships = NoRelationships;
//! }
//!
//! type Article = ResourceObject<ArticleDescription>;
//!
//! let wire = json!({
//!     "data": { "type": "articles", "id": "1", "attributes": { "title": "Rust" } }
//! });
//! let document = Document::<SingleResourceBody<Article>>::decode(&wire).unwrap();
//! let article = &document.primary().unwrap().value;
//! assert_eq!(article.attributes.title.value(), "Rust");
//! assert_eq!(document.encode().unwrap(), wire);
//! ```
//!
//! # Section Presence
//!
//! Which sections exist is decided by the schema's types, never by the wire:
//!
//! | Section | Absent | Optional | Required |
//! |---------|--------|----------|----------|
//! | `attributes` | [`NoAttributes`] | `Option<Attribute<T>>` fields | any other [`AttributeSet`] |
//! | `relationships` | [`NoRelationships`] | - | any other [`RelationshipSet`] |
//! | `meta`, `links` | [`NoMetadata`], [`NoLinks`] | `Option<T>`, `Map<String, Value>` | any other [`Section`] |
//! | `included` | [`NoIncludes`] | any other [`Include`] | - |
//! | `data` | [`NoResourceBody`] | - | [`SingleResourceBody`], [`ManyResourceBody`] |
//! | `jsonapi` | [`NoApiDescription`] | `Option<ApiDescription>` | [`ApiDescription`] |

mod attribute;
mod document;
mod error;
mod fields;
mod generic;
mod id;
mod includes;
mod loader;
mod poly;
mod relationship;
mod resource;
mod types;
mod validator;

pub use attribute::{
    Attribute, IdentityTransformer, ReversibleTransformer, TransformedAttribute, Transformer,
    Validated, ValidatedAttribute, Validator,
};
pub use document::{
    BasicJsonApiError, Body, DataBody, Document, ErrorBody, ErrorSource, JsonApiError,
    ManyResourceBody, NoResourceBody, ResourceBody, SingleResourceBody,
};
pub use error::{
    ordinal, DecodingCause, DocumentDecodingError, DocumentSection, EncodingError, LoadError,
    Location, PolyDecodingError, Quantity, ResourceDecodingError, ResourceObjectDecodingError,
    SchemaError, TransformError, ValidateError, ENTIRE_OBJECT,
};
pub use fields::{
    AttributeSet, FieldDecoder, FieldEncoder, FieldValue, NoAttributes, NoRelationships,
    RelationshipSet,
};
pub use generic::{GenericDocument, GenericResource, GenericResourceBody};
pub use id::{CreatableRawId, Id, RawId, ResourceIdentifier, Unidentified};
pub use includes::{Include, Includes};
pub use loader::{load_document, load_document_str};
pub use poly::{
    Lookup, NoIncludes, Poly0, Poly1, Poly2, Poly3, Poly4, Poly5, Poly6, Poly7, Poly8, Poly9, V0,
    V1, V2, V3, V4, V5, V6, V7, V8,
};
pub use relationship::{
    MetaRelationship, NullableToOneRelationship, ToManyRelationship, ToOneRelationship,
};
pub use resource::{
    DecodeResource, EncodeResource, ResourceObject, ResourceObjectDescription, ResourceObjectType,
    SparseFieldset,
};
pub use types::{
    json_type_name, ApiDescription, DecodingOptions, Fieldsets, Link, NoApiDescription, NoLinks,
    NoMetadata, Presence, Section, DEFAULT_API_VERSION,
};
pub use validator::{
    check_document, envelope_schema, validate_against_schema, validate_envelope, ENVELOPE_SCHEMA,
};
