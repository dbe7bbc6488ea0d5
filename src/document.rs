//! Top-level documents.
//!
//! ```json
//! { "data": <resource|array|null>, "included": [...]?,
//!   "meta"?, "links"?, "jsonapi"?: { "version": "1.0", "meta"? } }
//! ```
//!
//! or
//!
//! ```json
//! { "errors": [ ... ], "meta"?, "links"?, "jsonapi"? }
//! ```
//!
//! A [`Document`] holds exactly one of the two bodies. The presence of a
//! non-null `errors` member decides which one is decoded.

use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{DecodingCause, DocumentDecodingError, DocumentSection, EncodingError, Quantity};
use crate::includes::{Include, Includes};
use crate::poly::NoIncludes;
use crate::resource::{DecodeResource, EncodeResource};
use crate::types::{
    decode_section, encode_section, json_type_name, DecodingOptions, Fieldsets, NoApiDescription,
    NoLinks, NoMetadata, Presence, Section,
};

fn section_error(section: DocumentSection) -> impl Fn(DecodingCause) -> DocumentDecodingError {
    move |cause| DocumentDecodingError::Section { section, cause }
}

/// The primary data of a document.
pub trait ResourceBody: Sized + Clone + PartialEq + fmt::Debug {
    /// Decode from the `data` member, `None` when the member is absent.
    fn decode_body(data: Option<&Value>) -> Result<Self, DocumentDecodingError>;

    /// The `data` member to write, or `None` to leave it out.
    fn encode_body(&self, fieldsets: Option<&Fieldsets>) -> Result<Option<Value>, EncodingError>;
}

/// `data` holding a single resource. Use `SingleResourceBody<Option<R>>` for nullable data.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleResourceBody<R> {
    pub value: R,
}

impl<R> SingleResourceBody<R> {
    pub fn new(value: R) -> Self {
        Self { value }
    }
}

impl<R> From<R> for SingleResourceBody<R> {
    fn from(value: R) -> Self {
        Self::new(value)
    }
}

impl<R> ResourceBody for SingleResourceBody<R>
where
    R: DecodeResource + EncodeResource + Clone + PartialEq + fmt::Debug,
{
    fn decode_body(data: Option<&Value>) -> Result<Self, DocumentDecodingError> {
        match data {
            None => Err(section_error(DocumentSection::Data)(DecodingCause::KeyNotFound)),
            Some(Value::Null) => R::decode_null()
                .map(Self::new)
                .ok_or_else(|| section_error(DocumentSection::Data)(DecodingCause::ValueNotFound)),
            Some(Value::Array(_)) => Err(section_error(DocumentSection::Data)(
                DecodingCause::QuantityMismatch {
                    expected: Quantity::One,
                },
            )),
            Some(value) => R::decode_resource(value).map(Self::new).map_err(|source| {
                DocumentDecodingError::PrimaryResource {
                    index: None,
                    count: 1,
                    source,
                }
            }),
        }
    }

    fn encode_body(&self, fieldsets: Option<&Fieldsets>) -> Result<Option<Value>, EncodingError> {
        self.value.encode_resource(fieldsets).map(Some)
    }
}

/// `data` holding an array of resources.
#[derive(Debug, Clone, PartialEq)]
pub struct ManyResourceBody<R> {
    pub values: Vec<R>,
}

impl<R> ManyResourceBody<R> {
    pub fn new(values: Vec<R>) -> Self {
        Self { values }
    }

    /// Append the resources of `other`.
    pub fn appending(mut self, other: ManyResourceBody<R>) -> Self {
        self.values.extend(other.values);
        self
    }
}

impl<R> From<Vec<R>> for ManyResourceBody<R> {
    fn from(values: Vec<R>) -> Self {
        Self::new(values)
    }
}

impl<R> ResourceBody for ManyResourceBody<R>
where
    R: DecodeResource + EncodeResource + Clone + PartialEq + fmt::Debug,
{
    fn decode_body(data: Option<&Value>) -> Result<Self, DocumentDecodingError> {
        let values = match data {
            None => return Err(section_error(DocumentSection::Data)(DecodingCause::KeyNotFound)),
            Some(Value::Array(values)) => values,
            Some(Value::Null) => {
                return Err(section_error(DocumentSection::Data)(DecodingCause::ValueNotFound))
            }
            Some(Value::Object(_)) => {
                return Err(section_error(DocumentSection::Data)(
                    DecodingCause::QuantityMismatch {
                        expected: Quantity::Many,
                    },
                ))
            }
            Some(other) => {
                return Err(section_error(DocumentSection::Data)(DecodingCause::type_mismatch(
                    format!("an array of resource objects (found {})", json_type_name(other)),
                )))
            }
        };
        let count = values.len();
        values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                R::decode_resource(value).map_err(|source| DocumentDecodingError::PrimaryResource {
                    index: Some(index),
                    count,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    fn encode_body(&self, fieldsets: Option<&Fieldsets>) -> Result<Option<Value>, EncodingError> {
        let values = self
            .values
            .iter()
            .map(|value| value.encode_resource(fieldsets))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Value::Array(values)))
    }
}

/// Schema marker: the document carries no primary data. `data` is neither read nor written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NoResourceBody;

impl ResourceBody for NoResourceBody {
    fn decode_body(_: Option<&Value>) -> Result<Self, DocumentDecodingError> {
        Ok(NoResourceBody)
    }

    fn encode_body(&self, _: Option<&Fieldsets>) -> Result<Option<Value>, EncodingError> {
        Ok(None)
    }
}

/// Payload type usable as an entry of `errors`.
pub trait JsonApiError: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug {}

impl<T> JsonApiError for T where T: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug {}

/// Where in the request an error originated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorSource {
    /// JSON Pointer (RFC 6901) into the request document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// The query parameter that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// The standard JSON:API error object. Every member is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BasicJsonApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl BasicJsonApiError {
    pub fn new(status: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source.get_or_insert_with(ErrorSource::default).pointer = Some(pointer.into());
        self
    }
}

impl fmt::Display for BasicJsonApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = &self.status {
            write!(f, "[{status}] ")?;
        }
        let text = self
            .detail
            .as_deref()
            .or(self.title.as_deref())
            .or(self.code.as_deref())
            .unwrap_or("unknown error");
        f.write_str(text)?;
        if let Some(pointer) = self.source.as_ref().and_then(|source| source.pointer.as_deref()) {
            write!(f, " (at {pointer})")?;
        }
        Ok(())
    }
}

/// The success body: primary data, includes, meta and links.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBody<P, I = NoIncludes, M = NoMetadata, L = NoLinks> {
    pub primary: P,
    pub includes: Includes<I>,
    pub meta: M,
    pub links: L,
}

impl<P, I, M, L> DataBody<P, I, M, L> {
    pub fn new(primary: P, includes: Includes<I>, meta: M, links: L) -> Self {
        Self {
            primary,
            includes,
            meta,
            links,
        }
    }
}

impl<P: Default, I, M: Default, L: Default> Default for DataBody<P, I, M, L> {
    fn default() -> Self {
        Self::new(P::default(), Includes::none(), M::default(), L::default())
    }
}

impl<R, I, M, L> DataBody<ManyResourceBody<R>, I, M, L>
where
    I: Include,
{
    /// Combine two many-resource bodies. Primary resources are appended,
    /// includes are merged without duplicates, and meta and links come from `self`.
    pub fn merging(self, other: Self) -> Self {
        self.merging_with(other, |meta, _| meta, |links, _| links)
    }

    /// Like [`DataBody::merging`], combining meta and links with the given functions.
    pub fn merging_with(
        self,
        other: Self,
        combine_meta: impl FnOnce(M, M) -> M,
        combine_links: impl FnOnce(L, L) -> L,
    ) -> Self {
        Self {
            primary: self.primary.appending(other.primary),
            includes: self.includes.merging(other.includes),
            meta: combine_meta(self.meta, other.meta),
            links: combine_links(self.links, other.links),
        }
    }
}

/// The failure body: error objects with optional meta and links.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBody<E = BasicJsonApiError, M = NoMetadata, L = NoLinks> {
    pub errors: Vec<E>,
    pub meta: Option<M>,
    pub links: Option<L>,
}

impl<E, M, L> ErrorBody<E, M, L> {
    pub fn new(errors: Vec<E>) -> Self {
        Self {
            errors,
            meta: None,
            links: None,
        }
    }

    pub fn with_meta(self, meta: M) -> Self {
        Self {
            meta: Some(meta),
            ..self
        }
    }

    pub fn with_links(self, links: L) -> Self {
        Self {
            links: Some(links),
            ..self
        }
    }
}

fn encode_error_section<S: Section>(
    section: &Option<S>,
    object: &mut Map<String, Value>,
    key: &'static str,
) -> Result<(), EncodingError> {
    match section {
        Some(section) => encode_section(section, object, key),
        None if S::PRESENCE == Presence::Required => {
            Err(EncodingError::MissingSection { section: key })
        }
        None => Ok(()),
    }
}

/// `None` for absent sections and for optional sections the wire omits.
fn decode_error_section<S: Section>(
    object: &Map<String, Value>,
    section: DocumentSection,
) -> Result<Option<S>, DocumentDecodingError> {
    let key = section.member_name();
    match S::PRESENCE {
        Presence::Absent => Ok(None),
        Presence::Optional if !object.contains_key(key) => Ok(None),
        _ => decode_section(object, key)
            .map(Some)
            .map_err(section_error(section)),
    }
}

fn decode_errors<E: JsonApiError>(errors: &Value) -> Result<Vec<E>, DocumentDecodingError> {
    let Value::Array(errors) = errors else {
        return Err(section_error(DocumentSection::Errors)(DecodingCause::type_mismatch(
            format!("an array of error objects (found {})", json_type_name(errors)),
        )));
    };
    errors
        .iter()
        .enumerate()
        .map(|(index, error)| {
            serde_json::from_value(error.clone()).map_err(|err| DocumentDecodingError::ErrorObject {
                index,
                message: err.to_string(),
            })
        })
        .collect()
}

/// Exactly one of the two document bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum Body<P, I = NoIncludes, M = NoMetadata, L = NoLinks, E = BasicJsonApiError> {
    Data(DataBody<P, I, M, L>),
    Errors(ErrorBody<E, M, L>),
}

/// A typed JSON:API document.
///
/// - `P`: primary data ([`SingleResourceBody`], [`ManyResourceBody`], [`NoResourceBody`])
/// - `I`: include type, usually a `PolyN` ([`NoIncludes`] for none)
/// - `M`, `L`: document meta and links sections
/// - `E`: error object type
/// - `A`: the `jsonapi` block ([`NoApiDescription`] for none)
#[derive(Debug, Clone, PartialEq)]
pub struct Document<
    P,
    I = NoIncludes,
    M = NoMetadata,
    L = NoLinks,
    E = BasicJsonApiError,
    A = NoApiDescription,
> {
    pub api_description: A,
    pub body: Body<P, I, M, L, E>,
}

impl<P, I, M, L, E, A> Document<P, I, M, L, E, A> {
    pub fn new(api_description: A, body: Body<P, I, M, L, E>) -> Self {
        Self {
            api_description,
            body,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, Body::Errors(_))
    }

    pub fn data(&self) -> Option<&DataBody<P, I, M, L>> {
        match &self.body {
            Body::Data(body) => Some(body),
            Body::Errors(_) => None,
        }
    }

    pub fn error_body(&self) -> Option<&ErrorBody<E, M, L>> {
        match &self.body {
            Body::Data(_) => None,
            Body::Errors(body) => Some(body),
        }
    }

    pub fn errors(&self) -> Option<&[E]> {
        self.error_body().map(|body| body.errors.as_slice())
    }

    pub fn primary(&self) -> Option<&P> {
        self.data().map(|body| &body.primary)
    }

    pub fn includes(&self) -> Option<&Includes<I>> {
        self.data().map(|body| &body.includes)
    }

    pub fn meta(&self) -> Option<&M> {
        match &self.body {
            Body::Data(body) => Some(&body.meta),
            Body::Errors(body) => body.meta.as_ref(),
        }
    }

    pub fn links(&self) -> Option<&L> {
        match &self.body {
            Body::Data(body) => Some(&body.links),
            Body::Errors(body) => body.links.as_ref(),
        }
    }

    pub fn api_description(&self) -> &A {
        &self.api_description
    }

    pub fn with_api_description<B>(self, api_description: B) -> Document<P, I, M, L, E, B> {
        Document {
            api_description,
            body: self.body,
        }
    }
}

impl<P, I, M, L, E, A: Default> Document<P, I, M, L, E, A> {
    pub fn from_data(body: DataBody<P, I, M, L>) -> Self {
        Self::new(A::default(), Body::Data(body))
    }

    pub fn from_errors(body: ErrorBody<E, M, L>) -> Self {
        Self::new(A::default(), Body::Errors(body))
    }
}

impl<P, I, M, L, E, A> Document<P, I, M, L, E, A>
where
    P: ResourceBody,
    I: Include,
    M: Section,
    L: Section,
    E: JsonApiError,
    A: Section,
{
    /// Decode with default (lenient) options.
    pub fn decode(value: &Value) -> Result<Self, DocumentDecodingError> {
        Self::decode_with(value, &DecodingOptions::default())
    }

    pub fn decode_with(
        value: &Value,
        options: &DecodingOptions,
    ) -> Result<Self, DocumentDecodingError> {
        let Value::Object(object) = value else {
            return Err(DocumentDecodingError::NotAnObject {
                found: json_type_name(value),
            });
        };

        let api_description = decode_section(object, DocumentSection::ApiDescription.member_name())
            .map_err(section_error(DocumentSection::ApiDescription))?;

        let body = match object.get("errors") {
            Some(errors) if !errors.is_null() => {
                if object.contains_key("data") {
                    if options.strict {
                        return Err(DocumentDecodingError::Ambiguous);
                    }
                    debug!("document has both 'errors' and 'data'; decoding the error body");
                }
                let errors = decode_errors(errors)?;
                let meta = decode_error_section(object, DocumentSection::Meta)?;
                let links = decode_error_section(object, DocumentSection::Links)?;
                Body::Errors(ErrorBody {
                    errors,
                    meta,
                    links,
                })
            }
            _ => {
                let primary = P::decode_body(object.get("data"))?;
                let includes = Includes::decode(object)?;
                let meta = decode_section(object, "meta").map_err(section_error(DocumentSection::Meta))?;
                let links =
                    decode_section(object, "links").map_err(section_error(DocumentSection::Links))?;
                Body::Data(DataBody {
                    primary,
                    includes,
                    meta,
                    links,
                })
            }
        };

        Ok(Self {
            api_description,
            body,
        })
    }

    pub fn encode(&self) -> Result<Value, EncodingError> {
        self.encode_with(None)
    }

    /// Encode with per-type sparse fieldsets applied to primary and included resources.
    pub fn encode_sparse(&self, fieldsets: &Fieldsets) -> Result<Value, EncodingError> {
        self.encode_with(Some(fieldsets))
    }

    fn encode_with(&self, fieldsets: Option<&Fieldsets>) -> Result<Value, EncodingError> {
        let mut object = Map::new();
        match &self.body {
            Body::Data(body) => {
                if let Some(data) = body.primary.encode_body(fieldsets)? {
                    object.insert("data".to_string(), data);
                }
                if let Some(included) = body.includes.encode(fieldsets)? {
                    object.insert("included".to_string(), included);
                }
                encode_section(&body.meta, &mut object, "meta")?;
                encode_section(&body.links, &mut object, "links")?;
            }
            Body::Errors(body) => {
                let errors = serde_json::to_value(&body.errors)
                    .map_err(|source| EncodingError::serialization("errors", source))?;
                object.insert("errors".to_string(), errors);
                encode_error_section(&body.meta, &mut object, "meta")?;
                encode_error_section(&body.links, &mut object, "links")?;
            }
        }
        encode_section(
            &self.api_description,
            &mut object,
            DocumentSection::ApiDescription.member_name(),
        )?;
        Ok(Value::Object(object))
    }
}

impl<P, I, M, L, E, A> Serialize for Document<P, I, M, L, E, A>
where
    P: ResourceBody,
    I: Include,
    M: Section,
    L: Section,
    E: JsonApiError,
    A: Section,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encode()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, P, I, M, L, E, A> Deserialize<'de> for Document<P, I, M, L, E, A>
where
    P: ResourceBody,
    I: Include,
    M: Section,
    L: Section,
    E: JsonApiError,
    A: Section,
{
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::decode(&value).map_err(De::Error::custom)
    }
}
