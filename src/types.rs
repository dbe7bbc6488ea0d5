//! Core types shared by resource objects and documents.
//!
//! Optional sections (meta, links, the `jsonapi` block) are ordinary serde types
//! implementing [`Section`]. Each section type declares its [`Presence`] once,
//! when the schema is written, and the codec branches on that declaration.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{DecodingCause, EncodingError};

/// Version reported by the `jsonapi` block when the wire omits it.
pub const DEFAULT_API_VERSION: &str = "1.0";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a schema section exists, and whether the wire must carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Presence {
    /// The section does not exist for this schema; never read or written.
    Absent,
    /// The section may be omitted on the wire.
    Optional,
    /// The section must be present on the wire.
    #[default]
    Required,
}

/// A schema section carried as a serde value (meta, links, `jsonapi`).
pub trait Section: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug {
    const PRESENCE: Presence = Presence::Required;

    /// Value used when the section is absent from the wire.
    ///
    /// `None` means the absence is a decoding failure.
    fn missing() -> Option<Self> {
        None
    }
}

/// Schema marker: no metadata section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NoMetadata;

impl Section for NoMetadata {
    const PRESENCE: Presence = Presence::Absent;

    fn missing() -> Option<Self> {
        Some(NoMetadata)
    }
}

/// Schema marker: no links section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NoLinks;

impl Section for NoLinks {
    const PRESENCE: Presence = Presence::Absent;

    fn missing() -> Option<Self> {
        Some(NoLinks)
    }
}

impl<T: Section> Section for Option<T> {
    const PRESENCE: Presence = Presence::Optional;

    fn missing() -> Option<Self> {
        Some(None)
    }
}

/// Untyped, optional section.
impl Section for Map<String, Value> {
    const PRESENCE: Presence = Presence::Optional;

    fn missing() -> Option<Self> {
        Some(Map::new())
    }
}

/// Read section `key` out of `container` following `S::PRESENCE`.
pub(crate) fn decode_section<S: Section>(
    container: &Map<String, Value>,
    key: &str,
) -> Result<S, DecodingCause> {
    if S::PRESENCE == Presence::Absent {
        return S::missing().ok_or(DecodingCause::KeyNotFound);
    }
    match container.get(key) {
        None => S::missing().ok_or(DecodingCause::KeyNotFound),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err| DecodingCause::from_serde(value, &err)),
    }
}

/// Write section `key` into `container` following `S::PRESENCE`.
///
/// Optional sections that serialize to `null` or `{}` are left out.
pub(crate) fn encode_section<S: Section>(
    section: &S,
    container: &mut Map<String, Value>,
    key: &str,
) -> Result<(), EncodingError> {
    if S::PRESENCE == Presence::Absent {
        return Ok(());
    }
    let value =
        serde_json::to_value(section).map_err(|source| EncodingError::serialization(key, source))?;
    let empty = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if S::PRESENCE == Presence::Optional && empty {
        return Ok(());
    }
    container.insert(key.to_string(), value);
    Ok(())
}

/// A JSON:API link: a bare URL, or `{ "href", "meta" }` when the link carries metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Link<M = NoMetadata> {
    pub url: String,
    pub meta: M,
}

impl Link<NoMetadata> {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            meta: NoMetadata,
        }
    }
}

impl<M> Link<M> {
    pub fn with_meta(url: impl Into<String>, meta: M) -> Self {
        Self {
            url: url.into(),
            meta,
        }
    }
}

impl<M: Section> Serialize for Link<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if M::PRESENCE == Presence::Absent {
            return serializer.serialize_str(&self.url);
        }
        let mut object = Map::new();
        object.insert("href".to_string(), Value::String(self.url.clone()));
        encode_section(&self.meta, &mut object, "meta").map_err(S::Error::custom)?;
        Value::Object(object).serialize(serializer)
    }
}

impl<'de, M: Section> Deserialize<'de> for Link<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(url) => {
                let meta = M::missing()
                    .ok_or_else(|| D::Error::custom("link meta is required but the link is a bare URL"))?;
                Ok(Link { url, meta })
            }
            Value::Object(object) => {
                let url = match object.get("href") {
                    Some(Value::String(href)) => href.clone(),
                    Some(other) => {
                        return Err(D::Error::custom(format!(
                            "link href must be a string, found {}",
                            json_type_name(other)
                        )))
                    }
                    None => return Err(D::Error::missing_field("href")),
                };
                let meta = decode_section::<M>(&object, "meta")
                    .map_err(|cause| D::Error::custom(format!("invalid link meta: {cause:?}")))?;
                Ok(Link { url, meta })
            }
            other => Err(D::Error::custom(format!(
                "a link must be a string or an object, found {}",
                json_type_name(&other)
            ))),
        }
    }
}

/// The top-level `jsonapi` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiDescription<M = NoMetadata> {
    pub version: String,
    pub meta: M,
}

impl<M> ApiDescription<M> {
    pub fn new(version: impl Into<String>, meta: M) -> Self {
        Self {
            version: version.into(),
            meta,
        }
    }
}

impl<M: Default> Default for ApiDescription<M> {
    fn default() -> Self {
        Self::new(DEFAULT_API_VERSION, M::default())
    }
}

impl<M: Section> Serialize for ApiDescription<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut object = Map::new();
        object.insert("version".to_string(), Value::String(self.version.clone()));
        encode_section(&self.meta, &mut object, "meta").map_err(S::Error::custom)?;
        Value::Object(object).serialize(serializer)
    }
}

impl<'de, M: Section> Deserialize<'de> for ApiDescription<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(object) = value else {
            return Err(D::Error::custom(format!(
                "the jsonapi member must be an object, found {}",
                json_type_name(&value)
            )));
        };
        let version = match object.get("version") {
            None | Some(Value::Null) => DEFAULT_API_VERSION.to_string(),
            Some(Value::String(version)) => version.clone(),
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "jsonapi version must be a string, found {}",
                    json_type_name(other)
                )))
            }
        };
        let meta = decode_section::<M>(&object, "meta")
            .map_err(|cause| D::Error::custom(format!("invalid jsonapi meta: {cause:?}")))?;
        Ok(ApiDescription { version, meta })
    }
}

impl<M: Section> Section for ApiDescription<M> {}

/// Schema marker: no `jsonapi` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NoApiDescription;

impl Section for NoApiDescription {
    const PRESENCE: Presence = Presence::Absent;

    fn missing() -> Option<Self> {
        Some(NoApiDescription)
    }
}

/// Options for document decoding.
#[derive(Debug, Clone, Default)]
pub struct DecodingOptions {
    /// When true, a document carrying both `errors` and `data` is rejected.
    /// Defaults to false: `errors` wins and `data` is ignored.
    pub strict: bool,
}

impl DecodingOptions {
    /// Create decoding options with strict mode disabled (default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict mode (reject ambiguous `errors` + `data` documents).
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Sparse fieldsets keyed by JSON:API type: `fields[articles]=title,body`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fieldsets {
    by_type: BTreeMap<String, BTreeSet<String>>,
}

impl Fieldsets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict resources of `jsonapi_type` to `keys`. Repeated calls for a type accumulate.
    pub fn insert<I, K>(&mut self, jsonapi_type: impl Into<String>, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.by_type
            .entry(jsonapi_type.into())
            .or_default()
            .extend(keys.into_iter().map(Into::into));
    }

    /// Builder form of [`Fieldsets::insert`].
    pub fn with<I, K>(mut self, jsonapi_type: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.insert(jsonapi_type, keys);
        self
    }

    /// Allowed attribute keys for `jsonapi_type`, or `None` if the type is not restricted.
    pub fn for_type(&self, jsonapi_type: &str) -> Option<&BTreeSet<String>> {
        self.by_type.get(jsonapi_type)
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Parse one `TYPE=key,key` entry. `TYPE=` restricts the type to no attributes.
    pub fn parse(entry: &str) -> Result<Self, String> {
        let (jsonapi_type, keys) = entry
            .split_once('=')
            .ok_or_else(|| format!("expected TYPE=key,key but got '{entry}'"))?;
        let jsonapi_type = jsonapi_type.trim();
        if jsonapi_type.is_empty() {
            return Err(format!("missing resource type in '{entry}'"));
        }
        let keys = keys.split(',').map(str::trim).filter(|key| !key.is_empty());
        Ok(Self::new().with(jsonapi_type, keys))
    }

    /// Fold `other` into this fieldset; keys for a shared type accumulate.
    pub fn merge(&mut self, other: Fieldsets) {
        for (jsonapi_type, keys) in other.by_type {
            self.insert(jsonapi_type, keys);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct PageMeta {
        total: u32,
    }

    impl Section for PageMeta {}

    fn container(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn absent_section_ignores_wire() {
        let map = container(json!({ "meta": { "total": 3 } }));
        let meta: NoMetadata = decode_section(&map, "meta").unwrap();
        assert_eq!(meta, NoMetadata);

        let mut out = Map::new();
        encode_section(&NoMetadata, &mut out, "meta").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn required_section_must_be_present() {
        let map = container(json!({}));
        let result: Result<PageMeta, _> = decode_section(&map, "meta");
        assert_eq!(result, Err(DecodingCause::KeyNotFound));

        let map = container(json!({ "meta": { "total": 3 } }));
        let meta: PageMeta = decode_section(&map, "meta").unwrap();
        assert_eq!(meta, PageMeta { total: 3 });
    }

    #[test]
    fn required_section_rejects_null() {
        let map = container(json!({ "meta": null }));
        let result: Result<PageMeta, _> = decode_section(&map, "meta");
        assert_eq!(result, Err(DecodingCause::ValueNotFound));
    }

    #[test]
    fn optional_section_defaults_and_is_omitted() {
        let map = container(json!({}));
        let meta: Option<PageMeta> = decode_section(&map, "meta").unwrap();
        assert_eq!(meta, None);

        let mut out = Map::new();
        encode_section(&meta, &mut out, "meta").unwrap();
        assert!(out.get("meta").is_none());

        let untyped: Map<String, Value> = decode_section(&map, "meta").unwrap();
        assert!(untyped.is_empty());
    }

    #[test]
    fn link_forms() {
        let link: Link = serde_json::from_value(json!("https://example.com/a")).unwrap();
        assert_eq!(link, Link::new("https://example.com/a"));
        assert_eq!(serde_json::to_value(&link).unwrap(), json!("https://example.com/a"));

        let link: Link<PageMeta> =
            serde_json::from_value(json!({ "href": "https://example.com/b", "meta": { "total": 1 } }))
                .unwrap();
        assert_eq!(link.meta, PageMeta { total: 1 });
        assert_eq!(
            serde_json::to_value(&link).unwrap(),
            json!({ "href": "https://example.com/b", "meta": { "total": 1 } })
        );

        let result: Result<Link<PageMeta>, _> = serde_json::from_value(json!("https://example.com"));
        assert!(result.is_err());
    }

    #[test]
    fn link_with_absent_meta_accepts_object_form() {
        let link: Link = serde_json::from_value(json!({ "href": "https://example.com/c" })).unwrap();
        assert_eq!(link.url, "https://example.com/c");
    }

    #[test]
    fn api_description_defaults_version() {
        let api: ApiDescription = serde_json::from_value(json!({})).unwrap();
        assert_eq!(api.version, "1.0");

        let api: ApiDescription<Map<String, Value>> =
            serde_json::from_value(json!({ "version": "1.1", "meta": { "a": 1 } })).unwrap();
        assert_eq!(api.version, "1.1");
        assert_eq!(api.meta.get("a"), Some(&json!(1)));
    }

    #[test]
    fn api_description_encodes_version() {
        let api: ApiDescription = ApiDescription::default();
        assert_eq!(serde_json::to_value(&api).unwrap(), json!({ "version": "1.0" }));
    }

    #[test]
    fn decoding_options_builder() {
        assert!(!DecodingOptions::new().strict);
        assert!(DecodingOptions::new().strict(true).strict);
    }

    #[test]
    fn fieldsets_accumulate() {
        let mut fields = Fieldsets::new().with("articles", ["title"]);
        fields.insert("articles", ["body"]);
        let keys: Vec<_> = fields.for_type("articles").unwrap().iter().cloned().collect();
        assert_eq!(keys, vec!["body".to_string(), "title".to_string()]);
        assert!(fields.for_type("people").is_none());
    }

    #[test]
    fn fieldsets_parse_entries() {
        let mut fields = Fieldsets::parse("articles=title, body").unwrap();
        fields.merge(Fieldsets::parse("people=").unwrap());
        assert_eq!(fields.for_type("articles").unwrap().len(), 2);
        assert!(fields.for_type("people").unwrap().is_empty());

        assert!(Fieldsets::parse("articles").is_err());
        assert!(Fieldsets::parse("=title").is_err());
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
    }
}
