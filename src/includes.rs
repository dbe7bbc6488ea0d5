//! The `included` member: related resources delivered next to the primary data.

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{DecodingCause, DocumentDecodingError, DocumentSection, EncodingError};
use crate::id::ResourceIdentifier;
use crate::poly::Lookup;
use crate::resource::{DecodeResource, EncodeResource};
use crate::types::Fieldsets;

/// A type that can appear in the `included` array.
pub trait Include: DecodeResource + EncodeResource + Clone + PartialEq + fmt::Debug {
    /// False for [`NoIncludes`](crate::poly::NoIncludes): `included` is never read or written.
    const PRESENT: bool = true;
}

/// Ordered included resources.
#[derive(Debug, Clone, PartialEq)]
pub struct Includes<I> {
    values: Vec<I>,
}

impl<I> Default for Includes<I> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<I> Includes<I> {
    pub fn new(values: Vec<I>) -> Self {
        Self { values }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, I> {
        self.values.iter()
    }

    pub fn values(&self) -> &[I] {
        &self.values
    }

    pub fn into_values(self) -> Vec<I> {
        self.values
    }

    /// Every include whose active variant is a `T`, in order.
    pub fn get<T, Index>(&self) -> Vec<&T>
    where
        I: Lookup<T, Index>,
    {
        self.values.iter().filter_map(Lookup::lookup).collect()
    }

    /// Append `other`, keeping duplicates.
    pub fn appending(mut self, other: Includes<I>) -> Self {
        self.values.extend(other.values);
        self
    }
}

impl<I: Include> Includes<I> {
    /// Read the `included` member of a document. Empty when the schema has no includes.
    pub fn decode(document: &Map<String, Value>) -> Result<Self, DocumentDecodingError> {
        if !I::PRESENT {
            return Ok(Self::none());
        }
        let values = match document.get("included") {
            None => return Ok(Self::none()),
            Some(Value::Array(values)) => values,
            Some(Value::Null) => {
                return Err(DocumentDecodingError::Section {
                    section: DocumentSection::Included,
                    cause: DecodingCause::ValueNotFound,
                })
            }
            Some(_) => {
                return Err(DocumentDecodingError::Section {
                    section: DocumentSection::Included,
                    cause: DecodingCause::type_mismatch("an array of resource objects"),
                })
            }
        };
        let count = values.len();
        values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                I::decode_resource(value).map_err(|source| DocumentDecodingError::Include {
                    index,
                    count,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// The encoded `included` array, or `None` when there is nothing to include.
    pub fn encode(&self, fieldsets: Option<&Fieldsets>) -> Result<Option<Value>, EncodingError> {
        if !I::PRESENT || self.values.is_empty() {
            return Ok(None);
        }
        let values = self
            .values
            .iter()
            .map(|include| include.encode_resource(fieldsets))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Value::Array(values)))
    }

    /// Append `other`, skipping resources whose `{type, id}` is already present.
    ///
    /// Unidentified resources are always kept.
    pub fn merging(mut self, other: Includes<I>) -> Self {
        let mut seen: HashSet<ResourceIdentifier> = self
            .values
            .iter()
            .filter_map(EncodeResource::resource_identifier)
            .collect();
        let mut suppressed = 0usize;
        for include in other.values {
            match include.resource_identifier() {
                Some(identity) if seen.contains(&identity) => {
                    debug!(%identity, "suppressed duplicate include");
                    suppressed += 1;
                }
                Some(identity) => {
                    seen.insert(identity);
                    self.values.push(include);
                }
                None => self.values.push(include),
            }
        }
        if suppressed > 0 {
            debug!(suppressed, kept = self.values.len(), "merged includes");
        }
        self
    }

    /// Drop later resources sharing a `{type, id}` with an earlier one.
    pub fn deduplicated(self) -> Self {
        Self::none().merging(self)
    }
}

impl<I> From<Vec<I>> for Includes<I> {
    fn from(values: Vec<I>) -> Self {
        Self::new(values)
    }
}

impl<I> FromIterator<I> for Includes<I> {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, I> IntoIterator for &'a Includes<I> {
    type Item = &'a I;
    type IntoIter = std::slice::Iter<'a, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<I> IntoIterator for Includes<I> {
    type Item = I;
    type IntoIter = std::vec::IntoIter<I>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
