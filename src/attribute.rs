//! Attribute wrappers.
//!
//! [`Attribute`] holds a plain value. [`TransformedAttribute`] keeps the raw
//! wire value next to the value derived from it by a [`Transformer`]; the raw
//! value is what gets encoded, so a lossy transform still round-trips.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DecodingCause, EncodingError, TransformError};
use crate::fields::FieldValue;

/// A fallible function from a raw wire value to the value the schema exposes.
pub trait Transformer {
    type From: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug;
    type To;

    fn transform(from: &Self::From) -> Result<Self::To, TransformError>;
}

/// A transformer that can recover the raw value from the transformed one.
pub trait ReversibleTransformer: Transformer {
    fn reverse(to: &Self::To) -> Result<Self::From, TransformError>;
}

/// A check on a raw value that does not change it.
pub trait Validator {
    type Value: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug;

    fn validate(value: &Self::Value) -> Result<(), TransformError>;
}

/// Adapts a [`Validator`] into a reversible identity [`Transformer`].
pub struct Validated<V>(PhantomData<V>);

impl<V: Validator> Transformer for Validated<V> {
    type From = V::Value;
    type To = V::Value;

    fn transform(from: &Self::From) -> Result<Self::To, TransformError> {
        V::validate(from)?;
        Ok(from.clone())
    }
}

impl<V: Validator> ReversibleTransformer for Validated<V> {
    fn reverse(to: &Self::To) -> Result<Self::From, TransformError> {
        V::validate(to)?;
        Ok(to.clone())
    }
}

/// The transformer that accepts every value unchanged.
pub struct IdentityTransformer<T>(PhantomData<T>);

impl<T> Transformer for IdentityTransformer<T>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug,
{
    type From = T;
    type To = T;

    fn transform(from: &T) -> Result<T, TransformError> {
        Ok(from.clone())
    }
}

impl<T> ReversibleTransformer for IdentityTransformer<T>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug,
{
    fn reverse(to: &T) -> Result<T, TransformError> {
        Ok(to.clone())
    }
}

/// A plain attribute value. Use `Attribute<Option<T>>` for nullable attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attribute<T> {
    value: T,
}

impl<T> Attribute<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T> Deref for Attribute<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> From<T> for Attribute<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Serialize + DeserializeOwned> FieldValue for Attribute<T> {
    fn decode_field(value: &Value) -> Result<Self, DecodingCause> {
        serde_json::from_value(value.clone())
            .map(Self::new)
            .map_err(|err| DecodingCause::from_serde(value, &err))
    }

    fn encode_field(&self) -> Result<Value, EncodingError> {
        serde_json::to_value(&self.value)
            .map_err(|source| EncodingError::serialization("attribute", source))
    }
}

/// An attribute whose exposed value is derived from its raw wire value.
pub struct TransformedAttribute<Tr: Transformer> {
    raw_value: Tr::From,
    value: Tr::To,
}

/// An attribute whose raw value must pass validator `V`.
pub type ValidatedAttribute<V> = TransformedAttribute<Validated<V>>;

impl<Tr: Transformer> TransformedAttribute<Tr> {
    /// Build from a raw value, running the transform.
    pub fn from_raw(raw_value: Tr::From) -> Result<Self, TransformError> {
        let value = Tr::transform(&raw_value)?;
        Ok(Self { raw_value, value })
    }

    pub fn raw_value(&self) -> &Tr::From {
        &self.raw_value
    }

    pub fn value(&self) -> &Tr::To {
        &self.value
    }

    pub fn into_value(self) -> Tr::To {
        self.value
    }
}

impl<Tr: ReversibleTransformer> TransformedAttribute<Tr> {
    /// Build from the transformed value, recovering the raw value.
    pub fn from_value(value: Tr::To) -> Result<Self, TransformError> {
        let raw_value = Tr::reverse(&value)?;
        Ok(Self { raw_value, value })
    }
}

impl<Tr: Transformer> Deref for TransformedAttribute<Tr> {
    type Target = Tr::To;

    fn deref(&self) -> &Tr::To {
        &self.value
    }
}

impl<Tr> Clone for TransformedAttribute<Tr>
where
    Tr: Transformer,
    Tr::To: Clone,
{
    fn clone(&self) -> Self {
        Self {
            raw_value: self.raw_value.clone(),
            value: self.value.clone(),
        }
    }
}

impl<Tr: Transformer> PartialEq for TransformedAttribute<Tr> {
    fn eq(&self, other: &Self) -> bool {
        self.raw_value == other.raw_value
    }
}

impl<Tr> fmt::Debug for TransformedAttribute<Tr>
where
    Tr: Transformer,
    Tr::To: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformedAttribute")
            .field("raw_value", &self.raw_value)
            .field("value", &self.value)
            .finish()
    }
}

impl<Tr: Transformer> FieldValue for TransformedAttribute<Tr> {
    fn decode_field(value: &Value) -> Result<Self, DecodingCause> {
        let raw_value: Tr::From = serde_json::from_value(value.clone())
            .map_err(|err| DecodingCause::from_serde(value, &err))?;
        Self::from_raw(raw_value).map_err(DecodingCause::TransformFailure)
    }

    fn encode_field(&self) -> Result<Value, EncodingError> {
        serde_json::to_value(&self.raw_value)
            .map_err(|source| EncodingError::serialization("attribute", source))
    }
}
