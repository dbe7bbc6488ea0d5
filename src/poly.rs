//! Closed sum types over resource object types.
//!
//! `PolyN<A, B, ...>` holds exactly one of its variants. Decoding tries each
//! variant in declared order against the same wire value and keeps the first
//! success; if every variant fails, the failures are reported together.
//!
//! [`Poly0`] has no variants. It marks positions where no resource may appear
//! (a document without includes) and cannot be encoded.

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{EncodingError, PolyDecodingError, ResourceDecodingError};
use crate::id::ResourceIdentifier;
use crate::includes::Include;
use crate::resource::{DecodeResource, EncodeResource, ResourceObjectType};
use crate::types::Fieldsets;

/// Typed access to the variant of a sum type holding a `T`.
///
/// `Index` is one of the `V0`..`V8` markers and is normally inferred.
pub trait Lookup<T, Index> {
    fn lookup(&self) -> Option<&T>;

    fn into_lookup(self) -> Option<T>;
}

/// Variant index markers for [`Lookup`].
pub struct V0;
pub struct V1;
pub struct V2;
pub struct V3;
pub struct V4;
pub struct V5;
pub struct V6;
pub struct V7;
pub struct V8;

fn found_type(value: &Value) -> Option<String> {
    value.get("type").and_then(Value::as_str).map(String::from)
}

/// The sum type with no variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Poly0;

/// Include type for documents that carry no included resources.
pub type NoIncludes = Poly0;

impl DecodeResource for Poly0 {
    fn decode_resource(value: &Value) -> Result<Self, ResourceDecodingError> {
        Err(PolyDecodingError {
            found_type: found_type(value),
            failures: Vec::new(),
        }
        .into())
    }
}

impl EncodeResource for Poly0 {
    fn encode_resource(&self, _: Option<&Fieldsets>) -> Result<Value, EncodingError> {
        Err(EncodingError::ZeroVariant)
    }

    fn resource_identifier(&self) -> Option<ResourceIdentifier> {
        None
    }
}

impl Include for Poly0 {
    const PRESENT: bool = false;
}

macro_rules! impl_lookup {
    ($name:ident [$($all:ident),+] $variant:ident $index:ident) => {
        impl<$($all),+> Lookup<$variant, $index> for $name<$($all),+> {
            fn lookup(&self) -> Option<&$variant> {
                match self {
                    $name::$variant(inner) => Some(inner),
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }

            fn into_lookup(self) -> Option<$variant> {
                match self {
                    $name::$variant(inner) => Some(inner),
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }
    };
}

macro_rules! define_poly {
    ($(#[$doc:meta])* $name:ident $generics:tt { $($variant:ident => $index:ident),+ }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name<$($variant),+> {
            $($variant($variant)),+
        }

        impl<$($variant),+> $name<$($variant),+>
        where
            $($variant: ResourceObjectType),+
        {
            /// Try each variant in declared order; the first success wins.
            pub fn decode_poly(value: &Value) -> Result<Self, PolyDecodingError> {
                let mut failures = Vec::new();
                $(
                    match <$variant as ResourceObjectType>::decode_object(value) {
                        Ok(decoded) => {
                            trace!(
                                jsonapi_type = <$variant as ResourceObjectType>::JSONAPI_TYPE,
                                "sum type variant matched"
                            );
                            return Ok($name::$variant(decoded));
                        }
                        Err(err) => failures.push((<$variant as ResourceObjectType>::JSONAPI_TYPE, err)),
                    }
                )+
                debug!(
                    found = ?found_type(value),
                    candidates = failures.len(),
                    "no sum type variant matched"
                );
                Err(PolyDecodingError {
                    found_type: found_type(value),
                    failures,
                })
            }

            /// The JSON:API type token of the active variant.
            pub fn jsonapi_type(&self) -> &'static str {
                match self {
                    $($name::$variant(_) => <$variant as ResourceObjectType>::JSONAPI_TYPE),+
                }
            }
        }

        impl<$($variant),+> DecodeResource for $name<$($variant),+>
        where
            $($variant: ResourceObjectType),+
        {
            fn decode_resource(value: &Value) -> Result<Self, ResourceDecodingError> {
                Ok(Self::decode_poly(value)?)
            }
        }

        impl<$($variant),+> EncodeResource for $name<$($variant),+>
        where
            $($variant: EncodeResource),+
        {
            fn encode_resource(&self, fieldsets: Option<&Fieldsets>) -> Result<Value, EncodingError> {
                match self {
                    $($name::$variant(inner) => inner.encode_resource(fieldsets)),+
                }
            }

            fn resource_identifier(&self) -> Option<ResourceIdentifier> {
                match self {
                    $($name::$variant(inner) => inner.resource_identifier()),+
                }
            }
        }

        impl<$($variant),+> Include for $name<$($variant),+>
        where
            $($variant: ResourceObjectType + EncodeResource + Clone + PartialEq + std::fmt::Debug),+
        {
        }

        $(impl_lookup!($name $generics $variant $index);)+
    };
}

define_poly!(
    /// A sum type with one variant.
    Poly1 [A] { A => V0 }
);
define_poly!(
    /// A sum type with two variants.
    Poly2 [A, B] { A => V0, B => V1 }
);
define_poly!(
    /// A sum type with three variants.
    Poly3 [A, B, C] { A => V0, B => V1, C => V2 }
);
define_poly!(
    /// A sum type with four variants.
    Poly4 [A, B, C, D] { A => V0, B => V1, C => V2, D => V3 }
);
define_poly!(
    /// A sum type with five variants.
    Poly5 [A, B, C, D, E] { A => V0, B => V1, C => V2, D => V3, E => V4 }
);
define_poly!(
    /// A sum type with six variants.
    Poly6 [A, B, C, D, E, F] { A => V0, B => V1, C => V2, D => V3, E => V4, F => V5 }
);
define_poly!(
    /// A sum type with seven variants.
    Poly7 [A, B, C, D, E, F, G] { A => V0, B => V1, C => V2, D => V3, E => V4, F => V5, G => V6 }
);
define_poly!(
    /// A sum type with eight variants.
    Poly8 [A, B, C, D, E, F, G, H] {
        A => V0, B => V1, C => V2, D => V3, E => V4, F => V5, G => V6, H => V7
    }
);
define_poly!(
    /// A sum type with nine variants.
    Poly9 [A, B, C, D, E, F, G, H, I] {
        A => V0, B => V1, C => V2, D => V3, E => V4, F => V5, G => V6, H => V7, I => V8
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::error::{DecodingCause, Location, ResourceObjectDecodingError};
    use crate::fields::{AttributeSet, FieldDecoder, FieldEncoder, NoAttributes, NoRelationships};
    use crate::resource::{ResourceObject, ResourceObjectDescription};
    use serde_json::json;

    struct CatDescription;

    impl ResourceObjectDescription for CatDescription {
        const JSONAPI_TYPE: &'static str = "cats";
        type Attributes = NoAttributes;
        type Relationships = NoRelationships;
    }

    struct NamedCatDescription;

    #[derive(Debug, Clone, PartialEq)]
    struct NamedAttributes {
        name: Attribute<String>,
    }

    impl AttributeSet for NamedAttributes {
        fn decode(fields: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError> {
            Ok(Self {
                name: fields.required("name")?,
            })
        }

        fn encode(&self, fields: &mut FieldEncoder<'_>) -> Result<(), EncodingError> {
            fields.put("name", &self.name)
        }
    }

    impl ResourceObjectDescription for NamedCatDescription {
        const JSONAPI_TYPE: &'static str = "cats";
        type Attributes = NamedAttributes;
        type Relationships = NoRelationships;
    }

    struct DogDescription;

    impl ResourceObjectDescription for DogDescription {
        const JSONAPI_TYPE: &'static str = "dogs";
        type Attributes = NoAttributes;
        type Relationships = NoRelationships;
    }

    type Cat = ResourceObject<CatDescription>;
    type NamedCat = ResourceObject<NamedCatDescription>;
    type Dog = ResourceObject<DogDescription>;

    #[test]
    fn first_matching_variant_wins() {
        let value = json!({ "type": "cats", "id": "1", "attributes": { "name": "Tom" } });

        let poly = Poly2::<Cat, NamedCat>::decode_poly(&value).unwrap();
        assert!(matches!(poly, Poly2::A(_)));

        let poly = Poly2::<NamedCat, Cat>::decode_poly(&value).unwrap();
        assert!(matches!(poly, Poly2::A(_)));
        assert_eq!(poly.jsonapi_type(), "cats");
    }

    #[test]
    fn later_variant_used_when_earlier_fails() {
        let value = json!({ "type": "dogs", "id": "2" });
        let poly = Poly2::<Cat, Dog>::decode_poly(&value).unwrap();
        let dog: &Dog = poly.lookup().unwrap();
        assert_eq!(dog.id.raw(), "2");
        assert!(Lookup::<Cat, _>::lookup(&poly).is_none());
    }

    #[test]
    fn all_failures_are_aggregated() {
        let value = json!({ "type": "birds", "id": "3" });
        let err = Poly2::<Cat, Dog>::decode_poly(&value).unwrap_err();
        assert_eq!(err.found_type.as_deref(), Some("birds"));
        assert_eq!(err.failures.len(), 2);
        assert_eq!(
            err.to_string(),
            "found JSON:API type \"birds\" but expected one of \"cats\", \"dogs\""
        );
    }

    #[test]
    fn non_type_failures_are_reported_per_variant() {
        let value = json!({ "type": "cats", "id": "4", "attributes": {} });
        let err = Poly2::<NamedCat, Dog>::decode_poly(&value).unwrap_err();
        let (name, failure) = &err.failures[0];
        assert_eq!(*name, "cats");
        assert_eq!(failure.location, Location::Attributes);
        assert_eq!(failure.cause, DecodingCause::KeyNotFound);
        assert!(err.to_string().starts_with("could not have been resource type \"cats\""));
    }

    #[test]
    fn encodes_active_variant() {
        let poly: Poly3<Cat, Dog, NamedCat> =
            Poly3::B(Dog::decode(&json!({ "type": "dogs", "id": "5" })).unwrap());
        assert_eq!(
            poly.encode_resource(None).unwrap(),
            json!({ "type": "dogs", "id": "5" })
        );
        assert_eq!(
            poly.resource_identifier(),
            Some(ResourceIdentifier::new("dogs", "5"))
        );
        let dog: Option<Dog> = poly.into_lookup();
        assert!(dog.is_some());
    }

    #[test]
    fn zero_variant_never_decodes_or_encodes() {
        let err = Poly0::decode_resource(&json!({ "type": "cats", "id": "1" })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no resource types are possible in this position"
        );
        assert!(matches!(
            Poly0.encode_resource(None),
            Err(EncodingError::ZeroVariant)
        ));
    }
}
