//! Document envelope tests: compound documents, error bodies and merging.

use jsonapi_codec::{
    ApiDescription, Attribute, AttributeSet, BasicJsonApiError, DataBody, DecodingCause,
    DecodingOptions, Document, DocumentDecodingError, DocumentSection, EncodingError, ErrorBody,
    FieldDecoder, FieldEncoder, Fieldsets, Includes, ManyResourceBody, NoAttributes, NoIncludes,
    NoLinks, NoMetadata, NoRelationships, NoResourceBody, Poly2, RelationshipSet,
    ResourceDecodingError, ResourceObject, ResourceObjectDecodingError, ResourceObjectDescription,
    Section, SingleResourceBody, ToManyRelationship, ToOneRelationship,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

struct PersonDescription;

#[derive(Debug, Clone, PartialEq)]
struct PersonAttributes {
    name: Attribute<String>,
}

impl AttributeSet for PersonAttributes {
    fn decode(fields: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError> {
        Ok(Self {
            name: fields.required("name")?,
        })
    }

    fn encode(&self, fields: &mut FieldEncoder<'_>) -> Result<(), EncodingError> {
        fields.put("name", &self.name)
    }
}

impl ResourceObjectDescription for PersonDescription {
    const JSONAPI_TYPE: &'static str = "people";
    type Attributes = PersonAttributes;
    type Relationships = NoRelationships;
}

/// A second schema for `people` that ignores attributes.
struct PersonRefDescription;

impl ResourceObjectDescription for PersonRefDescription {
    const JSONAPI_TYPE: &'static str = "people";
    type Attributes = NoAttributes;
    type Relationships = NoRelationships;
}

struct CommentDescription;

#[derive(Debug, Clone, PartialEq)]
struct CommentAttributes {
    body: Attribute<String>,
}

impl AttributeSet for CommentAttributes {
    fn decode(fields: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError> {
        Ok(Self {
            body: fields.required("body")?,
        })
    }

    fn encode(&self, fields: &mut FieldEncoder<'_>) -> Result<(), EncodingError> {
        fields.put("body", &self.body)
    }
}

impl ResourceObjectDescription for CommentDescription {
    const JSONAPI_TYPE: &'static str = "comments";
    type Attributes = CommentAttributes;
    type Relationships = NoRelationships;
}

struct ArticleDescription;

#[derive(Debug, Clone, PartialEq)]
struct ArticleAttributes {
    title: Attribute<String>,
    body: Attribute<String>,
}

impl AttributeSet for ArticleAttributes {
    fn decode(fields: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError> {
        Ok(Self {
            title: fields.required("title")?,
            body: fields.required("body")?,
        })
    }

    fn encode(&self, fields: &mut FieldEncoder<'_>) -> Result<(), EncodingError> {
        fields.put("title", &self.title)?;
        fields.put("body", &self.body)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ArticleRelationships {
    author: ToOneRelationship<PersonDescription>,
    comments: ToManyRelationship<CommentDescription>,
}

impl RelationshipSet for ArticleRelationships {
    fn decode(fields: &FieldDecoder<'_>) -> Result<Self, ResourceObjectDecodingError> {
        Ok(Self {
            author: fields.required("author")?,
            comments: fields.required("comments")?,
        })
    }

    fn encode(&self, fields: &mut FieldEncoder<'_>) -> Result<(), EncodingError> {
        fields.put("author", &self.author)?;
        fields.put("comments", &self.comments)
    }
}

impl ResourceObjectDescription for ArticleDescription {
    const JSONAPI_TYPE: &'static str = "articles";
    type Attributes = ArticleAttributes;
    type Relationships = ArticleRelationships;
}

type Person = ResourceObject<PersonDescription>;
type PersonRef = ResourceObject<PersonRefDescription>;
type Comment = ResourceObject<CommentDescription>;
type Article = ResourceObject<ArticleDescription>;

type Related = Poly2<Person, Comment>;
type ArticleList = Document<ManyResourceBody<Article>, Related>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Page {
    total: u32,
}

impl Section for Page {}

fn person(id: &str, name: &str) -> Person {
    Person::new(
        id.into(),
        PersonAttributes {
            name: Attribute::new(name.to_string()),
        },
        NoRelationships,
        NoMetadata,
        NoLinks,
    )
}

fn article(id: &str, author: &Person, comments: &[&str]) -> Article {
    Article::new(
        id.into(),
        ArticleAttributes {
            title: Attribute::new(format!("Article {id}")),
            body: Attribute::new("Lorem ipsum".to_string()),
        },
        ArticleRelationships {
            author: author.pointer(),
            comments: ToManyRelationship::new(comments.iter().copied()),
        },
        NoMetadata,
        NoLinks,
    )
}

fn compound_wire() -> Value {
    json!({
        "data": [
            {
                "type": "articles",
                "id": "1",
                "attributes": { "title": "Article 1", "body": "Lorem ipsum" },
                "relationships": {
                    "author": { "data": { "id": "9", "type": "people" } },
                    "comments": { "data": [ { "id": "5", "type": "comments" } ] }
                }
            },
            {
                "type": "articles",
                "id": "2",
                "attributes": { "title": "Article 2", "body": "Lorem ipsum" },
                "relationships": {
                    "author": { "data": { "id": "9", "type": "people" } },
                    "comments": { "data": [] }
                }
            }
        ],
        "included": [
            { "type": "people", "id": "9", "attributes": { "name": "Dan" } },
            { "type": "comments", "id": "5", "attributes": { "body": "First!" } }
        ]
    })
}

mod compound_documents {
    use super::*;

    #[test]
    fn decodes_primary_and_includes() {
        let document = ArticleList::decode(&compound_wire()).unwrap();

        let primary = document.primary().unwrap();
        assert_eq!(primary.values.len(), 2);
        assert_eq!(primary.values[1].relationships.author.id().raw(), "9");

        let includes = document.includes().unwrap();
        assert_eq!(includes.len(), 2);
        let people = includes.get::<Person, _>();
        assert_eq!(people, vec![&person("9", "Dan")]);
        let comments = includes.get::<Comment, _>();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].attributes.body.value(), "First!");
    }

    #[test]
    fn encodes_back_to_the_same_wire() {
        let document = ArticleList::decode(&compound_wire()).unwrap();
        assert_eq!(document.encode().unwrap(), compound_wire());
    }

    #[test]
    fn built_documents_encode_members_in_order() {
        let dan = person("9", "Dan");
        let document = Document::<ManyResourceBody<Article>, Related, Page>::from_data(DataBody::new(
            vec![article("1", &dan, &[])].into(),
            Includes::new(vec![Poly2::A(dan)]),
            Page { total: 1 },
            NoLinks,
        ));

        let encoded = document.encode().unwrap();
        let keys: Vec<_> = encoded.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["data", "included", "meta"]);
        assert_eq!(encoded["meta"], json!({ "total": 1 }));
    }

    #[test]
    fn include_failures_name_the_element_and_candidates() {
        let mut wire = compound_wire();
        wire["included"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "type": "cars", "id": "1" }));

        let err = ArticleList::decode(&wire).unwrap_err();
        let DocumentDecodingError::Include {
            index,
            count,
            source: ResourceDecodingError::Poly(poly),
        } = &err
        else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!((*index, *count), (2, 3));
        assert_eq!(poly.found_type.as_deref(), Some("cars"));
        assert_eq!(
            err.to_string(),
            "Out of the 3 includes in the document, the 3rd one failed to parse: \
             found JSON:API type \"cars\" but expected one of \"people\", \"comments\""
        );
    }

    #[test]
    fn include_failures_explain_the_matching_variant() {
        let mut wire = compound_wire();
        wire["included"][0] = json!({ "type": "people", "id": "9", "attributes": {} });

        let err = ArticleList::decode(&wire).unwrap_err();
        assert!(err.to_string().contains(
            "could not have been resource type \"people\" because:\n'name' attribute is required and missing"
        ));
    }

    #[test]
    fn includes_are_ignored_without_an_include_type() {
        let document =
            Document::<ManyResourceBody<Article>, NoIncludes>::decode(&compound_wire()).unwrap();
        assert!(document.includes().unwrap().is_empty());
        assert!(document.encode().unwrap().get("included").is_none());
    }

    #[test]
    fn api_description_version_defaults() {
        type Described = Document<
            ManyResourceBody<Article>,
            NoIncludes,
            NoMetadata,
            NoLinks,
            BasicJsonApiError,
            ApiDescription,
        >;

        let document = Described::decode(&json!({ "data": [], "jsonapi": {} })).unwrap();
        assert_eq!(document.api_description().version, "1.0");
        assert_eq!(
            document.encode().unwrap(),
            json!({ "data": [], "jsonapi": { "version": "1.0" } })
        );

        let err = Described::decode(&json!({ "data": [] })).unwrap_err();
        assert_eq!(
            err,
            DocumentDecodingError::Section {
                section: DocumentSection::ApiDescription,
                cause: DecodingCause::KeyNotFound,
            }
        );
    }
}

mod error_documents {
    use super::*;

    fn not_found() -> Value {
        json!({
            "errors": [
                { "status": "404", "title": "Not Found", "source": { "pointer": "/data/id" } }
            ]
        })
    }

    #[test]
    fn error_document_exposes_no_data() {
        let document = ArticleList::decode(&not_found()).unwrap();

        assert!(document.is_error());
        assert!(document.data().is_none());
        assert!(document.primary().is_none());
        assert!(document.includes().is_none());

        let errors = document.errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status.as_deref(), Some("404"));
        assert_eq!(errors[0].to_string(), "[404] Not Found (at /data/id)");
        assert_eq!(document.encode().unwrap(), not_found());
    }

    #[test]
    fn data_document_exposes_no_errors() {
        let document = ArticleList::decode(&compound_wire()).unwrap();
        assert!(!document.is_error());
        assert!(document.errors().is_none());
        assert!(document.error_body().is_none());
    }

    #[test]
    fn errors_win_over_data_by_default() {
        let mut wire = compound_wire();
        wire["errors"] = not_found()["errors"].clone();

        let document = ArticleList::decode(&wire).unwrap();
        assert!(document.is_error());
        assert!(document.primary().is_none());
    }

    #[test]
    fn strict_mode_rejects_errors_with_data() {
        let mut wire = compound_wire();
        wire["errors"] = not_found()["errors"].clone();

        let err = ArticleList::decode_with(&wire, &DecodingOptions::new().strict(true)).unwrap_err();
        assert_eq!(err, DocumentDecodingError::Ambiguous);
    }

    #[test]
    fn null_errors_member_is_not_an_error_document() {
        let mut wire = compound_wire();
        wire["errors"] = Value::Null;

        let document = ArticleList::decode(&wire).unwrap();
        assert!(!document.is_error());
    }

    #[test]
    fn built_error_documents() {
        let document = ArticleList::from_errors(ErrorBody::new(vec![
            BasicJsonApiError::new("422", "Invalid Attribute")
                .with_detail("title is too short")
                .with_pointer("/data/attributes/title"),
        ]));
        assert_eq!(
            document.encode().unwrap(),
            json!({
                "errors": [{
                    "status": "422",
                    "title": "Invalid Attribute",
                    "detail": "title is too short",
                    "source": { "pointer": "/data/attributes/title" }
                }]
            })
        );
        assert_eq!(ArticleList::decode(&document.encode().unwrap()).unwrap(), document);
    }

    #[test]
    fn built_error_documents_round_trip_by_value() {
        let document = Document::<NoResourceBody>::from_errors(ErrorBody::new(vec![
            BasicJsonApiError::new("404", "Not Found"),
        ]));
        let decoded = Document::<NoResourceBody>::decode(&document.encode().unwrap()).unwrap();
        assert_eq!(decoded, document);
        assert_eq!(decoded.error_body().unwrap().meta, None);
        assert_eq!(decoded.error_body().unwrap().links, None);
    }

    #[test]
    fn optional_error_meta_survives_only_when_sent() {
        type Untyped = Document<NoResourceBody, NoIncludes, Map<String, Value>>;

        let bare = Untyped::from_errors(ErrorBody::new(vec![BasicJsonApiError::default()]));
        assert_eq!(Untyped::decode(&bare.encode().unwrap()).unwrap(), bare);

        let mut meta = Map::new();
        meta.insert("request".to_string(), json!("abc"));
        let with_meta =
            Untyped::from_errors(ErrorBody::new(vec![BasicJsonApiError::default()]).with_meta(meta));
        let decoded = Untyped::decode(&with_meta.encode().unwrap()).unwrap();
        assert_eq!(decoded, with_meta);
        assert_eq!(decoded.meta().unwrap()["request"], json!("abc"));
    }
}

mod null_data {
    use super::*;

    #[test]
    fn nullable_primary_accepts_null() {
        let document =
            Document::<SingleResourceBody<Option<Article>>>::decode(&json!({ "data": null })).unwrap();
        assert_eq!(document.primary().unwrap().value, None);
        assert_eq!(document.encode().unwrap(), json!({ "data": null }));
    }

    #[test]
    fn non_nullable_primary_rejects_null() {
        let err = Document::<SingleResourceBody<Article>>::decode(&json!({ "data": null })).unwrap_err();
        assert_eq!(
            err,
            DocumentDecodingError::Section {
                section: DocumentSection::Data,
                cause: DecodingCause::ValueNotFound,
            }
        );
    }
}

mod merging {
    use super::*;

    type PagedList = DataBody<ManyResourceBody<Article>, Related, Page>;

    fn page(article_id: &str, comment_id: &str, total: u32) -> PagedList {
        let dan = person("9", "Dan");
        let comment = Comment::decode(&json!({
            "type": "comments",
            "id": comment_id,
            "attributes": { "body": "Nice" }
        }))
        .unwrap();
        DataBody::new(
            vec![article(article_id, &dan, &[comment_id])].into(),
            Includes::new(vec![Poly2::A(dan), Poly2::B(comment)]),
            Page { total },
            NoLinks,
        )
    }

    #[test]
    fn shared_includes_are_deduplicated() {
        let merged = page("1", "5", 1).merging(page("2", "6", 1));

        assert_eq!(merged.primary.values.len(), 2);
        assert_eq!(merged.includes.len(), 3);
        assert_eq!(merged.includes.get::<Person, _>().len(), 1);
        assert_eq!(merged.includes.get::<Comment, _>().len(), 2);
        // meta comes from the receiver
        assert_eq!(merged.meta, Page { total: 1 });
    }

    #[test]
    fn merging_with_combines_meta() {
        let merged = page("1", "5", 2).merging_with(
            page("2", "5", 3),
            |a, b| Page {
                total: a.total + b.total,
            },
            |links, _| links,
        );

        assert_eq!(merged.meta, Page { total: 5 });
        assert_eq!(merged.includes.len(), 2);
    }
}

mod polymorphic_primary {
    use super::*;

    fn dan_wire() -> Value {
        json!({ "data": { "type": "people", "id": "9", "attributes": { "name": "Dan" } } })
    }

    #[test]
    fn first_matching_variant_wins() {
        let document =
            Document::<SingleResourceBody<Poly2<Person, PersonRef>>>::decode(&dan_wire()).unwrap();
        assert!(matches!(document.primary().unwrap().value, Poly2::A(_)));

        let document =
            Document::<SingleResourceBody<Poly2<PersonRef, Person>>>::decode(&dan_wire()).unwrap();
        assert!(matches!(document.primary().unwrap().value, Poly2::A(_)));
    }

    #[test]
    fn later_variant_used_when_earlier_fails() {
        let wire = json!({ "data": { "type": "people", "id": "9" } });
        let document =
            Document::<SingleResourceBody<Poly2<Person, PersonRef>>>::decode(&wire).unwrap();
        assert!(matches!(document.primary().unwrap().value, Poly2::B(_)));
    }

    #[test]
    fn encodes_the_active_variant() {
        let document =
            Document::<SingleResourceBody<Poly2<Person, Comment>>>::decode(&dan_wire()).unwrap();
        assert_eq!(document.encode().unwrap(), dan_wire());
    }
}

mod sparse_documents {
    use super::*;

    #[test]
    fn fieldsets_apply_per_type() {
        let document = ArticleList::decode(&compound_wire()).unwrap();
        let fieldsets = Fieldsets::new().with("articles", ["title"]);

        let encoded = document.encode_sparse(&fieldsets).unwrap();
        for article in encoded["data"].as_array().unwrap() {
            let attributes = article["attributes"].as_object().unwrap();
            assert_eq!(attributes.keys().collect::<Vec<_>>(), vec!["title"]);
            assert!(article["relationships"]["author"].is_object());
        }
        assert_eq!(encoded["included"], compound_wire()["included"]);
    }

    #[test]
    fn fieldsets_reach_included_resources() {
        let document = ArticleList::decode(&compound_wire()).unwrap();
        let fieldsets = Fieldsets::parse("comments=").unwrap();

        let encoded = document.encode_sparse(&fieldsets).unwrap();
        assert_eq!(encoded["included"][1]["attributes"], json!({}));
        assert_eq!(encoded["included"][0]["attributes"], json!({ "name": "Dan" }));
        assert_eq!(encoded["data"], compound_wire()["data"]);
    }
}
