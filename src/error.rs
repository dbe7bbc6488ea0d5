//! Error types for JSON:API encoding, decoding and document validation.

use std::fmt;
use std::path::PathBuf;

use serde_json::error::Category;
use serde_json::Value;
use thiserror::Error;

/// Subject name used when a whole section (rather than one field) is missing.
pub const ENTIRE_OBJECT: &str = "entire object";

/// Where inside a resource object a decoding failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Type,
    Id,
    Attributes,
    Relationships,
    Meta,
    Links,
}

impl Location {
    /// The wire member name of the section.
    pub fn section_name(&self) -> &'static str {
        match self {
            Location::Type => "type",
            Location::Id => "id",
            Location::Attributes => "attributes",
            Location::Relationships => "relationships",
            Location::Meta => "meta",
            Location::Links => "links",
        }
    }

    fn field_noun(&self) -> &'static str {
        match self {
            Location::Attributes => "attribute",
            Location::Relationships => "relationship",
            Location::Meta | Location::Links => "section",
            Location::Type | Location::Id => "member",
        }
    }
}

/// Expected cardinality of a relationship linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    One,
    Many,
}

/// A transform or validation function rejected a raw attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransformError {
    message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The reason a single field, section or type token failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodingCause {
    /// A required member was missing.
    KeyNotFound,
    /// `null` was found where the schema does not allow it.
    ValueNotFound,
    /// The value had the wrong structural or primitive kind.
    TypeMismatch { expected: String },
    /// A resource or linkage carried the wrong JSON:API type token.
    JsonTypeMismatch { expected: String, found: String },
    /// A to-one linkage held an array or a to-many linkage held a single value.
    QuantityMismatch { expected: Quantity },
    /// The attribute transformer rejected the raw value.
    TransformFailure(TransformError),
}

impl DecodingCause {
    /// Classify a serde failure to read `value` into some typed shape.
    pub(crate) fn from_serde(value: &Value, err: &serde_json::Error) -> Self {
        if value.is_null() {
            return DecodingCause::ValueNotFound;
        }
        let message = err.to_string();
        if err.classify() == Category::Data && message.starts_with("missing field ") {
            return DecodingCause::KeyNotFound;
        }
        let expected = match message.rsplit_once(", expected ") {
            Some((_, expected)) => expected.to_string(),
            None => message,
        };
        DecodingCause::TypeMismatch { expected }
    }

    pub(crate) fn type_mismatch(expected: impl Into<String>) -> Self {
        DecodingCause::TypeMismatch {
            expected: expected.into(),
        }
    }
}

/// Failure to decode one resource object, located by section and subject name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe_resource_error(subject_name, *location, cause))]
pub struct ResourceObjectDecodingError {
    /// Field name, member name, or [`ENTIRE_OBJECT`].
    pub subject_name: String,
    pub location: Location,
    pub cause: DecodingCause,
}

impl ResourceObjectDecodingError {
    pub fn new(subject_name: impl Into<String>, location: Location, cause: DecodingCause) -> Self {
        Self {
            subject_name: subject_name.into(),
            location,
            cause,
        }
    }

    /// True when the failure is a mismatched `type` token on the resource itself.
    pub fn is_type_mismatch(&self) -> bool {
        self.location == Location::Type
            && matches!(self.cause, DecodingCause::JsonTypeMismatch { .. })
    }
}

fn describe_resource_error(subject: &str, location: Location, cause: &DecodingCause) -> String {
    let noun = location.field_noun();
    match cause {
        DecodingCause::KeyNotFound if subject == ENTIRE_OBJECT => format!(
            "'{}' object is required and missing",
            location.section_name()
        ),
        DecodingCause::KeyNotFound => format!("'{subject}' {noun} is required and missing"),
        DecodingCause::ValueNotFound => {
            format!("'{subject}' {noun} is not nullable but null was found")
        }
        DecodingCause::TypeMismatch { expected } => {
            format!("'{subject}' {noun} is not the expected kind: expected {expected}")
        }
        DecodingCause::JsonTypeMismatch { expected, found } if location == Location::Type => {
            format!("found JSON:API type \"{found}\" but expected \"{expected}\"")
        }
        DecodingCause::JsonTypeMismatch { expected, found } => format!(
            "'{subject}' {noun} does not have the correct type: expected \"{expected}\" but found \"{found}\""
        ),
        DecodingCause::QuantityMismatch {
            expected: Quantity::One,
        } => format!("'{subject}' {noun} should contain one value but found many"),
        DecodingCause::QuantityMismatch {
            expected: Quantity::Many,
        } => format!("'{subject}' {noun} should contain many values but found one"),
        DecodingCause::TransformFailure(err) => {
            format!("'{subject}' {noun} failed to transform: {err}")
        }
    }
}

/// Every variant of a sum type rejected the same wire value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe_poly_error(found_type.as_deref(), failures))]
pub struct PolyDecodingError {
    /// The `type` token found on the wire, when there was a string one.
    pub found_type: Option<String>,
    /// One entry per variant, in declared order: the variant's JSON:API type and its failure.
    pub failures: Vec<(&'static str, ResourceObjectDecodingError)>,
}

fn describe_poly_error(
    found_type: Option<&str>,
    failures: &[(&'static str, ResourceObjectDecodingError)],
) -> String {
    if failures.is_empty() {
        return "no resource types are possible in this position".to_string();
    }
    if failures.iter().all(|(_, err)| err.is_type_mismatch()) {
        let expected = failures
            .iter()
            .map(|(name, _)| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let found = found_type.unwrap_or("<none>");
        return format!("found JSON:API type \"{found}\" but expected one of {expected}");
    }
    failures
        .iter()
        .filter(|(_, err)| !err.is_type_mismatch())
        .map(|(name, err)| format!("could not have been resource type \"{name}\" because:\n{err}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Failure to decode a value in a resource position (primary or included).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceDecodingError {
    #[error(transparent)]
    Object(#[from] ResourceObjectDecodingError),

    #[error(transparent)]
    Poly(#[from] PolyDecodingError),
}

/// Top-level document members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentSection {
    Data,
    Included,
    Errors,
    Meta,
    Links,
    ApiDescription,
}

impl DocumentSection {
    pub fn member_name(&self) -> &'static str {
        match self {
            DocumentSection::Data => "data",
            DocumentSection::Included => "included",
            DocumentSection::Errors => "errors",
            DocumentSection::Meta => "meta",
            DocumentSection::Links => "links",
            DocumentSection::ApiDescription => "jsonapi",
        }
    }
}

impl fmt::Display for DocumentSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.member_name())
    }
}

fn describe_section(section: &DocumentSection, cause: &DecodingCause) -> String {
    match cause {
        DecodingCause::KeyNotFound => format!("document is missing required '{section}' member"),
        DecodingCause::ValueNotFound => {
            format!("'{section}' is not nullable but null was found")
        }
        DecodingCause::TypeMismatch { expected } => {
            format!("'{section}' is not the expected kind: expected {expected}")
        }
        DecodingCause::QuantityMismatch {
            expected: Quantity::One,
        } => format!("'{section}' should contain one resource but found many"),
        DecodingCause::QuantityMismatch {
            expected: Quantity::Many,
        } => format!("'{section}' should contain many resources but found one"),
        DecodingCause::JsonTypeMismatch { expected, found } => {
            format!("'{section}' has type \"{found}\" but expected \"{expected}\"")
        }
        DecodingCause::TransformFailure(err) => format!("'{section}' failed to transform: {err}"),
    }
}

fn describe_primary(index: &Option<usize>, count: &usize, source: &ResourceDecodingError) -> String {
    match index {
        None => format!("primary resource failed to parse: {source}"),
        Some(index) => format!(
            "Out of the {count} primary resources in the document, the {} one failed to parse: {source}",
            ordinal(index + 1)
        ),
    }
}

/// Failure to decode a whole document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentDecodingError {
    #[error("a document must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("{}", describe_section(section, cause))]
    Section {
        section: DocumentSection,
        cause: DecodingCause,
    },

    /// `index` is zero-based and `None` for single-resource bodies.
    #[error("{}", describe_primary(index, count, source))]
    PrimaryResource {
        index: Option<usize>,
        count: usize,
        source: ResourceDecodingError,
    },

    /// `index` is zero-based.
    #[error(
        "Out of the {count} includes in the document, the {} one failed to parse: {source}",
        ordinal(index + 1)
    )]
    Include {
        index: usize,
        count: usize,
        source: ResourceDecodingError,
    },

    /// `index` is zero-based.
    #[error("the {} error object failed to parse: {message}", ordinal(index + 1))]
    ErrorObject { index: usize, message: String },

    #[error("document contains both 'errors' and 'data'")]
    Ambiguous,
}

/// Failure to encode a resource or document.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("cannot encode a resource in a position where no resource types are possible")]
    ZeroVariant,

    #[error("'{section}' is required by the schema but was not provided")]
    MissingSection { section: &'static str },

    #[error("failed to serialize {subject}: {source}")]
    Serialization {
        subject: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EncodingError {
    pub(crate) fn serialization(subject: impl Into<String>, source: serde_json::Error) -> Self {
        EncodingError::Serialization {
            subject: subject.into(),
            source,
        }
    }
}

/// Errors while loading a document from disk or text.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Errors during document validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid envelope schema: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },

    #[error(transparent)]
    Decode(#[from] DocumentDecodingError),
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Load(e) => e.exit_code(),
            ValidateError::InvalidSchema { .. } => 2,
            ValidateError::Invalid { .. } | ValidateError::Decode(_) => 1,
        }
    }
}

/// Single validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid member.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// English ordinal for a 1-based position ("1st", "2nd", "13th").
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
