//! Diagnostics
//!
//! Error codes and breadcrumb paths reported by the structural validator and
//! the equality guards. Every problem is collected, nothing is fail-fast.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Error Codes
// =============================================================================

/// Machine-readable code for a structural problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input text is not JSON
    JsonParse,
    /// Value has the wrong JSON type
    InvalidType,
    /// Required field absent
    MissingField,
    /// Array must not be empty
    EmptyList,
    /// Value outside a closed set
    InvalidEnum,
    /// Not an even-length hexadecimal string
    InvalidHex,
    /// Byte-string has the wrong length
    InvalidLength,
    /// `dataType` is not part of either namespace
    UnknownDataType,
    /// Keyword used with a discriminant that does not own it
    KeywordNotAllowed,
    /// Constructor without both `index` and `fields`
    IncompleteConstructor,
    /// Two alternatives of one sum share an index
    DuplicateIndex,
    /// More than one of `$ref`, `dataType` and a combinator
    AmbiguousNode,
    /// Schema-namespace node in a Data-namespace position
    NamespaceViolation,
    /// `$ref` naming a key absent from `definitions`
    UnresolvedReference,
    /// `$ref` pointing outside the document
    ExternalReference,
    /// Purpose validator without compiled code
    MissingCompiledCode,
    /// Fallback validator with neither compiled code nor hash
    MissingCodeOrHash,
    /// Shared field differs across purposes of one validator
    EqualityGuard,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JsonParse => "JSON_PARSE",
            Self::InvalidType => "INVALID_TYPE",
            Self::MissingField => "MISSING_FIELD",
            Self::EmptyList => "EMPTY_LIST",
            Self::InvalidEnum => "INVALID_ENUM",
            Self::InvalidHex => "INVALID_HEX",
            Self::InvalidLength => "INVALID_LENGTH",
            Self::UnknownDataType => "UNKNOWN_DATA_TYPE",
            Self::KeywordNotAllowed => "KEYWORD_NOT_ALLOWED",
            Self::IncompleteConstructor => "INCOMPLETE_CONSTRUCTOR",
            Self::DuplicateIndex => "DUPLICATE_INDEX",
            Self::AmbiguousNode => "AMBIGUOUS_NODE",
            Self::NamespaceViolation => "NAMESPACE_VIOLATION",
            Self::UnresolvedReference => "UNRESOLVED_REFERENCE",
            Self::ExternalReference => "EXTERNAL_REFERENCE",
            Self::MissingCompiledCode => "MISSING_COMPILED_CODE",
            Self::MissingCodeOrHash => "MISSING_CODE_OR_HASH",
            Self::EqualityGuard => "EQUALITY_GUARD",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Paths
// =============================================================================

/// One step of a breadcrumb
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// Field-by-field breadcrumb into a blueprint document
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ErrorPath(Vec<PathSegment>);

impl ErrorPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// A new path with `segment` appended
    pub fn join(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ErrorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

// =============================================================================
// Structural Error
// =============================================================================

/// A single structural or equality-guard violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralError {
    pub path: ErrorPath,
    pub message: String,
    pub code: ErrorCode,
}

impl StructuralError {
    pub fn new(path: ErrorPath, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            code,
        }
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message)
    }
}

/// Collector used by the validation passes
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<StructuralError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: &ErrorPath, code: ErrorCode, message: impl Into<String>) {
        self.items.push(StructuralError::new(path.clone(), code, message));
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = StructuralError>) {
        self.items.extend(other);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<StructuralError> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = StructuralError;
    type IntoIter = std::vec::IntoIter<StructuralError>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
