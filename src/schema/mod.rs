//! Schema Grammar
//!
//! Typed model of CIP-57 schema nodes. Two discriminant families coexist:
//!
//! - **Data namespace** (`dataType` without prefix): `integer`, `bytes`,
//!   `list`, `map`, `constructor`, plus constructor sums (`anyOf` of inline
//!   constructors).
//! - **Schema namespace** (`#`-prefixed): `#integer`, `#bytes`, `#string`,
//!   `#unit`, `#boolean`, `#list`, `#pair`. Schema positions may embed any
//!   Data node.
//!
//! Combinators (`allOf`, `anyOf`, `oneOf`, `not`) are legal everywhere.
//! Every node keeps the keys it does not understand in `extras`.

pub mod parse;
pub mod resolve;

pub use parse::{parse_schema, validate_schema, Namespace, NodeParser};
pub use resolve::{decode_reference, resolve, resolve_deep, DEFINITIONS_PREFIX};

use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::diagnostics::ErrorPath;

// =============================================================================
// Schema Node
// =============================================================================

/// One node of the schema tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: NodeKind,
    /// Unrecognized keys, preserved verbatim
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

/// Exactly one shape per node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// `$ref` into the document's definitions
    Reference(String),
    /// No discriminant: any well-formed Data value
    Opaque,
    Data(DataType),
    Schema(SchemaType),
    /// `anyOf` made only of inline constructors
    Sum(Vec<Alternative>),
    Composition(Composition),
}

impl SchemaNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            title: None,
            description: None,
            kind,
            extras: BTreeMap::new(),
        }
    }

    pub fn opaque() -> Self {
        Self::new(NodeKind::Opaque)
    }

    /// Reference to a definition key (encoded with `~1` for `/`)
    pub fn reference_to(key: &str) -> Self {
        Self::new(NodeKind::Reference(format!(
            "{}{}",
            DEFINITIONS_PREFIX,
            resolve::encode_key(key)
        )))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn reference(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.kind, NodeKind::Opaque)
    }

    /// Constructor alternatives when the node is a single constructor or a sum
    pub fn constructors(&self) -> Option<Vec<ConstructorView<'_>>> {
        match &self.kind {
            NodeKind::Data(DataType::Constructor(c)) => Some(vec![ConstructorView {
                title: self.title.as_deref(),
                constructor: c,
            }]),
            NodeKind::Sum(alternatives) => Some(
                alternatives
                    .iter()
                    .map(|a| ConstructorView {
                        title: a.title.as_deref(),
                        constructor: &a.constructor,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Every `$ref` in the tree, with the path of the `$ref` key relative
    /// to `path`
    pub fn references(&self, path: &ErrorPath) -> Vec<(ErrorPath, &str)> {
        let mut found = Vec::new();
        self.collect_references(path, &mut found);
        found
    }

    fn collect_references<'a>(&'a self, path: &ErrorPath, found: &mut Vec<(ErrorPath, &'a str)>) {
        fn each<'a>(
            nodes: &'a [SchemaNode],
            path: &ErrorPath,
            found: &mut Vec<(ErrorPath, &'a str)>,
        ) {
            for (i, node) in nodes.iter().enumerate() {
                node.collect_references(&path.join(i), found);
            }
        }

        match &self.kind {
            NodeKind::Reference(r) => found.push((path.join("$ref"), r.as_str())),
            NodeKind::Data(DataType::List(shape)) | NodeKind::Schema(SchemaType::List(shape)) => {
                match &shape.items {
                    ListItems::Single(item) => item.collect_references(&path.join("items"), found),
                    ListItems::Tuple(items) | ListItems::Alternatives(items) => {
                        each(items, &path.join("items"), found)
                    }
                }
            }
            NodeKind::Data(DataType::Map(map)) => {
                map.keys.collect_references(&path.join("keys"), found);
                map.values.collect_references(&path.join("values"), found);
            }
            NodeKind::Data(DataType::Constructor(c)) => each(&c.fields, &path.join("fields"), found),
            NodeKind::Schema(SchemaType::Pair(pair)) => {
                pair.left.collect_references(&path.join("left"), found);
                pair.right.collect_references(&path.join("right"), found);
            }
            NodeKind::Sum(alternatives) => {
                let any_of = path.join("anyOf");
                for (i, alternative) in alternatives.iter().enumerate() {
                    each(&alternative.constructor.fields, &any_of.join(i).join("fields"), found);
                }
            }
            NodeKind::Composition(composition) => match composition {
                Composition::Not(child) => child.collect_references(&path.join("not"), found),
                Composition::AllOf(children)
                | Composition::AnyOf(children)
                | Composition::OneOf(children) => each(children, &path.join(composition.keyword()), found),
            },
            NodeKind::Opaque
            | NodeKind::Data(DataType::Integer(_) | DataType::Bytes(_))
            | NodeKind::Schema(
                SchemaType::Integer(_)
                | SchemaType::Bytes(_)
                | SchemaType::String
                | SchemaType::Unit
                | SchemaType::Boolean,
            ) => {}
        }
    }

    /// Short label used in messages (`bytes`, `#pair`, `$ref ...`)
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Reference(r) => format!("$ref {}", r),
            NodeKind::Opaque => "opaque data".to_string(),
            NodeKind::Data(d) => d.tag().to_string(),
            NodeKind::Schema(s) => s.tag().to_string(),
            NodeKind::Sum(_) => "constructor sum".to_string(),
            NodeKind::Composition(c) => c.keyword().to_string(),
        }
    }
}

// =============================================================================
// Data Namespace
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Integer(IntegerRules),
    Bytes(BytesRules),
    List(ListShape),
    Map(MapShape),
    Constructor(Constructor),
}

impl DataType {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Constructor(_) => "constructor",
        }
    }
}

/// Numeric keywords, kept as the document wrote them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntegerRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Number>,
}

impl IntegerRules {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Byte-string keywords; lengths count bytes, not hex digits
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BytesRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Allowed values (`enum`), lowercase hex
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListShape {
    pub items: ListItems,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    pub unique_items: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListItems {
    /// Every element has this schema
    Single(Box<SchemaNode>),
    /// Fixed length, one schema per position (`list` with an array of items)
    Tuple(Vec<SchemaNode>),
    /// Every element matches one of these (`#list` with an array of items)
    Alternatives(Vec<SchemaNode>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapShape {
    pub keys: Box<SchemaNode>,
    pub values: Box<SchemaNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constructor {
    pub index: u64,
    pub fields: Vec<SchemaNode>,
}

/// One alternative of a constructor sum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub constructor: Constructor,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

/// Borrowed view over a constructor and its title
#[derive(Debug, Clone, Copy)]
pub struct ConstructorView<'a> {
    pub title: Option<&'a str>,
    pub constructor: &'a Constructor,
}

// =============================================================================
// Schema Namespace
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    Integer(IntegerRules),
    Bytes(BytesRules),
    String,
    Unit,
    Boolean,
    List(ListShape),
    Pair(PairShape),
}

impl SchemaType {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Integer(_) => "#integer",
            Self::Bytes(_) => "#bytes",
            Self::String => "#string",
            Self::Unit => "#unit",
            Self::Boolean => "#boolean",
            Self::List(_) => "#list",
            Self::Pair(_) => "#pair",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairShape {
    pub left: Box<SchemaNode>,
    pub right: Box<SchemaNode>,
}

// =============================================================================
// Combinators
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    AllOf(Vec<SchemaNode>),
    AnyOf(Vec<SchemaNode>),
    OneOf(Vec<SchemaNode>),
    Not(Box<SchemaNode>),
}

impl Composition {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::AllOf(_) => "allOf",
            Self::AnyOf(_) => "anyOf",
            Self::OneOf(_) => "oneOf",
            Self::Not(_) => "not",
        }
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// Named schema table of a blueprint (`definitions`)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Definitions(BTreeMap<String, SchemaNode>);

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SchemaNode> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, node: SchemaNode) {
        self.0.insert(key.into(), node);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, SchemaNode)> for Definitions {
    fn from_iter<I: IntoIterator<Item = (String, SchemaNode)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{} ({})", title, self.label()),
            None => write!(f, "{}", self.label()),
        }
    }
}
