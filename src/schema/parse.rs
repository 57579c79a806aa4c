//! Schema Node Parsing
//!
//! Turns raw JSON into [`SchemaNode`]s while checking the grammar. For each
//! node, in order:
//!
//! 1. **Keyword scoping**: constraint keywords belong to one discriminant
//!    family (`minLength` to bytes, `minimum` to integer, ...).
//! 2. **Constructor completeness**: `index` and `fields` always together.
//!
//! Combinators recurse into their children unconditionally. Problems are
//! collected, and a best-effort node is still produced so later passes can
//! keep going.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    Alternative, BytesRules, Composition, Constructor, DataType, IntegerRules, ListItems,
    ListShape, MapShape, NodeKind, PairShape, SchemaNode, SchemaType,
};
use crate::codec;
use crate::diagnostics::{Diagnostics, ErrorCode, ErrorPath, StructuralError};

// =============================================================================
// Keyword Tables
// =============================================================================

const ANNOTATION_KEYWORDS: &[&str] = &["title", "description", "dataType", "$ref"];
const COMBINATOR_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf", "not"];
const INTEGER_KEYWORDS: &[&str] = &[
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
];
const BYTES_KEYWORDS: &[&str] = &["minLength", "maxLength", "enum"];
const LIST_KEYWORDS: &[&str] = &["items", "minItems", "maxItems", "uniqueItems"];
const MAP_KEYWORDS: &[&str] = &["keys", "values"];
const PAIR_KEYWORDS: &[&str] = &["left", "right"];
const CONSTRUCTOR_KEYWORDS: &[&str] = &["index", "fields"];

/// Keyword families scoped to one discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeywordFamily {
    Integer,
    Bytes,
    List,
    Map,
    Pair,
    Constructor,
}

impl KeywordFamily {
    const ALL: [KeywordFamily; 6] = [
        Self::Integer,
        Self::Bytes,
        Self::List,
        Self::Map,
        Self::Pair,
        Self::Constructor,
    ];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Integer => INTEGER_KEYWORDS,
            Self::Bytes => BYTES_KEYWORDS,
            Self::List => LIST_KEYWORDS,
            Self::Map => MAP_KEYWORDS,
            Self::Pair => PAIR_KEYWORDS,
            Self::Constructor => CONSTRUCTOR_KEYWORDS,
        }
    }

    /// Discriminants that own the family, for messages
    fn owner(self) -> &'static str {
        match self {
            Self::Integer => "integer or #integer",
            Self::Bytes => "bytes or #bytes",
            Self::List => "list or #list",
            Self::Map => "map",
            Self::Pair => "#pair",
            Self::Constructor => "constructor",
        }
    }
}

fn is_known_keyword(key: &str) -> bool {
    ANNOTATION_KEYWORDS.contains(&key)
        || COMBINATOR_KEYWORDS.contains(&key)
        || KeywordFamily::ALL.iter().any(|f| f.keywords().contains(&key))
}

// =============================================================================
// Namespaces and Discriminants
// =============================================================================

/// Which discriminant family a position accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Validator slots and children of Data containers
    Data,
    /// Definition entries and children of `#list` / `#pair`
    Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discriminant {
    Integer,
    Bytes,
    List,
    Map,
    Constructor,
    HashInteger,
    HashBytes,
    HashString,
    HashUnit,
    HashBoolean,
    HashList,
    HashPair,
}

impl Discriminant {
    fn parse(tag: &str) -> Option<Self> {
        Some(match tag {
            "integer" => Self::Integer,
            "bytes" => Self::Bytes,
            "list" => Self::List,
            "map" => Self::Map,
            "constructor" => Self::Constructor,
            "#integer" => Self::HashInteger,
            "#bytes" => Self::HashBytes,
            "#string" => Self::HashString,
            "#unit" => Self::HashUnit,
            "#boolean" => Self::HashBoolean,
            "#list" => Self::HashList,
            "#pair" => Self::HashPair,
            _ => return None,
        })
    }

    fn is_schema_namespace(self) -> bool {
        !matches!(
            self,
            Self::Integer | Self::Bytes | Self::List | Self::Map | Self::Constructor
        )
    }

    /// Keyword family this discriminant owns, if any
    fn owned_family(self) -> Option<KeywordFamily> {
        match self {
            Self::Integer | Self::HashInteger => Some(KeywordFamily::Integer),
            Self::Bytes | Self::HashBytes => Some(KeywordFamily::Bytes),
            Self::List | Self::HashList => Some(KeywordFamily::List),
            Self::Map => Some(KeywordFamily::Map),
            Self::HashPair => Some(KeywordFamily::Pair),
            Self::Constructor => Some(KeywordFamily::Constructor),
            Self::HashString | Self::HashUnit | Self::HashBoolean => None,
        }
    }
}

// =============================================================================
// Parser
// =============================================================================

/// Grammar checker that records every problem it meets
pub struct NodeParser<'d> {
    diagnostics: &'d mut Diagnostics,
}

impl<'d> NodeParser<'d> {
    pub fn new(diagnostics: &'d mut Diagnostics) -> Self {
        Self { diagnostics }
    }

    /// Parse one schema node at `path`
    pub fn parse(&mut self, value: &Value, path: &ErrorPath, namespace: Namespace) -> SchemaNode {
        let Some(obj) = value.as_object() else {
            self.diagnostics.push(
                path,
                ErrorCode::InvalidType,
                format!("schema must be an object, got {}", json_type(value)),
            );
            return SchemaNode::opaque();
        };

        let title = self.optional_string(obj, "title", path);
        let description = self.optional_string(obj, "description", path);
        let extras: BTreeMap<String, Value> = obj
            .iter()
            .filter(|(key, _)| !is_known_keyword(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let combinators: Vec<&str> = COMBINATOR_KEYWORDS
            .iter()
            .copied()
            .filter(|key| obj.contains_key(*key))
            .collect();
        let shapes = usize::from(obj.contains_key("$ref"))
            + usize::from(obj.contains_key("dataType"))
            + combinators.len();
        if shapes > 1 {
            let mut present: Vec<&str> = Vec::new();
            if obj.contains_key("$ref") {
                present.push("$ref");
            }
            if obj.contains_key("dataType") {
                present.push("dataType");
            }
            present.extend(combinators.iter().copied());
            self.diagnostics.push(
                path,
                ErrorCode::AmbiguousNode,
                format!("node must carry only one of {}", present.join(", ")),
            );
        }

        let discriminant = match obj.get("dataType") {
            None => None,
            Some(Value::String(tag)) => match Discriminant::parse(tag) {
                Some(d) => Some(d),
                None => {
                    self.diagnostics.push(
                        &path.join("dataType"),
                        ErrorCode::UnknownDataType,
                        format!("unknown dataType '{}'", tag),
                    );
                    None
                }
            },
            Some(other) => {
                self.diagnostics.push(
                    &path.join("dataType"),
                    ErrorCode::InvalidType,
                    format!("dataType must be a string, got {}", json_type(other)),
                );
                None
            }
        };

        // (1) keyword scoping
        self.check_keyword_scope(obj, path, discriminant);

        let kind = if let Some(reference) = obj.get("$ref") {
            match reference.as_str() {
                Some(r) => NodeKind::Reference(r.to_string()),
                None => {
                    self.diagnostics.push(
                        &path.join("$ref"),
                        ErrorCode::InvalidType,
                        "$ref must be a string",
                    );
                    NodeKind::Opaque
                }
            }
        } else if let Some(d) = discriminant {
            if d.is_schema_namespace() && namespace == Namespace::Data {
                self.diagnostics.push(
                    &path.join("dataType"),
                    ErrorCode::NamespaceViolation,
                    format!(
                        "schema-namespace type '{}' is not allowed in a data position",
                        obj.get("dataType").and_then(Value::as_str).unwrap_or_default()
                    ),
                );
            }
            self.parse_discriminated(obj, path, d)
        } else if let Some(keyword) = combinators.first() {
            self.parse_combinator(obj, path, keyword, namespace)
        } else {
            NodeKind::Opaque
        };

        SchemaNode {
            title,
            description,
            kind,
            extras,
        }
    }

    fn check_keyword_scope(
        &mut self,
        obj: &Map<String, Value>,
        path: &ErrorPath,
        discriminant: Option<Discriminant>,
    ) {
        let owned = discriminant.and_then(Discriminant::owned_family);
        for family in KeywordFamily::ALL {
            if Some(family) == owned {
                continue;
            }
            for keyword in family.keywords().iter().copied() {
                if obj.contains_key(keyword) {
                    self.diagnostics.push(
                        &path.join(keyword),
                        ErrorCode::KeywordNotAllowed,
                        format!("'{}' is only allowed with dataType {}", keyword, family.owner()),
                    );
                }
            }
        }
    }

    fn parse_discriminated(
        &mut self,
        obj: &Map<String, Value>,
        path: &ErrorPath,
        discriminant: Discriminant,
    ) -> NodeKind {
        match discriminant {
            Discriminant::Integer => NodeKind::Data(DataType::Integer(self.integer_rules(obj, path))),
            Discriminant::Bytes => NodeKind::Data(DataType::Bytes(self.bytes_rules(obj, path))),
            Discriminant::List => {
                NodeKind::Data(DataType::List(self.list_shape(obj, path, Namespace::Data, false)))
            }
            Discriminant::Map => {
                let keys = self.required_child(obj, "keys", path, Namespace::Data, "map");
                let values = self.required_child(obj, "values", path, Namespace::Data, "map");
                NodeKind::Data(DataType::Map(MapShape {
                    keys: Box::new(keys),
                    values: Box::new(values),
                }))
            }
            // (2) constructor completeness
            Discriminant::Constructor => match self.constructor(obj, path) {
                Some(c) => NodeKind::Data(DataType::Constructor(c)),
                None => NodeKind::Opaque,
            },
            Discriminant::HashInteger => {
                NodeKind::Schema(SchemaType::Integer(self.integer_rules(obj, path)))
            }
            Discriminant::HashBytes => NodeKind::Schema(SchemaType::Bytes(self.bytes_rules(obj, path))),
            Discriminant::HashString => NodeKind::Schema(SchemaType::String),
            Discriminant::HashUnit => NodeKind::Schema(SchemaType::Unit),
            Discriminant::HashBoolean => NodeKind::Schema(SchemaType::Boolean),
            Discriminant::HashList => {
                NodeKind::Schema(SchemaType::List(self.list_shape(obj, path, Namespace::Schema, true)))
            }
            Discriminant::HashPair => {
                let left = self.required_child(obj, "left", path, Namespace::Schema, "#pair");
                let right = self.required_child(obj, "right", path, Namespace::Schema, "#pair");
                NodeKind::Schema(SchemaType::Pair(PairShape {
                    left: Box::new(left),
                    right: Box::new(right),
                }))
            }
        }
    }

    fn constructor(&mut self, obj: &Map<String, Value>, path: &ErrorPath) -> Option<Constructor> {
        let (index, fields) = match (obj.get("index"), obj.get("fields")) {
            (Some(index), Some(fields)) => (index, fields),
            (index, fields) => {
                let missing: Vec<&str> = [("index", index), ("fields", fields)]
                    .iter()
                    .filter(|(_, v)| v.is_none())
                    .map(|(k, _)| *k)
                    .collect();
                self.diagnostics.push(
                    path,
                    ErrorCode::IncompleteConstructor,
                    format!(
                        "constructor requires both 'index' and 'fields' (missing {})",
                        missing.join(", ")
                    ),
                );
                return None;
            }
        };

        let index = match index.as_u64() {
            Some(i) => i,
            None => {
                self.diagnostics.push(
                    &path.join("index"),
                    ErrorCode::InvalidType,
                    "constructor index must be a non-negative integer",
                );
                0
            }
        };

        let fields = match fields.as_array() {
            Some(items) => {
                let fields_path = path.join("fields");
                items
                    .iter()
                    .enumerate()
                    .map(|(i, field)| self.parse(field, &fields_path.join(i), Namespace::Data))
                    .collect()
            }
            None => {
                self.diagnostics.push(
                    &path.join("fields"),
                    ErrorCode::InvalidType,
                    "constructor fields must be an array",
                );
                Vec::new()
            }
        };

        Some(Constructor { index, fields })
    }

    fn parse_combinator(
        &mut self,
        obj: &Map<String, Value>,
        path: &ErrorPath,
        keyword: &str,
        namespace: Namespace,
    ) -> NodeKind {
        let child_path = path.join(keyword);
        let raw = &obj[keyword];

        if keyword == "not" {
            let child = self.parse(raw, &child_path, namespace);
            return NodeKind::Composition(Composition::Not(Box::new(child)));
        }

        let children: Vec<SchemaNode> = match raw.as_array() {
            Some(items) if items.is_empty() => {
                self.diagnostics.push(
                    &child_path,
                    ErrorCode::EmptyList,
                    format!("'{}' needs at least one schema", keyword),
                );
                Vec::new()
            }
            Some(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.parse(item, &child_path.join(i), namespace))
                .collect(),
            None => {
                self.diagnostics.push(
                    &child_path,
                    ErrorCode::InvalidType,
                    format!("'{}' must be an array of schemas", keyword),
                );
                Vec::new()
            }
        };

        match keyword {
            "allOf" => NodeKind::Composition(Composition::AllOf(children)),
            "oneOf" => NodeKind::Composition(Composition::OneOf(children)),
            _ => self.sum_or_any_of(children, &child_path),
        }
    }

    /// `anyOf` of inline constructors becomes a sum
    fn sum_or_any_of(&mut self, children: Vec<SchemaNode>, path: &ErrorPath) -> NodeKind {
        let all_constructors = !children.is_empty()
            && children
                .iter()
                .all(|c| matches!(c.kind, NodeKind::Data(DataType::Constructor(_))));
        if !all_constructors {
            return NodeKind::Composition(Composition::AnyOf(children));
        }

        let mut seen = BTreeSet::new();
        let mut alternatives = Vec::with_capacity(children.len());
        for (i, child) in children.into_iter().enumerate() {
            let NodeKind::Data(DataType::Constructor(constructor)) = child.kind else {
                continue;
            };
            if !seen.insert(constructor.index) {
                self.diagnostics.push(
                    &path.join(i).join("index"),
                    ErrorCode::DuplicateIndex,
                    format!("constructor index {} is used more than once", constructor.index),
                );
            }
            alternatives.push(Alternative {
                title: child.title,
                description: child.description,
                constructor,
                extras: child.extras,
            });
        }
        NodeKind::Sum(alternatives)
    }

    fn list_shape(
        &mut self,
        obj: &Map<String, Value>,
        path: &ErrorPath,
        namespace: Namespace,
        array_means_alternatives: bool,
    ) -> ListShape {
        let items_path = path.join("items");
        let items = match obj.get("items") {
            None => {
                self.diagnostics.push(path, ErrorCode::MissingField, "list requires 'items'");
                ListItems::Single(Box::new(SchemaNode::opaque()))
            }
            Some(Value::Array(entries)) => {
                if entries.is_empty() {
                    self.diagnostics.push(
                        &items_path,
                        ErrorCode::EmptyList,
                        "'items' needs at least one schema",
                    );
                }
                let nodes: Vec<SchemaNode> = entries
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.parse(item, &items_path.join(i), namespace))
                    .collect();
                if array_means_alternatives {
                    ListItems::Alternatives(nodes)
                } else {
                    ListItems::Tuple(nodes)
                }
            }
            Some(item) => ListItems::Single(Box::new(self.parse(item, &items_path, namespace))),
        };

        let unique_items = match obj.get("uniqueItems") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                self.diagnostics.push(
                    &path.join("uniqueItems"),
                    ErrorCode::InvalidType,
                    "'uniqueItems' must be a boolean",
                );
                false
            }
        };

        ListShape {
            items,
            min_items: self.count_keyword(obj, "minItems", path),
            max_items: self.count_keyword(obj, "maxItems", path),
            unique_items,
        }
    }

    fn integer_rules(&mut self, obj: &Map<String, Value>, path: &ErrorPath) -> IntegerRules {
        let mut rules = IntegerRules::default();
        for keyword in INTEGER_KEYWORDS {
            let Some(raw) = obj.get(*keyword) else { continue };
            let number = match raw {
                Value::Number(n) if codec::number_to_integer(n).is_some() => n.clone(),
                _ => {
                    self.diagnostics.push(
                        &path.join(*keyword),
                        ErrorCode::InvalidType,
                        format!("'{}' must be an integer", keyword),
                    );
                    continue;
                }
            };
            match *keyword {
                "minimum" => rules.minimum = Some(number),
                "maximum" => rules.maximum = Some(number),
                "exclusiveMinimum" => rules.exclusive_minimum = Some(number),
                "exclusiveMaximum" => rules.exclusive_maximum = Some(number),
                _ => {
                    let positive = codec::number_to_integer(&number)
                        .map(|m| m.sign() == num_bigint::Sign::Plus)
                        .unwrap_or(false);
                    if positive {
                        rules.multiple_of = Some(number);
                    } else {
                        self.diagnostics.push(
                            &path.join(*keyword),
                            ErrorCode::InvalidType,
                            "'multipleOf' must be a positive integer",
                        );
                    }
                }
            }
        }
        rules
    }

    fn bytes_rules(&mut self, obj: &Map<String, Value>, path: &ErrorPath) -> BytesRules {
        let allowed = match obj.get("enum") {
            None => None,
            Some(Value::Array(values)) => {
                let enum_path = path.join("enum");
                if values.is_empty() {
                    self.diagnostics.push(
                        &enum_path,
                        ErrorCode::EmptyList,
                        "'enum' needs at least one value",
                    );
                }
                let mut allowed = Vec::with_capacity(values.len());
                for (i, value) in values.iter().enumerate() {
                    match value.as_str() {
                        Some(s) if codec::is_hex(s) => allowed.push(s.to_ascii_lowercase()),
                        _ => self.diagnostics.push(
                            &enum_path.join(i),
                            ErrorCode::InvalidHex,
                            "'enum' values must be hex-encoded byte-strings",
                        ),
                    }
                }
                Some(allowed)
            }
            Some(_) => {
                self.diagnostics.push(
                    &path.join("enum"),
                    ErrorCode::InvalidType,
                    "'enum' must be an array",
                );
                None
            }
        };

        BytesRules {
            min_length: self.count_keyword(obj, "minLength", path),
            max_length: self.count_keyword(obj, "maxLength", path),
            allowed,
        }
    }

    fn required_child(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &ErrorPath,
        namespace: Namespace,
        owner: &str,
    ) -> SchemaNode {
        match obj.get(key) {
            Some(value) => self.parse(value, &path.join(key), namespace),
            None => {
                self.diagnostics.push(
                    path,
                    ErrorCode::MissingField,
                    format!("{} requires '{}'", owner, key),
                );
                SchemaNode::opaque()
            }
        }
    }

    fn count_keyword(&mut self, obj: &Map<String, Value>, key: &str, path: &ErrorPath) -> Option<usize> {
        let raw = obj.get(key)?;
        match raw.as_u64().and_then(|n| usize::try_from(n).ok()) {
            Some(n) => Some(n),
            None => {
                self.diagnostics.push(
                    &path.join(key),
                    ErrorCode::InvalidType,
                    format!("'{}' must be a non-negative integer", key),
                );
                None
            }
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, key: &str, path: &ErrorPath) -> Option<String> {
        match obj.get(key)? {
            Value::String(s) => Some(s.clone()),
            other => {
                self.diagnostics.push(
                    &path.join(key),
                    ErrorCode::InvalidType,
                    format!("'{}' must be a string, got {}", key, json_type(other)),
                );
                None
            }
        }
    }
}

/// Name of a JSON value's type, for messages
pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Parse a schema node, recording problems into `diagnostics`
pub fn parse_schema(
    value: &Value,
    path: &ErrorPath,
    namespace: Namespace,
    diagnostics: &mut Diagnostics,
) -> SchemaNode {
    NodeParser::new(diagnostics).parse(value, path, namespace)
}

/// Parse a standalone schema node; any problem fails the whole node
pub fn validate_schema(value: &Value, namespace: Namespace) -> Result<SchemaNode, Vec<StructuralError>> {
    let mut diagnostics = Diagnostics::new();
    let node = parse_schema(value, &ErrorPath::root(), namespace, &mut diagnostics);
    if diagnostics.is_empty() {
        Ok(node)
    } else {
        Err(diagnostics.into_vec())
    }
}
