//! Parameter Descriptors
//!
//! Form-friendly view of a schema slot. A descriptor flattens references,
//! recognizes well-known Cardano identifiers (28-byte hashes, asset names)
//! and knows how to validate and coerce the raw text a user types in.
//!
//! ```text
//! ParamDescriptor (owner: bytes, hash28, 28..28 bytes)
//! ParamDescriptor (redeemer: constructor sum)
//! ├── alternatives[0] Cancel (constructor 0)
//! └── alternatives[1] Update (constructor 1)
//!     └── children[0] new_price (integer, minimum 0)
//! ```

use num_bigint::BigInt;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::blueprint::ParsedValidator;
use crate::codec;
use crate::schema::{
    decode_reference, Composition, DataType, Definitions, ListItems, NodeKind, SchemaNode,
    SchemaType,
};
use crate::value::{self, ByteBounds, IntegerBounds, Mismatch, ValueCheckConfig};

/// Bytes in a Blake2b-224 hash
const HASH28_LEN: usize = 28;
/// Upper bound of an asset name
const ASSET_NAME_MAX: usize = 32;

// =============================================================================
// Descriptor Types
// =============================================================================

/// Coarse input kind of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Bytes,
    Integer,
    List,
    Map,
    Constructor,
    Unknown,
}

/// Well-known identifier recognized from a definition key or title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticHint {
    /// 28-byte key or script hash
    Hash28,
    /// Asset name, up to 32 bytes
    AssetName,
}

impl SemanticHint {
    fn bounds(self) -> ByteBounds {
        match self {
            SemanticHint::Hash28 => ByteBounds::exact(HASH28_LEN),
            SemanticHint::AssetName => ByteBounds {
                min: Some(0),
                max: Some(ASSET_NAME_MAX),
            },
        }
    }
}

struct HintPatterns {
    hash28: Regex,
    asset_name: Regex,
}

fn hint_patterns() -> &'static HintPatterns {
    static PATTERNS: OnceLock<HintPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HintPatterns {
        hash28: Regex::new(
            r"(?:^|/)(?:VerificationKeyHash|ScriptHash|PolicyId|KeyHash)$|Hash(?:<|\$)Blake2b_224",
        )
        .expect("hash28 pattern"),
        asset_name: Regex::new(r"(?:^|/)AssetName$").expect("asset name pattern"),
    })
}

/// Hint for a definition key or title
pub fn detect_hint(name: &str) -> Option<SemanticHint> {
    let patterns = hint_patterns();
    if patterns.hash28.is_match(name) {
        Some(SemanticHint::Hash28)
    } else if patterns.asset_name.is_match(name) {
        Some(SemanticHint::AssetName)
    } else {
        None
    }
}

/// Descriptor of one slot, parameter or nested position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: ParamKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<SemanticHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_bounds: Option<ByteBounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integer_bounds: Option<IntegerBounds>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ParamDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<ParamDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructor_index: Option<u64>,
    /// Expansion stopped at a reference already being expanded
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recursive: bool,
    /// Resolved schema node
    pub schema: SchemaNode,
}

impl ParamDescriptor {
    fn new(name: String, schema: SchemaNode) -> Self {
        Self {
            name,
            title: schema.title.clone(),
            description: schema.description.clone(),
            kind: ParamKind::Unknown,
            hint: None,
            byte_bounds: None,
            integer_bounds: None,
            children: Vec::new(),
            alternatives: Vec::new(),
            constructor_index: None,
            recursive: false,
            schema,
        }
    }

    /// Problem with `raw`, if any
    pub fn validate(&self, raw: &str, definitions: &Definitions) -> Option<String> {
        self.coerce(raw, definitions).err().map(|e| e.to_string())
    }

    /// Turn user text into a typed value.
    ///
    /// Bytes accept hex (optionally `0x`-prefixed) and fall back to encoding
    /// the text itself. Integers are decimal. `#string` takes the text as is
    /// unless it is a quoted JSON string. Anything else is parsed as JSON and
    /// checked against the schema.
    pub fn coerce(&self, raw: &str, definitions: &Definitions) -> Result<CoercedValue, CoerceError> {
        match self.kind {
            ParamKind::Bytes => {
                let hex = codec::normalize_hex(raw).unwrap_or_else(|| codec::text_to_hex(raw));
                if let Some(bounds) = &self.byte_bounds {
                    bounds.check(&hex).map_err(CoerceError::Bounds)?;
                }
                if let Some(rules) = bytes_rules(&self.schema) {
                    value::allowed_bytes(rules, &hex).map_err(CoerceError::Bounds)?;
                }
                Ok(CoercedValue::Bytes(hex))
            }
            ParamKind::Integer => {
                let n = codec::parse_integer(raw)
                    .ok_or_else(|| CoerceError::NotInteger(raw.trim().to_string()))?;
                if let Some(bounds) = &self.integer_bounds {
                    bounds.check(&n).map_err(CoerceError::Bounds)?;
                }
                Ok(CoercedValue::Integer(n))
            }
            _ => {
                let value: Value = match &self.schema.kind {
                    NodeKind::Schema(SchemaType::String) => serde_json::from_str::<String>(raw)
                        .unwrap_or_else(|_| raw.to_string())
                        .into(),
                    _ => serde_json::from_str(raw)?,
                };
                value::check(&self.schema, &value, definitions, &ValueCheckConfig::default())?;
                Ok(CoercedValue::Json(value))
            }
        }
    }
}

fn bytes_rules(node: &SchemaNode) -> Option<&crate::schema::BytesRules> {
    match &node.kind {
        NodeKind::Data(DataType::Bytes(rules)) | NodeKind::Schema(SchemaType::Bytes(rules)) => Some(rules),
        _ => None,
    }
}

// =============================================================================
// Coercion
// =============================================================================

#[derive(Error, Debug)]
pub enum CoerceError {
    #[error("{0}")]
    Bounds(String),

    #[error("'{0}' is not an integer")]
    NotInteger(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Mismatch(#[from] Mismatch),
}

/// Typed result of [`ParamDescriptor::coerce`]
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    /// Lowercase hex without prefix
    Bytes(String),
    Integer(BigInt),
    Json(Value),
}

impl CoercedValue {
    pub fn to_json(&self) -> Value {
        match self {
            CoercedValue::Bytes(hex) => Value::String(hex.clone()),
            CoercedValue::Integer(n) => n
                .to_string()
                .parse::<serde_json::Number>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::String(n.to_string())),
            CoercedValue::Json(value) => value.clone(),
        }
    }
}

impl Serialize for CoercedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// One descriptor per parameter, in declaration order
pub fn build_descriptors(validator: &ParsedValidator, definitions: &Definitions) -> Vec<ParamDescriptor> {
    let mut builder = DescriptorBuilder::new(definitions);
    let descriptors: Vec<ParamDescriptor> = validator
        .parameters
        .iter()
        .map(|p| {
            let mut d = builder.describe(&p.title, &p.schema);
            d.description = d.description.or_else(|| p.description.clone());
            d
        })
        .collect();
    debug!(validator = %validator.title, count = descriptors.len(), "built parameter descriptors");
    descriptors
}

/// Descriptor for any slot
pub fn describe(name: &str, node: &SchemaNode, definitions: &Definitions) -> ParamDescriptor {
    DescriptorBuilder::new(definitions).describe(name, node)
}

/// Expands schema nodes into descriptor trees
pub struct DescriptorBuilder<'a> {
    definitions: &'a Definitions,
    /// References currently being expanded
    stack: Vec<String>,
    max_depth: usize,
}

impl<'a> DescriptorBuilder<'a> {
    pub fn new(definitions: &'a Definitions) -> Self {
        Self {
            definitions,
            stack: Vec::new(),
            max_depth: ValueCheckConfig::default().max_depth,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn describe(&mut self, name: &str, node: &SchemaNode) -> ParamDescriptor {
        self.expand(name.to_string(), node, 0)
    }

    fn expand(&mut self, name: String, node: &SchemaNode, depth: usize) -> ParamDescriptor {
        let mut title = node.title.clone();
        let mut description = node.description.clone();
        let mut hint = title.as_deref().and_then(detect_hint);
        let mut current = node;
        let mut pushed = 0;
        let mut recursive = false;
        let definitions = self.definitions;

        while let Some(reference) = current.reference() {
            if self.stack.iter().any(|r| r == reference) {
                recursive = true;
                break;
            }
            if let Ok(key) = decode_reference(reference) {
                hint = hint.or_else(|| detect_hint(&key));
            }
            match definitions.resolve(reference) {
                Ok(target) => {
                    self.stack.push(reference.to_string());
                    pushed += 1;
                    title = title.or_else(|| target.title.clone());
                    description = description.or_else(|| target.description.clone());
                    hint = hint.or_else(|| target.title.as_deref().and_then(detect_hint));
                    current = target;
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "cannot describe parameter schema");
                    break;
                }
            }
        }

        let mut d = ParamDescriptor::new(name, current.clone());
        d.title = title;
        d.description = description;

        if recursive || depth >= self.max_depth {
            d.recursive = true;
        } else {
            self.fill(&mut d, current, depth);
        }

        if d.kind == ParamKind::Bytes {
            if let Some(hint) = hint {
                d.hint = Some(hint);
                d.byte_bounds = Some(hint.bounds());
            }
        }

        for _ in 0..pushed {
            self.stack.pop();
        }
        d
    }

    fn fill(&mut self, d: &mut ParamDescriptor, node: &SchemaNode, depth: usize) {
        let depth = depth + 1;
        match &node.kind {
            NodeKind::Data(DataType::Integer(rules)) | NodeKind::Schema(SchemaType::Integer(rules)) => {
                d.kind = ParamKind::Integer;
                let bounds = IntegerBounds::from_rules(rules);
                d.integer_bounds = (!bounds.is_unbounded()).then_some(bounds);
            }
            NodeKind::Data(DataType::Bytes(rules)) | NodeKind::Schema(SchemaType::Bytes(rules)) => {
                d.kind = ParamKind::Bytes;
                let bounds = ByteBounds::from_rules(rules);
                d.byte_bounds = (!bounds.is_unbounded()).then_some(bounds);
            }
            NodeKind::Data(DataType::List(shape)) | NodeKind::Schema(SchemaType::List(shape)) => {
                d.kind = ParamKind::List;
                d.children = match &shape.items {
                    ListItems::Single(item) => vec![self.expand("item".to_string(), item, depth)],
                    ListItems::Tuple(items) => items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| self.expand(format!("[{}]", i), item, depth))
                        .collect(),
                    ListItems::Alternatives(items) => {
                        let union = SchemaNode::new(NodeKind::Composition(Composition::AnyOf(items.clone())));
                        vec![self.expand("item".to_string(), &union, depth)]
                    }
                };
            }
            NodeKind::Schema(SchemaType::Pair(pair)) => {
                d.kind = ParamKind::List;
                d.children = vec![
                    self.expand("left".to_string(), &pair.left, depth),
                    self.expand("right".to_string(), &pair.right, depth),
                ];
            }
            NodeKind::Data(DataType::Map(map)) => {
                d.kind = ParamKind::Map;
                d.children = vec![
                    self.expand("key".to_string(), &map.keys, depth),
                    self.expand("value".to_string(), &map.values, depth),
                ];
            }
            NodeKind::Data(DataType::Constructor(c)) => {
                d.kind = ParamKind::Constructor;
                d.constructor_index = Some(c.index);
                d.children = c
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(i, field)| {
                        let name = field.title.clone().unwrap_or_else(|| format!("fields[{}]", i));
                        self.expand(name, field, depth)
                    })
                    .collect();
            }
            NodeKind::Sum(alternatives) => {
                d.kind = ParamKind::Constructor;
                d.alternatives = alternatives
                    .iter()
                    .map(|alt| {
                        let mut node =
                            SchemaNode::new(NodeKind::Data(DataType::Constructor(alt.constructor.clone())));
                        node.title = alt.title.clone();
                        node.description = alt.description.clone();
                        let name = alt
                            .title
                            .clone()
                            .unwrap_or_else(|| format!("constructor {}", alt.constructor.index));
                        self.expand(name, &node, depth)
                    })
                    .collect();
            }
            NodeKind::Composition(Composition::AnyOf(children))
            | NodeKind::Composition(Composition::OneOf(children)) => {
                d.alternatives = children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| {
                        let name = child.title.clone().unwrap_or_else(|| format!("[{}]", i));
                        self.expand(name, child, depth)
                    })
                    .collect();
            }
            NodeKind::Composition(_)
            | NodeKind::Reference(_)
            | NodeKind::Opaque
            | NodeKind::Schema(SchemaType::String)
            | NodeKind::Schema(SchemaType::Unit)
            | NodeKind::Schema(SchemaType::Boolean) => {}
        }
    }
}
