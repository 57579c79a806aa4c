//! Value Validation
//!
//! Checks a concrete runtime value (JSON) against one schema node, following
//! references, constructor sums and combinators. The first failure wins and is
//! reported as a [`Mismatch`] naming the sub-path where it happened.
//!
//! Value encodings:
//!
//! | Schema              | JSON value                                        |
//! |---------------------|---------------------------------------------------|
//! | integer / #integer  | number (arbitrary precision)                      |
//! | bytes / #bytes      | even-length hex string                            |
//! | list / #list        | array                                             |
//! | #pair               | `[left, right]`                                   |
//! | map                 | `[[k, v], ...]`, or an object when configured     |
//! | constructor / sum   | `{"constructor": n, "fields": [...]}`             |
//! | #unit               | `null` or `{}` depending on configuration         |

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::trace;

use crate::codec;
use crate::schema::parse::json_type;
use crate::schema::{
    BytesRules, Composition, ConstructorView, DataType, Definitions, IntegerRules, ListItems,
    ListShape, MapShape, NodeKind, PairShape, SchemaNode, SchemaType,
};

// =============================================================================
// Configuration
// =============================================================================

/// Accepted encodings of `#unit`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitAccepts {
    Null,
    EmptyObject,
    #[default]
    Both,
}

/// Accepted encodings of `map`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapAccepts {
    #[default]
    ArrayTuples,
    Object,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueCheckConfig {
    pub unit_accepts: UnitAccepts,
    pub map_accepts: MapAccepts,
    /// Nesting limit, counting values and references
    pub max_depth: usize,
}

impl Default for ValueCheckConfig {
    fn default() -> Self {
        Self {
            unit_accepts: UnitAccepts::default(),
            map_accepts: MapAccepts::default(),
            max_depth: 128,
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Why a value does not conform
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{}{}", location(.path), .reason)]
pub struct Mismatch {
    /// Sub-path such as `[2].fields[0]`; empty for the value itself
    pub path: String,
    pub reason: String,
}

fn location(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("at {}: ", path)
    }
}

/// Serializable outcome of a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Result<(), Mismatch>> for CheckReport {
    fn from(result: Result<(), Mismatch>) -> Self {
        match result {
            Ok(()) => Self { ok: true, message: None },
            Err(mismatch) => Self {
                ok: false,
                message: Some(mismatch.to_string()),
            },
        }
    }
}

// =============================================================================
// Entry Point
// =============================================================================

/// Check `value` against `node`, resolving references in `definitions`
pub fn check(
    node: &SchemaNode,
    value: &Value,
    definitions: &Definitions,
    config: &ValueCheckConfig,
) -> Result<(), Mismatch> {
    let checker = Checker { definitions, config };
    checker.node(node, value, "", 0, &mut Vec::new())
}

/// [`check`] with the outcome as a [`CheckReport`]
pub fn check_report(
    node: &SchemaNode,
    value: &Value,
    definitions: &Definitions,
    config: &ValueCheckConfig,
) -> CheckReport {
    check(node, value, definitions, config).into()
}

// =============================================================================
// Checker
// =============================================================================

struct Checker<'a> {
    definitions: &'a Definitions,
    config: &'a ValueCheckConfig,
}

fn mismatch(path: &str, reason: impl Into<String>) -> Mismatch {
    Mismatch {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn index_path(path: &str, i: usize) -> String {
    format!("{}[{}]", path, i)
}

fn field_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

impl<'a> Checker<'a> {
    /// `refs` holds the references followed since the last descent into a
    /// child value; seeing one twice means the schema loops without consuming
    /// any input. Reference hops do not count toward `depth`, which tracks
    /// nesting of the value itself.
    fn node(
        &self,
        node: &SchemaNode,
        value: &Value,
        path: &str,
        depth: usize,
        refs: &mut Vec<String>,
    ) -> Result<(), Mismatch> {
        if depth > self.config.max_depth {
            return Err(mismatch(
                path,
                format!("maximum depth of {} exceeded", self.config.max_depth),
            ));
        }

        match &node.kind {
            NodeKind::Reference(reference) => {
                if refs.iter().any(|seen| seen == reference) {
                    let mut chain = refs.clone();
                    chain.push(reference.clone());
                    return Err(mismatch(path, format!("reference cycle: {}", chain.join(" -> "))));
                }
                let target = self
                    .definitions
                    .resolve(reference)
                    .map_err(|e| mismatch(path, e.to_string()))?;
                trace!(reference = %reference, path, "following reference");
                refs.push(reference.clone());
                let result = self.node(target, value, path, depth, refs);
                refs.pop();
                result
            }
            NodeKind::Opaque => self.opaque(value, path),
            NodeKind::Data(data) => match data {
                DataType::Integer(rules) => integer(rules, value, path),
                DataType::Bytes(rules) => bytes(rules, value, path),
                DataType::List(shape) => self.list(shape, value, path, depth),
                DataType::Map(shape) => self.map(shape, value, path, depth),
                DataType::Constructor(c) => {
                    let view = ConstructorView {
                        title: node.title.as_deref(),
                        constructor: c,
                    };
                    self.constructor(&[view], value, path, depth)
                }
            },
            NodeKind::Sum(_) => {
                let alternatives = node.constructors().unwrap_or_default();
                self.constructor(&alternatives, value, path, depth)
            }
            NodeKind::Schema(schema) => match schema {
                SchemaType::Integer(rules) => integer(rules, value, path),
                SchemaType::Bytes(rules) => bytes(rules, value, path),
                SchemaType::String => expect(value.is_string(), "string", value, path),
                SchemaType::Boolean => expect(value.is_boolean(), "boolean", value, path),
                SchemaType::Unit => self.unit(value, path),
                SchemaType::List(shape) => self.list(shape, value, path, depth),
                SchemaType::Pair(shape) => self.pair(shape, value, path, depth),
            },
            NodeKind::Composition(composition) => {
                self.composition(composition, value, path, depth, refs)
            }
        }
    }

    /// Descend into a child value: the reference trail starts over
    fn child(&self, node: &SchemaNode, value: &Value, path: &str, depth: usize) -> Result<(), Mismatch> {
        self.node(node, value, path, depth + 1, &mut Vec::new())
    }

    fn opaque(&self, value: &Value, path: &str) -> Result<(), Mismatch> {
        let ok = match value {
            Value::Number(n) => codec::number_to_integer(n).is_some(),
            Value::String(s) => codec::is_hex(s),
            Value::Array(_) | Value::Object(_) => true,
            Value::Null | Value::Bool(_) => false,
        };
        expect(ok, "Plutus data (integer, hex bytes, list or object)", value, path)
    }

    fn unit(&self, value: &Value, path: &str) -> Result<(), Mismatch> {
        let is_null = value.is_null();
        let is_empty_object = value.as_object().map(|o| o.is_empty()).unwrap_or(false);
        let (ok, expected) = match self.config.unit_accepts {
            UnitAccepts::Null => (is_null, "null"),
            UnitAccepts::EmptyObject => (is_empty_object, "{}"),
            UnitAccepts::Both => (is_null || is_empty_object, "null or {}"),
        };
        expect(ok, expected, value, path)
    }

    fn list(&self, shape: &ListShape, value: &Value, path: &str, depth: usize) -> Result<(), Mismatch> {
        let Some(items) = value.as_array() else {
            return Err(expected("list", value, path));
        };

        if let Some(min) = shape.min_items {
            if items.len() < min {
                return Err(mismatch(path, format!("expected at least {} items, got {}", min, items.len())));
            }
        }
        if let Some(max) = shape.max_items {
            if items.len() > max {
                return Err(mismatch(path, format!("expected at most {} items, got {}", max, items.len())));
            }
        }

        match &shape.items {
            ListItems::Single(schema) => {
                for (i, item) in items.iter().enumerate() {
                    self.child(schema, item, &index_path(path, i), depth)?;
                }
            }
            ListItems::Tuple(schemas) => {
                if items.len() != schemas.len() {
                    return Err(mismatch(
                        path,
                        format!("expected exactly {} items, got {}", schemas.len(), items.len()),
                    ));
                }
                for (i, (schema, item)) in schemas.iter().zip(items).enumerate() {
                    self.child(schema, item, &index_path(path, i), depth)?;
                }
            }
            ListItems::Alternatives(schemas) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = index_path(path, i);
                    let matched = schemas
                        .iter()
                        .any(|schema| self.child(schema, item, &item_path, depth).is_ok());
                    if !matched {
                        return Err(mismatch(
                            &item_path,
                            format!("matches none of the {} allowed item schemas", schemas.len()),
                        ));
                    }
                }
            }
        }

        if shape.unique_items {
            let mut seen = BTreeSet::new();
            for (i, item) in items.iter().enumerate() {
                if !seen.insert(codec::canonical_key(item)) {
                    return Err(mismatch(&index_path(path, i), "duplicate item in a unique list"));
                }
            }
        }
        Ok(())
    }

    fn pair(&self, shape: &PairShape, value: &Value, path: &str, depth: usize) -> Result<(), Mismatch> {
        match value.as_array().map(Vec::as_slice) {
            Some([left, right]) => {
                self.child(&shape.left, left, &field_path(path, "left"), depth)?;
                self.child(&shape.right, right, &field_path(path, "right"), depth)
            }
            _ => Err(expected("pair ([left, right])", value, path)),
        }
    }

    fn map(&self, shape: &MapShape, value: &Value, path: &str, depth: usize) -> Result<(), Mismatch> {
        let accepts = self.config.map_accepts;
        match value {
            Value::Array(entries) if accepts != MapAccepts::Object => {
                for (i, entry) in entries.iter().enumerate() {
                    let entry_path = index_path(path, i);
                    let Some([key, val]) = entry.as_array().map(Vec::as_slice) else {
                        return Err(expected("[key, value] entry", entry, &entry_path));
                    };
                    self.child(&shape.keys, key, &field_path(&entry_path, "key"), depth)?;
                    self.child(&shape.values, val, &field_path(&entry_path, "value"), depth)?;
                }
                Ok(())
            }
            Value::Object(entries) if accepts != MapAccepts::ArrayTuples => {
                for (key, val) in entries {
                    let entry_path = format!("{}[{:?}]", path, key);
                    self.child(&shape.keys, &Value::String(key.clone()), &entry_path, depth)?;
                    self.child(&shape.values, val, &entry_path, depth)?;
                }
                Ok(())
            }
            _ => {
                let wanted = match accepts {
                    MapAccepts::ArrayTuples => "map as an array of [key, value] pairs",
                    MapAccepts::Object => "map as an object",
                    MapAccepts::Both => "map as an object or an array of [key, value] pairs",
                };
                Err(expected(wanted, value, path))
            }
        }
    }

    fn constructor(
        &self,
        alternatives: &[ConstructorView<'_>],
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Result<(), Mismatch> {
        let Some(obj) = value.as_object() else {
            return Err(expected("constructor object", value, path));
        };
        let tag = obj
            .get("constructor")
            .or_else(|| obj.get("index"))
            .ok_or_else(|| mismatch(path, "missing 'constructor' index"))?;
        let Some(tag) = tag.as_u64() else {
            return Err(mismatch(path, format!("constructor index must be a non-negative integer, got {}", tag)));
        };
        let fields = match obj.get("fields") {
            Some(Value::Array(fields)) => fields,
            Some(other) => return Err(expected("'fields' array", other, &field_path(path, "fields"))),
            None => return Err(mismatch(path, "missing 'fields'")),
        };

        let Some(alternative) = alternatives.iter().find(|a| a.constructor.index == tag) else {
            let known: Vec<String> = alternatives
                .iter()
                .map(|a| a.constructor.index.to_string())
                .collect();
            return Err(mismatch(
                path,
                format!("constructor {} is not one of [{}]", tag, known.join(", ")),
            ));
        };

        let schemas = &alternative.constructor.fields;
        if fields.len() != schemas.len() {
            return Err(mismatch(
                path,
                format!(
                    "constructor {}{} takes {} fields, got {}",
                    tag,
                    alternative.title.map(|t| format!(" ({})", t)).unwrap_or_default(),
                    schemas.len(),
                    fields.len()
                ),
            ));
        }
        let fields_path = field_path(path, "fields");
        for (i, (schema, field)) in schemas.iter().zip(fields).enumerate() {
            self.child(schema, field, &index_path(&fields_path, i), depth)?;
        }
        Ok(())
    }

    fn composition(
        &self,
        composition: &Composition,
        value: &Value,
        path: &str,
        depth: usize,
        refs: &mut Vec<String>,
    ) -> Result<(), Mismatch> {
        match composition {
            Composition::AllOf(children) => children
                .iter()
                .try_for_each(|child| self.node(child, value, path, depth + 1, refs)),
            Composition::AnyOf(children) => {
                let mut last = None;
                for child in children {
                    match self.node(child, value, path, depth + 1, refs) {
                        Ok(()) => return Ok(()),
                        Err(e) => last = Some(e),
                    }
                }
                Err(mismatch(
                    path,
                    match last {
                        Some(e) => format!("matches none of the anyOf schemas (last: {})", e),
                        None => "matches none of the anyOf schemas".to_string(),
                    },
                ))
            }
            Composition::OneOf(children) => {
                let matches = children
                    .iter()
                    .filter(|child| self.node(child, value, path, depth + 1, refs).is_ok())
                    .count();
                if matches == 1 {
                    Ok(())
                } else {
                    Err(mismatch(
                        path,
                        format!("must match exactly one oneOf schema, matched {}", matches),
                    ))
                }
            }
            Composition::Not(child) => match self.node(child, value, path, depth + 1, refs) {
                Ok(()) => Err(mismatch(path, format!("must not match {}", child))),
                Err(_) => Ok(()),
            },
        }
    }
}

// =============================================================================
// Scalars
// =============================================================================

fn expected(what: &str, value: &Value, path: &str) -> Mismatch {
    mismatch(path, format!("expected {}, got {}", what, json_type(value)))
}

fn expect(ok: bool, what: &str, value: &Value, path: &str) -> Result<(), Mismatch> {
    if ok {
        Ok(())
    } else {
        Err(expected(what, value, path))
    }
}

fn integer(rules: &IntegerRules, value: &Value, path: &str) -> Result<(), Mismatch> {
    let n = match value {
        Value::Number(n) => codec::number_to_integer(n)
            .ok_or_else(|| mismatch(path, format!("expected integer, got {}", n)))?,
        other => return Err(expected("integer", other, path)),
    };
    IntegerBounds::from_rules(rules)
        .check(&n)
        .map_err(|reason| mismatch(path, reason))
}

fn bytes(rules: &BytesRules, value: &Value, path: &str) -> Result<(), Mismatch> {
    let Some(s) = value.as_str() else {
        return Err(expected("hex byte-string", value, path));
    };
    if !codec::is_hex(s) {
        return Err(mismatch(path, format!("'{}' is not an even-length hex string", s)));
    }
    let hex = s.to_ascii_lowercase();
    ByteBounds::from_rules(rules)
        .check(&hex)
        .and_then(|()| allowed_bytes(rules, &hex))
        .map_err(|reason| mismatch(path, reason))
}

/// `enum` keyword against lowercase hex
pub(crate) fn allowed_bytes(rules: &BytesRules, hex: &str) -> Result<(), String> {
    match &rules.allowed {
        Some(allowed) if !allowed.iter().any(|a| a == hex) => {
            Err(format!("'{}' is not one of the allowed values", hex))
        }
        _ => Ok(()),
    }
}

// =============================================================================
// Bounds
// =============================================================================

/// Byte-length bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ByteBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl ByteBounds {
    pub fn exact(len: usize) -> Self {
        Self {
            min: Some(len),
            max: Some(len),
        }
    }

    pub fn from_rules(rules: &BytesRules) -> Self {
        Self {
            min: rules.min_length,
            max: rules.max_length,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Check a strict hex string
    pub fn check(&self, hex: &str) -> Result<(), String> {
        let len = codec::byte_len(hex);
        match (self.min, self.max) {
            (Some(min), Some(max)) if min == max && len != min => {
                Err(format!("expected exactly {} bytes, got {}", min, len))
            }
            (Some(min), _) if len < min => Err(format!("expected at least {} bytes, got {}", min, len)),
            (_, Some(max)) if len > max => Err(format!("expected at most {} bytes, got {}", max, len)),
            _ => Ok(()),
        }
    }
}

/// Numeric keywords as exact integers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegerBounds {
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "decimal")]
    pub minimum: Option<BigInt>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "decimal")]
    pub maximum: Option<BigInt>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "decimal")]
    pub exclusive_minimum: Option<BigInt>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "decimal")]
    pub exclusive_maximum: Option<BigInt>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "decimal")]
    pub multiple_of: Option<BigInt>,
}

/// Bounds serialize as decimal strings
fn decimal<S: serde::Serializer>(value: &Option<BigInt>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(n) => serializer.serialize_str(&n.to_string()),
        None => serializer.serialize_none(),
    }
}

impl IntegerBounds {
    pub fn from_rules(rules: &IntegerRules) -> Self {
        let exact = |raw: &Option<serde_json::Number>| raw.as_ref().and_then(codec::number_to_integer);
        Self {
            minimum: exact(&rules.minimum),
            maximum: exact(&rules.maximum),
            exclusive_minimum: exact(&rules.exclusive_minimum),
            exclusive_maximum: exact(&rules.exclusive_maximum),
            multiple_of: exact(&rules.multiple_of),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self == &Self::default()
    }

    pub fn check(&self, n: &BigInt) -> Result<(), String> {
        if let Some(min) = &self.minimum {
            if n < min {
                return Err(format!("{} is less than the minimum {}", n, min));
            }
        }
        if let Some(max) = &self.maximum {
            if n > max {
                return Err(format!("{} is greater than the maximum {}", n, max));
            }
        }
        if let Some(min) = &self.exclusive_minimum {
            if n <= min {
                return Err(format!("{} must be greater than {}", n, min));
            }
        }
        if let Some(max) = &self.exclusive_maximum {
            if n >= max {
                return Err(format!("{} must be less than {}", n, max));
            }
        }
        if let Some(step) = &self.multiple_of {
            let zero = BigInt::from(0);
            if step != &zero && n % step != zero {
                return Err(format!("{} is not a multiple of {}", n, step));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{validate_schema, Namespace};
    use serde_json::json;

    fn schema(value: Value) -> SchemaNode {
        validate_schema(&value, Namespace::Schema).unwrap()
    }

    fn defs(entries: Value) -> Definitions {
        entries
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), schema(v.clone())))
            .collect()
    }

    fn ok(node: &Value, value: Value) -> bool {
        check(&schema(node.clone()), &value, &Definitions::new(), &ValueCheckConfig::default()).is_ok()
    }

    #[test]
    fn test_integers() {
        let int = json!({"dataType": "integer", "minimum": -5, "maximum": 10});
        assert!(ok(&int, json!(3)));
        assert!(ok(&int, json!(-5)));
        assert!(!ok(&int, json!(11)));
        assert!(!ok(&int, json!(1.5)));
        assert!(!ok(&int, json!("3")));

        let wide = serde_json::from_str("340282366920938463463374607431768211456").unwrap();
        assert!(ok(&json!({"dataType": "#integer"}), wide));

        let even = json!({"dataType": "integer", "multipleOf": 2, "exclusiveMinimum": 0});
        assert!(ok(&even, json!(4)));
        assert!(!ok(&even, json!(3)));
        assert!(!ok(&even, json!(0)));
    }

    #[test]
    fn test_bytes() {
        let hash = json!({"dataType": "bytes", "minLength": 28, "maxLength": 28});
        assert!(ok(&hash, json!("ab".repeat(28))));
        assert!(!ok(&hash, json!("ab".repeat(27))));
        assert!(!ok(&hash, json!("ab".repeat(29))));
        assert!(!ok(&json!({"dataType": "bytes"}), json!("abc")));
        assert!(!ok(&json!({"dataType": "bytes"}), json!("0xab")));

        let tagged = json!({"dataType": "#bytes", "enum": ["aa", "BB"]});
        assert!(ok(&tagged, json!("AA")));
        assert!(ok(&tagged, json!("bb")));
        assert!(!ok(&tagged, json!("cc")));
    }

    #[test]
    fn test_unit_config() {
        let unit = schema(json!({"dataType": "#unit"}));
        let defs = Definitions::new();
        let null_only = ValueCheckConfig {
            unit_accepts: UnitAccepts::Null,
            ..Default::default()
        };
        let object_only = ValueCheckConfig {
            unit_accepts: UnitAccepts::EmptyObject,
            ..Default::default()
        };
        let both = ValueCheckConfig::default();

        assert!(check(&unit, &json!(null), &defs, &null_only).is_ok());
        assert!(check(&unit, &json!({}), &defs, &null_only).is_err());
        assert!(check(&unit, &json!({}), &defs, &object_only).is_ok());
        assert!(check(&unit, &json!(null), &defs, &object_only).is_err());
        assert!(check(&unit, &json!(null), &defs, &both).is_ok());
        assert!(check(&unit, &json!({}), &defs, &both).is_ok());
        assert!(check(&unit, &json!({"a": 1}), &defs, &both).is_err());
    }

    #[test]
    fn test_map_config() {
        let map = schema(json!({"dataType": "map", "keys": {"dataType": "bytes"}, "values": {"dataType": "integer"}}));
        let defs = Definitions::new();
        let tuples = json!([["aa", 1], ["bb", 2]]);
        let object = json!({"aa": 1});

        let default = ValueCheckConfig::default();
        assert!(check(&map, &tuples, &defs, &default).is_ok());
        assert!(check(&map, &object, &defs, &default).is_err());

        let objects = ValueCheckConfig {
            map_accepts: MapAccepts::Object,
            ..Default::default()
        };
        assert!(check(&map, &object, &defs, &objects).is_ok());
        assert!(check(&map, &tuples, &defs, &objects).is_err());

        let both = ValueCheckConfig {
            map_accepts: MapAccepts::Both,
            ..Default::default()
        };
        assert!(check(&map, &object, &defs, &both).is_ok());
        assert!(check(&map, &tuples, &defs, &both).is_ok());

        let err = check(&map, &json!([["aa", "x"]]), &defs, &default).unwrap_err();
        assert_eq!(err.path, "[0].value");
        let err = check(&map, &json!({"zz": 1}), &defs, &both).unwrap_err();
        assert_eq!(err.path, "[\"zz\"]");
    }

    #[test]
    fn test_list_forms() {
        let homogeneous = json!({"dataType": "list", "items": {"dataType": "integer"}, "maxItems": 3});
        assert!(ok(&homogeneous, json!([1, 2, 3])));
        assert!(!ok(&homogeneous, json!([1, 2, 3, 4])));
        let err = check(&schema(homogeneous), &json!([1, "x"]), &Definitions::new(), &ValueCheckConfig::default())
            .unwrap_err();
        assert_eq!(err.path, "[1]");

        let tuple = json!({"dataType": "list", "items": [{"dataType": "integer"}, {"dataType": "bytes"}]});
        assert!(ok(&tuple, json!([1, "aa"])));
        assert!(!ok(&tuple, json!([1])));
        assert!(!ok(&tuple, json!(["aa", 1])));

        let alternatives = json!({"dataType": "#list", "items": [{"dataType": "integer"}, {"dataType": "#string"}]});
        assert!(ok(&alternatives, json!([1, "hello", 2])));
        assert!(!ok(&alternatives, json!([1, true])));

        let unique = json!({"dataType": "list", "items": {}, "uniqueItems": true});
        assert!(ok(&unique, json!([1, 2])));
        assert!(!ok(&unique, json!([{"a": 1}, {"a": 1}])));
    }

    #[test]
    fn test_pair_messages_name_the_side() {
        let pair = schema(json!({"dataType": "#pair", "left": {"dataType": "#integer"}, "right": {"dataType": "#string"}}));
        let defs = Definitions::new();
        let config = ValueCheckConfig::default();
        assert!(check(&pair, &json!([1, "x"]), &defs, &config).is_ok());
        assert_eq!(check(&pair, &json!([1, 2]), &defs, &config).unwrap_err().path, "right");
        assert_eq!(check(&pair, &json!(["1", "x"]), &defs, &config).unwrap_err().path, "left");
        assert!(check(&pair, &json!([1]), &defs, &config).is_err());
    }

    #[test]
    fn test_constructor_arity_and_tag() {
        let sum = json!({"anyOf": [
            {"title": "Nothing", "dataType": "constructor", "index": 1, "fields": []},
            {"title": "Just", "dataType": "constructor", "index": 0, "fields": [{"dataType": "integer"}]}
        ]});
        assert!(ok(&sum, json!({"constructor": 0, "fields": [42]})));
        assert!(ok(&sum, json!({"constructor": 1, "fields": []})));
        assert!(ok(&sum, json!({"index": 1, "fields": []})));
        assert!(!ok(&sum, json!({"constructor": 2, "fields": []})));
        assert!(!ok(&sum, json!({"constructor": 0, "fields": []})));
        assert!(!ok(&sum, json!({"constructor": 1, "fields": [1]})));

        let err = check(
            &schema(sum),
            &json!({"constructor": 0, "fields": ["x"]}),
            &Definitions::new(),
            &ValueCheckConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.path, "fields[0]");
        assert_eq!(err.to_string(), "at fields[0]: expected integer, got string");
    }

    #[test]
    fn test_compositions() {
        let any = json!({"anyOf": [{"dataType": "integer"}, {"dataType": "bytes"}]});
        assert!(ok(&any, json!(1)));
        assert!(ok(&any, json!("aa")));
        assert!(!ok(&any, json!([])));

        let one = json!({"oneOf": [{"dataType": "integer", "minimum": 0}, {"dataType": "integer", "maximum": 10}]});
        assert!(ok(&one, json!(20)));
        assert!(!ok(&one, json!(5)));

        let all = json!({"allOf": [{"dataType": "integer", "minimum": 0}, {"dataType": "integer", "maximum": 10}]});
        assert!(ok(&all, json!(5)));
        assert!(!ok(&all, json!(20)));

        let not = json!({"not": {"dataType": "integer"}});
        assert!(ok(&not, json!("aa")));
        assert!(!ok(&not, json!(1)));
    }

    #[test]
    fn test_opaque_accepts_data() {
        let data = json!({"title": "Data"});
        assert!(ok(&data, json!(1)));
        assert!(ok(&data, json!("deadbeef")));
        assert!(ok(&data, json!([1, "x"])));
        assert!(ok(&data, json!({"constructor": 0, "fields": []})));
        assert!(!ok(&data, json!("xyz")));
        assert!(!ok(&data, json!(true)));
        assert!(!ok(&data, json!(null)));
    }

    #[test]
    fn test_references() {
        let defs = defs(json!({
            "Int": {"dataType": "integer"},
            "Alias": {"$ref": "#/definitions/Int"}
        }));
        let config = ValueCheckConfig::default();
        let alias = SchemaNode::reference_to("Alias");
        assert!(check(&alias, &json!(7), &defs, &config).is_ok());
        assert!(check(&alias, &json!("aa"), &defs, &config).is_err());

        let err = check(&SchemaNode::reference_to("Missing"), &json!(1), &defs, &config).unwrap_err();
        assert!(err.reason.starts_with("unresolved reference"));
    }

    #[test]
    fn test_reference_cycles_terminate() {
        let defs = defs(json!({
            "A": {"$ref": "#/definitions/B"},
            "B": {"anyOf": [{"$ref": "#/definitions/A"}, {"dataType": "#string"}]}
        }));
        let config = ValueCheckConfig::default();
        let err = check(&SchemaNode::reference_to("A"), &json!(1), &defs, &config).unwrap_err();
        assert!(err.reason.contains("matches none"));

        let direct = defs_cycle();
        let err = check(&SchemaNode::reference_to("A"), &json!(1), &direct, &config).unwrap_err();
        assert!(err.reason.starts_with("reference cycle"));
    }

    fn defs_cycle() -> Definitions {
        defs(json!({
            "A": {"$ref": "#/definitions/B"},
            "B": {"$ref": "#/definitions/A"}
        }))
    }

    #[test]
    fn test_recursive_schema_through_values() {
        let defs = defs(json!({
            "Int": {"dataType": "integer"},
            "IntList": {
                "anyOf": [
                    {"title": "Nil", "dataType": "constructor", "index": 0, "fields": []},
                    {"title": "Cons", "dataType": "constructor", "index": 1, "fields": [
                        {"$ref": "#/definitions/Int"},
                        {"$ref": "#/definitions/IntList"}
                    ]}
                ]
            }
        }));
        let value = json!({"constructor": 1, "fields": [1, {"constructor": 1, "fields": [2, {"constructor": 0, "fields": []}]}]});
        let node = SchemaNode::reference_to("IntList");
        assert!(check(&node, &value, &defs, &ValueCheckConfig::default()).is_ok());
    }

    #[test]
    fn test_long_recursive_list_within_default_depth() {
        let defs = defs(json!({
            "Int": {"dataType": "integer"},
            "IntList": {
                "anyOf": [
                    {"title": "Nil", "dataType": "constructor", "index": 0, "fields": []},
                    {"title": "Cons", "dataType": "constructor", "index": 1, "fields": [
                        {"$ref": "#/definitions/Int"},
                        {"$ref": "#/definitions/IntList"}
                    ]}
                ]
            }
        }));
        let build = |len: usize| {
            let mut value = json!({"constructor": 0, "fields": []});
            for i in 0..len {
                value = json!({"constructor": 1, "fields": [i, value]});
            }
            value
        };
        let node = SchemaNode::reference_to("IntList");
        assert!(check(&node, &build(100), &defs, &ValueCheckConfig::default()).is_ok());

        let tight = ValueCheckConfig {
            max_depth: 8,
            ..Default::default()
        };
        assert!(check(&node, &build(6), &defs, &tight).is_ok());
        let err = check(&node, &build(20), &defs, &tight).unwrap_err();
        assert!(err.reason.contains("maximum depth of 8"));
    }

    #[test]
    fn test_max_depth() {
        let nested = schema(json!({"dataType": "list", "items": {}}));
        let mut value = json!(1);
        for _ in 0..10 {
            value = json!([value]);
        }
        let tight = ValueCheckConfig {
            max_depth: 4,
            ..Default::default()
        };
        let deep_schema = {
            let mut node = json!({"dataType": "integer"});
            for _ in 0..10 {
                node = json!({"dataType": "list", "items": node});
            }
            schema(node)
        };
        assert!(check(&nested, &value, &Definitions::new(), &tight).is_ok());
        let err = check(&deep_schema, &value, &Definitions::new(), &tight).unwrap_err();
        assert!(err.reason.contains("maximum depth"));
        assert!(check(&deep_schema, &value, &Definitions::new(), &ValueCheckConfig::default()).is_ok());
    }

    #[test]
    fn test_check_report() {
        let node = schema(json!({"dataType": "integer"}));
        let report = check_report(&node, &json!("x"), &Definitions::new(), &ValueCheckConfig::default());
        assert!(!report.ok);
        assert_eq!(report.message.as_deref(), Some("expected integer, got string"));
        assert_eq!(
            serde_json::to_value(check_report(&node, &json!(1), &Definitions::new(), &ValueCheckConfig::default()))
                .unwrap(),
            json!({"ok": true})
        );
    }
}
