//! Structural Validation
//!
//! Checks the document shape around the schema grammar: preamble, the
//! validator list, slots, parameters, compiled code, hashes and definitions.
//! Every problem is collected with its breadcrumb path; a best-effort
//! [`BlueprintDocument`] is always produced so the grouping pass can still run.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{
    split_title, BlueprintDocument, Compiler, Parameter, PlutusVersion, Preamble, Slot, TitleSuffix,
    ValidatorEntry,
};
use crate::codec;
use crate::diagnostics::{Diagnostics, ErrorCode, ErrorPath, StructuralError};
use crate::schema::parse::json_type;
use crate::error::ResolveError;
use crate::schema::{resolve, Definitions, Namespace, NodeParser, SchemaNode};

/// Hex characters in a 28-byte script hash
const HASH_HEX_LEN: usize = 56;

const PREAMBLE_KEYS: &[&str] = &[
    "title",
    "description",
    "version",
    "compiler",
    "plutusVersion",
    "license",
];
const VALIDATOR_KEYS: &[&str] = &[
    "title",
    "datum",
    "redeemer",
    "parameters",
    "compiledCode",
    "hash",
];
const SLOT_KEYS: &[&str] = &["title", "description", "schema"];
const DOCUMENT_KEYS: &[&str] = &["preamble", "validators", "definitions"];

// =============================================================================
// Input
// =============================================================================

/// Blueprint input: JSON text or an already parsed value
#[derive(Debug, Clone, Copy)]
pub enum RawDocument<'a> {
    Text(&'a str),
    Json(&'a Value),
}

impl<'a> RawDocument<'a> {
    /// Parsed JSON, or a single `JSON_PARSE` error
    pub(crate) fn into_value(self) -> Result<Value, StructuralError> {
        match self {
            RawDocument::Text(text) => serde_json::from_str(text).map_err(|e| {
                StructuralError::new(ErrorPath::root(), ErrorCode::JsonParse, e.to_string())
            }),
            RawDocument::Json(value) => Ok(value.clone()),
        }
    }
}

impl<'a> From<&'a str> for RawDocument<'a> {
    fn from(text: &'a str) -> Self {
        RawDocument::Text(text)
    }
}

impl<'a> From<&'a String> for RawDocument<'a> {
    fn from(text: &'a String) -> Self {
        RawDocument::Text(text)
    }
}

impl<'a> From<&'a Value> for RawDocument<'a> {
    fn from(value: &'a Value) -> Self {
        RawDocument::Json(value)
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Decide whether `raw` is a well-formed blueprint
pub fn validate_document<'a>(
    raw: impl Into<RawDocument<'a>>,
) -> Result<BlueprintDocument, Vec<StructuralError>> {
    let value = raw.into().into_value().map_err(|e| vec![e])?;
    let (document, diagnostics) = parse_document(&value);
    super::finish(document, diagnostics)
}

/// Validate one entry of `definitions` on its own
pub fn validate_definition(key: &str, value: &Value) -> Result<SchemaNode, Vec<StructuralError>> {
    let mut diagnostics = Diagnostics::new();
    let path = ErrorPath::root().join("definitions").join(key);
    let node = NodeParser::new(&mut diagnostics).parse(value, &path, Namespace::Schema);
    super::finish(node, diagnostics)
}

/// Best-effort document plus every problem found
pub(crate) fn parse_document(value: &Value) -> (BlueprintDocument, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let document = DocumentParser {
        diagnostics: &mut diagnostics,
        references: Vec::new(),
    }
    .document(value);
    debug!(
        validators = document.validators.len(),
        definitions = document.definitions.len(),
        problems = diagnostics.len(),
        "structural pass finished"
    );
    (document, diagnostics)
}

// =============================================================================
// Document Parser
// =============================================================================

struct DocumentParser<'d> {
    diagnostics: &'d mut Diagnostics,
    /// `$ref`s seen so far, checked once `definitions` is known
    references: Vec<(ErrorPath, String)>,
}

impl<'d> DocumentParser<'d> {
    fn document(&mut self, value: &Value) -> BlueprintDocument {
        let root = ErrorPath::root();
        let Some(obj) = value.as_object() else {
            self.diagnostics.push(
                &root,
                ErrorCode::InvalidType,
                format!("blueprint must be an object, got {}", json_type(value)),
            );
            return BlueprintDocument::default();
        };

        let preamble = match obj.get("preamble") {
            Some(preamble) => self.preamble(preamble, &root.join("preamble")),
            None => {
                self.diagnostics
                    .push(&root, ErrorCode::MissingField, "missing 'preamble'");
                Preamble::default()
            }
        };

        let validators = match obj.get("validators") {
            Some(Value::Array(entries)) => {
                let path = root.join("validators");
                if entries.is_empty() {
                    self.diagnostics.push(
                        &path,
                        ErrorCode::EmptyList,
                        "blueprint must declare at least one validator",
                    );
                }
                entries
                    .iter()
                    .enumerate()
                    .filter_map(|(i, entry)| self.validator(entry, &path, i))
                    .collect()
            }
            Some(other) => {
                self.diagnostics.push(
                    &root.join("validators"),
                    ErrorCode::InvalidType,
                    format!("'validators' must be an array, got {}", json_type(other)),
                );
                Vec::new()
            }
            None => {
                self.diagnostics
                    .push(&root, ErrorCode::MissingField, "missing 'validators'");
                Vec::new()
            }
        };

        let definitions = match obj.get("definitions") {
            None => Definitions::new(),
            Some(Value::Object(entries)) => {
                let path = root.join("definitions");
                let mut definitions = Definitions::new();
                for (key, raw) in entries {
                    let node_path = path.join(key.as_str());
                    let node = NodeParser::new(self.diagnostics).parse(raw, &node_path, Namespace::Schema);
                    self.note_references(&node, &node_path);
                    definitions.insert(key.as_str(), node);
                }
                definitions
            }
            Some(other) => {
                self.diagnostics.push(
                    &root.join("definitions"),
                    ErrorCode::InvalidType,
                    format!("'definitions' must be an object, got {}", json_type(other)),
                );
                Definitions::new()
            }
        };

        self.check_references(&definitions);

        BlueprintDocument {
            preamble,
            validators,
            definitions,
            extras: extras(obj, DOCUMENT_KEYS),
        }
    }

    fn note_references(&mut self, node: &SchemaNode, path: &ErrorPath) {
        self.references.extend(
            node.references(path)
                .into_iter()
                .map(|(at, reference)| (at, reference.to_string())),
        );
    }

    /// Every collected `$ref` must name a local definition
    fn check_references(&mut self, definitions: &Definitions) {
        for (path, reference) in std::mem::take(&mut self.references) {
            match resolve(&reference, definitions) {
                Ok(_) => {}
                Err(e @ ResolveError::External(_)) => {
                    self.diagnostics
                        .push(&path, ErrorCode::ExternalReference, e.to_string())
                }
                Err(e) => self
                    .diagnostics
                    .push(&path, ErrorCode::UnresolvedReference, e.to_string()),
            }
        }
    }

    fn preamble(&mut self, value: &Value, path: &ErrorPath) -> Preamble {
        let Some(obj) = value.as_object() else {
            self.diagnostics.push(
                path,
                ErrorCode::InvalidType,
                format!("preamble must be an object, got {}", json_type(value)),
            );
            return Preamble::default();
        };

        let plutus_version = match obj.get("plutusVersion") {
            None => {
                self.diagnostics
                    .push(path, ErrorCode::MissingField, "missing 'plutusVersion'");
                PlutusVersion::default()
            }
            Some(raw) => match raw.as_str().and_then(PlutusVersion::parse) {
                Some(version) => version,
                None => {
                    self.diagnostics.push(
                        &path.join("plutusVersion"),
                        ErrorCode::InvalidEnum,
                        format!("plutusVersion must be one of v1, v2, v3, got {}", raw),
                    );
                    PlutusVersion::default()
                }
            },
        };

        let compiler = match obj.get("compiler") {
            None => None,
            Some(Value::Object(compiler)) => {
                let compiler_path = path.join("compiler");
                Some(Compiler {
                    name: self
                        .required_string(compiler, "name", &compiler_path)
                        .unwrap_or_default(),
                    version: self.optional_string(compiler, "version", &compiler_path),
                })
            }
            Some(other) => {
                self.diagnostics.push(
                    &path.join("compiler"),
                    ErrorCode::InvalidType,
                    format!("compiler must be an object, got {}", json_type(other)),
                );
                None
            }
        };

        let preamble = Preamble {
            title: self.required_string(obj, "title", path).unwrap_or_default(),
            description: self.optional_string(obj, "description", path),
            version: self.required_string(obj, "version", path).unwrap_or_default(),
            compiler,
            plutus_version,
            license: self.optional_string(obj, "license", path),
            extras: extras(obj, PREAMBLE_KEYS),
        };

        if !preamble.version.is_empty() && preamble.semver().is_none() {
            warn!(version = %preamble.version, "preamble version is not a semantic version");
        }
        preamble
    }

    fn validator(&mut self, value: &Value, parent: &ErrorPath, index: usize) -> Option<ValidatorEntry> {
        let Some(obj) = value.as_object() else {
            self.diagnostics.push(
                &parent.join(index),
                ErrorCode::InvalidType,
                format!("validator must be an object, got {}", json_type(value)),
            );
            return None;
        };

        // The index is only a placeholder until the title is known
        let (path, title) = match obj.get("title") {
            Some(Value::String(title)) => (parent.join(title.as_str()), title.clone()),
            Some(other) => {
                let path = parent.join(index);
                self.diagnostics.push(
                    &path.join("title"),
                    ErrorCode::InvalidType,
                    format!("'title' must be a string, got {}", json_type(other)),
                );
                (path, String::new())
            }
            None => {
                let path = parent.join(index);
                self.diagnostics
                    .push(&path, ErrorCode::MissingField, "missing 'title'");
                (path, String::new())
            }
        };

        let datum = self.slot(obj, "datum", &path);
        let redeemer = self.slot(obj, "redeemer", &path);
        let parameters = self.parameters(obj, &path);
        let compiled_code = self.hex_field(obj, "compiledCode", &path);
        let hash = self.hex_field(obj, "hash", &path);

        if let Some(hash) = &hash {
            if hash.len() != HASH_HEX_LEN {
                self.diagnostics.push(
                    &path.join("hash"),
                    ErrorCode::InvalidLength,
                    format!(
                        "hash must be 28 bytes ({} hex characters), got {}",
                        HASH_HEX_LEN,
                        hash.len()
                    ),
                );
            }
        }

        let has_code = obj.contains_key("compiledCode");
        let has_hash = obj.contains_key("hash");
        match split_title(&title).1 {
            TitleSuffix::Else if !has_code && !has_hash => self.diagnostics.push(
                &path,
                ErrorCode::MissingCodeOrHash,
                "fallback validator needs 'compiledCode' or 'hash'",
            ),
            TitleSuffix::Else => {}
            _ if !has_code => self.diagnostics.push(
                &path,
                ErrorCode::MissingCompiledCode,
                "validator is missing 'compiledCode'",
            ),
            _ => {}
        }

        Some(ValidatorEntry {
            title,
            datum,
            redeemer,
            parameters,
            compiled_code,
            hash,
            extras: extras(obj, VALIDATOR_KEYS),
        })
    }

    fn slot(&mut self, obj: &Map<String, Value>, key: &str, parent: &ErrorPath) -> Option<Slot> {
        let raw = obj.get(key)?;
        let path = parent.join(key);
        let Some(slot) = raw.as_object() else {
            self.diagnostics.push(
                &path,
                ErrorCode::InvalidType,
                format!("'{}' must be an object, got {}", key, json_type(raw)),
            );
            return None;
        };

        let schema = match slot.get("schema") {
            Some(schema) => {
                let schema_path = path.join("schema");
                let node = NodeParser::new(self.diagnostics).parse(schema, &schema_path, Namespace::Data);
                self.note_references(&node, &schema_path);
                node
            }
            None => {
                self.diagnostics
                    .push(&path, ErrorCode::MissingField, "missing 'schema'");
                SchemaNode::opaque()
            }
        };

        Some(Slot {
            title: self.optional_string(slot, "title", &path),
            description: self.optional_string(slot, "description", &path),
            schema,
            extras: extras(slot, SLOT_KEYS),
        })
    }

    fn parameters(&mut self, obj: &Map<String, Value>, parent: &ErrorPath) -> Option<Vec<Parameter>> {
        let raw = obj.get("parameters")?;
        let Some(entries) = raw.as_array() else {
            warn!(
                path = %parent,
                found = json_type(raw),
                "'parameters' is not an array, treating as no parameters"
            );
            return None;
        };

        let path = parent.join("parameters");
        let mut parameters = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let entry_path = path.join(i);
            let Some(param) = entry.as_object() else {
                self.diagnostics.push(
                    &entry_path,
                    ErrorCode::InvalidType,
                    format!("parameter must be an object, got {}", json_type(entry)),
                );
                continue;
            };
            let schema = match param.get("schema") {
                Some(schema) => {
                    let schema_path = entry_path.join("schema");
                    let node = NodeParser::new(self.diagnostics).parse(schema, &schema_path, Namespace::Data);
                    self.note_references(&node, &schema_path);
                    node
                }
                None => {
                    self.diagnostics
                        .push(&entry_path, ErrorCode::MissingField, "missing 'schema'");
                    SchemaNode::opaque()
                }
            };
            parameters.push(Parameter {
                title: self
                    .required_string(param, "title", &entry_path)
                    .unwrap_or_default(),
                description: self.optional_string(param, "description", &entry_path),
                schema,
                extras: extras(param, SLOT_KEYS),
            });
        }
        Some(parameters)
    }

    /// Optional hex string, lowercased
    fn hex_field(&mut self, obj: &Map<String, Value>, key: &str, parent: &ErrorPath) -> Option<String> {
        match obj.get(key)? {
            Value::String(s) if codec::is_hex(s) => Some(s.to_ascii_lowercase()),
            Value::String(_) => {
                self.diagnostics.push(
                    &parent.join(key),
                    ErrorCode::InvalidHex,
                    format!("'{}' must be an even-length hex string", key),
                );
                None
            }
            other => {
                self.diagnostics.push(
                    &parent.join(key),
                    ErrorCode::InvalidType,
                    format!("'{}' must be a string, got {}", key, json_type(other)),
                );
                None
            }
        }
    }

    fn required_string(&mut self, obj: &Map<String, Value>, key: &str, path: &ErrorPath) -> Option<String> {
        if !obj.contains_key(key) {
            self.diagnostics
                .push(path, ErrorCode::MissingField, format!("missing '{}'", key));
            return None;
        }
        self.optional_string(obj, key, path)
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

fn extras(obj: &Map<String, Value>, known: &[&str]) -> BTreeMap<String, Value> {
    obj.iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
