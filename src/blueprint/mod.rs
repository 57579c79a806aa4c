//! Blueprint Documents
//!
//! Typed model of a CIP-57 blueprint: a preamble, the raw validator entries as
//! written by the compiler, and the definition table. [`validate`] builds it
//! from JSON; [`group`] consolidates the entries into one [`ParsedValidator`]
//! per logical validator.
//!
//! ```text
//! plutus.json
//! ├── preamble            title, version, compiler, plutusVersion
//! ├── validators[]        "<module>.<name>.<purpose>" or "<module>.<name>.else"
//! │   ├── datum / redeemer
//! │   ├── parameters[]
//! │   ├── compiledCode
//! │   └── hash
//! └── definitions         "<key>" -> schema node
//! ```

pub mod group;
pub mod validate;

pub use group::{check_equality_guards, group_and_guard};
pub use validate::{validate_definition, validate_document, RawDocument};

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::diagnostics::{Diagnostics, StructuralError};
use crate::error::{BlueprintError, Result};
use crate::schema::{Definitions, NodeKind, SchemaNode};

// =============================================================================
// Purposes and Titles
// =============================================================================

/// Ledger role a validator plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Spend,
    Mint,
    Withdraw,
    Publish,
    Vote,
    Propose,
}

impl Purpose {
    pub const ALL: [Purpose; 6] = [
        Purpose::Spend,
        Purpose::Mint,
        Purpose::Withdraw,
        Purpose::Publish,
        Purpose::Vote,
        Purpose::Propose,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Spend => "spend",
            Purpose::Mint => "mint",
            Purpose::Withdraw => "withdraw",
            Purpose::Publish => "publish",
            Purpose::Vote => "vote",
            Purpose::Propose => "propose",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Purpose::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown purpose '{}'", s))
    }
}

/// Trailing segment of a validator title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSuffix {
    Purpose(Purpose),
    /// Fallback handler (`.else`)
    Else,
    /// Anything else, including titles without a dot
    Other,
}

/// Split a dotted title into its base name and trailing suffix.
///
/// For [`TitleSuffix::Other`] the base is the whole title.
pub fn split_title(title: &str) -> (&str, TitleSuffix) {
    let Some((base, last)) = title.rsplit_once('.') else {
        return (title, TitleSuffix::Other);
    };
    if last == "else" {
        return (base, TitleSuffix::Else);
    }
    match last.parse::<Purpose>() {
        Ok(purpose) => (base, TitleSuffix::Purpose(purpose)),
        Err(_) => (title, TitleSuffix::Other),
    }
}

// =============================================================================
// Preamble
// =============================================================================

/// Target Plutus language version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlutusVersion {
    V1,
    V2,
    #[default]
    V3,
}

impl PlutusVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "v1" => Some(Self::V1),
            "v2" => Some(Self::V2),
            "v3" => Some(Self::V3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Compiler {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preamble {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<Compiler>,
    pub plutus_version: PlutusVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

impl Preamble {
    /// Blueprint version as semver, tolerating a leading `v`
    pub fn semver(&self) -> Option<Version> {
        let version = self.version.strip_prefix('v').unwrap_or(&self.version);
        Version::parse(version).ok()
    }
}

// =============================================================================
// Validator Entries
// =============================================================================

/// Datum or redeemer declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: SchemaNode,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

/// Validator parameter applied before deployment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: SchemaNode,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

/// One raw entry of `validators`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorEntry {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datum: Option<Slot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemer: Option<Slot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiled_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

impl ValidatorEntry {
    pub fn suffix(&self) -> TitleSuffix {
        split_title(&self.title).1
    }

    pub fn base_title(&self) -> &str {
        split_title(&self.title).0
    }

    /// Declared parameters; absent means none
    pub fn parameters(&self) -> &[Parameter] {
        self.parameters.as_deref().unwrap_or_default()
    }
}

/// A structurally valid blueprint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlueprintDocument {
    pub preamble: Preamble,
    pub validators: Vec<ValidatorEntry>,
    #[serde(skip_serializing_if = "Definitions::is_empty")]
    pub definitions: Definitions,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

// =============================================================================
// Grouped View
// =============================================================================

/// Which declaration of a purpose entry to look at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Datum,
    Redeemer,
}

impl FromStr for SlotKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "datum" => Ok(SlotKind::Datum),
            "redeemer" => Ok(SlotKind::Redeemer),
            other => Err(format!("unknown slot '{}'", other)),
        }
    }
}

/// Datum and redeemer of one purpose
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurposeSlots {
    /// Full title of the raw entry
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datum: Option<Slot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemer: Option<Slot>,
}

impl PurposeSlots {
    pub fn slot(&self, kind: SlotKind) -> Option<&Slot> {
        match kind {
            SlotKind::Datum => self.datum.as_ref(),
            SlotKind::Redeemer => self.redeemer.as_ref(),
        }
    }
}

/// All purposes of one logical validator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedValidator {
    /// Title without the purpose suffix
    pub title: String,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiled_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub purposes: BTreeMap<Purpose, PurposeSlots>,
}

impl ParsedValidator {
    pub fn purpose(&self, purpose: Purpose) -> Option<&PurposeSlots> {
        self.purposes.get(&purpose)
    }

    pub fn slot(&self, purpose: Purpose, kind: SlotKind) -> Option<&Slot> {
        self.purpose(purpose).and_then(|p| p.slot(kind))
    }
}

/// Blueprint with validators grouped by base title
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDocument {
    pub preamble: Preamble,
    pub validators: BTreeMap<String, ParsedValidator>,
    #[serde(skip_serializing_if = "Definitions::is_empty")]
    pub definitions: Definitions,
}

impl ParsedDocument {
    pub fn validator(&self, base_title: &str) -> Option<&ParsedValidator> {
        self.validators.get(base_title)
    }

    /// Like [`ParsedDocument::validator`], failing with a typed error
    pub fn require_validator(&self, base_title: &str) -> Result<&ParsedValidator> {
        self.validator(base_title)
            .ok_or_else(|| BlueprintError::ValidatorNotFound(base_title.to_string()))
    }

    /// Schema named by a selector.
    ///
    /// Accepted forms: a local reference (`#/definitions/Int`), a slot
    /// (`<validator>.<purpose>.datum` or `.redeemer`), or a definition key.
    pub fn select_schema(&self, selector: &str) -> Result<SchemaNode> {
        if selector.starts_with('#') {
            self.definitions.resolve(selector)?;
            return Ok(SchemaNode::new(NodeKind::Reference(selector.to_string())));
        }

        let mut parts = selector.rsplitn(3, '.');
        if let (Some(slot), Some(purpose), Some(base)) = (parts.next(), parts.next(), parts.next()) {
            if let (Ok(kind), Ok(purpose)) = (slot.parse::<SlotKind>(), purpose.parse::<Purpose>()) {
                let validator = self.require_validator(base)?;
                return validator
                    .slot(purpose, kind)
                    .map(|s| s.schema.clone())
                    .ok_or_else(|| BlueprintError::SlotNotFound(selector.to_string()));
            }
        }

        if self.definitions.get(selector).is_some() {
            return Ok(SchemaNode::reference_to(selector));
        }
        Err(BlueprintError::SlotNotFound(selector.to_string()))
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Structural validation followed by grouping and equality guards.
///
/// Guard violations are reported alongside structural ones: the guards run on
/// the best-effort document even when the structural pass found problems.
pub fn load_blueprint<'a>(
    raw: impl Into<RawDocument<'a>>,
) -> std::result::Result<ParsedDocument, Vec<StructuralError>> {
    let value = raw.into().into_value().map_err(|e| vec![e])?;
    let (document, mut diagnostics) = validate::parse_document(&value);
    let (parsed, guard_errors) = group::group(&document);
    diagnostics.extend(guard_errors);
    finish(parsed, diagnostics)
}

/// Read and load a blueprint file
pub fn load_blueprint_file(path: impl AsRef<Path>) -> Result<ParsedDocument> {
    let text = std::fs::read_to_string(path.as_ref())?;
    load_blueprint(text.as_str()).map_err(BlueprintError::Invalid)
}

fn finish<T>(value: T, diagnostics: Diagnostics) -> std::result::Result<T, Vec<StructuralError>> {
    if diagnostics.is_empty() {
        Ok(value)
    } else {
        Err(diagnostics.into_vec())
    }
}
