//! Blueprint Schemas
//!
//! Structural and value validation for CIP-57 Plutus blueprints, the JSON
//! documents a smart-contract compiler emits next to its validators.
//!
//! ## Features
//!
//! - **Structural Validation**: Every grammar problem in a blueprint, with its path and code
//! - **Grouping**: Per-purpose validator entries folded into one record per validator
//! - **Equality Guards**: Shared code, hash and parameters checked across purposes
//! - **Value Validation**: Runtime values checked against datum, redeemer or parameter schemas
//! - **Parameter Descriptors**: Form-friendly trees with validate/coerce for user input
//!
//! ## Architecture
//!
//! ```text
//! raw JSON
//!   └── blueprint::validate   (schema::parse for every node)
//!         └── blueprint::group   (purposes + equality guards)
//!               ├── value::check        (runtime values)
//!               └── params::describe    (input descriptors)
//! ```

pub mod blueprint;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod params;
pub mod schema;
pub mod value;

pub use blueprint::{
    group_and_guard, load_blueprint, load_blueprint_file, validate_definition, validate_document,
    BlueprintDocument, ParsedDocument, ParsedValidator, Purpose, RawDocument,
};
pub use config::BlueprintConfig;
pub use diagnostics::{ErrorCode, ErrorPath, StructuralError};
pub use error::{BlueprintError, ResolveError, Result};
pub use params::{build_descriptors, describe, CoercedValue, ParamDescriptor};
pub use schema::{resolve, Definitions, SchemaNode};
pub use value::{check, CheckReport, Mismatch, ValueCheckConfig};
