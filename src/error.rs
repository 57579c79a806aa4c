//! Error types for blueprint handling

use thiserror::Error;

use crate::diagnostics::StructuralError;

/// Result type for blueprint operations
pub type Result<T> = std::result::Result<T, BlueprintError>;

/// Blueprint library errors
#[derive(Error, Debug)]
pub enum BlueprintError {
    #[error("Blueprint is invalid: {} problem(s), first: {}", .0.len(), first_message(.0))]
    Invalid(Vec<StructuralError>),

    #[error("Validator not found: {0}")]
    ValidatorNotFound(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

fn first_message(errors: &[StructuralError]) -> String {
    errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none".to_string())
}

/// Reference resolution failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unresolved reference {reference}{}", suggestion_suffix(.suggestion))]
    NotFound {
        reference: String,
        suggestion: Option<String>,
    },

    #[error("external reference {0} is not supported")]
    External(String),

    #[error("reference cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(key) => format!(" (did you mean '{}'?)", key),
        None => String::new(),
    }
}
