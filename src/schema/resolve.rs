//! Reference Resolution
//!
//! Resolves local `#/definitions/<key>` references one level at a time.
//! Keys are single JSON-pointer segments: `~1` stands for `/` and `~0` for `~`.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::trace;

use super::{Definitions, SchemaNode};
use crate::error::ResolveError;

pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Definition key named by a reference
pub fn decode_reference(reference: &str) -> Result<String, ResolveError> {
    if !reference.starts_with('#') {
        return Err(ResolveError::External(reference.to_string()));
    }
    let Some(encoded) = reference.strip_prefix(DEFINITIONS_PREFIX) else {
        return Err(ResolveError::NotFound {
            reference: reference.to_string(),
            suggestion: None,
        });
    };
    // More than one segment cannot name a definition key
    if encoded.is_empty() || encoded.contains('/') {
        return Err(ResolveError::NotFound {
            reference: reference.to_string(),
            suggestion: None,
        });
    }
    Ok(encoded.replace("~1", "/").replace("~0", "~"))
}

/// Inverse of the segment decoding used by [`decode_reference`]
pub fn encode_key(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Resolve a reference against a definition table (one level)
pub fn resolve<'a>(
    reference: &str,
    definitions: &'a Definitions,
) -> Result<&'a SchemaNode, ResolveError> {
    let key = decode_reference(reference)?;
    trace!(reference, key = %key, "resolving reference");
    definitions
        .get(&key)
        .ok_or_else(|| ResolveError::NotFound {
            reference: reference.to_string(),
            suggestion: suggest(&key, definitions),
        })
}

/// Follow a chain of references until a non-reference node.
///
/// A reference seen twice on the chain is reported as a cycle.
pub fn resolve_deep<'a>(
    node: &'a SchemaNode,
    definitions: &'a Definitions,
) -> Result<&'a SchemaNode, ResolveError> {
    let mut current = node;
    let mut chain: Vec<String> = Vec::new();
    while let Some(reference) = current.reference() {
        if chain.iter().any(|seen| seen == reference) {
            chain.push(reference.to_string());
            return Err(ResolveError::Cycle(chain));
        }
        chain.push(reference.to_string());
        current = resolve(reference, definitions)?;
    }
    Ok(current)
}

/// Closest definition key to a missing one
fn suggest(missing: &str, definitions: &Definitions) -> Option<String> {
    let matcher = SkimMatcherV2::default();
    definitions
        .keys()
        .filter_map(|key| matcher.fuzzy_match(key, missing).map(|score| (score, key)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, key)| key.to_string())
}

impl Definitions {
    /// See [`resolve`]
    pub fn resolve(&self, reference: &str) -> Result<&SchemaNode, ResolveError> {
        resolve(reference, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataType, IntegerRules, NodeKind};

    fn int_node() -> SchemaNode {
        SchemaNode::new(NodeKind::Data(DataType::Integer(IntegerRules::default())))
    }

    #[test]
    fn test_decode_escaped_segment() {
        assert_eq!(
            decode_reference("#/definitions/aiken~1crypto~1VerificationKeyHash").unwrap(),
            "aiken/crypto/VerificationKeyHash"
        );
        assert_eq!(decode_reference("#/definitions/a~0b").unwrap(), "a~b");
        assert_eq!(encode_key("a~b/c"), "a~0b~1c");
    }

    #[test]
    fn test_decode_rejects_multi_segment_and_external() {
        assert!(matches!(
            decode_reference("#/definitions/a/b"),
            Err(ResolveError::NotFound { .. })
        ));
        assert!(matches!(
            decode_reference("other.json#/definitions/Int"),
            Err(ResolveError::External(_))
        ));
    }

    #[test]
    fn test_resolve_one_level() {
        let mut defs = Definitions::new();
        defs.insert("Int", int_node());
        defs.insert("Alias", SchemaNode::reference_to("Int"));

        let alias = resolve("#/definitions/Alias", &defs).unwrap();
        assert_eq!(alias.reference(), Some("#/definitions/Int"));

        let deep = resolve_deep(alias, &defs).unwrap();
        assert_eq!(deep, &int_node());
    }

    #[test]
    fn test_missing_key_suggests_nearby() {
        let mut defs = Definitions::new();
        defs.insert("cardano/assets/PolicyId", int_node());
        let err = resolve("#/definitions/PolicyId", &defs).unwrap_err();
        match err {
            ResolveError::NotFound { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("cardano/assets/PolicyId"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut defs = Definitions::new();
        defs.insert("A", SchemaNode::reference_to("B"));
        defs.insert("B", SchemaNode::reference_to("A"));
        let start = SchemaNode::reference_to("A");
        let err = resolve_deep(&start, &defs).unwrap_err();
        assert!(matches!(err, ResolveError::Cycle(chain) if chain.len() == 3));
    }
}
