//! Grouping and Equality Guards
//!
//! Compilers emit one validator entry per purpose (`gift.gift.spend`,
//! `gift.gift.mint`, ...). This pass folds them into one [`ParsedValidator`]
//! per base title and checks that the fields they must share agree.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{
    split_title, BlueprintDocument, ParsedDocument, ParsedValidator, PurposeSlots, TitleSuffix,
    ValidatorEntry,
};
use crate::codec;
use crate::diagnostics::{Diagnostics, ErrorCode, ErrorPath, StructuralError};

/// Group validators by base title and run the equality guards
pub fn group_and_guard(document: &BlueprintDocument) -> Result<ParsedDocument, Vec<StructuralError>> {
    let (parsed, diagnostics) = group(document);
    super::finish(parsed, diagnostics)
}

/// Equality guard violations only
pub fn check_equality_guards(document: &BlueprintDocument) -> Vec<StructuralError> {
    group(document).1.into_vec()
}

pub(crate) fn group(document: &BlueprintDocument) -> (ParsedDocument, Diagnostics) {
    let mut validators: BTreeMap<String, ParsedValidator> = BTreeMap::new();
    let mut members: BTreeMap<&str, Vec<&ValidatorEntry>> = BTreeMap::new();

    for entry in &document.validators {
        let (base, suffix) = split_title(&entry.title);
        let purpose = match suffix {
            TitleSuffix::Else => {
                debug!(title = %entry.title, "skipping fallback handler");
                continue;
            }
            TitleSuffix::Other => None,
            TitleSuffix::Purpose(purpose) => Some(purpose),
        };

        let record = validators
            .entry(base.to_string())
            .or_insert_with(|| ParsedValidator {
                title: base.to_string(),
                parameters: entry.parameters().to_vec(),
                compiled_code: entry.compiled_code.clone(),
                hash: entry.hash.clone(),
                purposes: BTreeMap::new(),
            });

        let Some(purpose) = purpose else { continue };
        match record.purposes.entry(purpose) {
            Entry::Vacant(slot) => {
                slot.insert(PurposeSlots {
                    title: entry.title.clone(),
                    datum: entry.datum.clone(),
                    redeemer: entry.redeemer.clone(),
                });
            }
            Entry::Occupied(_) => {
                warn!(title = %entry.title, "duplicate purpose entry, keeping the first");
            }
        }
        // Duplicates still share the guarded fields
        members.entry(base).or_default().push(entry);
    }

    validators.retain(|base, record| {
        let keep = !record.purposes.is_empty();
        if !keep {
            debug!(base = %base, "discarding validator without purposes");
        }
        keep
    });

    let mut diagnostics = Diagnostics::new();
    for entries in members.values() {
        guard(entries, &mut diagnostics);
    }

    debug!(
        validators = validators.len(),
        guard_errors = diagnostics.len(),
        "grouping pass finished"
    );

    let parsed = ParsedDocument {
        preamble: document.preamble.clone(),
        validators,
        definitions: document.definitions.clone(),
    };
    (parsed, diagnostics)
}

/// Compare every purpose entry of one base against the first
fn guard(entries: &[&ValidatorEntry], diagnostics: &mut Diagnostics) {
    let Some((first, rest)) = entries.split_first() else {
        return;
    };
    let first_params = parameter_key(first);

    for entry in rest {
        let path = ErrorPath::root().join("validators").join(entry.title.as_str());
        if entry.compiled_code != first.compiled_code {
            diagnostics.push(
                &path.join("compiledCode"),
                ErrorCode::EqualityGuard,
                format!("compiledCode differs from '{}'", first.title),
            );
        }
        if entry.hash != first.hash {
            diagnostics.push(
                &path.join("hash"),
                ErrorCode::EqualityGuard,
                format!("hash differs from '{}'", first.title),
            );
        }
        if parameter_key(entry) != first_params {
            diagnostics.push(
                &path.join("parameters"),
                ErrorCode::EqualityGuard,
                format!("parameters differ from '{}'", first.title),
            );
        }
    }
}

/// Order-independent structural key of a parameter list
fn parameter_key(entry: &ValidatorEntry) -> Vec<String> {
    let mut keys: Vec<String> = entry
        .parameters()
        .iter()
        .map(|p| codec::canonical_key(&(&p.title, &p.schema)))
        .collect();
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{validate_document, Parameter, Purpose};
    use crate::schema::SchemaNode;

    fn entry(title: &str, code: &str) -> ValidatorEntry {
        ValidatorEntry {
            title: title.to_string(),
            compiled_code: Some(code.to_string()),
            ..Default::default()
        }
    }

    fn param(title: &str, key: &str) -> Parameter {
        Parameter {
            title: title.to_string(),
            description: None,
            schema: SchemaNode::reference_to(key),
            extras: BTreeMap::new(),
        }
    }

    fn document(validators: Vec<ValidatorEntry>) -> BlueprintDocument {
        BlueprintDocument {
            validators,
            ..Default::default()
        }
    }

    #[test]
    fn test_groups_purposes_under_base() {
        let doc = document(vec![
            entry("gift.gift.spend", "aa"),
            entry("gift.gift.mint", "aa"),
            entry("gift.gift.else", "aa"),
            entry("other.other.withdraw", "bb"),
        ]);
        let parsed = group_and_guard(&doc).unwrap();
        assert_eq!(parsed.validators.len(), 2);
        let gift = parsed.validator("gift.gift").unwrap();
        let purposes: Vec<Purpose> = gift.purposes.keys().copied().collect();
        assert_eq!(purposes, vec![Purpose::Spend, Purpose::Mint]);
        assert_eq!(gift.purpose(Purpose::Mint).unwrap().title, "gift.gift.mint");
    }

    #[test]
    fn test_purpose_set_is_order_independent() {
        let forward = group_and_guard(&document(vec![
            entry("v.v.spend", "aa"),
            entry("v.v.vote", "aa"),
            entry("v.v.propose", "aa"),
        ]))
        .unwrap();
        let reverse = group_and_guard(&document(vec![
            entry("v.v.propose", "aa"),
            entry("v.v.vote", "aa"),
            entry("v.v.spend", "aa"),
        ]))
        .unwrap();
        assert_eq!(
            forward.validators["v.v"].purposes.keys().collect::<Vec<_>>(),
            reverse.validators["v.v"].purposes.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_unrecognized_titles_are_discarded() {
        let parsed = group_and_guard(&document(vec![entry("legacy.validator", "aa")])).unwrap();
        assert!(parsed.validators.is_empty());
    }

    #[test]
    fn test_first_entry_supplies_shared_fields() {
        let mut first = entry("v.v.spend", "aa");
        first.parameters = Some(vec![param("owner", "ByteArray")]);
        first.hash = Some("11".repeat(28));
        let mut second = entry("v.v.mint", "aa");
        second.parameters = Some(vec![param("owner", "ByteArray")]);
        second.hash = Some("11".repeat(28));

        let parsed = group_and_guard(&document(vec![first, second])).unwrap();
        let v = &parsed.validators["v.v"];
        assert_eq!(v.parameters.len(), 1);
        assert_eq!(v.parameters[0].title, "owner");
        assert_eq!(v.hash.as_deref(), Some("11".repeat(28).as_str()));
    }

    #[test]
    fn test_duplicate_purpose_keeps_first() {
        let mut later = entry("v.v.spend", "aa");
        later.datum = Some(crate::blueprint::Slot {
            title: Some("later".to_string()),
            description: None,
            schema: SchemaNode::opaque(),
            extras: BTreeMap::new(),
        });
        let parsed = group_and_guard(&document(vec![entry("v.v.spend", "aa"), later])).unwrap();
        assert!(parsed.validators["v.v"].slot(Purpose::Spend, crate::blueprint::SlotKind::Datum).is_none());
    }

    #[test]
    fn test_differing_parameters_keep_first_and_are_guarded() {
        let mut first = entry("v.v.spend", "aa");
        first.parameters = Some(vec![param("owner", "ByteArray")]);
        let mut second = entry("v.v.mint", "aa");
        second.parameters = Some(vec![param("deadline", "Int"), param("owner", "ByteArray")]);

        let (parsed, diagnostics) = group(&document(vec![first, second]));
        let v = &parsed.validators["v.v"];
        let names: Vec<&str> = v.parameters.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(names, vec!["owner"]);

        let errs = diagnostics.into_vec();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::EqualityGuard);
        assert_eq!(errs[0].path.to_string(), "/validators/v.v.mint/parameters");
    }

    #[test]
    fn test_duplicate_purpose_is_still_guarded() {
        let doc = document(vec![entry("m.v.spend", "aa"), entry("m.v.spend", "bb")]);
        let errs = group_and_guard(&doc).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::EqualityGuard);
        assert_eq!(errs[0].path.to_string(), "/validators/m.v.spend/compiledCode");
    }

    #[test]
    fn test_equality_guard_on_compiled_code() {
        let doc = document(vec![
            entry("v.v.spend", "aa"),
            entry("v.v.mint", "bb"),
            entry("w.w.spend", "cc"),
            entry("w.w.mint", "cc"),
        ]);
        let errs = group_and_guard(&doc).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::EqualityGuard);
        assert_eq!(errs[0].path.to_string(), "/validators/v.v.mint/compiledCode");
    }

    #[test]
    fn test_parameter_order_does_not_matter() {
        let mut a = entry("v.v.spend", "aa");
        a.parameters = Some(vec![param("x", "Int"), param("y", "ByteArray")]);
        let mut b = entry("v.v.mint", "aa");
        b.parameters = Some(vec![param("y", "ByteArray"), param("x", "Int")]);
        assert!(group_and_guard(&document(vec![a.clone(), b])).is_ok());

        let mut c = entry("v.v.mint", "aa");
        c.parameters = Some(vec![param("x", "Int")]);
        let errs = group_and_guard(&document(vec![a, c])).unwrap_err();
        assert_eq!(errs[0].path.to_string(), "/validators/v.v.mint/parameters");
    }

    #[test]
    fn test_every_base_is_checked() {
        let doc = document(vec![
            entry("a.a.spend", "01"),
            entry("a.a.mint", "02"),
            entry("b.b.spend", "03"),
            entry("b.b.mint", "04"),
        ]);
        assert_eq!(check_equality_guards(&doc).len(), 2);
    }

    #[test]
    fn test_grouping_after_validation() {
        let doc = validate_document(&serde_json::json!({
            "preamble": {"title": "t", "version": "1.0.0", "plutusVersion": "v2"},
            "validators": [
                {"title": "m.v.spend", "compiledCode": "00"},
                {"title": "m.v.mint", "compiledCode": "00"}
            ]
        }))
        .unwrap();
        let parsed = group_and_guard(&doc).unwrap();
        assert_eq!(parsed.validators["m.v"].purposes.len(), 2);
    }
}
