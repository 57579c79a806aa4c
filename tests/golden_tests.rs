//! Golden Tests for Real-World Blueprints
//!
//! Loads complete blueprints from `tests/fixtures` and checks grouping,
//! guards, diagnostics, value checks and parameter descriptors end to end.

use std::collections::BTreeSet;
use std::path::Path;

use blueprint_schemas::blueprint::SlotKind;
use blueprint_schemas::params::{ParamKind, SemanticHint};
use blueprint_schemas::value::{check_report, MapAccepts};
use blueprint_schemas::{
    build_descriptors, describe, load_blueprint, load_blueprint_file, validate_document,
    BlueprintError, CoercedValue, ErrorCode, ParsedDocument, Purpose, StructuralError,
    ValueCheckConfig,
};
use num_bigint::BigInt;
use serde_json::json;

const HELLO_WORLD: &str = include_str!("fixtures/hello_world.json");
const MARKETPLACE: &str = include_str!("fixtures/marketplace.json");
const DRIFTED: &str = include_str!("fixtures/drifted_code.json");
const INVALID: &str = include_str!("fixtures/invalid.json");

fn fixtures_path() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").leak()
}

fn load(text: &str) -> ParsedDocument {
    match load_blueprint(text) {
        Ok(parsed) => parsed,
        Err(errors) => panic!("expected a valid blueprint, got {:#?}", errors),
    }
}

fn problems(text: &str) -> Vec<(String, ErrorCode)> {
    load_blueprint(text)
        .err()
        .unwrap_or_default()
        .into_iter()
        .map(|e: StructuralError| (e.path.to_string(), e.code))
        .collect()
}

// =============================================================================
// Hello World
// =============================================================================

#[test]
fn test_hello_world_groups_spend_only() {
    let parsed = load(HELLO_WORLD);

    assert_eq!(parsed.preamble.plutus_version.as_str(), "v3");
    assert_eq!(parsed.validators.len(), 1);

    let validator = parsed.validator("hello_world.hello_world").unwrap();
    let purposes: Vec<Purpose> = validator.purposes.keys().copied().collect();
    assert_eq!(purposes, vec![Purpose::Spend]);
    assert_eq!(
        validator.hash.as_deref(),
        Some("c1fe430f19ac248a8a7ea47db106002c4327e542c3fdc60ad6481103")
    );
    assert!(validator.parameters.is_empty());

    let spend = validator.purpose(Purpose::Spend).unwrap();
    assert_eq!(spend.title, "hello_world.hello_world.spend");
    assert!(spend.datum.is_some());
    assert!(spend.redeemer.is_some());
}

#[test]
fn test_hello_world_values() {
    let parsed = load(HELLO_WORLD);
    let config = ValueCheckConfig::default();

    let datum = parsed.select_schema("hello_world.hello_world.spend.datum").unwrap();
    let owner = "00".repeat(28);
    let ok = check_report(
        &datum,
        &json!({"constructor": 0, "fields": [owner]}),
        &parsed.definitions,
        &config,
    );
    assert!(ok.ok, "{:?}", ok.message);

    let redeemer = parsed.select_schema("hello_world.hello_world.spend.redeemer").unwrap();
    let wrong = check_report(
        &redeemer,
        &json!({"constructor": 0, "fields": ["not hex"]}),
        &parsed.definitions,
        &config,
    );
    assert!(!wrong.ok);
    assert!(wrong.message.unwrap().starts_with("at fields[0]:"));

    let arity = check_report(
        &redeemer,
        &json!({"constructor": 0, "fields": []}),
        &parsed.definitions,
        &config,
    );
    assert!(!arity.ok);
}

#[test]
fn test_hello_world_datum_descriptor() {
    let parsed = load(HELLO_WORLD);
    let datum = parsed.select_schema("hello_world.hello_world.spend.datum").unwrap();
    let descriptor = describe("datum", &datum, &parsed.definitions);

    assert_eq!(descriptor.kind, ParamKind::Constructor);
    assert_eq!(descriptor.alternatives.len(), 1);

    let constructor = &descriptor.alternatives[0];
    assert_eq!(constructor.constructor_index, Some(0));
    assert_eq!(constructor.children.len(), 1);

    let owner = &constructor.children[0];
    assert_eq!(owner.name, "owner");
    assert_eq!(owner.kind, ParamKind::Bytes);
    assert_eq!(owner.hint, Some(SemanticHint::Hash28));
    assert!(owner.validate(&"ab".repeat(28), &parsed.definitions).is_none());
    assert!(owner.validate(&"ab".repeat(27), &parsed.definitions).is_some());
}

#[test]
fn test_load_from_file() {
    let parsed = load_blueprint_file(fixtures_path().join("hello_world.json")).unwrap();
    assert!(parsed.validator("hello_world.hello_world").is_some());

    match load_blueprint_file(fixtures_path().join("invalid.json")) {
        Err(BlueprintError::Invalid(errors)) => assert!(!errors.is_empty()),
        other => panic!("expected Invalid, got {:?}", other.map(|_| ())),
    }
}

// =============================================================================
// Marketplace
// =============================================================================

#[test]
fn test_marketplace_purposes() {
    let parsed = load(MARKETPLACE);
    let allowed: BTreeSet<Purpose> = Purpose::ALL.into_iter().collect();

    for validator in parsed.validators.values() {
        assert!(!validator.purposes.is_empty());
        assert!(validator.purposes.keys().all(|p| allowed.contains(p)));
    }

    let market = parsed.validator("market.market").unwrap();
    let purposes: Vec<Purpose> = market.purposes.keys().copied().collect();
    assert_eq!(purposes, vec![Purpose::Spend, Purpose::Mint, Purpose::Withdraw]);
    assert!(market.slot(Purpose::Withdraw, SlotKind::Datum).is_none());
    assert!(market.slot(Purpose::Mint, SlotKind::Redeemer).is_some());

    let oracle = parsed.validator("oracle.oracle").unwrap();
    let purposes: Vec<Purpose> = oracle.purposes.keys().copied().collect();
    assert_eq!(purposes, vec![Purpose::Spend, Purpose::Vote]);
}

#[test]
fn test_marketplace_parameter_order_is_not_a_drift() {
    // mint lists the same parameters in a different order
    let parsed = load(MARKETPLACE);
    let market = parsed.validator("market.market").unwrap();
    let names: Vec<&str> = market.parameters.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(names, vec!["platform_key", "fee", "policy"]);
}

#[test]
fn test_marketplace_descriptors() {
    let parsed = load(MARKETPLACE);
    let market = parsed.validator("market.market").unwrap();
    let descriptors = build_descriptors(market, &parsed.definitions);
    assert_eq!(descriptors.len(), 3);

    let key = &descriptors[0];
    assert_eq!(key.hint, Some(SemanticHint::Hash28));

    let fee = &descriptors[1];
    assert_eq!(fee.kind, ParamKind::Integer);
    assert_eq!(
        fee.coerce("250", &parsed.definitions).unwrap(),
        CoercedValue::Integer(BigInt::from(250))
    );
    assert!(fee.validate("0", &parsed.definitions).is_some());
    assert!(fee.validate("ten", &parsed.definitions).is_some());

    let policy = &descriptors[2];
    assert_eq!(policy.hint, Some(SemanticHint::Hash28));
    let coerced = policy
        .coerce(&format!("0x{}", "AB".repeat(28)), &parsed.definitions)
        .unwrap();
    assert_eq!(coerced, CoercedValue::Bytes("ab".repeat(28)));
}

#[test]
fn test_marketplace_listing_descriptor() {
    let parsed = load(MARKETPLACE);
    let listing = parsed.select_schema("market/Listing").unwrap();
    let descriptor = describe("listing", &listing, &parsed.definitions);
    let fields = &descriptor.alternatives[0].children;

    let names: Vec<&str> = fields.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["seller", "price", "tokens", "royalty"]);
    assert_eq!(fields[0].hint, Some(SemanticHint::Hash28));

    let tokens = &fields[2];
    assert_eq!(tokens.kind, ParamKind::Map);
    let key = tokens.children.iter().find(|c| c.name == "key").unwrap();
    assert_eq!(key.hint, Some(SemanticHint::AssetName));

    let royalty = &fields[3];
    let alternatives: Vec<&str> = royalty.alternatives.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(alternatives, vec!["Some", "None"]);
}

#[test]
fn test_marketplace_listing_values() {
    let parsed = load(MARKETPLACE);
    let datum = parsed.select_schema("market.market.spend.datum").unwrap();
    let seller = "11".repeat(28);

    let listing = json!({
        "constructor": 0,
        "fields": [
            seller,
            1500,
            [["444f47", 10], ["434154", 1]],
            {"constructor": 1, "fields": []}
        ]
    });
    let report = check_report(&datum, &listing, &parsed.definitions, &ValueCheckConfig::default());
    assert!(report.ok, "{:?}", report.message);

    // Price has a minimum of 1
    let free = json!({
        "constructor": 0,
        "fields": [seller, 0, [], {"constructor": 1, "fields": []}]
    });
    let report = check_report(&datum, &free, &parsed.definitions, &ValueCheckConfig::default());
    assert!(report.message.unwrap().starts_with("at fields[1]:"));

    // Object-shaped maps need configuration
    let object_map = json!({
        "constructor": 0,
        "fields": [seller, 5, {"444f47": 10}, {"constructor": 0, "fields": [3]}]
    });
    assert!(!check_report(&datum, &object_map, &parsed.definitions, &ValueCheckConfig::default()).ok);
    let config = ValueCheckConfig {
        map_accepts: MapAccepts::Both,
        ..Default::default()
    };
    assert!(check_report(&datum, &object_map, &parsed.definitions, &config).ok);
}

#[test]
fn test_marketplace_withdraw_pair() {
    let parsed = load(MARKETPLACE);
    let redeemer = parsed.select_schema("market.market.withdraw.redeemer").unwrap();
    let config = ValueCheckConfig::default();

    assert!(check_report(&redeemer, &json!([42, "cafe"]), &parsed.definitions, &config).ok);

    let report = check_report(&redeemer, &json!([42, 7]), &parsed.definitions, &config);
    assert_eq!(report.message.as_deref().map(|m| m.starts_with("at right:")), Some(true));
}

#[test]
fn test_select_schema_errors() {
    let parsed = load(MARKETPLACE);
    assert!(matches!(
        parsed.select_schema("nope.nope.spend.datum"),
        Err(BlueprintError::ValidatorNotFound(_))
    ));
    assert!(matches!(
        parsed.select_schema("market.market.withdraw.datum"),
        Err(BlueprintError::SlotNotFound(_))
    ));
    assert!(parsed.select_schema("#/definitions/Missing").is_err());
}

// =============================================================================
// Drift
// =============================================================================

#[test]
fn test_drifted_code_guard_paths() {
    let found = problems(DRIFTED);
    assert_eq!(
        found,
        vec![
            (
                "/validators/market.market.mint/compiledCode".to_string(),
                ErrorCode::EqualityGuard
            ),
            (
                "/validators/market.market.withdraw/hash".to_string(),
                ErrorCode::EqualityGuard
            ),
        ]
    );
}

#[test]
fn test_drifted_document_is_structurally_valid() {
    // The guards are a second pass over a well-formed document
    let document = validate_document(DRIFTED).unwrap();
    assert_eq!(document.validators.len(), 6);
}

// =============================================================================
// Invalid
// =============================================================================

#[test]
fn test_invalid_blueprint_reports_everything() {
    let found = problems(INVALID);
    let expect = [
        ("/preamble/plutusVersion", ErrorCode::InvalidEnum),
        ("/validators/broken.broken.spend/datum/schema/dataType", ErrorCode::NamespaceViolation),
        ("/validators/broken.broken.spend/compiledCode", ErrorCode::InvalidHex),
        ("/validators/broken.broken.mint", ErrorCode::MissingCompiledCode),
        ("/validators/broken.broken.else", ErrorCode::MissingCodeOrHash),
        ("/validators/3", ErrorCode::MissingField),
        ("/definitions/Bad", ErrorCode::IncompleteConstructor),
        ("/definitions/Ambiguous", ErrorCode::AmbiguousNode),
        ("/definitions/Unknown/dataType", ErrorCode::UnknownDataType),
    ];
    for (path, code) in expect {
        assert!(
            found.iter().any(|(p, c)| p == path && *c == code),
            "missing {} at {} in {:#?}",
            code,
            path,
            found
        );
    }

    let codes: BTreeSet<ErrorCode> = found.iter().map(|(_, c)| *c).collect();
    assert!(codes.contains(&ErrorCode::KeywordNotAllowed));
    assert!(codes.contains(&ErrorCode::DuplicateIndex));

    // A bytes schema with maxLength is fine
    assert!(!found.iter().any(|(p, _)| p.starts_with("/definitions/Short")));
}

#[test]
fn test_invalid_text_is_a_json_parse_error() {
    let found = problems("{\"preamble\": ");
    assert_eq!(found, vec![("/".to_string(), ErrorCode::JsonParse)]);
}
