use std::sync::Arc;

use performer::registry::{
    KindEntry, ParamMatcher, ParamType, ParamValue, Part, PartKind, PartQuery, PartRegistry,
    PartSeed, RegistryError, RegistryErrorKind, SignatureSpec, default_part,
};

fn body_registry() -> PartRegistry {
    PartRegistry::with_kinds(
        "guitar",
        [
            KindEntry::root("body_part"),
            KindEntry::child("finger", "body_part"),
            KindEntry::child("thumb", "finger"),
            KindEntry::root("string").with_cardinality(2),
        ],
    )
    .expect("kind table should build")
}

fn finger_signature() -> SignatureSpec {
    SignatureSpec::new(vec![ParamType::Symbol, ParamType::Int], vec![2, 5])
}

fn values(hand: &str, order: i64) -> Vec<ParamValue> {
    vec![ParamValue::symbol(hand), ParamValue::Int(order)]
}

#[test]
fn given_finger_signature_when_created_twice_then_same_part_is_returned() {
    let mut registry = body_registry();
    let first = registry
        .create_part("finger", Some(finger_signature()), values("right", 2))
        .expect("first creation should succeed");
    let second = registry
        .create_part("finger", Some(finger_signature()), values("right", 2))
        .expect("second creation should succeed");

    assert_eq!(first, second);
    assert_eq!(registry.parts().len(), 1);

    let found = registry
        .find("finger")
        .with_values(values("right", 2))
        .one()
        .expect("lookup should not be ambiguous")
        .expect("right finger 2 should exist");
    assert_eq!(found.id, first);

    let missing = registry
        .find("finger")
        .with_values(values("left", 2))
        .one()
        .expect("lookup should not be ambiguous");
    assert!(missing.is_none());
}

#[test]
fn given_values_beyond_range_estimate_when_created_then_identity_stays_exact() {
    let mut registry = body_registry();
    let mut ids = Vec::new();
    for order in [7, 9, 7, 12, 9] {
        ids.push(
            registry
                .create_part("finger", Some(finger_signature()), values("left", order))
                .expect("creation past the range estimate should succeed"),
        );
    }

    assert_eq!(ids[0], ids[2]);
    assert_eq!(ids[1], ids[4]);
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[0], ids[3]);
    assert_eq!(registry.parts().len(), 3);

    let found = registry
        .find("finger")
        .with_values(values("left", 12))
        .one()
        .expect("lookup should succeed")
        .expect("left finger 12 should exist");
    assert_eq!(found.id, ids[3]);
}

#[test]
fn given_registered_signature_when_arity_mismatches_then_configuration_error() {
    let mut registry = body_registry();
    registry
        .create_part("finger", Some(finger_signature()), values("right", 1))
        .expect("creation should succeed");

    let err = registry
        .create_part("finger", None, vec![ParamValue::symbol("right")])
        .expect_err("wrong arity must fail");
    assert_eq!(err.kind, RegistryErrorKind::Configuration);
}

#[test]
fn given_two_constructors_when_values_fit_neither_then_no_signature_is_inferred() {
    let mut registry = body_registry();
    registry
        .create_part("finger", Some(finger_signature()), values("right", 1))
        .expect("first constructor should register");
    registry
        .create_part(
            "finger",
            Some(SignatureSpec::new(vec![ParamType::Int], vec![10])),
            vec![ParamValue::Int(3)],
        )
        .expect("second constructor should register");

    let err = registry
        .create_part("finger", None, vec![ParamValue::Bool(true)])
        .expect_err("no constructor matches a bool");
    assert_eq!(err.kind, RegistryErrorKind::Configuration);

    let by_int = registry
        .create_part("finger", None, vec![ParamValue::Int(3)])
        .expect("int tuple selects the int constructor");
    assert_eq!(registry.part(by_int).map(|part| part.signature), Some(1));
}

#[test]
fn given_predicates_when_finding_then_creation_order_scan_applies_positionally() {
    let mut registry = body_registry();
    for (hand, order) in [("left", 1), ("right", 3), ("left", 4), ("right", 2)] {
        registry
            .create_part("finger", Some(finger_signature()), values(hand, order))
            .expect("creation should succeed");
    }

    let query = PartQuery::any()
        .at(0, ParamMatcher::Exact(ParamValue::symbol("right")))
        .at(
            1,
            ParamMatcher::predicate(|value| matches!(value, ParamValue::Int(order) if *order >= 2)),
        );
    let found = registry
        .find_parts(&PartKind::new("finger"), &query)
        .expect("scan should succeed");
    let orders: Vec<_> = found.iter().map(|part| part.values[1].clone()).collect();
    assert_eq!(orders, vec![ParamValue::Int(3), ParamValue::Int(2)]);

    let sorted = registry
        .find("finger")
        .at(0, ParamMatcher::Exact(ParamValue::symbol("right")))
        .sorted_by(|lhs, rhs| lhs.values[1].cmp(&rhs.values[1]))
        .expect("sorted scan should succeed");
    let orders: Vec<_> = sorted.iter().map(|part| part.values[1].clone()).collect();
    assert_eq!(orders, vec![ParamValue::Int(2), ParamValue::Int(3)]);
}

#[test]
fn given_several_matches_when_unique_lookup_then_ambiguous_error() {
    let mut registry = body_registry();
    for order in [1, 2] {
        registry
            .create_part("finger", Some(finger_signature()), values("left", order))
            .expect("creation should succeed");
    }

    let err = registry
        .find("finger")
        .at(0, ParamMatcher::Exact(ParamValue::symbol("left")))
        .one()
        .expect_err("two left fingers match");
    assert_eq!(err.kind, RegistryErrorKind::Ambiguous);
}

#[test]
fn given_substitution_when_creating_abstract_kind_then_concrete_kind_is_built() {
    let mut registry = body_registry();
    registry
        .substitute("finger", "thumb")
        .expect("thumb is a kind of finger");

    let id = registry
        .create_part("finger", Some(finger_signature()), values("right", 1))
        .expect("creation should resolve through the substitution");
    let part = registry.part(id).expect("part should exist");
    assert_eq!(part.kind, PartKind::new("finger"));
    assert_eq!(part.concrete_kind, PartKind::new("thumb"));
    assert_eq!(
        registry
            .resolve_concrete_kind(&PartKind::new("finger"))
            .expect("resolution should succeed"),
        PartKind::new("thumb")
    );

    let found = registry
        .find("finger")
        .with_values(values("right", 1))
        .one()
        .expect("lookup should succeed");
    assert_eq!(found.map(|part| part.id), Some(id));
    assert_eq!(registry.parts_of_kind(&PartKind::new("body_part")).len(), 1);
}

#[test]
fn given_unrelated_kind_when_substituting_then_configuration_error() {
    let mut registry = body_registry();
    let err = registry
        .substitute("finger", "string")
        .expect_err("string is not a finger");
    assert_eq!(err.kind, RegistryErrorKind::Configuration);
}

#[test]
fn given_cardinality_when_exceeded_then_configuration_error() {
    let mut registry = body_registry();
    let signature = SignatureSpec::new(vec![ParamType::Int], vec![6]);
    for number in [1, 2] {
        registry
            .create_part("string", Some(signature.clone()), vec![ParamValue::Int(number)])
            .expect("within cardinality");
    }
    registry
        .create_part("string", Some(signature.clone()), vec![ParamValue::Int(1)])
        .expect("existing part is returned without counting");

    let err = registry
        .create_part("string", Some(signature), vec![ParamValue::Int(3)])
        .expect_err("third string exceeds cardinality");
    assert_eq!(err.kind, RegistryErrorKind::Configuration);
}

#[test]
fn given_factory_when_creating_then_factory_attributes_are_kept() {
    let mut registry = body_registry();
    registry
        .register_factory(
            "finger",
            vec![ParamType::Symbol, ParamType::Int],
            Arc::new(|seed: &PartSeed<'_>| -> Result<Part, RegistryError> {
                let mut part = default_part(seed);
                part.attributes
                    .insert("hand".to_string(), seed.values[0].to_string());
                Ok(part)
            }),
        )
        .expect("factory should register");

    let id = registry
        .create_part("finger", Some(finger_signature()), values("left", 3))
        .expect("factory-built part should be created");
    let part = registry.part(id).expect("part should exist");
    assert_eq!(part.attributes.get("hand").map(String::as_str), Some("left"));
}

#[test]
fn given_frozen_registry_when_creating_then_configuration_error() {
    let mut registry = body_registry();
    registry.freeze();
    let err = registry
        .create_part("finger", Some(finger_signature()), values("left", 1))
        .expect_err("frozen registry is read-only");
    assert_eq!(err.kind, RegistryErrorKind::Configuration);
    assert!(registry.is_frozen());
}
