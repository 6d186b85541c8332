//! Integration tests for Value and LiveRef
//!
//! Tests value typing, equality semantics, and the serialization boundary.

use std::collections::HashSet;
use std::sync::Arc;

use lockstep_foundation::{EntityId, LiveRef, Type, Value};

struct Session {
    name: &'static str,
}

// =============================================================================
// Value Typing
// =============================================================================

#[test]
fn every_variant_reports_its_type() {
    let object = Arc::new(Session { name: "s" });
    let cases = [
        (Value::Bool(true), Type::Bool),
        (Value::Int(1), Type::Int),
        (Value::Float(1.5), Type::Float),
        (Value::from("text"), Type::String),
        (Value::EntityRef(EntityId::new(3)), Type::EntityRef),
        (Value::live(&object), Type::Live),
    ];

    for (value, ty) in cases {
        assert_eq!(value.value_type(), ty);
    }
}

#[test]
fn only_float_is_unhashable() {
    assert!(!Type::Float.is_hashable());
    for ty in [Type::Bool, Type::Int, Type::String, Type::EntityRef, Type::Live] {
        assert!(ty.is_hashable(), "{ty} should be hashable");
    }
}

#[test]
fn only_live_is_unserializable() {
    assert!(!Type::Live.is_serializable());
    assert!(Type::String.is_serializable());
    assert!(Type::EntityRef.is_serializable());
}

// =============================================================================
// Live References
// =============================================================================

#[test]
fn live_values_compare_by_identity() {
    let a = Arc::new(Session { name: "same" });
    let b = Arc::new(Session { name: "same" });

    assert_eq!(Value::live(&a), Value::live(&a));
    assert_ne!(Value::live(&a), Value::live(&b));

    let set: HashSet<_> = [Value::live(&a), Value::live(&a), Value::live(&b)]
        .into_iter()
        .collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn live_ref_downcasts_to_original() {
    let object = Arc::new(Session { name: "s" });
    let live = LiveRef::new(&object);

    let back = live.downcast::<Session>().unwrap();
    assert!(Arc::ptr_eq(&back, &object));
    assert_eq!(back.name, "s");
    assert!(live.downcast::<String>().is_none());
    assert!(live.points_to(&object));
}

#[test]
fn live_value_displays_opaquely() {
    let object = Arc::new(Session { name: "secret" });
    assert_eq!(format!("{}", Value::live(&object)), "<live>");
}

// =============================================================================
// Serialization Boundary
// =============================================================================

#[test]
fn serializable_values_cross_the_boundary() {
    for value in [
        Value::Bool(false),
        Value::Int(-4),
        Value::from("A"),
        Value::EntityRef(EntityId::new(9)),
    ] {
        let bytes = rmp_serde::to_vec_named(&value).unwrap();
        let back: Value = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, value);
    }
}

#[test]
fn live_values_refuse_to_serialize() {
    let object = Arc::new(Session { name: "s" });
    let err = rmp_serde::to_vec_named(&Value::live(&object)).unwrap_err();
    assert!(err.to_string().contains("process-local"));
}
