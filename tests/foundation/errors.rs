//! Integration tests for Error types
//!
//! Tests error construction, display, context, and retry classification.

use lockstep_foundation::{EntityId, Error, ErrorContext, ErrorKind, SchemaError, Type};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_type_mismatch() {
    let err = Error::type_mismatch(Type::String, Type::Live);
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    assert_eq!(format!("{err}"), "type mismatch: expected string, got live");
}

#[test]
fn error_entity_not_found() {
    let err = Error::entity_not_found(EntityId::new(42));
    assert!(matches!(err.kind, ErrorKind::EntityNotFound(_)));
    assert!(format!("{err}").contains("42"));
}

#[test]
fn error_taxonomy_messages() {
    assert_eq!(
        format!("{}", Error::constraint_violation("dup")),
        "constraint violation: dup"
    );
    assert_eq!(
        format!("{}", Error::invariant_violation("two")),
        "invariant violation: two"
    );
    assert_eq!(format!("{}", Error::not_bound("p")), "not bound: p");
    assert_eq!(
        format!("{}", Error::no_active_context()),
        "no active transaction"
    );
}

#[test]
fn not_indexed_names_the_attribute() {
    let err = Error::new(ErrorKind::NotIndexed {
        entity_type: "SharedEntity".into(),
        attribute: "color".into(),
    });
    assert_eq!(
        format!("{err}"),
        "attribute color on entity type SharedEntity is not indexed"
    );
}

#[test]
fn schema_errors_display() {
    let err = Error::schema(SchemaError::UnhashableUnique {
        entity_type: "Reading".into(),
        attribute: "celsius".into(),
        ty: Type::Float,
    });
    assert_eq!(
        format!("{err}"),
        "schema error: unique attribute celsius on Reading has non-hashable type float"
    );
}

// =============================================================================
// Classification
// =============================================================================

#[test]
fn only_commit_conflicts_are_retryable() {
    assert!(Error::new(ErrorKind::CommitConflict("lost".into())).is_retryable());
    assert!(!Error::constraint_violation("dup").is_retryable());
    assert!(!Error::invariant_violation("two").is_retryable());
    assert!(!Error::not_found("p").is_retryable());
}

#[test]
fn context_frames_display() {
    let ctx = ErrorContext::new()
        .with_entity_type("LocalEntity")
        .with_attribute("liveObject")
        .with_frame("bind")
        .with_frame("create");

    let text = format!("{ctx}");
    assert!(text.starts_with("at LocalEntity.liveObject"));
    assert!(text.contains("  in bind"));
    assert!(text.contains("  in create"));
}
