//! Binding, unbinding, and teardown through committed transactions.

use std::sync::Arc;

use lockstep_bridge::{IdentityBridge, LOCAL_ENTITY, ProjectId, SHARED_ENTITY};
use lockstep_foundation::ErrorKind;

use crate::{Workspace, bridge_engine};

// =============================================================================
// Bind
// =============================================================================

#[test]
fn bind_persists_across_transactions() {
    let engine = bridge_engine();
    let project = Workspace::new("alpha");

    let first = engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &project))
        .unwrap();
    let second = engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &project))
        .unwrap();

    assert_eq!(first, second);
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.entities_of(SHARED_ENTITY).count(), 1);
    assert_eq!(snapshot.entities_of(LOCAL_ENTITY).count(), 1);
}

#[test]
fn second_object_with_same_id_is_rejected() {
    let engine = bridge_engine();
    let original = Workspace::new("alpha");
    let twin = Workspace::new("alpha");

    engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &original))
        .unwrap();
    let err = engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &twin))
        .unwrap_err();

    assert!(matches!(err.kind, ErrorKind::ConstraintViolation(_)));
    assert_eq!(engine.snapshot().entities_of(LOCAL_ENTITY).count(), 1);
}

#[test]
fn shared_of_unbound_is_not_bound() {
    let engine = bridge_engine();
    let tx = engine.begin();
    let project = Workspace::new("alpha");

    assert_eq!(IdentityBridge::shared_of_or_null(&tx, &project).unwrap(), None);
    let err = IdentityBridge::shared_of(&tx, &project).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotBound(ref d) if d == "workspace alpha"));
}

// =============================================================================
// Unbind and Teardown
// =============================================================================

#[test]
fn unbind_then_rebind_reuses_shared_identity() {
    let engine = bridge_engine();
    let first = Workspace::new("alpha");
    let bound = engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &first))
        .unwrap();

    assert!(engine
        .with_transaction(|tx| IdentityBridge::unbind(tx, &first))
        .unwrap());
    assert!(!engine
        .with_transaction(|tx| IdentityBridge::unbind(tx, &first))
        .unwrap());

    let reopened = Workspace::new("alpha");
    let rebound = engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &reopened))
        .unwrap();

    assert_eq!(rebound.shared, bound.shared);
    assert_ne!(rebound.id, bound.id);
    assert!(Arc::ptr_eq(&rebound.project, &reopened));
}

#[test]
fn teardown_of_unknown_project_removes_nothing() {
    let engine = bridge_engine();
    let removed = engine
        .with_transaction(|tx| IdentityBridge::teardown(tx, &ProjectId::from("ghost")))
        .unwrap();
    assert!(removed.is_empty());
}

#[test]
fn teardown_leaves_other_projects_alone() {
    let engine = bridge_engine();
    let alpha = Workspace::new("alpha");
    let beta = Workspace::new("beta");
    engine
        .with_transaction(|tx| {
            IdentityBridge::bind(tx, &alpha)?;
            IdentityBridge::bind(tx, &beta)
        })
        .unwrap();

    let removed = engine
        .with_transaction(|tx| IdentityBridge::teardown(tx, &ProjectId::from("alpha")))
        .unwrap();
    assert_eq!(removed.len(), 2);

    let tx = engine.begin();
    assert!(!IdentityBridge::is_bound(&tx, &alpha).unwrap());
    assert!(IdentityBridge::is_bound(&tx, &beta).unwrap());
}
