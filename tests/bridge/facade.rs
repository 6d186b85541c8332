//! Facade conversions against committed state.

use std::sync::Arc;

use lockstep_bridge::{IdentityBridge, QueryFacade};
use lockstep_foundation::ErrorKind;

use crate::{Workspace, bridge_engine};

#[test]
fn facade_round_trips_between_halves() {
    let engine = bridge_engine();
    let project = Workspace::new("alpha");
    engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &project))
        .unwrap();

    let tx = engine.begin();
    let facade = QueryFacade::new(&tx);
    let shared = facade.to_shared_entity(&project).unwrap();
    let live: Arc<Workspace> = facade.to_live_object(&shared).unwrap();
    let local = facade.to_local_entity(&live).unwrap();

    assert!(Arc::ptr_eq(&live, &project));
    assert_eq!(local.shared, shared.id);
    assert_eq!(shared.project_id.as_str(), "alpha");
}

#[test]
fn facade_sees_uncommitted_writes_of_its_transaction() {
    let engine = bridge_engine();
    let project = Workspace::new("alpha");
    let mut tx = engine.begin();
    IdentityBridge::bind(&mut tx, &project).unwrap();

    assert!(QueryFacade::new(&tx).is_bound(&project).unwrap());

    let other = engine.begin();
    assert!(!QueryFacade::new(&other).is_bound(&project).unwrap());
}

#[test]
fn strict_conversions_fail_with_not_found() {
    let engine = bridge_engine();
    let tx = engine.begin();
    let facade = QueryFacade::new(&tx);
    let project = Workspace::new("alpha");

    let err = facade.to_local_entity(&project).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotFound(ref d) if d.contains("workspace alpha")));
}
