//! A project's identity from first bind to teardown.

use std::sync::Arc;

use lockstep::bridge::{IdentityBridge, ProjectId, QueryFacade};
use lockstep::foundation::ErrorKind;

use crate::{Document, process};

#[test]
fn bind_query_and_teardown() {
    let engine = process();
    let a = Document::open("A");
    let b = Document::open("B");

    // Binding twice yields one binding.
    let la = engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &a))
        .unwrap();
    let again = engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &a))
        .unwrap();
    assert_eq!(la, again);

    let sa = {
        let tx = engine.begin();
        let facade = QueryFacade::new(&tx);
        let sa = facade.to_shared_entity(&a).unwrap();
        assert_eq!(sa.id, la.shared);
        let live: Arc<Document> = facade.to_live_object(&sa).unwrap();
        assert!(Arc::ptr_eq(&live, &a));
        sa
    };

    let lb = engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &b))
        .unwrap();
    assert_ne!(lb.shared, la.shared);

    let removed = engine
        .with_transaction(|tx| IdentityBridge::teardown(tx, &ProjectId::from("A")))
        .unwrap();
    assert_eq!(removed, vec![la.id, sa.id]);

    let tx = engine.begin();
    let facade = QueryFacade::new(&tx);
    assert!(facade.to_live_object_or_null::<Document>(&sa).unwrap().is_none());
    assert!(facade.to_local_entity_or_null(&a).unwrap().is_none());
    let err = facade.to_shared_entity(&a).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotFound(_)));

    // B is unaffected.
    let sb = facade.to_shared_entity(&b).unwrap();
    assert_eq!(sb.id, lb.shared);
    assert!(Arc::ptr_eq(&facade.to_live_object::<Document>(&sb).unwrap(), &b));
}

#[test]
fn rolled_back_bind_leaves_no_trace() {
    let engine = process();
    let a = Document::open("A");

    let mut tx = engine.begin();
    IdentityBridge::bind(&mut tx, &a).unwrap();
    tx.rollback();

    assert!(engine.snapshot().is_empty());
    let tx = engine.begin();
    assert!(!QueryFacade::new(&tx).is_bound(&a).unwrap());
}

#[test]
fn rebinding_under_a_new_id_is_rejected() {
    let engine = process();
    let doc = Arc::new(std::sync::RwLock::new(String::from("A")));

    struct Renamable(Arc<std::sync::RwLock<String>>);

    impl lockstep::bridge::Project for Renamable {
        fn project_id(&self) -> ProjectId {
            ProjectId::from(self.0.read().unwrap().as_str())
        }
    }

    let project = Arc::new(Renamable(Arc::clone(&doc)));
    engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &project))
        .unwrap();

    *doc.write().unwrap() = String::from("B");
    let err = engine
        .with_transaction(|tx| IdentityBridge::bind(tx, &project))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvariantViolation(_)));
}
