//! Moving shared identities between two independent processes.

use std::sync::Arc;

use lockstep::bridge::{
    DecoderRegistry, IdentityBridge, QueryFacade, ReplicatedRecord, WireRecord,
    export_replicated,
};

use crate::{Document, process};

fn ship(records: &[WireRecord]) -> Vec<Vec<u8>> {
    records.iter().map(|r| r.to_bytes().unwrap()).collect()
}

#[test]
fn frontend_binds_identity_created_by_backend() {
    let backend = process();
    let frontend = process();

    // The frontend allocates an unrelated entity first so IDs diverge.
    let local_only = Document::open("scratch");
    frontend
        .with_transaction(|tx| IdentityBridge::bind(tx, &local_only))
        .unwrap();

    let backend_doc = Document::open("A");
    let backend_local = backend
        .with_transaction(|tx| IdentityBridge::bind(tx, &backend_doc))
        .unwrap();

    let registry = DecoderRegistry::default();
    let received: Vec<_> = ship(&export_replicated(&backend.snapshot()).unwrap())
        .iter()
        .map(|bytes| registry.decode(&WireRecord::from_bytes(bytes).unwrap()).unwrap())
        .collect();
    assert_eq!(received.len(), 1);

    let adopted = frontend
        .with_transaction(|tx| {
            received
                .iter()
                .map(|ReplicatedRecord::Shared(shared)| IdentityBridge::adopt(tx, shared))
                .collect::<lockstep::foundation::Result<Vec<_>>>()
        })
        .unwrap();
    assert_eq!(adopted[0].project_id.as_str(), "A");
    assert_ne!(adopted[0].id, backend_local.shared);

    // The frontend has the identity but no live object yet.
    {
        let tx = frontend.begin();
        let facade = QueryFacade::new(&tx);
        assert!(facade
            .to_live_object_or_null::<Document>(&adopted[0])
            .unwrap()
            .is_none());
    }

    let frontend_doc = Document::open("A");
    let frontend_local = frontend
        .with_transaction(|tx| IdentityBridge::bind(tx, &frontend_doc))
        .unwrap();
    assert_eq!(frontend_local.shared, adopted[0].id);

    let tx = frontend.begin();
    let live: Arc<Document> = QueryFacade::new(&tx).to_live_object(&adopted[0]).unwrap();
    assert!(Arc::ptr_eq(&live, &frontend_doc));
}

#[test]
fn adopting_twice_is_idempotent() {
    let backend = process();
    let frontend = process();
    let doc = Document::open("A");
    backend
        .with_transaction(|tx| IdentityBridge::bind(tx, &doc))
        .unwrap();

    let exported = export_replicated(&backend.snapshot()).unwrap();
    let ReplicatedRecord::Shared(shared) = DecoderRegistry::default().decode(&exported[0]).unwrap();

    let first = frontend
        .with_transaction(|tx| IdentityBridge::adopt(tx, &shared))
        .unwrap();
    let second = frontend
        .with_transaction(|tx| IdentityBridge::adopt(tx, &shared))
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(frontend.snapshot().len(), 1);
}

#[test]
fn live_objects_never_leave_the_process() {
    let backend = process();
    let doc = Document::open("A");
    backend
        .with_transaction(|tx| IdentityBridge::bind(tx, &doc))
        .unwrap();

    let exported = export_replicated(&backend.snapshot()).unwrap();
    assert_eq!(backend.snapshot().len(), 2);
    assert_eq!(exported.len(), 1);
    assert!(exported.iter().all(|w| w.entity_type == "SharedEntity"));
}

#[test]
fn received_identity_resolves_by_project_id_not_sender_eid() {
    let backend = process();
    let frontend = process();

    let backend_doc = Document::open("A");
    backend
        .with_transaction(|tx| IdentityBridge::bind(tx, &backend_doc))
        .unwrap();
    let frontend_other = Document::open("X");
    let other_local = frontend
        .with_transaction(|tx| IdentityBridge::bind(tx, &frontend_other))
        .unwrap();

    let exported = export_replicated(&backend.snapshot()).unwrap();
    let ReplicatedRecord::Shared(received) = DecoderRegistry::default().decode(&exported[0]).unwrap();
    // Both processes allocated their first shared entity under the same EID.
    assert_eq!(received.id, other_local.shared);

    {
        let tx = frontend.begin();
        let facade = QueryFacade::new(&tx);
        assert!(facade
            .to_live_object_or_null::<Document>(&received)
            .unwrap()
            .is_none());
        assert!(facade.to_live_object::<Document>(&received).is_err());
    }

    let frontend_doc = Document::open("A");
    frontend
        .with_transaction(|tx| IdentityBridge::bind(tx, &frontend_doc))
        .unwrap();

    let tx = frontend.begin();
    let live: Arc<Document> = QueryFacade::new(&tx).to_live_object(&received).unwrap();
    assert!(Arc::ptr_eq(&live, &frontend_doc));
}
