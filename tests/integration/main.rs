//! End-to-end tests across all layers
//!
//! Tests the full project lifecycle, cross-process replication, concurrent
//! binding, and property-based identity invariants.

mod lifecycle;
mod replication;

use std::sync::Arc;

use lockstep::bridge::{IdentityBridge, Project, ProjectId};
use lockstep::storage::Engine;

/// A host project whose identifier is owned by the caller.
pub struct Document {
    pub id: String,
}

impl Document {
    pub fn open(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { id: id.into() })
    }
}

impl Project for Document {
    fn project_id(&self) -> ProjectId {
        ProjectId::from(self.id.as_str())
    }
}

pub fn process() -> Engine {
    let engine = Engine::default();
    IdentityBridge::install_into(&engine).unwrap();
    engine
}
