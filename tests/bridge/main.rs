//! Integration tests for Layer 2: Identity Bridge
//!
//! Tests for binding, facade conversions, and replicated record encoding.

mod binding;
mod facade;

use std::sync::Arc;

use lockstep_bridge::{IdentityBridge, Project, ProjectId};
use lockstep_storage::Engine;

/// A minimal host project with a fixed identifier.
pub struct Workspace {
    pub name: &'static str,
}

impl Workspace {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self { name })
    }
}

impl Project for Workspace {
    fn project_id(&self) -> ProjectId {
        ProjectId::from(self.name)
    }

    fn describe(&self) -> String {
        format!("workspace {}", self.name)
    }
}

pub fn bridge_engine() -> Engine {
    let engine = Engine::default();
    IdentityBridge::install_into(&engine).unwrap();
    engine
}
