//! Entity identifier allocation.
//!
//! Every snapshot derived from the same root store shares one allocator, so
//! identifiers stay unique across snapshots, transactions, and aborted work.
//! Identifiers are never reused.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lockstep_foundation::EntityId;

/// Allocates fresh entity IDs.
///
/// Cloning an allocator yields a handle to the same counter.
#[derive(Debug, Clone, Default)]
pub struct EidAllocator {
    next: Arc<AtomicU64>,
}

impl EidAllocator {
    /// Creates a new allocator starting at ID 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh entity ID.
    pub fn allocate(&self) -> EntityId {
        EntityId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the number of IDs handed out so far.
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
