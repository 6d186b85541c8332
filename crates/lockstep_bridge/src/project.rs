//! Host project identity.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Serializable, globally comparable project identifier.
///
/// This is the only piece of a project's identity that crosses process
/// boundaries.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Arc<str>);

impl ProjectId {
    /// Creates a project identifier.
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectId({:?})", &*self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A process-local live project object.
///
/// The host runtime owns these. The store keeps only a weak lookup handle,
/// so dropping the last `Arc` disposes of the object even while it is
/// bound; lookups then treat the binding as absent. A project's identifier
/// must not change for the object's lifetime.
pub trait Project: Send + Sync + 'static {
    /// Returns the project's distributable identity.
    fn project_id(&self) -> ProjectId;

    /// Returns a human-readable description for error messages.
    fn describe(&self) -> String {
        format!("project '{}'", self.project_id())
    }
}
