//! Configuration for the transactional engine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the transactional engine.
///
/// Controls how commit conflicts are retried and reported.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// How many times `with_transaction` re-runs its body after a commit
    /// conflict before giving up.
    pub max_commit_retries: u32,

    /// Log each commit conflict at `warn` level (otherwise `debug`).
    pub log_conflicts: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: 8,
            log_conflicts: true,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration that never retries: the first conflict is
    /// surfaced to the caller.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_commit_retries: 0,
            ..Self::default()
        }
    }

    /// Creates a configuration for heavily contended workloads.
    #[must_use]
    pub fn contended() -> Self {
        Self {
            max_commit_retries: 64,
            log_conflicts: false,
        }
    }

    /// Builder method to set the retry limit.
    #[must_use]
    pub fn with_max_commit_retries(mut self, retries: u32) -> Self {
        self.max_commit_retries = retries;
        self
    }

    /// Builder method to enable/disable conflict warnings.
    #[must_use]
    pub fn with_log_conflicts(mut self, log: bool) -> Self {
        self.log_conflicts = log;
        self
    }
}
