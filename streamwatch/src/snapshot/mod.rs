//! Crash-recovery snapshot of the liveness set.
//!
//! Written once at controlled shutdown and consumed at most once at the next
//! startup.

mod file;
mod recovery;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::domain::Target;

pub use file::FileSnapshotStore;
pub use recovery::{RecoveryOutcome, recover};

/// Point-in-time liveness state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Set when the previous process stopped on purpose.
    pub restarted: bool,
    pub targets: BTreeSet<Target>,
}

impl Snapshot {
    /// Snapshot taken before an intentional shutdown.
    pub fn restart(targets: BTreeSet<Target>) -> Self {
        Self {
            restarted: true,
            targets,
        }
    }
}

/// Persistence for a single snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace any stored snapshot.
    async fn write(&self, snapshot: &Snapshot) -> Result<()>;

    /// Take the stored snapshot, if any. A second call returns `None`.
    async fn read_once(&self) -> Result<Option<Snapshot>>;
}
