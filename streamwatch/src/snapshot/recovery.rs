use tracing::{info, warn};

use super::SnapshotStore;
use crate::monitor::LivenessTracker;

/// Liveness state to start the engine with.
#[derive(Debug, Default)]
pub struct RecoveryOutcome {
    pub liveness: LivenessTracker,
    /// True when a restart snapshot pre-populated the set.
    pub restored: bool,
}

/// Consume the prior snapshot, if any.
///
/// Store failures are logged and treated as a fresh start.
pub async fn recover(store: &dyn SnapshotStore) -> RecoveryOutcome {
    match store.read_once().await {
        Ok(Some(snapshot)) if snapshot.restarted => {
            info!(
                targets = snapshot.targets.len(),
                "Restored liveness state from snapshot"
            );
            RecoveryOutcome {
                liveness: LivenessTracker::restore(snapshot),
                restored: true,
            }
        }
        Ok(Some(_)) => {
            info!("Snapshot was not written by a restart, starting fresh");
            RecoveryOutcome::default()
        }
        Ok(None) => {
            info!("No snapshot found, starting fresh");
            RecoveryOutcome::default()
        }
        Err(e) => {
            warn!(error = %e, "Failed to read snapshot, starting fresh");
            RecoveryOutcome::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Target;
    use crate::snapshot::{FileSnapshotStore, Snapshot};
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn restores_restart_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("snapshot.json"));
        let alice = Target::parse("alice").unwrap();
        store
            .write(&Snapshot::restart(BTreeSet::from([alice.clone()])))
            .await
            .unwrap();

        let outcome = recover(&store).await;
        assert!(outcome.restored);
        assert!(outcome.liveness.contains(&alice));

        let again = recover(&store).await;
        assert!(!again.restored);
        assert!(again.liveness.is_empty());
    }

    #[tokio::test]
    async fn non_restart_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("snapshot.json"));
        store
            .write(&Snapshot {
                restarted: false,
                targets: BTreeSet::from([Target::parse("alice").unwrap()]),
            })
            .await
            .unwrap();

        let outcome = recover(&store).await;
        assert!(!outcome.restored);
        assert!(outcome.liveness.is_empty());
    }
}
