//! Liveness tracking.
//!
//! The set of targets currently believed live. Membership is the only
//! de-duplication signal: a target already in the set produces no new
//! notification on later live observations.

use std::collections::BTreeSet;

use crate::domain::Target;
use crate::snapshot::Snapshot;

/// Targets currently believed live.
///
/// Owned by the scheduler; nothing else mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessTracker {
    live: BTreeSet<Target>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, target: &Target) -> bool {
        self.live.contains(target)
    }

    /// Returns true if the target was not already tracked.
    pub fn add(&mut self, target: Target) -> bool {
        self.live.insert(target)
    }

    /// Returns true if the target was tracked.
    pub fn remove(&mut self, target: &Target) -> bool {
        self.live.remove(target)
    }

    pub fn get(&self) -> &BTreeSet<Target> {
        &self.live
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.live.iter()
    }

    /// Snapshot for a controlled shutdown.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::restart(self.live.clone())
    }

    /// Tracker pre-populated from a prior snapshot.
    pub fn restore(snapshot: Snapshot) -> Self {
        Self {
            live: snapshot.targets,
        }
    }
}

impl FromIterator<Target> for LivenessTracker {
    fn from_iter<I: IntoIterator<Item = Target>>(iter: I) -> Self {
        Self {
            live: iter.into_iter().collect(),
        }
    }
}
