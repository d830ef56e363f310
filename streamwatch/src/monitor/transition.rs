//! Transition detection.
//!
//! Two states per target, driven solely by the latest observation:
//!
//! | observed | tracked | event          |
//! |----------|---------|----------------|
//! | live     | no      | became live    |
//! | live     | yes     | none           |
//! | offline  | yes     | became offline |
//! | offline  | no      | none           |
//!
//! Only an offline observation removes a target from the set. A tracked
//! target that was not polled keeps its entry.

use crate::domain::Target;

use super::detector::{LiveStatus, StreamDetails};
use super::liveness::LivenessTracker;
use super::poller::PollResults;

/// A liveness edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    BecameLive {
        target: Target,
        details: StreamDetails,
    },
    BecameOffline {
        target: Target,
    },
}

impl Transition {
    pub fn target(&self) -> &Target {
        match self {
            Transition::BecameLive { target, .. } | Transition::BecameOffline { target } => target,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Transition::BecameLive { .. })
    }
}

/// Lazily yield the transitions implied by `results` against `liveness`.
///
/// Neither input is modified.
pub fn transitions<'a>(
    results: &'a PollResults,
    liveness: &'a LivenessTracker,
) -> impl Iterator<Item = Transition> + 'a {
    results
        .results
        .iter()
        .filter_map(move |(target, status)| match status {
            LiveStatus::Live(details) if !liveness.contains(target) => {
                Some(Transition::BecameLive {
                    target: target.clone(),
                    details: details.clone(),
                })
            }
            LiveStatus::Offline if liveness.contains(target) => {
                Some(Transition::BecameOffline {
                    target: target.clone(),
                })
            }
            _ => None,
        })
}

/// Outcome of comparing one poll against the liveness set.
#[derive(Debug, Default)]
pub struct Detection {
    pub became_live: Vec<(Target, StreamDetails)>,
    pub became_offline: Vec<Target>,
    /// Liveness set after this poll.
    pub liveness: LivenessTracker,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.became_live.is_empty() && self.became_offline.is_empty()
    }
}

/// Collect the transitions and compute the updated liveness set.
///
/// The new set is the previous one minus the targets that became offline,
/// plus the ones that became live.
pub fn detect(results: &PollResults, liveness: &LivenessTracker) -> Detection {
    let mut detection = Detection {
        liveness: liveness.clone(),
        ..Default::default()
    };
    for transition in transitions(results, liveness) {
        match transition {
            Transition::BecameLive { target, details } => {
                detection.liveness.add(target.clone());
                detection.became_live.push((target, details));
            }
            Transition::BecameOffline { target } => {
                detection.liveness.remove(&target);
                detection.became_offline.push(target);
            }
        }
    }

    detection
}
