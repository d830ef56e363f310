//! Watch engine.
//!
//! Polls every registered target, compares the observations against the
//! liveness set and reports the resulting transitions.

pub mod detector;
pub mod events;
pub mod liveness;
pub mod poller;
pub mod transition;

pub use detector::{
    HelixDetector, LiveStatus, ProfileLookup, StatusQuery, StreamDetails, TargetProfile,
};
pub use events::{MonitorEvent, MonitorEventBroadcaster};
pub use liveness::LivenessTracker;
pub use poller::{PollFailure, PollResults, Poller, PollerConfig};
pub use transition::{Detection, Transition, detect, transitions};
