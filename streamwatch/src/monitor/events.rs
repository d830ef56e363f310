//! Monitor events.
//!
//! Every transition the engine observes is published here so observers
//! (logging, stats, tests) can follow it without coupling to the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::Target;

/// Events emitted by the watch engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Target went live.
    TargetLive {
        target: Target,
        title: String,
        game: Option<String>,
        viewer_count: u64,
        timestamp: DateTime<Utc>,
    },
    /// Target went offline.
    TargetOffline {
        target: Target,
        timestamp: DateTime<Utc>,
    },
    /// A status query failed and the target was treated as offline.
    PollFailed {
        target: Target,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// A full poll, detect and dispatch pass finished.
    CycleCompleted {
        cycle: u64,
        targets: usize,
        live: usize,
        notifications: usize,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::TargetLive { target, title, .. } => {
                format!("{} is now live: {}", target, title)
            }
            MonitorEvent::TargetOffline { target, .. } => {
                format!("{} went offline", target)
            }
            MonitorEvent::PollFailed { target, error, .. } => {
                format!("{}: status query failed ({})", target, error)
            }
            MonitorEvent::CycleCompleted {
                cycle,
                targets,
                live,
                notifications,
                ..
            } => {
                format!(
                    "cycle {}: checked {} targets, {} live, {} notifications",
                    cycle, targets, live, notifications
                )
            }
        }
    }

    /// Target this event is about, if any.
    pub fn target(&self) -> Option<&Target> {
        match self {
            MonitorEvent::TargetLive { target, .. }
            | MonitorEvent::TargetOffline { target, .. }
            | MonitorEvent::PollFailed { target, .. } => Some(target),
            MonitorEvent::CycleCompleted { .. } => None,
        }
    }
}

/// Broadcaster for monitor events.
#[derive(Clone)]
pub struct MonitorEventBroadcaster {
    sender: broadcast::Sender<MonitorEvent>,
}

impl MonitorEventBroadcaster {
    /// Create a new broadcaster with default capacity (256).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new broadcaster with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to monitor events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish a monitor event. Having no subscribers is not an error.
    pub fn publish(&self, event: MonitorEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MonitorEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(login: &str) -> Target {
        Target::parse(login).unwrap()
    }

    #[test]
    fn test_event_description() {
        let event = MonitorEvent::TargetLive {
            target: target("teststreamer"),
            title: "Playing Games".to_string(),
            game: Some("Gaming".to_string()),
            viewer_count: 3,
            timestamp: Utc::now(),
        };
        assert!(event.description().contains("teststreamer"));
        assert!(event.description().contains("Playing Games"));
        assert_eq!(event.target(), Some(&target("teststreamer")));
    }

    #[test]
    fn test_broadcaster_publish_subscribe() {
        let broadcaster = MonitorEventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        let event = MonitorEvent::TargetOffline {
            target: target("test"),
            timestamp: Utc::now(),
        };

        assert_eq!(broadcaster.publish(event.clone()), 1);

        let received = receiver.try_recv().unwrap();
        assert_eq!(received, event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broadcaster = MonitorEventBroadcaster::new();
        let event = MonitorEvent::CycleCompleted {
            cycle: 1,
            targets: 0,
            live: 0,
            notifications: 0,
            timestamp: Utc::now(),
        };
        assert_eq!(broadcaster.publish(event), 0);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
