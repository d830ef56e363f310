//! The watch loop.
//!
//! One task owns the liveness set and runs poll, detect and dispatch in
//! sequence. Cycles never overlap: the next one starts one poll interval
//! after the previous one started, or right away if that cycle overran.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::domain::SubscriberId;
use crate::monitor::{
    LivenessTracker, MonitorEvent, MonitorEventBroadcaster, Poller, detect,
};
use crate::notification::{DispatchReport, NotificationDispatcher};
use crate::registry::TargetRegistry;
use crate::snapshot::{self, SnapshotStore};

/// Default polling cadence (5 seconds).
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between the starts of two consecutive cycles.
    pub poll_interval: Duration,
    /// Recipient of the startup notice after a fresh start.
    pub owner: Option<SubscriberId>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            owner: None,
        }
    }
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Cycle number, starting at 1.
    pub cycle: u64,
    /// Distinct targets polled.
    pub targets: usize,
    /// Targets observed live.
    pub live: usize,
    pub became_live: usize,
    pub became_offline: usize,
    /// Failed status queries.
    pub failures: usize,
    pub dispatch: DispatchReport,
    pub elapsed: Duration,
}

/// Returned by [`WatchScheduler::run`] after a controlled shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Number of cycles that ran to completion.
    pub cycles: u64,
    /// Number of targets written to the snapshot.
    pub snapshot_targets: usize,
}

/// Drives the watch-and-notify engine.
pub struct WatchScheduler {
    registry: Arc<dyn TargetRegistry>,
    poller: Poller,
    dispatcher: NotificationDispatcher,
    snapshots: Arc<dyn SnapshotStore>,
    events: MonitorEventBroadcaster,
    config: SchedulerConfig,
    liveness: LivenessTracker,
    cycles: u64,
    recovered: bool,
}

impl WatchScheduler {
    pub fn new(
        registry: Arc<dyn TargetRegistry>,
        poller: Poller,
        dispatcher: NotificationDispatcher,
        snapshots: Arc<dyn SnapshotStore>,
        config: SchedulerConfig,
    ) -> Self {
        Self::with_broadcaster(
            registry,
            poller,
            dispatcher,
            snapshots,
            config,
            MonitorEventBroadcaster::new(),
        )
    }

    /// Create a scheduler publishing on an existing broadcaster.
    pub fn with_broadcaster(
        registry: Arc<dyn TargetRegistry>,
        poller: Poller,
        dispatcher: NotificationDispatcher,
        snapshots: Arc<dyn SnapshotStore>,
        config: SchedulerConfig,
        events: MonitorEventBroadcaster,
    ) -> Self {
        Self {
            registry,
            poller,
            dispatcher,
            snapshots,
            events,
            config,
            liveness: LivenessTracker::new(),
            cycles: 0,
            recovered: false,
        }
    }

    pub fn events(&self) -> &MonitorEventBroadcaster {
        &self.events
    }

    /// Current liveness set.
    pub fn liveness(&self) -> &LivenessTracker {
        &self.liveness
    }

    /// Number of completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Load the prior snapshot into the liveness set.
    ///
    /// Runs at most once. After a fresh start the owner, if configured, is
    /// sent the startup notice.
    pub async fn recover(&mut self) -> bool {
        match self.restore_snapshot().await {
            Some(true) => true,
            Some(false) => {
                self.notify_startup().await;
                false
            }
            None => false,
        }
    }

    /// Returns `None` when recovery already ran.
    async fn restore_snapshot(&mut self) -> Option<bool> {
        if self.recovered {
            return None;
        }
        self.recovered = true;

        let outcome = snapshot::recover(self.snapshots.as_ref()).await;
        self.liveness = outcome.liveness;
        Some(outcome.restored)
    }

    async fn notify_startup(&self) {
        if let Some(owner) = &self.config.owner {
            // Delivery failures are logged by the dispatcher.
            let _ = self.dispatcher.notify_owner_startup(owner).await;
        }
    }

    /// Run one poll, detect and dispatch cycle.
    ///
    /// The liveness set is only replaced once detection has finished, so an
    /// error before that point leaves it untouched.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let started = Instant::now();
        let cycle = self.cycles + 1;

        let targets = self.registry.all_targets().await?;
        let results = self.poller.poll(targets).await;

        for failure in &results.failures {
            self.events.publish(MonitorEvent::PollFailed {
                target: failure.target.clone(),
                error: failure.error.clone(),
                timestamp: chrono::Utc::now(),
            });
        }

        let detection = detect(&results, &self.liveness);
        for (target, details) in &detection.became_live {
            info!(login = %target, title = %details.title, "Target went live");
            self.events.publish(MonitorEvent::TargetLive {
                target: target.clone(),
                title: details.title.clone(),
                game: details.game.clone(),
                viewer_count: details.viewer_count,
                timestamp: chrono::Utc::now(),
            });
        }
        for target in &detection.became_offline {
            info!(login = %target, "Target went offline");
            self.events.publish(MonitorEvent::TargetOffline {
                target: target.clone(),
                timestamp: chrono::Utc::now(),
            });
        }

        let mut report = CycleReport {
            cycle,
            targets: results.total_count(),
            live: results.live_count(),
            became_live: detection.became_live.len(),
            became_offline: detection.became_offline.len(),
            failures: results.failure_count(),
            ..Default::default()
        };

        self.liveness = detection.liveness;
        report.dispatch = self.dispatcher.dispatch(&detection.became_live).await;
        report.elapsed = started.elapsed();
        self.cycles = cycle;

        self.events.publish(MonitorEvent::CycleCompleted {
            cycle,
            targets: report.targets,
            live: report.live,
            notifications: report.dispatch.delivered,
            timestamp: chrono::Utc::now(),
        });

        debug!(
            "Cycle {} complete in {:?}: {} targets, {} live, {} new, {} delivered",
            cycle,
            report.elapsed,
            report.targets,
            report.live,
            report.became_live,
            report.dispatch.delivered
        );

        Ok(report)
    }

    /// Run cycles until `cancel` fires, then write the snapshot.
    ///
    /// A cycle in flight at cancellation is dropped along with its
    /// outstanding requests; the liveness set keeps its last committed value.
    /// The same holds for a startup notice still in flight.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<ShutdownReport> {
        if self.restore_snapshot().await == Some(false) {
            let cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = self.notify_startup() => false,
            };
            if cancelled {
                return self.shutdown().await;
            }
        }
        info!(
            interval = ?self.config.poll_interval,
            live = self.liveness.len(),
            "Watch loop starting"
        );

        loop {
            let cycle_start = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.run_cycle() => Some(result),
            };
            match outcome {
                None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => error!(error = %e, "Watch cycle failed"),
            }

            let next = cycle_start + self.config.poll_interval;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(next) => {}
            }
        }

        self.shutdown().await
    }

    async fn shutdown(&mut self) -> Result<ShutdownReport> {
        info!("Watch loop stopping, writing snapshot");
        let snapshot = self.liveness.snapshot();
        let report = ShutdownReport {
            cycles: self.cycles,
            snapshot_targets: snapshot.targets.len(),
        };

        if let Err(e) = self.snapshots.write(&snapshot).await {
            warn!(error = %e, "Failed to write liveness snapshot");
            return Err(e);
        }

        info!(
            "Shutdown complete: {} cycles, {} live targets saved",
            report.cycles, report.snapshot_targets
        );
        Ok(report)
    }
}
