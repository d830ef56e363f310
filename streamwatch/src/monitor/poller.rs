//! Concurrent polling of every registered target.
//!
//! One status query is issued per distinct target. The whole batch is joined
//! before returning, so a cycle never overlaps the next one.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tracing::{debug, warn};

use crate::Error;
use crate::domain::Target;

use super::detector::{LiveStatus, StatusQuery};

/// Poller configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Maximum number of status queries in flight.
    pub max_concurrent_requests: usize,
    /// Time budget of a single status query.
    pub request_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 16,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of one poll.
///
/// Every queried target has an entry in `results`; failed queries are recorded
/// in `failures` and classified as offline.
#[derive(Debug, Default)]
pub struct PollResults {
    /// Observed status by target.
    pub results: BTreeMap<Target, LiveStatus>,
    /// Targets whose query failed.
    pub failures: Vec<PollFailure>,
}

/// A failed status query.
#[derive(Debug, Clone)]
pub struct PollFailure {
    pub target: Target,
    /// Error message.
    pub error: String,
}

impl PollResults {
    /// Create a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a successful observation.
    pub fn add_result(&mut self, target: Target, status: LiveStatus) {
        self.results.insert(target, status);
    }

    /// Add a failure. The target counts as offline for this cycle.
    pub fn add_failure(&mut self, target: Target, error: String) {
        self.results.insert(target.clone(), LiveStatus::Offline);
        self.failures.push(PollFailure { target, error });
    }

    /// Status observed for `target`, if it was polled.
    pub fn status(&self, target: &Target) -> Option<&LiveStatus> {
        self.results.get(target)
    }

    /// Get the total number of targets polled.
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// Get the number of targets observed live.
    pub fn live_count(&self) -> usize {
        self.results.values().filter(|s| s.is_live()).count()
    }

    /// Get the number of failures.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if every query succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Issues status queries for a set of targets.
pub struct Poller {
    query: Arc<dyn StatusQuery>,
    config: PollerConfig,
}

impl Poller {
    pub fn new(query: Arc<dyn StatusQuery>, config: PollerConfig) -> Self {
        Self { query, config }
    }

    /// Poll every distinct target once.
    pub async fn poll(&self, targets: impl IntoIterator<Item = Target>) -> PollResults {
        let targets: BTreeSet<Target> = targets.into_iter().collect();
        debug!(count = targets.len(), "Polling targets");

        let request_timeout = self.config.request_timeout;
        let outcomes: Vec<_> = stream::iter(targets)
            .map(|target| async move {
                let outcome =
                    match tokio::time::timeout(request_timeout, self.query.check_status(&target))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(Error::Monitor(format!(
                            "status query timed out after {:?}",
                            request_timeout
                        ))),
                    };
                (target, outcome)
            })
            .buffer_unordered(self.config.max_concurrent_requests.max(1))
            .collect()
            .await;

        let mut results = PollResults::new();
        for (target, outcome) in outcomes {
            match outcome {
                Ok(status) => results.add_result(target, status),
                Err(e) => {
                    warn!(login = %target, error = %e, "Status query failed, treating as offline");
                    results.add_failure(target, e.to_string());
                }
            }
        }

        debug!(
            "Poll complete: {} targets, {} live, {} failures",
            results.total_count(),
            results.live_count(),
            results.failure_count()
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::monitor::detector::StreamDetails;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestQuery {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatusQuery for TestQuery {
        async fn check_status(&self, target: &Target) -> Result<LiveStatus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match target.as_str() {
                "live" => Ok(LiveStatus::Live(StreamDetails {
                    title: "on air".to_string(),
                    viewer_count: 1,
                    started_at: Utc::now(),
                    game: None,
                    thumbnail_url: None,
                })),
                "broken" => Err(Error::Monitor("boom".to_string())),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(LiveStatus::Offline)
                }
                _ => Ok(LiveStatus::Offline),
            }
        }
    }

    fn poller(query: Arc<TestQuery>) -> Poller {
        Poller::new(
            query,
            PollerConfig {
                max_concurrent_requests: 4,
                request_timeout: Duration::from_millis(50),
            },
        )
    }

    fn target(login: &str) -> Target {
        Target::parse(login).unwrap()
    }

    #[tokio::test]
    async fn every_target_gets_a_result() {
        let query = Arc::new(TestQuery {
            calls: AtomicUsize::new(0),
        });
        let results = poller(query.clone())
            .poll(["live", "idle", "broken"].map(target))
            .await;

        assert_eq!(results.total_count(), 3);
        assert_eq!(results.live_count(), 1);
        assert!(results.status(&target("live")).unwrap().is_live());
        assert!(results.status(&target("idle")).unwrap().is_offline());
        assert!(results.status(&target("broken")).unwrap().is_offline());
        assert_eq!(results.failure_count(), 1);
        assert_eq!(results.failures[0].target, target("broken"));
    }

    #[tokio::test]
    async fn duplicate_targets_are_queried_once() {
        let query = Arc::new(TestQuery {
            calls: AtomicUsize::new(0),
        });
        let results = poller(query.clone())
            .poll(["idle", "IDLE", " idle "].map(target))
            .await;

        assert_eq!(results.total_count(), 1);
        assert_eq!(query.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_counts_as_offline_failure() {
        let query = Arc::new(TestQuery {
            calls: AtomicUsize::new(0),
        });
        let results = poller(query).poll([target("slow")]).await;

        assert!(results.status(&target("slow")).unwrap().is_offline());
        assert!(!results.is_complete());
        assert!(results.failures[0].error.contains("timed out"));
    }

    #[tokio::test]
    async fn empty_poll() {
        let query = Arc::new(TestQuery {
            calls: AtomicUsize::new(0),
        });
        let results = poller(query).poll(Vec::new()).await;
        assert_eq!(results.total_count(), 0);
        assert!(results.is_complete());
    }
}
