//! Fan-out of go-live notifications.
//!
//! Every became-live target is mapped to one delivery per current subscriber.
//! Subscribers are resolved at dispatch time, so a subscription removed after
//! the poll started is never notified.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tracing::{debug, info, warn};

use super::channels::{DeliveryChannel, DeliveryError};
use super::events::NotificationEvent;
use crate::domain::{Subscriber, SubscriberId, Target};
use crate::monitor::{ProfileLookup, StreamDetails};
use crate::registry::TargetRegistry;

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum number of deliveries in flight.
    pub max_concurrent_deliveries: usize,
    /// Pause after each delivery.
    pub delivery_pacing: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_deliveries: 8,
            delivery_pacing: Duration::from_millis(250),
        }
    }
}

/// Outcome counts of one dispatch batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub unreachable: usize,
    pub not_found: usize,
    pub failed: usize,
    /// Became-live targets nobody watches anymore.
    pub targets_without_subscribers: usize,
    /// Targets skipped because the registry lookup failed.
    pub registry_errors: usize,
}

impl DispatchReport {
    /// Deliveries attempted.
    pub fn attempted(&self) -> usize {
        self.delivered + self.unreachable + self.not_found + self.failed
    }

    fn record(&mut self, outcome: &Result<(), DeliveryError>) {
        match outcome {
            Ok(()) => self.delivered += 1,
            Err(DeliveryError::RecipientUnreachable(_)) => self.unreachable += 1,
            Err(DeliveryError::RecipientNotFound(_)) => self.not_found += 1,
            Err(DeliveryError::Other(_)) => self.failed += 1,
        }
    }
}

/// Resolves subscribers and delivers notifications.
pub struct NotificationDispatcher {
    registry: Arc<dyn TargetRegistry>,
    profiles: Arc<dyn ProfileLookup>,
    channel: Arc<dyn DeliveryChannel>,
    config: DispatcherConfig,
}

impl NotificationDispatcher {
    pub fn new(
        registry: Arc<dyn TargetRegistry>,
        profiles: Arc<dyn ProfileLookup>,
        channel: Arc<dyn DeliveryChannel>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            profiles,
            channel,
            config,
        }
    }

    /// Notify every current subscriber of every became-live target.
    ///
    /// Returns once all deliveries of the batch have completed.
    pub async fn dispatch(&self, became_live: &[(Target, StreamDetails)]) -> DispatchReport {
        let mut report = DispatchReport::default();
        if became_live.is_empty() {
            return report;
        }

        let concurrency = self.config.max_concurrent_deliveries.max(1);

        let prepared: Vec<_> = stream::iter(became_live)
            .map(|(target, details)| self.prepare(target, details))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut deliveries: Vec<(Subscriber, Arc<NotificationEvent>)> = Vec::new();
        for outcome in prepared {
            match outcome {
                Prepared::Ready(subscribers, event) => deliveries.extend(
                    subscribers
                        .into_iter()
                        .map(|subscriber| (subscriber, event.clone())),
                ),
                Prepared::NoSubscribers => report.targets_without_subscribers += 1,
                Prepared::RegistryError => report.registry_errors += 1,
            }
        }

        let pacing = self.config.delivery_pacing;
        let outcomes: Vec<_> = stream::iter(deliveries)
            .map(|(subscriber, event)| async move {
                let outcome = self.channel.deliver(&subscriber.id, &event).await;
                log_outcome(&subscriber, &event, &outcome);
                if !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                }
                outcome
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for outcome in &outcomes {
            report.record(outcome);
        }

        info!(
            targets = became_live.len(),
            delivered = report.delivered,
            unreachable = report.unreachable,
            not_found = report.not_found,
            failed = report.failed,
            "Dispatch complete"
        );
        report
    }

    /// Resolve the subscribers and build the shared event for one target.
    async fn prepare(&self, target: &Target, details: &StreamDetails) -> Prepared {
        let subscribers = match self.registry.subscribers_for(target).await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                warn!(login = %target, error = %e, "Failed to resolve subscribers");
                return Prepared::RegistryError;
            }
        };
        if subscribers.is_empty() {
            debug!(login = %target, "No subscribers left for live target");
            return Prepared::NoSubscribers;
        }

        let profile = match self.profiles.lookup_profile(target).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(login = %target, error = %e, "Profile lookup failed, sending without it");
                None
            }
        };

        let event = NotificationEvent::stream_online(target, details, profile.as_ref());
        Prepared::Ready(subscribers, Arc::new(event))
    }

    /// Tell the bot owner the engine started without a restart snapshot.
    pub async fn notify_owner_startup(&self, owner: &SubscriberId) -> Result<(), DeliveryError> {
        let event = NotificationEvent::system_startup();
        let outcome = self.channel.deliver(owner, &event).await;
        match &outcome {
            Ok(()) => info!(owner = %owner, "Startup notice sent"),
            Err(e) => warn!(owner = %owner, error = %e, "Failed to send startup notice"),
        }
        outcome
    }
}

enum Prepared {
    Ready(Vec<Subscriber>, Arc<NotificationEvent>),
    NoSubscribers,
    RegistryError,
}

fn log_outcome(
    subscriber: &Subscriber,
    event: &NotificationEvent,
    outcome: &Result<(), DeliveryError>,
) {
    let login = event.target().map(Target::as_str).unwrap_or_default();
    match outcome {
        Ok(()) => info!(
            login,
            subscriber = %subscriber.display_name,
            "Notification sent"
        ),
        Err(DeliveryError::RecipientUnreachable(_)) => info!(
            login,
            subscriber = %subscriber.display_name,
            "Cannot message subscriber, direct messages disabled"
        ),
        Err(DeliveryError::RecipientNotFound(id)) => warn!(
            login,
            subscriber = %id,
            "Subscriber not found"
        ),
        Err(e) => warn!(
            login,
            subscriber = %subscriber.display_name,
            error = %e,
            "Notification failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::TargetProfile;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::{BTreeSet, HashMap};

    struct TestRegistry {
        watchers: HashMap<Target, Vec<Subscriber>>,
        broken: Option<Target>,
    }

    #[async_trait]
    impl TargetRegistry for TestRegistry {
        async fn all_targets(&self) -> Result<BTreeSet<Target>> {
            Ok(self.watchers.keys().cloned().collect())
        }

        async fn subscribers_for(&self, target: &Target) -> Result<Vec<Subscriber>> {
            if self.broken.as_ref() == Some(target) {
                return Err(Error::Other("registry offline".to_string()));
            }
            Ok(self.watchers.get(target).cloned().unwrap_or_default())
        }

        async fn all_subscribers(&self) -> Result<Vec<Subscriber>> {
            Ok(self.watchers.values().flatten().cloned().collect())
        }
    }

    struct TestProfiles {
        fail: bool,
    }

    #[async_trait]
    impl ProfileLookup for TestProfiles {
        async fn lookup_profile(&self, target: &Target) -> Result<Option<TargetProfile>> {
            if self.fail {
                return Err(Error::Other("helix down".to_string()));
            }
            Ok(Some(TargetProfile {
                display_name: target.as_str().to_uppercase(),
                profile_image_url: Some(format!("https://cdn/{target}.png")),
            }))
        }
    }

    /// Records deliveries; fails for configured recipients.
    #[derive(Default)]
    struct TestChannel {
        sent: Mutex<Vec<(SubscriberId, NotificationEvent)>>,
        failures: HashMap<SubscriberId, DeliveryError>,
    }

    #[async_trait]
    impl DeliveryChannel for TestChannel {
        fn channel_type(&self) -> &'static str {
            "test"
        }

        async fn deliver(
            &self,
            recipient: &SubscriberId,
            event: &NotificationEvent,
        ) -> std::result::Result<(), DeliveryError> {
            if let Some(e) = self.failures.get(recipient) {
                return Err(e.clone());
            }
            self.sent.lock().push((recipient.clone(), event.clone()));
            Ok(())
        }
    }

    fn target(login: &str) -> Target {
        Target::parse(login).unwrap()
    }

    fn user(id: &str) -> Subscriber {
        Subscriber::new(SubscriberId::from_trusted(id), format!("user{id}"))
    }

    fn details() -> StreamDetails {
        StreamDetails {
            title: "live now".to_string(),
            viewer_count: 5,
            started_at: Utc::now(),
            game: None,
            thumbnail_url: None,
        }
    }

    fn config() -> DispatcherConfig {
        DispatcherConfig {
            max_concurrent_deliveries: 4,
            delivery_pacing: Duration::ZERO,
        }
    }

    fn dispatcher(
        registry: TestRegistry,
        profiles_fail: bool,
        channel: Arc<TestChannel>,
    ) -> NotificationDispatcher {
        NotificationDispatcher::new(
            Arc::new(registry),
            Arc::new(TestProfiles {
                fail: profiles_fail,
            }),
            channel,
            config(),
        )
    }

    #[tokio::test]
    async fn one_notification_per_subscriber_and_target() {
        let registry = TestRegistry {
            watchers: HashMap::from([
                (target("a"), vec![user("1"), user("2")]),
                (target("b"), vec![user("1")]),
            ]),
            broken: None,
        };
        let channel = Arc::new(TestChannel::default());
        let report = dispatcher(registry, false, channel.clone())
            .dispatch(&[(target("a"), details()), (target("b"), details())])
            .await;

        assert_eq!(report.delivered, 3);
        let sent = channel.sent.lock();
        let for_user1: BTreeSet<_> = sent
            .iter()
            .filter(|(id, _)| id.as_str() == "1")
            .filter_map(|(_, e)| e.target().cloned())
            .collect();
        assert_eq!(for_user1, BTreeSet::from([target("a"), target("b")]));
    }

    #[tokio::test]
    async fn failures_are_counted_and_do_not_stop_the_batch() {
        let registry = TestRegistry {
            watchers: HashMap::from([(target("a"), vec![user("1"), user("2"), user("3"), user("4")])]),
            broken: None,
        };
        let channel = Arc::new(TestChannel {
            sent: Mutex::default(),
            failures: HashMap::from([
                (
                    user("1").id,
                    DeliveryError::RecipientUnreachable(user("1").id),
                ),
                (user("2").id, DeliveryError::RecipientNotFound(user("2").id)),
                (user("3").id, DeliveryError::Other("boom".to_string())),
            ]),
        });
        let report = dispatcher(registry, false, channel.clone())
            .dispatch(&[(target("a"), details())])
            .await;

        assert_eq!(
            report,
            DispatchReport {
                delivered: 1,
                unreachable: 1,
                not_found: 1,
                failed: 1,
                ..Default::default()
            }
        );
        assert_eq!(report.attempted(), 4);
        assert_eq!(channel.sent.lock()[0].0.as_str(), "4");
    }

    #[tokio::test]
    async fn target_without_subscribers_is_not_an_error() {
        let registry = TestRegistry {
            watchers: HashMap::new(),
            broken: None,
        };
        let channel = Arc::new(TestChannel::default());
        let report = dispatcher(registry, false, channel.clone())
            .dispatch(&[(target("a"), details())])
            .await;

        assert_eq!(report.targets_without_subscribers, 1);
        assert_eq!(report.attempted(), 0);
    }

    #[tokio::test]
    async fn registry_failure_is_isolated_to_its_target() {
        let registry = TestRegistry {
            watchers: HashMap::from([
                (target("a"), vec![user("1")]),
                (target("b"), vec![user("1")]),
            ]),
            broken: Some(target("a")),
        };
        let channel = Arc::new(TestChannel::default());
        let report = dispatcher(registry, false, channel.clone())
            .dispatch(&[(target("a"), details()), (target("b"), details())])
            .await;

        assert_eq!(report.registry_errors, 1);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn profile_failure_degrades_to_plain_notification() {
        let registry = TestRegistry {
            watchers: HashMap::from([(target("a"), vec![user("1")])]),
            broken: None,
        };
        let channel = Arc::new(TestChannel::default());
        dispatcher(registry, true, channel.clone())
            .dispatch(&[(target("a"), details())])
            .await;

        let sent = channel.sent.lock();
        assert!(matches!(
            &sent[0].1,
            NotificationEvent::StreamOnline {
                profile_image_url: None,
                display_name,
                ..
            } if display_name == "a"
        ));
    }

    #[tokio::test]
    async fn profile_enriches_notification() {
        let registry = TestRegistry {
            watchers: HashMap::from([(target("a"), vec![user("1")])]),
            broken: None,
        };
        let channel = Arc::new(TestChannel::default());
        dispatcher(registry, false, channel.clone())
            .dispatch(&[(target("a"), details())])
            .await;

        let sent = channel.sent.lock();
        assert_eq!(sent[0].1.title(), "A is streaming!");
    }

    #[tokio::test]
    async fn startup_notice_goes_to_owner() {
        let registry = TestRegistry {
            watchers: HashMap::new(),
            broken: None,
        };
        let channel = Arc::new(TestChannel::default());
        dispatcher(registry, false, channel.clone())
            .notify_owner_startup(&SubscriberId::from_trusted("owner"))
            .await
            .unwrap();

        let sent = channel.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.as_str(), "owner");
        assert!(matches!(sent[0].1, NotificationEvent::SystemStartup { .. }));
    }
}
