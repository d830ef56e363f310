//! User-facing watchlist operations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::database::repositories::WatchlistRepository;
use crate::domain::{Subscriber, SubscriberId, Target};
use crate::monitor::{ProfileLookup, TargetProfile};
use crate::{Error, Result};

/// Result of a watch command.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchOutcome {
    /// First target of a new subscriber.
    Created {
        target: Target,
        profile: TargetProfile,
    },
    Added {
        target: Target,
        profile: TargetProfile,
    },
    AlreadyWatching { target: Target },
}

/// Result of an unwatch command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnwatchOutcome {
    Removed { target: Target },
    NotWatching { target: Target },
    /// The caller never watched anything.
    NoWatchlist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub subscribers: u64,
    /// Distinct watched targets.
    pub targets: u64,
    pub uptime: Duration,
}

/// Watchlist commands, applied to the registry on behalf of one subscriber.
///
/// Changes become visible to the engine on its next cycle.
pub struct WatchlistService {
    repo: Arc<dyn WatchlistRepository>,
    profiles: Arc<dyn ProfileLookup>,
    started_at: Instant,
}

impl WatchlistService {
    pub fn new(repo: Arc<dyn WatchlistRepository>, profiles: Arc<dyn ProfileLookup>) -> Self {
        Self {
            repo,
            profiles,
            started_at: Instant::now(),
        }
    }

    /// Add a channel (login or link) to the subscriber's watchlist.
    ///
    /// Fails with `NotFound` when the channel does not exist.
    pub async fn watch(&self, subscriber: &Subscriber, input: &str) -> Result<WatchOutcome> {
        let target = Target::parse(input)?;
        let profile = self
            .profiles
            .lookup_profile(&target)
            .await?
            .ok_or_else(|| Error::not_found("Channel", target.as_str()))?;

        let existed = self.repo.get_subscriber(&subscriber.id).await?.is_some();
        self.repo.upsert_subscriber(subscriber).await?;
        let added = self.repo.add_target(&subscriber.id, &target).await?;

        let outcome = match (existed, added) {
            (false, _) => {
                info!(
                    subscriber = %subscriber.display_name,
                    login = %target,
                    "Created a new watchlist"
                );
                WatchOutcome::Created { target, profile }
            }
            (true, true) => {
                info!(subscriber = %subscriber.display_name, login = %target, "Added to watchlist");
                WatchOutcome::Added { target, profile }
            }
            (true, false) => {
                debug!(subscriber = %subscriber.display_name, login = %target, "Already watching");
                WatchOutcome::AlreadyWatching { target }
            }
        };
        Ok(outcome)
    }

    /// Remove a channel (login or link) from the subscriber's watchlist.
    pub async fn unwatch(&self, subscriber: &SubscriberId, input: &str) -> Result<UnwatchOutcome> {
        let target = Target::parse(input)?;
        if self.repo.get_subscriber(subscriber).await?.is_none() {
            return Ok(UnwatchOutcome::NoWatchlist);
        }

        if self.repo.remove_target(subscriber, &target).await? {
            info!(subscriber = %subscriber, login = %target, "Removed from watchlist");
            Ok(UnwatchOutcome::Removed { target })
        } else {
            Ok(UnwatchOutcome::NotWatching { target })
        }
    }

    pub async fn list(&self, subscriber: &SubscriberId) -> Result<Vec<Target>> {
        self.repo.list_targets(subscriber).await
    }

    /// Drop the subscriber and its whole watchlist. Returns false if it was not registered.
    pub async fn unregister(&self, subscriber: &SubscriberId) -> Result<bool> {
        let removed = self.repo.delete_subscriber(subscriber).await?;
        if removed {
            info!(subscriber = %subscriber, "Unregistered");
        }
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<RegistryStats> {
        Ok(RegistryStats {
            subscribers: self.repo.count_subscribers().await?,
            targets: self.repo.count_targets().await?,
            uptime: self.started_at.elapsed(),
        })
    }
}
