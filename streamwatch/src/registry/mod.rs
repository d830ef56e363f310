//! Target registry.
//!
//! Subscribers and the targets they watch. The engine only reads it through
//! [`TargetRegistry`]; user commands mutate it through [`WatchlistService`].

pub mod service;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::Result;
use crate::domain::{Subscriber, Target};

pub use service::{RegistryStats, UnwatchOutcome, WatchOutcome, WatchlistService};

/// Read-only view of the registry used by the engine.
#[async_trait]
pub trait TargetRegistry: Send + Sync {
    /// Distinct targets watched by at least one subscriber.
    async fn all_targets(&self) -> Result<BTreeSet<Target>>;

    /// Subscribers currently watching `target`, in subscription order.
    async fn subscribers_for(&self, target: &Target) -> Result<Vec<Subscriber>>;

    async fn all_subscribers(&self) -> Result<Vec<Subscriber>>;
}
