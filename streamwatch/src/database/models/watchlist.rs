//! Watchlist database models.

use sqlx::FromRow;

use crate::domain::{Subscriber, SubscriberId};

/// Subscriber database model.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriberDbModel {
    /// Platform user id
    pub id: String,
    pub display_name: String,
    /// Unix epoch milliseconds (UTC) when the subscriber first watched a target.
    pub created_at: i64,
}

impl From<SubscriberDbModel> for Subscriber {
    fn from(model: SubscriberDbModel) -> Self {
        Subscriber::new(SubscriberId::from_trusted(model.id), model.display_name)
    }
}

/// A single (subscriber, target) row.
#[derive(Debug, Clone, FromRow)]
pub struct WatchEntryDbModel {
    pub subscriber_id: String,
    /// Canonical target login
    pub target: String,
    /// Unix epoch milliseconds (UTC).
    pub added_at: i64,
}
