//! Watchlist repository.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::warn;

use crate::Result;
use crate::database::models::{SubscriberDbModel, WatchEntryDbModel};
use crate::database::time::now_ms;
use crate::domain::{Subscriber, SubscriberId, Target};
use crate::registry::TargetRegistry;

/// Watchlist repository trait.
#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    async fn get_subscriber(&self, id: &SubscriberId) -> Result<Option<SubscriberDbModel>>;
    /// Insert the subscriber or refresh its display name.
    async fn upsert_subscriber(&self, subscriber: &Subscriber) -> Result<()>;
    /// Delete the subscriber and its whole watchlist. Returns false if it did not exist.
    async fn delete_subscriber(&self, id: &SubscriberId) -> Result<bool>;
    /// Returns true if the target was newly added.
    async fn add_target(&self, id: &SubscriberId, target: &Target) -> Result<bool>;
    /// Returns true if the target was present.
    async fn remove_target(&self, id: &SubscriberId, target: &Target) -> Result<bool>;
    async fn list_targets(&self, id: &SubscriberId) -> Result<Vec<Target>>;
    async fn count_subscribers(&self) -> Result<u64>;
    async fn count_targets(&self) -> Result<u64>;
}

/// SQLx implementation of WatchlistRepository.
pub struct SqlxWatchlistRepository {
    pool: SqlitePool,
    write_pool: SqlitePool,
}

impl SqlxWatchlistRepository {
    pub fn new(pool: SqlitePool, write_pool: SqlitePool) -> Self {
        Self { pool, write_pool }
    }
}

fn stored_target(raw: String) -> Option<Target> {
    match Target::try_from(raw) {
        Ok(target) => Some(target),
        Err(e) => {
            warn!(error = %e, "Skipping malformed watchlist row");
            None
        }
    }
}

#[async_trait]
impl WatchlistRepository for SqlxWatchlistRepository {
    async fn get_subscriber(&self, id: &SubscriberId) -> Result<Option<SubscriberDbModel>> {
        let subscriber =
            sqlx::query_as::<_, SubscriberDbModel>("SELECT * FROM subscribers WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(subscriber)
    }

    async fn upsert_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO subscribers (id, display_name, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name
            "#,
        )
        .bind(subscriber.id.as_str())
        .bind(&subscriber.display_name)
        .bind(now_ms())
        .execute(&self.write_pool)
        .await?;
        Ok(())
    }

    async fn delete_subscriber(&self, id: &SubscriberId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscribers WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.write_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_target(&self, id: &SubscriberId, target: &Target) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO watchlist (subscriber_id, target, added_at) VALUES (?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(target.as_str())
        .bind(now_ms())
        .execute(&self.write_pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_target(&self, id: &SubscriberId, target: &Target) -> Result<bool> {
        let result = sqlx::query("DELETE FROM watchlist WHERE subscriber_id = ? AND target = ?")
            .bind(id.as_str())
            .bind(target.as_str())
            .execute(&self.write_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_targets(&self, id: &SubscriberId) -> Result<Vec<Target>> {
        let entries = sqlx::query_as::<_, WatchEntryDbModel>(
            "SELECT * FROM watchlist WHERE subscriber_id = ? ORDER BY added_at, target",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| stored_target(entry.target))
            .collect())
    }

    async fn count_subscribers(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_targets(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT target) FROM watchlist")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl TargetRegistry for SqlxWatchlistRepository {
    async fn all_targets(&self) -> Result<BTreeSet<Target>> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT DISTINCT target FROM watchlist")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().filter_map(stored_target).collect())
    }

    async fn subscribers_for(&self, target: &Target) -> Result<Vec<Subscriber>> {
        let subscribers = sqlx::query_as::<_, SubscriberDbModel>(
            r#"
            SELECT s.* FROM subscribers s
            JOIN watchlist w ON w.subscriber_id = s.id
            WHERE w.target = ?
            ORDER BY w.added_at, s.id
            "#,
        )
        .bind(target.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(subscribers.into_iter().map(Subscriber::from).collect())
    }

    async fn all_subscribers(&self) -> Result<Vec<Subscriber>> {
        let subscribers = sqlx::query_as::<_, SubscriberDbModel>(
            "SELECT * FROM subscribers ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(subscribers.into_iter().map(Subscriber::from).collect())
    }
}
