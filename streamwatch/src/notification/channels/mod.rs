//! Notification channels.
//!
//! A channel delivers a [`NotificationEvent`] to a single recipient. The
//! dispatcher only distinguishes the failure kinds in [`DeliveryError`].

mod discord;

pub use discord::{DEFAULT_DISCORD_API_BASE, DiscordConfig, DiscordDmChannel};

use async_trait::async_trait;

use super::events::NotificationEvent;
use crate::domain::SubscriberId;

/// Why a delivery failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The recipient exists but does not accept direct messages.
    #[error("recipient {0} does not accept direct messages")]
    RecipientUnreachable(SubscriberId),

    /// The recipient no longer exists.
    #[error("recipient {0} not found")]
    RecipientNotFound(SubscriberId),

    #[error("delivery failed: {0}")]
    Other(String),
}

/// Trait for notification channels.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Deliver `event` to `recipient`.
    async fn deliver(
        &self,
        recipient: &SubscriberId,
        event: &NotificationEvent,
    ) -> Result<(), DeliveryError>;
}
