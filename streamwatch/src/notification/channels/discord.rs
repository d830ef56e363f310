//! Discord direct-message notification channel.
//!
//! Opens (and caches) a DM channel per recipient, then posts an embed to it.
//! Rate limits follow Discord's recommended handling: retry on 429 responses
//! respecting the Retry-After header.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{DeliveryChannel, DeliveryError};
use crate::domain::SubscriberId;
use crate::notification::events::NotificationEvent;

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Maximum number of retries for rate-limited requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Upper bound on a server-requested rate limit wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// "Cannot send messages to this user".
const CANNOT_MESSAGE_USER: u64 = 50007;

/// "Unknown user".
const UNKNOWN_USER: u64 = 10013;

/// Discord channel configuration.
#[derive(Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
    pub api_base: String,
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: DEFAULT_DISCORD_API_BASE.to_string(),
        }
    }

    /// Point the channel at another host (used by tests and proxies).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    OpenDm,
    SendMessage,
}

#[derive(Deserialize)]
struct DiscordErrorBody {
    #[serde(default)]
    code: u64,
}

#[derive(Deserialize)]
struct DmChannelBody {
    id: String,
}

/// Discord DM notification channel.
pub struct DiscordDmChannel {
    config: DiscordConfig,
    client: Client,
    /// Recipient -> DM channel id.
    dm_channels: DashMap<SubscriberId, String>,
}

impl DiscordDmChannel {
    /// Create a new Discord channel.
    ///
    /// The client should come from `platforms_client::create_client_builder`.
    pub fn new(config: DiscordConfig, client: Client) -> Self {
        Self {
            config,
            client,
            dm_channels: DashMap::new(),
        }
    }

    fn authorization(&self) -> String {
        let token = self.config.bot_token.trim();
        let token = token.strip_prefix("Bot ").unwrap_or(token);
        format!("Bot {token}")
    }

    /// Build the message payload for an event.
    fn build_payload(&self, recipient: &SubscriberId, event: &NotificationEvent) -> serde_json::Value {
        let fields: Vec<_> = event
            .fields()
            .into_iter()
            .map(|field| json!({ "name": field.name, "value": field.value, "inline": true }))
            .collect();

        let mut embed = json!({
            "title": event.title(),
            "description": event.description(),
            "color": event.color(),
            "timestamp": event.timestamp().to_rfc3339(),
            "fields": fields,
            "footer": { "text": event.footer() }
        });

        if let Some(url) = event.url() {
            embed["url"] = json!(url);
        }
        if let NotificationEvent::StreamOnline {
            profile_image_url,
            thumbnail_url,
            ..
        } = event
        {
            if let Some(url) = profile_image_url {
                embed["thumbnail"] = json!({ "url": url });
            }
            if let Some(url) = thumbnail_url {
                embed["image"] = json!({ "url": url });
            }
        }

        let mut payload = json!({ "embeds": [embed] });
        if event.target().is_some() {
            payload["content"] = json!(format!("||{}||", recipient.mention()));
        }
        payload
    }

    /// Send request with rate limit handling.
    /// Retries on 429 responses respecting the Retry-After header.
    async fn send_with_retry(
        &self,
        phase: Phase,
        recipient: &SubscriberId,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<reqwest::Response, DeliveryError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let response = self
                .client
                .post(url)
                .header(AUTHORIZATION, self.authorization())
                .json(payload)
                .send()
                .await
                .map_err(|e| DeliveryError::Other(format!("Discord request failed: {}", e)))?;

            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = parse_retry_after(&response);

                if attempts >= MAX_RATE_LIMIT_RETRIES {
                    warn!(
                        "Discord rate limit: max retries ({}) exceeded, last retry_after was {:?}",
                        MAX_RATE_LIMIT_RETRIES, retry_after
                    );
                    return Err(DeliveryError::Other(format!(
                        "Discord rate limit exceeded after {} retries",
                        MAX_RATE_LIMIT_RETRIES
                    )));
                }

                let wait_duration = retry_after.unwrap_or(Duration::from_secs(1));
                debug!(
                    "Discord rate limited (429), waiting {:?} before retry (attempt {}/{})",
                    wait_duration, attempts, MAX_RATE_LIMIT_RETRIES
                );
                tokio::time::sleep(wait_duration).await;
                continue;
            }

            // Other error - don't retry
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(phase, recipient, status, &body));
        }
    }

    /// DM channel id for `recipient`, opening one on first use.
    async fn dm_channel_id(&self, recipient: &SubscriberId) -> Result<String, DeliveryError> {
        if let Some(id) = self.dm_channels.get(recipient) {
            return Ok(id.value().clone());
        }

        let url = format!("{}/users/@me/channels", self.config.api_base);
        let payload = json!({ "recipient_id": recipient.as_str() });
        let response = self
            .send_with_retry(Phase::OpenDm, recipient, &url, &payload)
            .await?;
        let channel: DmChannelBody = response
            .json()
            .await
            .map_err(|e| DeliveryError::Other(format!("Invalid DM channel response: {}", e)))?;

        self.dm_channels
            .insert(recipient.clone(), channel.id.clone());
        Ok(channel.id)
    }
}

/// Parse the Retry-After duration from a 429 response.
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    // Retry-After first, then X-RateLimit-Reset-After.
    ["Retry-After", "X-RateLimit-Reset-After"]
        .iter()
        .filter_map(|name| response.headers().get(*name))
        .find_map(|value| value.to_str().ok().and_then(parse_wait_secs))
}

/// Fractional seconds as a wait, capped at [`MAX_RETRY_AFTER`].
///
/// Negative, non-finite and unparsable values yield `None`.
fn parse_wait_secs(value: &str) -> Option<Duration> {
    let secs = value.trim().parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64())).ok()
}

fn classify_failure(
    phase: Phase,
    recipient: &SubscriberId,
    status: StatusCode,
    body: &str,
) -> DeliveryError {
    let code = serde_json::from_str::<DiscordErrorBody>(body)
        .map(|b| b.code)
        .unwrap_or_default();

    if code == CANNOT_MESSAGE_USER || status == StatusCode::FORBIDDEN {
        return DeliveryError::RecipientUnreachable(recipient.clone());
    }
    if code == UNKNOWN_USER || (phase == Phase::OpenDm && status == StatusCode::NOT_FOUND) {
        return DeliveryError::RecipientNotFound(recipient.clone());
    }

    warn!("Discord request failed: {} - {}", status, body);
    DeliveryError::Other(format!("Discord request failed: {} - {}", status, body))
}

#[async_trait]
impl DeliveryChannel for DiscordDmChannel {
    fn channel_type(&self) -> &'static str {
        "discord"
    }

    async fn deliver(
        &self,
        recipient: &SubscriberId,
        event: &NotificationEvent,
    ) -> Result<(), DeliveryError> {
        let channel_id = self.dm_channel_id(recipient).await?;
        let url = format!("{}/channels/{}/messages", self.config.api_base, channel_id);
        let payload = self.build_payload(recipient, event);

        if let Err(e) = self
            .send_with_retry(Phase::SendMessage, recipient, &url, &payload)
            .await
        {
            // The cached channel may be stale; reopen it next time.
            self.dm_channels.remove(recipient);
            return Err(e);
        }

        debug!(recipient = %recipient, "Discord notification sent: {}", event.event_type());
        Ok(())
    }
}
