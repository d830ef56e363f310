//! Notification events.
//!
//! Defines the events that can be delivered to a recipient and the
//! channel-agnostic fields they render to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Target;
use crate::monitor::{StreamDetails, TargetProfile};

/// Crate version shown in notification footers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Events that can trigger notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NotificationEvent {
    /// Target went online.
    StreamOnline {
        target: Target,
        display_name: String,
        title: String,
        viewer_count: u64,
        started_at: DateTime<Utc>,
        game: Option<String>,
        profile_image_url: Option<String>,
        thumbnail_url: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// Sent to the bot owner after a fresh start.
    SystemStartup {
        version: String,
        timestamp: DateTime<Utc>,
    },
}

/// A named value shown alongside the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventField {
    pub name: &'static str,
    pub value: String,
}

/// Viewer count as shown to recipients.
pub fn viewers_text(count: u64) -> String {
    if count == 0 {
        "No viewers. Be the first!".to_string()
    } else {
        count.to_string()
    }
}

/// Discord timestamp markup; every client renders it in its own time zone.
pub fn discord_timestamp(at: DateTime<Utc>) -> String {
    format!("<t:{}:T>", at.timestamp())
}

impl NotificationEvent {
    /// Build the go-live notification for `target`.
    ///
    /// Without a profile the login stands in for the display name and no
    /// profile image is shown.
    pub fn stream_online(
        target: &Target,
        details: &StreamDetails,
        profile: Option<&TargetProfile>,
    ) -> Self {
        Self::StreamOnline {
            target: target.clone(),
            display_name: profile
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| target.to_string()),
            title: details.title.clone(),
            viewer_count: details.viewer_count,
            started_at: details.started_at,
            game: details.game.clone(),
            profile_image_url: profile.and_then(|p| p.profile_image_url.clone()),
            thumbnail_url: details.thumbnail_url.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn system_startup() -> Self {
        Self::SystemStartup {
            version: VERSION.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StreamOnline { .. } => "stream_online",
            Self::SystemStartup { .. } => "system_startup",
        }
    }

    /// Get a human-readable title for this event.
    pub fn title(&self) -> String {
        match self {
            Self::StreamOnline { display_name, .. } => format!("{} is streaming!", display_name),
            Self::SystemStartup { .. } => "Initialization Successful".to_string(),
        }
    }

    /// Get a detailed description of this event.
    pub fn description(&self) -> String {
        match self {
            Self::StreamOnline { target, .. } => format!(
                "Click [here]({}) to watch the stream.",
                target.channel_url()
            ),
            Self::SystemStartup { version, .. } => {
                format!("Bot started successfully (v{}).", version)
            }
        }
    }

    /// Link the title points to.
    pub fn url(&self) -> Option<String> {
        match self {
            Self::StreamOnline { target, .. } => Some(target.channel_url()),
            Self::SystemStartup { .. } => None,
        }
    }

    /// Embed color (RGB).
    pub fn color(&self) -> u32 {
        match self {
            Self::StreamOnline { .. } => 0x2ecc71,
            Self::SystemStartup { .. } => 0x00ff00,
        }
    }

    /// Fields rendered under the description, in display order.
    pub fn fields(&self) -> Vec<EventField> {
        match self {
            Self::StreamOnline {
                title,
                viewer_count,
                started_at,
                game,
                ..
            } => {
                let mut fields = Vec::with_capacity(4);
                if let Some(game) = game {
                    fields.push(EventField {
                        name: "Game",
                        value: game.clone(),
                    });
                }
                fields.push(EventField {
                    name: "Viewers",
                    value: viewers_text(*viewer_count),
                });
                fields.push(EventField {
                    name: "Stream Title",
                    value: title.clone(),
                });
                fields.push(EventField {
                    name: "Stream Start Time (local)",
                    value: discord_timestamp(*started_at),
                });
                fields
            }
            Self::SystemStartup { .. } => Vec::new(),
        }
    }

    /// Get the timestamp of this event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::StreamOnline { timestamp, .. } | Self::SystemStartup { timestamp, .. } => {
                *timestamp
            }
        }
    }

    /// Get the target ID if this is a stream event.
    pub fn target(&self) -> Option<&Target> {
        match self {
            Self::StreamOnline { target, .. } => Some(target),
            Self::SystemStartup { .. } => None,
        }
    }

    /// Footer text shown under every notification.
    pub fn footer(&self) -> String {
        format!("streamwatch v{}", VERSION)
    }
}
