//! Individual stream detection.
//!
//! This module handles checking the live status of individual targets and
//! looking up the profile metadata used to enrich notifications.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platforms_client::twitch::{TwitchHelix, models::HelixStream, sized_image_url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;
use crate::domain::Target;

/// Size requested for profile images.
pub const PROFILE_IMAGE_SIZE: u32 = 300;

/// Size requested for stream preview thumbnails.
const THUMBNAIL_SIZE: (u32, u32) = (1280, 720);

/// Payload of a live observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDetails {
    pub title: String,
    pub viewer_count: u64,
    pub started_at: DateTime<Utc>,
    /// Game or category, if the broadcaster set one.
    pub game: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl From<HelixStream> for StreamDetails {
    fn from(stream: HelixStream) -> Self {
        let game = stream.game().map(str::to_string);
        let thumbnail_url = Some(stream.thumbnail_url.as_str())
            .filter(|url| !url.is_empty())
            .map(|url| sized_image_url(url, THUMBNAIL_SIZE.0, THUMBNAIL_SIZE.1));
        Self {
            title: stream.title,
            viewer_count: stream.viewer_count,
            started_at: stream.started_at,
            game,
            thumbnail_url,
        }
    }
}

/// Live status of a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiveStatus {
    /// Target is currently live.
    Live(StreamDetails),
    /// Target is offline.
    Offline,
}

impl LiveStatus {
    /// Check if the status indicates the target is live.
    pub fn is_live(&self) -> bool {
        matches!(self, LiveStatus::Live(_))
    }

    /// Check if the status indicates the target is offline.
    pub fn is_offline(&self) -> bool {
        matches!(self, LiveStatus::Offline)
    }

    /// Stream payload when live.
    pub fn details(&self) -> Option<&StreamDetails> {
        match self {
            LiveStatus::Live(details) => Some(details),
            LiveStatus::Offline => None,
        }
    }
}

/// Profile metadata of a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetProfile {
    pub display_name: String,
    /// Already sized to [`PROFILE_IMAGE_SIZE`].
    pub profile_image_url: Option<String>,
}

/// Remote status query.
///
/// Implementations must be safe to call concurrently for distinct targets.
#[async_trait]
pub trait StatusQuery: Send + Sync {
    async fn check_status(&self, target: &Target) -> Result<LiveStatus>;
}

/// Remote profile lookup. `Ok(None)` means the account does not exist.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn lookup_profile(&self, target: &Target) -> Result<Option<TargetProfile>>;
}

/// Twitch Helix backed detector.
#[derive(Debug, Clone)]
pub struct HelixDetector {
    helix: TwitchHelix,
}

impl HelixDetector {
    pub fn new(helix: TwitchHelix) -> Self {
        Self { helix }
    }
}

#[async_trait]
impl StatusQuery for HelixDetector {
    async fn check_status(&self, target: &Target) -> Result<LiveStatus> {
        let status = match self.helix.get_stream(target.as_str()).await? {
            Some(stream) => LiveStatus::Live(stream.into()),
            None => LiveStatus::Offline,
        };
        debug!(login = %target, live = status.is_live(), "Checked status");
        Ok(status)
    }
}

#[async_trait]
impl ProfileLookup for HelixDetector {
    async fn lookup_profile(&self, target: &Target) -> Result<Option<TargetProfile>> {
        let profile = self
            .helix
            .get_user(target.as_str())
            .await?
            .map(|user| TargetProfile {
                display_name: user.display_name,
                profile_image_url: Some(user.profile_image_url.as_str())
                    .filter(|url| !url.is_empty())
                    .map(|url| sized_image_url(url, PROFILE_IMAGE_SIZE, PROFILE_IMAGE_SIZE)),
            });
        Ok(profile)
    }
}
