//! Twitch Helix API support.

mod helix;
pub mod models;

use std::sync::LazyLock;

use regex::Regex;

use crate::error::PlatformError;

pub use helix::{DEFAULT_HELIX_BASE_URL, HelixCredentials, TwitchHelix};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.|m\.)?twitch\.tv/([^/?#\s]+)").expect("valid regex")
});

static LOGIN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]{1,25}$").expect("valid regex"));

/// Public channel page for a login.
pub fn channel_url(login: &str) -> String {
    format!("https://www.twitch.tv/{login}")
}

/// Extract a canonical channel login from either a bare login or a channel URL.
///
/// The result is trimmed and lower-cased.
pub fn parse_channel_login(input: &str) -> Result<String, PlatformError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PlatformError::InvalidLogin(input.to_string()));
    }

    let raw = if trimmed.contains("twitch.tv") {
        URL_REGEX
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| PlatformError::InvalidUrl(trimmed.to_string()))?
    } else {
        trimmed
    };

    let login = raw.to_lowercase();
    if !LOGIN_REGEX.is_match(&login) {
        return Err(PlatformError::InvalidLogin(input.to_string()));
    }
    Ok(login)
}

/// Fill the `{width}`/`{height}` placeholders Twitch uses in image URLs.
pub fn sized_image_url(template: &str, width: u32, height: u32) -> String {
    template
        .replace("{width}", &width.to_string())
        .replace("{height}", &height.to_string())
}
