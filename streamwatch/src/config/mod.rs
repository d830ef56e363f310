//! Application configuration.
//!
//! Everything is read from the process environment, optionally seeded from a
//! `.env` file. Secrets have no default; every other setting does.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, info};

use crate::domain::SubscriberId;
use crate::monitor::PollerConfig;
use crate::notification::DispatcherConfig;
use crate::scheduler::SchedulerConfig;
use crate::utils::fs;
use crate::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:streamwatch.db?mode=rwc";
pub const DEFAULT_SNAPSHOT_PATH: &str = "streamwatch-snapshot.json";
pub const DEFAULT_LOG_DIR: &str = "logs";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 16;
const DEFAULT_MAX_CONCURRENT_DELIVERIES: usize = 8;
const DEFAULT_DELIVERY_PACING_MS: u64 = 250;
const DEFAULT_LOG_RETENTION_DAYS: u32 = 7;

/// Settings without a default.
const SECRET_KEYS: [&str; 3] = ["TWITCH_CLIENT_ID", "TWITCH_ACCESS_TOKEN", "DISCORD_TOKEN"];

/// Written to `.env` when the required secrets are missing.
const ENV_TEMPLATE: &str = "\
TWITCH_CLIENT_ID=your-twitch-client-id
TWITCH_ACCESS_TOKEN=your-twitch-app-access-token
DISCORD_TOKEN=your-discord-bot-token
BOT_OWNER_ID=
DATABASE_URL=sqlite:streamwatch.db?mode=rwc
SNAPSHOT_PATH=streamwatch-snapshot.json
POLL_INTERVAL_SECS=5
";

/// Resolved application configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub twitch_client_id: String,
    pub twitch_access_token: String,
    pub discord_token: String,
    /// Recipient of the startup notice.
    pub owner: Option<SubscriberId>,
    pub database_url: String,
    pub snapshot_path: PathBuf,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub max_concurrent_deliveries: usize,
    pub delivery_pacing: Duration,
    pub log_dir: PathBuf,
    pub log_retention_days: u32,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("twitch_client_id", &self.twitch_client_id)
            .field("twitch_access_token", &"<redacted>")
            .field("discord_token", &"<redacted>")
            .field("owner", &self.owner)
            .field("database_url", &self.database_url)
            .field("snapshot_path", &self.snapshot_path)
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("max_concurrent_deliveries", &self.max_concurrent_deliveries)
            .field("delivery_pacing", &self.delivery_pacing)
            .field("log_dir", &self.log_dir)
            .field("log_retention_days", &self.log_retention_days)
            .finish()
    }
}

impl AppConfig {
    /// Load `env_file` (if present) into the environment and read the config.
    ///
    /// When a secret is missing and `env_file` does not exist, a template is
    /// written there and a configuration error is returned.
    pub fn load(env_file: &Path) -> Result<Self> {
        Self::load_with(env_file, |key| std::env::var(key).ok())
    }

    fn load_with<F>(env_file: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match dotenvy::from_path(env_file) {
            Ok(()) => debug!(path = %env_file.display(), "Loaded environment file"),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(Error::config(format!(
                    "Failed to read {}: {}",
                    env_file.display(),
                    e
                )));
            }
        }

        match Self::from_lookup(&lookup) {
            Err(Error::Configuration(msg))
                if !env_file.exists() && !missing_secrets(&lookup).is_empty() =>
            {
                write_env_template(env_file)?;
                Err(Error::config(format!(
                    "{}. A template was written to {}; fill it in and restart",
                    msg,
                    env_file.display()
                )))
            }
            other => other,
        }
    }

    /// Read the config through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| get(key).ok_or_else(|| Error::config(format!("{key} is not set")));

        let owner = get("BOT_OWNER_ID")
            .map(SubscriberId::new)
            .transpose()
            .map_err(|e| Error::config(format!("BOT_OWNER_ID: {e}")))?;

        let config = Self {
            twitch_client_id: required("TWITCH_CLIENT_ID")?,
            twitch_access_token: required("TWITCH_ACCESS_TOKEN")?,
            discord_token: required("DISCORD_TOKEN")?,
            owner,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            snapshot_path: get("SNAPSHOT_PATH")
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string())
                .into(),
            poll_interval: Duration::from_secs(positive(
                "POLL_INTERVAL_SECS",
                get("POLL_INTERVAL_SECS"),
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            request_timeout: Duration::from_secs(positive(
                "REQUEST_TIMEOUT_SECS",
                get("REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            max_concurrent_requests: positive(
                "MAX_CONCURRENT_REQUESTS",
                get("MAX_CONCURRENT_REQUESTS"),
                DEFAULT_MAX_CONCURRENT_REQUESTS,
            )?,
            max_concurrent_deliveries: positive(
                "MAX_CONCURRENT_DELIVERIES",
                get("MAX_CONCURRENT_DELIVERIES"),
                DEFAULT_MAX_CONCURRENT_DELIVERIES,
            )?,
            delivery_pacing: Duration::from_millis(parse(
                "DELIVERY_PACING_MS",
                get("DELIVERY_PACING_MS"),
                DEFAULT_DELIVERY_PACING_MS,
            )?),
            log_dir: get("LOG_DIR")
                .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
                .into(),
            log_retention_days: positive(
                "LOG_RETENTION_DAYS",
                get("LOG_RETENTION_DAYS"),
                DEFAULT_LOG_RETENTION_DAYS,
            )?,
        };

        Ok(config)
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            request_timeout: self.request_timeout,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_concurrent_deliveries: self.max_concurrent_deliveries,
            delivery_pacing: self.delivery_pacing,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: self.poll_interval,
            owner: self.owner.clone(),
        }
    }
}

/// Secrets that are unset or blank.
fn missing_secrets<F>(lookup: F) -> Vec<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    SECRET_KEYS
        .into_iter()
        .filter(|key| lookup(*key).is_none_or(|v| v.trim().is_empty()))
        .collect()
}

/// Write the `.env` template unless a file already exists at `path`.
///
/// Returns true if the template was written.
pub fn write_env_template(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::ensure_dir_all_sync(parent)?;
    }
    std::fs::write(path, ENV_TEMPLATE).map_err(|e| fs::io_error("writing env template", path, e))?;
    info!(path = %path.display(), "Wrote environment template");
    Ok(true)
}

fn parse<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::config(format!("{key}: invalid value {raw:?}: {e}"))),
    }
}

fn positive<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr + Default + PartialEq,
    T::Err: fmt::Display,
{
    let parsed = parse(key, value, default)?;
    if parsed == T::default() {
        return Err(Error::config(format!("{key} must be greater than zero")));
    }
    Ok(parsed)
}
