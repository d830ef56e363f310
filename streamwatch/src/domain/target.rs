//! Target value object.

use std::fmt;
use std::str::FromStr;

use platforms_client::twitch;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A watched channel.
///
/// Always holds the canonical form (trimmed, lower-case login), so the derived
/// equality and hashing are case-insensitive with respect to user input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target(String);

impl Target {
    /// Parse a login or a channel link into a target.
    pub fn parse(input: &str) -> Result<Self, Error> {
        twitch::parse_channel_login(input).map(Self).map_err(|_| {
            Error::validation(format!(
                "'{}' is not a valid channel name or link",
                input.trim()
            ))
        })
    }

    /// Get the canonical login.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public channel page.
    pub fn channel_url(&self) -> String {
        twitch::channel_url(&self.0)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Target {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_case_and_whitespace() {
        assert_eq!(Target::parse("Alice").unwrap(), Target::parse(" alice ").unwrap());
        assert_eq!(Target::parse("ALICE").unwrap().as_str(), "alice");
    }

    #[test]
    fn accepts_links() {
        let target = Target::parse("https://www.twitch.tv/Alice").unwrap();
        assert_eq!(target.as_str(), "alice");
        assert_eq!(target.channel_url(), "https://www.twitch.tv/alice");
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(Target::parse("  "), Err(Error::Validation(_))));
    }

    #[test]
    fn serde_uses_canonical_string() {
        let target: Target = serde_json::from_str("\"Bob\"").unwrap();
        assert_eq!(serde_json::to_string(&target).unwrap(), "\"bob\"");
        assert!(serde_json::from_str::<Target>("\"\"").is_err());
    }
}
