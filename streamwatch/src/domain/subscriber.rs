//! Subscriber value objects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Opaque platform user id of a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("Subscriber id cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Create an id without validation (for trusted sources like DB).
    pub fn from_trusted(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chat mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user who watches one or more targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    /// Informational only; never used for routing.
    pub display_name: String,
}

impl Subscriber {
    pub fn new(id: SubscriberId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_trimmed_and_required() {
        assert_eq!(SubscriberId::new(" 42 ").unwrap().as_str(), "42");
        assert!(SubscriberId::new("").is_err());
    }

    #[test]
    fn mention_markup() {
        assert_eq!(SubscriberId::from_trusted("42").mention(), "<@42>");
    }
}
