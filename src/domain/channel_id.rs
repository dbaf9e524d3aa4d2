//! Validated channel names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Longest channel name accepted by the relay.
pub const MAX_CHANNEL_LEN: usize = 164;

/// Name of a topic that connections join to receive published events.
///
/// Always non-empty, at most [`MAX_CHANNEL_LEN`] bytes, and restricted to
/// ASCII alphanumerics plus `_ - = @ , . ;`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    /// Validates and wraps a channel name.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidRequest`] if the name is empty, too long,
    /// or contains a character outside the allowed set.
    pub fn parse(name: impl Into<String>) -> Result<Self, RelayError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RelayError::InvalidRequest(
                "channel must not be empty".to_string(),
            ));
        }
        if name.len() > MAX_CHANNEL_LEN {
            return Err(RelayError::InvalidRequest(format!(
                "channel name exceeds {MAX_CHANNEL_LEN} characters"
            )));
        }
        if let Some(bad) = name.chars().find(|c| !is_channel_char(*c)) {
            return Err(RelayError::InvalidRequest(format!(
                "channel name contains invalid character {bad:?}"
            )));
        }
        Ok(Self(name))
    }

    /// Returns the channel name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_channel_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '=' | '@' | ',' | '.' | ';')
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ChannelId {
    type Error = RelayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
