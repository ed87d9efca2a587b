//! Discord account identifier type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`DiscordId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscordIdError {
    /// The input string is empty or whitespace-only.
    #[error("discordId cannot be empty")]
    Empty,
    /// The input is shorter than the minimum length.
    #[error("discordId must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is longer than the maximum length.
    #[error("discordId must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A Discord account identifier.
///
/// Discord snowflakes are numeric strings, but the bot occasionally sends
/// tagged test identifiers, so this only enforces length bounds. Input is
/// trimmed before validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct DiscordId(String);

impl DiscordId {
    /// Minimum length of a Discord identifier.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum length of a Discord identifier.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `DiscordId` from a string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or outside the
    /// 3..=64 character bounds.
    pub fn parse(s: &str) -> Result<Self, DiscordIdError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(DiscordIdError::Empty);
        }

        if trimmed.len() < Self::MIN_LENGTH {
            return Err(DiscordIdError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if trimmed.len() > Self::MAX_LENGTH {
            return Err(DiscordIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiscordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
