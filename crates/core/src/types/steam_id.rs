//! SteamID64 identifier type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`SteamId64`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SteamIdError {
    /// The input string is empty.
    #[error("steamId64 cannot be empty")]
    Empty,
    /// The input is not exactly 17 characters long.
    #[error("steamId64 must be exactly {expected} digits (got {got})")]
    WrongLength {
        /// Required number of digits.
        expected: usize,
        /// Number of characters in the input.
        got: usize,
    },
    /// The input contains a non-digit character.
    #[error("steamId64 must contain only ASCII digits")]
    NonDigit,
}

/// A SteamID64 community identifier.
///
/// Steam identifies accounts with a 64-bit number rendered as exactly 17
/// decimal digits (e.g. `76561198000000000`). The value is kept as a string
/// because it is an opaque identifier everywhere in this system: it is never
/// used arithmetically and JSON consumers (game-server plugin, Discord bot)
/// expect a string.
///
/// ## Examples
///
/// ```
/// use vip_core::SteamId64;
///
/// assert!(SteamId64::parse("76561198000000000").is_ok());
/// assert!(SteamId64::parse("7656119800000000").is_err());  // 16 digits
/// assert!(SteamId64::parse("7656119800000000x").is_err()); // non-digit
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SteamId64(String);

impl SteamId64 {
    /// Number of decimal digits in a SteamID64.
    pub const LENGTH: usize = 17;

    /// Parse a `SteamId64` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 17 ASCII digits.
    pub fn parse(s: &str) -> Result<Self, SteamIdError> {
        if s.is_empty() {
            return Err(SteamIdError::Empty);
        }

        if s.len() != Self::LENGTH {
            return Err(SteamIdError::WrongLength {
                expected: Self::LENGTH,
                got: s.len(),
            });
        }

        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SteamIdError::NonDigit);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `SteamId64` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SteamId64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SteamId64 {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
