//! Order reference generation.

use core::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ServerInstance;

/// The order reference correlating a purchase with the payment provider.
///
/// Generated at checkout-creation time as
/// `{INSTANCE}-{epochMillis}-{8-hex-random}` (e.g.
/// `SOLO-1735689600000-3f9a1c2e`). Uniqueness relies on the millisecond
/// timestamp plus 32 random bits rather than a collision check, which is
/// fine at human purchase volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OrderNsu(String);

impl OrderNsu {
    /// Generate a fresh order reference for an instance.
    #[must_use]
    pub fn generate(instance: ServerInstance) -> Self {
        let timestamp = Utc::now().timestamp_millis();
        let suffix = random_suffix();
        Self(format!(
            "{}-{timestamp}-{suffix}",
            instance.as_str().to_uppercase()
        ))
    }

    /// Wrap an order reference received from the outside (webhook payloads).
    #[must_use]
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNsu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First 8 hex characters of a v4 UUID.
fn random_suffix() -> String {
    let mut buf = Uuid::encode_buffer();
    let simple = Uuid::new_v4().as_simple().encode_lower(&mut buf);
    simple[..8].to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn has_expected_shape() {
        let nsu = OrderNsu::generate(ServerInstance::Solo);
        let parts: Vec<&str> = nsu.as_str().splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "SOLO");
        assert!(parts[1].bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn ten_thousand_rapid_generations_are_unique() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let nsu = OrderNsu::generate(ServerInstance::Duo);
            assert!(seen.insert(nsu), "collision in generated order references");
        }
    }
}
