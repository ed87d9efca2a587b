//! VIP entitlement tiers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A purchasable VIP tier.
///
/// Serialized as `"vip"` / `"vip+"` in the per-server documents and the
/// checkout API. The Discord bot path historically sent `"vip_plus"` for
/// the higher tier, kept as a deserialization alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VipType {
    #[serde(rename = "vip")]
    Vip,
    #[serde(rename = "vip+", alias = "vip_plus")]
    VipPlus,
}

impl VipType {
    /// Validity period granted per purchase of this tier.
    ///
    /// Both tiers are currently 30 days; the lookup is per-tier so the
    /// durations can diverge without touching the ledger.
    #[must_use]
    pub const fn duration_days(self) -> i64 {
        match self {
            Self::Vip | Self::VipPlus => 30,
        }
    }

    /// The wire representation of this tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vip => "vip",
            Self::VipPlus => "vip+",
        }
    }
}

impl fmt::Display for VipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_plus_suffix() {
        assert_eq!(
            serde_json::to_string(&VipType::VipPlus).expect("serialize"),
            "\"vip+\""
        );
        let t: VipType = serde_json::from_str("\"vip+\"").expect("deserialize");
        assert_eq!(t, VipType::VipPlus);
    }

    #[test]
    fn accepts_bot_alias() {
        let t: VipType = serde_json::from_str("\"vip_plus\"").expect("deserialize");
        assert_eq!(t, VipType::VipPlus);
    }

    #[test]
    fn both_tiers_grant_thirty_days() {
        assert_eq!(VipType::Vip.duration_days(), 30);
        assert_eq!(VipType::VipPlus.duration_days(), 30);
    }
}
