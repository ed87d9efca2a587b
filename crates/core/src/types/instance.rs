//! Game-server instance keys.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a server key is not one of the known instances.
///
/// Instance validation happens at the request boundary: an unknown key
/// fails here, before any store or filesystem access.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown server instance '{0}', expected one of: solo, duo")]
pub struct InvalidInstance(pub String);

/// One of the fixed game-server deployments.
///
/// Each instance has its own isolated data document; there is no shared
/// state between instances. The set is closed by design - adding a server
/// means adding a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerInstance {
    Solo,
    Duo,
}

impl ServerInstance {
    /// All instances, in the order the webhook reconciler scans them.
    pub const ALL: [Self; 2] = [Self::Solo, Self::Duo];

    /// The lowercase key used in routes and on-disk file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::Duo => "duo",
        }
    }
}

impl fmt::Display for ServerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerInstance {
    type Err = InvalidInstance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "solo" => Ok(Self::Solo),
            "duo" => Ok(Self::Duo),
            _ => Err(InvalidInstance(s.to_owned())),
        }
    }
}
