//! Propagation profile codec.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rules the SDK applies when propagating messages.
///
/// The SDK refuses to start without a profile, so decoding is lenient:
/// absent or unrecognized input falls back to [`PropagationProfile::Standard`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropagationProfile {
    #[default]
    Standard,
    HighDensityEnvironment,
    SparseEnvironment,
    LongReach,
    ShortReach,
}

impl PropagationProfile {
    pub const ALL: [PropagationProfile; 5] = [
        Self::Standard,
        Self::HighDensityEnvironment,
        Self::SparseEnvironment,
        Self::LongReach,
        Self::ShortReach,
    ];

    /// Fixed wire string for this profile.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::HighDensityEnvironment => "highDensityEnvironment",
            Self::SparseEnvironment => "sparseEnvironment",
            Self::LongReach => "longReach",
            Self::ShortReach => "shortReach",
        }
    }

    /// Strict lookup by wire string.
    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }

    /// Lenient decode used for start options.
    pub fn decode(value: Option<&str>) -> Self {
        match value.and_then(Self::from_wire) {
            Some(profile) => profile,
            None => {
                if let Some(other) = value {
                    tracing::debug!("Unrecognized propagation profile {:?}, using standard", other);
                }
                Self::Standard
            }
        }
    }
}

impl fmt::Display for PropagationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
