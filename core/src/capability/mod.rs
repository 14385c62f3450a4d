//! Platform capability negotiation
//!
//! The radio session cannot start until the platform has granted the
//! capability bundles the OS version demands. This module resolves which
//! bundles (aliases) to ask for and keeps the outstanding request set; the
//! OS permission subsystem itself sits behind [`PermissionBackend`].

pub mod request;
pub mod resolver;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

pub use request::CapabilityRequest;

// ============================================================================
// TYPES
// ============================================================================

/// Android API level, the OS capability level the policy is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiLevel(pub u32);

impl ApiLevel {
    /// Android 10
    pub const Q: ApiLevel = ApiLevel(29);
    /// Android 12
    pub const S: ApiLevel = ApiLevel(31);
    /// Android 13
    pub const TIRAMISU: ApiLevel = ApiLevel(33);
}

impl Default for ApiLevel {
    fn default() -> Self {
        Self::TIRAMISU
    }
}

impl fmt::Display for ApiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API {}", self.0)
    }
}

/// A named bundle of platform permissions, granted or denied as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapabilityAlias {
    /// BLUETOOTH_CONNECT, BLUETOOTH_ADVERTISE, BLUETOOTH_SCAN
    BluetoothNearby,
    /// BLUETOOTH, BLUETOOTH_ADMIN
    BluetoothLegacy,
    /// ACCESS_COARSE_LOCATION, ACCESS_FINE_LOCATION
    Location,
    /// ACCESS_COARSE_LOCATION
    LocationCoarse,
}

impl CapabilityAlias {
    pub const ALL: [CapabilityAlias; 4] = [
        Self::BluetoothNearby,
        Self::BluetoothLegacy,
        Self::Location,
        Self::LocationCoarse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BluetoothNearby => "bluetoothNearby",
            Self::BluetoothLegacy => "bluetoothLegacy",
            Self::Location => "location",
            Self::LocationCoarse => "locationCoarse",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == value)
    }

    /// Platform permission strings the bundle covers.
    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Self::BluetoothNearby => &[
                "android.permission.BLUETOOTH_CONNECT",
                "android.permission.BLUETOOTH_ADVERTISE",
                "android.permission.BLUETOOTH_SCAN",
            ],
            Self::BluetoothLegacy => &[
                "android.permission.BLUETOOTH",
                "android.permission.BLUETOOTH_ADMIN",
            ],
            Self::Location => &[
                "android.permission.ACCESS_COARSE_LOCATION",
                "android.permission.ACCESS_FINE_LOCATION",
            ],
            Self::LocationCoarse => &["android.permission.ACCESS_COARSE_LOCATION"],
        }
    }

    pub fn is_bluetooth(&self) -> bool {
        matches!(self, Self::BluetoothNearby | Self::BluetoothLegacy)
    }
}

impl fmt::Display for CapabilityAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category a host may explicitly ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityCategory {
    Bluetooth,
    Location,
}

impl CapabilityCategory {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "bluetooth" => Some(Self::Bluetooth),
            "location" => Some(Self::Location),
            _ => None,
        }
    }
}

/// Grant state reported by the permission subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
    PromptWithRationale,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Prompt => "prompt",
            Self::PromptWithRationale => "prompt-with-rationale",
        }
    }
}

// ============================================================================
// PERMISSION SUBSYSTEM SEAM
// ============================================================================

/// The OS permission subsystem, keyed by alias name.
pub trait PermissionBackend: Send + Sync {
    /// OS capability level the policy is evaluated against.
    fn api_level(&self) -> ApiLevel;

    /// Current state of every alias the platform knows about.
    fn states(&self) -> HashMap<String, PermissionState>;

    /// Prompt for `aliases` and return the resulting states.
    fn request(&self, aliases: &[CapabilityAlias]) -> HashMap<String, PermissionState>;
}

/// Backend for hosts without a permission model: everything is granted.
#[derive(Debug, Clone, Default)]
pub struct GrantAll {
    level: ApiLevel,
}

impl GrantAll {
    pub fn new(level: ApiLevel) -> Self {
        Self { level }
    }
}

impl PermissionBackend for GrantAll {
    fn api_level(&self) -> ApiLevel {
        self.level
    }

    fn states(&self) -> HashMap<String, PermissionState> {
        CapabilityAlias::ALL
            .into_iter()
            .map(|a| (a.as_str().to_string(), PermissionState::Granted))
            .collect()
    }

    fn request(&self, _aliases: &[CapabilityAlias]) -> HashMap<String, PermissionState> {
        self.states()
    }
}

/// In-memory backend: aliases start at `Prompt`, requests grant everything
/// except the aliases configured as denied.
#[derive(Debug, Default)]
pub struct StaticPermissions {
    level: ApiLevel,
    denied: HashSet<CapabilityAlias>,
    states: Mutex<HashMap<String, PermissionState>>,
}

impl StaticPermissions {
    pub fn new(level: ApiLevel) -> Self {
        Self {
            level,
            denied: HashSet::new(),
            states: Mutex::new(
                CapabilityAlias::ALL
                    .into_iter()
                    .map(|a| (a.as_str().to_string(), PermissionState::Prompt))
                    .collect(),
            ),
        }
    }

    /// Deny `alias` whenever it is requested.
    pub fn deny(mut self, alias: CapabilityAlias) -> Self {
        self.denied.insert(alias);
        self
    }

    /// Force the current state of `alias`.
    pub fn set(&self, alias: CapabilityAlias, state: PermissionState) {
        self.states.lock().insert(alias.as_str().to_string(), state);
    }
}

impl PermissionBackend for StaticPermissions {
    fn api_level(&self) -> ApiLevel {
        self.level
    }

    fn states(&self) -> HashMap<String, PermissionState> {
        self.states.lock().clone()
    }

    fn request(&self, aliases: &[CapabilityAlias]) -> HashMap<String, PermissionState> {
        let mut states = self.states.lock();
        for alias in aliases {
            let state = if self.denied.contains(alias) {
                PermissionState::Denied
            } else {
                PermissionState::Granted
            };
            states.insert(alias.as_str().to_string(), state);
        }
        states.clone()
    }
}
