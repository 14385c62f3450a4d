//! Failure reason codec.
//!
//! A [`FailureReason`] is what the host sees when the SDK (or the adapter)
//! reports a failure: a closed kind, plus an optional message and code that
//! are only serialized when present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Closed set of failure kinds.
///
/// The first thirteen mirror the SDK's exception taxonomy; `Unknown` covers
/// failures raised outside of it (foreign errors, panics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    #[serde(rename = "alreadyStarted")]
    AlreadyStarted,
    #[serde(rename = "deviceCapabilities")]
    DeviceCapabilities,
    #[serde(rename = "expiredLicense")]
    ExpiredLicense,
    #[serde(rename = "generic")]
    Generic,
    #[serde(rename = "inconsistentDeviceTime")]
    InconsistentDeviceTime,
    #[serde(rename = "internetConnectionRequired")]
    InternetConnectionRequired,
    #[serde(rename = "invalidAPIKeyFormat")]
    InvalidApiKeyFormat,
    #[serde(rename = "missingApplicationID")]
    MissingApplicationId,
    #[serde(rename = "permission")]
    Permission,
    #[serde(rename = "registration")]
    Registration,
    #[serde(rename = "sessionError")]
    SessionError,
    #[serde(rename = "simulatorIsNotSupported")]
    SimulatorIsNotSupported,
    #[serde(rename = "sizeLimitExceeded")]
    SizeLimitExceeded,
    #[serde(rename = "unknown")]
    Unknown,
}

impl FailureKind {
    pub const ALL: [FailureKind; 14] = [
        Self::AlreadyStarted,
        Self::DeviceCapabilities,
        Self::ExpiredLicense,
        Self::Generic,
        Self::InconsistentDeviceTime,
        Self::InternetConnectionRequired,
        Self::InvalidApiKeyFormat,
        Self::MissingApplicationId,
        Self::Permission,
        Self::Registration,
        Self::SessionError,
        Self::SimulatorIsNotSupported,
        Self::SizeLimitExceeded,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyStarted => "alreadyStarted",
            Self::DeviceCapabilities => "deviceCapabilities",
            Self::ExpiredLicense => "expiredLicense",
            Self::Generic => "generic",
            Self::InconsistentDeviceTime => "inconsistentDeviceTime",
            Self::InternetConnectionRequired => "internetConnectionRequired",
            Self::InvalidApiKeyFormat => "invalidAPIKeyFormat",
            Self::MissingApplicationId => "missingApplicationID",
            Self::Permission => "permission",
            Self::Registration => "registration",
            Self::SessionError => "sessionError",
            Self::SimulatorIsNotSupported => "simulatorIsNotSupported",
            Self::SizeLimitExceeded => "sizeLimitExceeded",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured failure as delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    #[serde(rename = "type")]
    pub kind: FailureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

impl FailureReason {
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            message: None,
            code: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = if message.is_empty() { None } else { Some(message) };
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    /// Wire object; `message` and `code` appear only when set.
    pub fn encode(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), Value::String(self.kind.as_str().into()));
        if let Some(message) = &self.message {
            object.insert("message".into(), Value::String(message.clone()));
        }
        if let Some(code) = self.code {
            object.insert("code".into(), Value::from(code));
        }
        Value::Object(object)
    }

    /// Decode a wire object. A missing or unknown `type` is absent; malformed
    /// `message`/`code` fields are dropped rather than failing the whole value.
    pub fn decode(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let kind = FailureKind::from_wire(object.get("type")?.as_str()?)?;
        Some(Self {
            kind,
            message: object
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_owned),
            code: object.get("code").and_then(Value::as_i64),
        })
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, self.code) {
            (Some(message), Some(code)) => write!(f, "{}: {} (code {})", self.kind, message, code),
            (Some(message), None) => write!(f, "{}: {}", self.kind, message),
            (None, Some(code)) => write!(f, "{} (code {})", self.kind, code),
            (None, None) => write!(f, "{}", self.kind),
        }
    }
}
