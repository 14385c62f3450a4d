// meshlink core: host adapter for a callback-driven mesh networking SDK
//
// Inbound calls arrive as a method name plus a JSON argument bag and settle
// exactly once. SDK callbacks leave as named JSON events. Nothing here
// speaks radio; that all sits behind `MeshSdk`.

pub mod capability;
pub mod codec;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod events;
pub mod logging;
pub mod sdk;
pub mod session;

use capability::CapabilityAlias;
use codec::{FailureKind, FailureReason};
use sdk::{describe_error, SdkError};
use thiserror::Error;

pub use capability::{ApiLevel, GrantAll, PermissionBackend, PermissionState, StaticPermissions};
pub use codec::{MessageId, PeerId, PropagationProfile, TransmissionMode, UserId};
pub use config::{AdapterConfig, ConfigError};
pub use controller::Controller;
pub use dispatch::{CallResolver, Dispatcher, Outcome, PendingInvocation, Rejection};
pub use events::{BridgeEvent, ChannelSink, EventRouter, EventSink, HostEvent};
pub use sdk::{LogLevel, MeshSdk, SdkDelegate, SimulatedSdk};
pub use session::{SessionSnapshot, SessionState};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Why a call was rejected.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("an API key is required")]
    MissingApiKey,
    #[error("a valid userID is required")]
    MissingUserIdentifier,
    #[error("a fingerprint is required")]
    MissingFingerprint,
    #[error("a non-empty payload is required")]
    MissingPayload,
    #[error("a transmission mode is required")]
    MissingTransmissionMode,
    #[error("{0}")]
    Session(String),
    #[error("permissions not granted: {}", join_aliases(.0))]
    PermissionsNotGranted(Vec<CapabilityAlias>),
    #[error("{0} is not implemented by the SDK")]
    NotImplemented(&'static str),
    #[error("unknown method {0:?}")]
    UnknownMethod(String),
    #[error(transparent)]
    Sdk(#[from] SdkError),
    #[error("failed to encode the result")]
    Marshal(#[from] serde_json::Error),
}

fn join_aliases(aliases: &[CapabilityAlias]) -> String {
    aliases
        .iter()
        .map(CapabilityAlias::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl BridgeError {
    /// Stable code the host switches on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "missingAPIKey",
            Self::MissingUserIdentifier => "missingUserIdentifier",
            Self::MissingFingerprint => "missingFingerprint",
            Self::MissingPayload => "missingPayload",
            Self::MissingTransmissionMode => "missingTransmissionMode",
            Self::Session(_) => FailureKind::SessionError.as_str(),
            Self::PermissionsNotGranted(_) => FailureKind::Permission.as_str(),
            Self::NotImplemented(_) => "notImplemented",
            Self::UnknownMethod(_) => "unknownMethod",
            Self::Sdk(err) => err.kind().as_str(),
            Self::Marshal(_) => FailureKind::Unknown.as_str(),
        }
    }

    /// Structured reason, for failures that map onto the failure taxonomy.
    pub fn reason(&self) -> Option<FailureReason> {
        let kind = match self {
            Self::Sdk(err) => return Some(FailureReason::from(err)),
            Self::Session(_) => FailureKind::SessionError,
            Self::PermissionsNotGranted(_) => FailureKind::Permission,
            Self::Marshal(_) => FailureKind::Unknown,
            _ => return None,
        };
        Some(FailureReason::new(kind).with_message(describe_error(self)))
    }

    pub fn into_rejection(self) -> Rejection {
        Rejection::new(self.code(), describe_error(&self)).with_reason(self.reason())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("socket closed")]
    struct SocketClosed;

    #[test]
    fn test_validation_errors_have_no_reason() {
        let rejection = BridgeError::MissingPayload.into_rejection();
        assert_eq!(rejection.code, "missingPayload");
        assert!(!rejection.message.is_empty());
        assert!(rejection.reason.is_none());
    }

    #[test]
    fn test_sdk_rejection_prefixes_cause() {
        let rejection = BridgeError::from(SdkError::other("send failed", SocketClosed)).into_rejection();
        assert_eq!(rejection.code, "unknown");
        assert_eq!(rejection.message, "socket closed: send failed");
        assert_eq!(
            rejection.reason.and_then(|r| r.message),
            Some("socket closed: send failed".to_string())
        );
    }

    #[test]
    fn test_permission_rejection_names_aliases() {
        let err = BridgeError::PermissionsNotGranted(vec![
            CapabilityAlias::BluetoothLegacy,
            CapabilityAlias::LocationCoarse,
        ]);
        assert_eq!(err.code(), "permission");
        assert_eq!(
            err.to_string(),
            "permissions not granted: bluetoothLegacy, locationCoarse"
        );
        assert_eq!(err.reason().unwrap().kind, FailureKind::Permission);
    }

    #[test]
    fn test_not_implemented_code() {
        let rejection = BridgeError::NotImplemented("updateLicense").into_rejection();
        assert_eq!(rejection.code, "notImplemented");
        assert!(rejection.message.contains("updateLicense"));
    }
}
