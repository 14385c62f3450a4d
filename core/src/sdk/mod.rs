//! The wrapped mesh SDK, seen only through the interface it presents.
//!
//! [`MeshSdk`] is the command surface the controller drives; [`SdkDelegate`]
//! is the callback surface the SDK drives back, from whatever thread it
//! likes. Neither knows about the host runtime.

pub mod simulated;

use crate::codec::{
    ApiKey, FailureKind, FailureReason, MessageId, PeerId, PropagationProfile, TransmissionMode,
    UserId,
};
use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

pub use simulated::SimulatedSdk;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Failures the SDK reports, either synchronously or through a delegate
/// callback.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("the SDK is already started")]
    AlreadyStarted,

    #[error("device capabilities: {0}")]
    DeviceCapabilities(String),

    #[error("the license is expired")]
    ExpiredLicense,

    #[error("{message}")]
    Generic { message: String, code: Option<i64> },

    #[error("the device time is inconsistent")]
    InconsistentDeviceTime,

    #[error("an internet connection is required to validate the license")]
    InternetConnectionRequired,

    #[error("the API key format is invalid")]
    InvalidApiKeyFormat,

    #[error("the application id is missing")]
    MissingApplicationId,

    #[error("permission: {0}")]
    Permission(String),

    #[error("registration: {0}")]
    Registration(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("the simulator is not supported")]
    SimulatorIsNotSupported,

    #[error("size limit exceeded: {size} bytes (limit {limit})")]
    SizeLimitExceeded { size: usize, limit: usize },

    #[error("{0} is not supported by this SDK")]
    Unsupported(&'static str),

    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl SdkError {
    /// Wrap a foreign error, keeping it as the cause.
    pub fn other(message: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Other {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::AlreadyStarted => FailureKind::AlreadyStarted,
            Self::DeviceCapabilities(_) => FailureKind::DeviceCapabilities,
            Self::ExpiredLicense => FailureKind::ExpiredLicense,
            Self::Generic { .. } => FailureKind::Generic,
            Self::InconsistentDeviceTime => FailureKind::InconsistentDeviceTime,
            Self::InternetConnectionRequired => FailureKind::InternetConnectionRequired,
            Self::InvalidApiKeyFormat => FailureKind::InvalidApiKeyFormat,
            Self::MissingApplicationId => FailureKind::MissingApplicationId,
            Self::Permission(_) => FailureKind::Permission,
            Self::Registration(_) => FailureKind::Registration,
            Self::Session(_) => FailureKind::SessionError,
            Self::SimulatorIsNotSupported => FailureKind::SimulatorIsNotSupported,
            Self::SizeLimitExceeded { .. } => FailureKind::SizeLimitExceeded,
            Self::Unsupported(_) | Self::Other { .. } => FailureKind::Unknown,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Generic { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<&SdkError> for FailureReason {
    fn from(err: &SdkError) -> Self {
        let reason = FailureReason::new(err.kind()).with_message(describe_error(err));
        match err.code() {
            Some(code) => reason.with_code(code),
            None => reason,
        }
    }
}

/// Message used when an error renders to nothing.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Render an error for the host: its own message (or [`UNKNOWN_ERROR`]),
/// prefixed with the cause's message when there is one.
pub fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let message = err.to_string();
    let message = if message.is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        message
    };
    match err.source() {
        Some(cause) => {
            let cause = cause.to_string();
            if cause.is_empty() {
                message
            } else {
                format!("{cause}: {message}")
            }
        }
        None => message,
    }
}

// ============================================================================
// LOGGING
// ============================================================================

/// SDK-side log verbosity derived from the `verboseLogging` option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[default]
    Off,
    Warn,
    Debug,
}

impl LogLevel {
    /// Unset → off, `true` → debug, `false` → warnings only.
    pub fn from_verbose(verbose: Option<bool>) -> Self {
        match verbose {
            None => Self::Off,
            Some(true) => Self::Debug,
            Some(false) => Self::Warn,
        }
    }
}

// ============================================================================
// SDK SEAM
// ============================================================================

/// Commands the controller can issue.
///
/// Calls return only their immediate outcome. Everything that happens on the
/// network afterwards comes back through the delegate.
#[cfg_attr(test, mockall::automock)]
pub trait MeshSdk: Send + Sync {
    fn initialize(
        &self,
        api_key: ApiKey,
        log_level: LogLevel,
        delegate: Arc<dyn SdkDelegate>,
    ) -> Result<(), SdkError>;

    fn start(&self, user_id: Option<UserId>, profile: PropagationProfile) -> Result<(), SdkError>;

    fn stop(&self) -> Result<(), SdkError>;

    fn destroy_session(&self) -> Result<(), SdkError>;

    fn license_expiration_date(&self) -> Result<Option<DateTime<Utc>>, SdkError> {
        Err(SdkError::Unsupported("licenseExpirationDate"))
    }

    fn update_license(&self) -> Result<(), SdkError> {
        Err(SdkError::Unsupported("updateLicense"))
    }

    fn establish_secure_connection(&self, user_id: UserId) -> Result<(), SdkError>;

    fn fingerprint(&self, user_id: UserId) -> Result<Vec<u8>, SdkError>;

    fn is_fingerprint_valid(&self, user_id: UserId, fingerprint: &[u8]) -> Result<bool, SdkError>;

    fn send(&self, data: &[u8], mode: TransmissionMode) -> Result<MessageId, SdkError>;
}

/// Callbacks the SDK fires. Any of them may fire any number of times, on any
/// thread, with or without a preceding command.
pub trait SdkDelegate: Send + Sync {
    // Initialization
    fn on_started(&self, user_id: UserId);
    fn on_fail_to_start(&self, error: &SdkError);
    fn on_stopped(&self);
    fn on_fail_to_stop(&self, error: &SdkError);
    fn on_destroy_session(&self);
    fn on_fail_to_destroy_session(&self, error: &SdkError);

    // Connectivity
    fn on_connected(&self, peer_id: PeerId);
    fn on_disconnected(&self, peer_id: PeerId);
    fn on_connected_peers(&self, peers: Vec<PeerId>);
    fn on_establish_secure_connection(&self, user_id: UserId);
    fn on_fail_to_establish_secure_connection(&self, user_id: UserId, error: &SdkError);

    // Transmission
    fn on_send(&self, message_id: MessageId);
    fn on_fail_to_send(&self, message_id: MessageId, error: &SdkError);
    fn on_progress_of_send(&self, message_id: MessageId, position: u32, total: u32);
    fn on_receive_data(
        &self,
        message_id: MessageId,
        data: Vec<u8>,
        transmission_mode: Option<TransmissionMode>,
    );
}
