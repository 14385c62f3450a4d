//! Session owner.
//!
//! The [`Controller`] is the only thing that issues commands to the SDK. It
//! validates session preconditions, forwards the command, and records the
//! command-driven transition. SDK-confirmed transitions arrive separately
//! through the event router and always take precedence.

use crate::codec::{ApiKey, MessageId, PeerId, PropagationProfile, TransmissionMode, UserId};
use crate::sdk::{LogLevel, MeshSdk, SdkDelegate, SdkError};
use crate::session::{SessionState, SessionTracker};
use crate::BridgeError;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Values `initialize` falls back to when the caller leaves them out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerDefaults {
    pub api_key: Option<ApiKey>,
    pub verbose_logging: Option<bool>,
}

pub struct Controller {
    sdk: Arc<dyn MeshSdk>,
    session: SessionTracker,
    delegate: Arc<dyn SdkDelegate>,
    defaults: ControllerDefaults,
}

impl Controller {
    pub fn new(
        sdk: Arc<dyn MeshSdk>,
        session: SessionTracker,
        delegate: Arc<dyn SdkDelegate>,
        defaults: ControllerDefaults,
    ) -> Self {
        Self {
            sdk,
            session,
            delegate,
            defaults,
        }
    }

    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    pub fn initialize(
        &self,
        api_key: Option<ApiKey>,
        verbose_logging: Option<bool>,
    ) -> Result<(), BridgeError> {
        let api_key = api_key
            .or(self.defaults.api_key)
            .ok_or(BridgeError::MissingApiKey)?;
        let log_level = LogLevel::from_verbose(verbose_logging.or(self.defaults.verbose_logging));

        let (_, epoch) = self.session.begin();
        sdk_call("initialize", self.sdk.initialize(api_key, log_level, self.delegate.clone()))?;
        self.session.commit(epoch, |s| {
            if s.state == SessionState::Uninitialized {
                s.state = SessionState::Initialized;
            }
        });

        tracing::info!("SDK initialized (log level {:?})", log_level);
        Ok(())
    }

    pub fn start(
        &self,
        user_id: Option<UserId>,
        profile: PropagationProfile,
    ) -> Result<(), BridgeError> {
        let (state, epoch) = self.session.begin();
        if !state.is_initialized() {
            return Err(BridgeError::Session(
                "the SDK must be initialized before it is started".into(),
            ));
        }

        tracing::info!("Starting session ({} profile)", profile);
        sdk_call("start", self.sdk.start(user_id, profile))?;
        self.session.commit(epoch, |s| {
            s.state = SessionState::Started;
            if user_id.is_some() {
                s.user_id = user_id;
            }
        });
        Ok(())
    }

    pub fn stop(&self) -> Result<(), BridgeError> {
        let (state, epoch) = self.session.begin();
        if !state.is_initialized() {
            tracing::debug!("stop ignored: nothing to stop");
            return Ok(());
        }

        tracing::info!("Stopping session");
        sdk_call("stop", self.sdk.stop())?;
        self.session.commit(epoch, |s| {
            if s.state == SessionState::Started {
                s.state = SessionState::Stopped;
            }
        });
        Ok(())
    }

    pub fn destroy_session(&self) -> Result<(), BridgeError> {
        if !self.session.state().is_initialized() {
            tracing::debug!("destroySession ignored: no session");
            return Ok(());
        }

        tracing::info!("Destroying session");
        sdk_call("destroySession", self.sdk.destroy_session())?;
        self.session.reset();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn is_initialized(&self) -> bool {
        self.session.state().is_initialized()
    }

    pub fn is_started(&self) -> bool {
        self.session.state().is_started()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.session.snapshot().user_id
    }

    pub fn connected_peers(&self) -> Vec<PeerId> {
        self.session.snapshot().peers
    }

    pub fn license_expiration_date(&self) -> Result<Option<DateTime<Utc>>, BridgeError> {
        sdk_call("licenseExpirationDate", self.sdk.license_expiration_date())
    }

    pub fn update_license(&self) -> Result<(), BridgeError> {
        sdk_call("updateLicense", self.sdk.update_license())
    }

    // ------------------------------------------------------------------------
    // Peers and payloads
    // ------------------------------------------------------------------------

    pub fn establish_secure_connection(&self, user_id: UserId) -> Result<(), BridgeError> {
        sdk_call(
            "establishSecureConnection",
            self.sdk.establish_secure_connection(user_id),
        )
    }

    pub fn fingerprint(&self, user_id: UserId) -> Result<Vec<u8>, BridgeError> {
        sdk_call("fingerprint", self.sdk.fingerprint(user_id))
    }

    pub fn is_fingerprint_valid(
        &self,
        user_id: UserId,
        fingerprint: &[u8],
    ) -> Result<bool, BridgeError> {
        sdk_call(
            "isFingerprintValid",
            self.sdk.is_fingerprint_valid(user_id, fingerprint),
        )
    }

    pub fn send(&self, data: &[u8], mode: TransmissionMode) -> Result<MessageId, BridgeError> {
        let message_id = sdk_call("send", self.sdk.send(data, mode))?;
        tracing::debug!("Queued {} bytes as {} ({})", data.len(), message_id, mode);
        Ok(message_id)
    }
}

/// Lift an SDK result, turning "the SDK has no such operation" into
/// `notImplemented` for `op`.
fn sdk_call<T>(op: &'static str, result: Result<T, SdkError>) -> Result<T, BridgeError> {
    result.map_err(|err| match err {
        SdkError::Unsupported(_) => BridgeError::NotImplemented(op),
        other => BridgeError::Sdk(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FailureKind;
    use crate::events::{BridgeEvent, EventRouter};
    use crate::sdk::MockMeshSdk;
    use serde_json::Value;
    use uuid::Uuid;

    fn controller(sdk: MockMeshSdk, defaults: ControllerDefaults) -> Controller {
        let session = SessionTracker::new();
        let sink = |_: &str, _: Value| {};
        let router = Arc::new(EventRouter::new(Arc::new(sink), session.clone()));
        Controller::new(Arc::new(sdk), session, router, defaults)
    }

    fn accepting_sdk() -> MockMeshSdk {
        let mut sdk = MockMeshSdk::new();
        sdk.expect_initialize().returning(|_, _, _| Ok(()));
        sdk.expect_start().returning(|_, _| Ok(()));
        sdk.expect_stop().returning(|| Ok(()));
        sdk.expect_destroy_session().returning(|| Ok(()));
        sdk
    }

    #[test]
    fn test_initialize_requires_a_key() {
        let ctl = controller(MockMeshSdk::new(), ControllerDefaults::default());
        assert!(matches!(
            ctl.initialize(None, None),
            Err(BridgeError::MissingApiKey)
        ));
        assert!(!ctl.is_initialized());
    }

    #[test]
    fn test_initialize_uses_defaults() {
        let key = Uuid::new_v4();
        let mut sdk = MockMeshSdk::new();
        sdk.expect_initialize()
            .withf(move |k, level, _| *k == key && *level == LogLevel::Debug)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let ctl = controller(
            sdk,
            ControllerDefaults {
                api_key: Some(key),
                verbose_logging: Some(true),
            },
        );
        ctl.initialize(None, None).unwrap();
        assert!(ctl.is_initialized());
    }

    #[test]
    fn test_start_before_initialize_is_a_session_error() {
        let ctl = controller(MockMeshSdk::new(), ControllerDefaults::default());
        let err = ctl.start(None, PropagationProfile::Standard).unwrap_err();
        assert_eq!(err.code(), FailureKind::SessionError.as_str());
        assert!(!ctl.is_started());
    }

    #[test]
    fn test_lifecycle() {
        let ctl = controller(accepting_sdk(), ControllerDefaults::default());
        let user = Uuid::new_v4();
        ctl.initialize(Some(Uuid::new_v4()), None).unwrap();
        ctl.start(Some(user), PropagationProfile::LongReach).unwrap();
        assert!(ctl.is_started());
        assert_eq!(ctl.current_user_id(), Some(user));

        ctl.stop().unwrap();
        assert!(!ctl.is_started());
        assert!(ctl.is_initialized());

        ctl.destroy_session().unwrap();
        assert!(!ctl.is_initialized());
        assert_eq!(ctl.current_user_id(), None);
    }

    #[test]
    fn test_sdk_rejection_leaves_state_alone() {
        let mut sdk = MockMeshSdk::new();
        sdk.expect_initialize().returning(|_, _, _| Ok(()));
        sdk.expect_start()
            .returning(|_, _| Err(SdkError::AlreadyStarted));
        let ctl = controller(sdk, ControllerDefaults::default());
        ctl.initialize(Some(Uuid::new_v4()), None).unwrap();
        let err = ctl.start(None, PropagationProfile::Standard).unwrap_err();
        assert_eq!(err.code(), "alreadyStarted");
        assert!(!ctl.is_started());
    }

    #[test]
    fn test_confirmed_failure_is_not_overwritten() {
        let session = SessionTracker::new();
        let sink = |_: &str, _: Value| {};
        let router = Arc::new(EventRouter::new(Arc::new(sink), session.clone()));
        let callback = router.clone();

        let mut sdk = MockMeshSdk::new();
        sdk.expect_initialize().returning(|_, _, _| Ok(()));
        sdk.expect_start().returning(move |_, _| {
            callback.route(BridgeEvent::FailToStart {
                reason: crate::codec::FailureReason::new(FailureKind::Permission),
            });
            Ok(())
        });
        let ctl = Controller::new(Arc::new(sdk), session, router, ControllerDefaults::default());
        ctl.initialize(Some(Uuid::new_v4()), None).unwrap();
        ctl.start(None, PropagationProfile::Standard).unwrap();
        assert!(!ctl.is_started());
    }

    #[test]
    fn test_failed_stop_keeps_session_started() {
        let session = SessionTracker::new();
        let sink = |_: &str, _: Value| {};
        let router = Arc::new(EventRouter::new(Arc::new(sink), session.clone()));
        let ctl = Controller::new(
            Arc::new(accepting_sdk()),
            session,
            router.clone(),
            ControllerDefaults::default(),
        );
        ctl.initialize(Some(Uuid::new_v4()), None).unwrap();
        ctl.start(None, PropagationProfile::Standard).unwrap();

        // SDK acknowledges the command, then reports the failure later.
        ctl.stop().unwrap();
        assert!(!ctl.is_started());
        router.route(BridgeEvent::FailToStop {
            reason: crate::codec::FailureReason::new(FailureKind::Unknown),
        });
        assert!(ctl.is_started());
    }

    #[test]
    fn test_synchronous_stop_failure_is_not_overwritten() {
        let session = SessionTracker::new();
        let sink = |_: &str, _: Value| {};
        let router = Arc::new(EventRouter::new(Arc::new(sink), session.clone()));
        let callback = router.clone();

        let mut sdk = MockMeshSdk::new();
        sdk.expect_initialize().returning(|_, _, _| Ok(()));
        sdk.expect_start().returning(|_, _| Ok(()));
        sdk.expect_stop().returning(move || {
            callback.route(BridgeEvent::FailToStop {
                reason: crate::codec::FailureReason::new(FailureKind::Unknown),
            });
            Ok(())
        });
        let ctl = Controller::new(Arc::new(sdk), session, router, ControllerDefaults::default());
        ctl.initialize(Some(Uuid::new_v4()), None).unwrap();
        ctl.start(None, PropagationProfile::Standard).unwrap();
        ctl.stop().unwrap();
        assert!(ctl.is_started());
    }

    #[test]
    fn test_late_start_failure_keeps_session_started() {
        let session = SessionTracker::new();
        let sink = |_: &str, _: Value| {};
        let router = Arc::new(EventRouter::new(Arc::new(sink), session.clone()));
        let ctl = Controller::new(
            Arc::new(accepting_sdk()),
            session,
            router.clone(),
            ControllerDefaults::default(),
        );
        let user = Uuid::new_v4();
        ctl.initialize(Some(Uuid::new_v4()), None).unwrap();
        ctl.start(Some(user), PropagationProfile::Standard).unwrap();

        router.route(BridgeEvent::FailToStart {
            reason: crate::codec::FailureReason::new(FailureKind::AlreadyStarted),
        });
        assert!(ctl.is_started());
        assert_eq!(ctl.current_user_id(), Some(user));
    }

    #[test]
    fn test_license_ops_not_implemented() {
        let mut sdk = MockMeshSdk::new();
        sdk.expect_license_expiration_date()
            .returning(|| Err(SdkError::Unsupported("licenseExpirationDate")));
        sdk.expect_update_license()
            .returning(|| Err(SdkError::Unsupported("updateLicense")));
        let ctl = controller(sdk, ControllerDefaults::default());
        assert!(matches!(
            ctl.license_expiration_date(),
            Err(BridgeError::NotImplemented("licenseExpirationDate"))
        ));
        assert!(matches!(
            ctl.update_license(),
            Err(BridgeError::NotImplemented("updateLicense"))
        ));
    }
}
