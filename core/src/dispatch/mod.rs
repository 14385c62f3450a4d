//! Call dispatcher: the single entry point the host runtime talks to.
//!
//! Each inbound call goes through the same steps: parse the argument bag
//! leniently, validate what the operation requires, run it against the
//! controller, and settle the [`PendingInvocation`] exactly once. Any failure
//! on the way, panics included, ends up as a [`Rejection`].

pub mod invocation;
pub mod options;
pub mod results;

use crate::capability::{CapabilityRequest, PermissionBackend};
use crate::codec::{FailureKind, FailureReason};
use crate::config::AdapterConfig;
use crate::controller::Controller;
use crate::events::{ChannelSink, EventRouter, EventSink, HostEvent};
use crate::sdk::{MeshSdk, UNKNOWN_ERROR};
use crate::session::{SessionSnapshot, SessionTracker};
use crate::BridgeError;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

pub use invocation::{CallResolver, Outcome, PendingInvocation, Rejection};
use options::{
    InitializeOptions, IsFingerprintValidOptions, RequestPermissionsOptions, SendOptions,
    StartOptions, UserOptions,
};
use results::{
    ConnectedPeersResult, CurrentUserIdResult, FingerprintResult, IsFingerprintValidResult,
    IsInitializedResult, IsStartedResult, LicenseExpirationDateResult, SendResult,
};

/// Every operation the dispatcher answers.
pub const METHODS: [&str; 16] = [
    "initialize",
    "start",
    "stop",
    "destroySession",
    "isInitialized",
    "isStarted",
    "currentUserID",
    "connectedPeers",
    "licenseExpirationDate",
    "updateLicense",
    "establishSecureConnection",
    "fingerprint",
    "isFingerprintValid",
    "send",
    "checkPermissions",
    "requestPermissions",
];

pub struct Dispatcher {
    controller: Controller,
    permissions: Arc<dyn PermissionBackend>,
    permission_gate: bool,
}

impl Dispatcher {
    pub fn new(
        sdk: Arc<dyn MeshSdk>,
        permissions: Arc<dyn PermissionBackend>,
        sink: Arc<dyn EventSink>,
        config: &AdapterConfig,
    ) -> Self {
        let session = SessionTracker::new();
        let router = Arc::new(EventRouter::new(sink, session.clone()));
        let controller = Controller::new(sdk, session, router, config.controller_defaults());
        Self {
            controller,
            permissions,
            permission_gate: config.permission_gate,
        }
    }

    /// A dispatcher whose events are queued on the returned channel.
    pub fn with_event_channel(
        sdk: Arc<dyn MeshSdk>,
        permissions: Arc<dyn PermissionBackend>,
        config: &AdapterConfig,
    ) -> (Self, UnboundedReceiver<HostEvent>) {
        let (sink, rx) = ChannelSink::new();
        (Self::new(sdk, permissions, Arc::new(sink), config), rx)
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn session(&self) -> SessionSnapshot {
        self.controller.session().snapshot()
    }

    /// Run `method` and settle `call` with its outcome.
    pub fn dispatch(&self, method: &str, args: &Value, call: PendingInvocation) {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.handle(method, args))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                tracing::warn!("{} rejected: {}", method, err);
                Err(err.into_rejection())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("{} panicked: {}", method, message);
                Err(Rejection::new(FailureKind::Unknown.as_str(), message.clone())
                    .with_reason(Some(FailureReason::new(FailureKind::Unknown).with_message(message))))
            }
        };
        call.settle(outcome);
    }

    /// Dispatch and await the outcome.
    pub async fn invoke(&self, method: &str, args: Value) -> Outcome {
        let (call, rx) = PendingInvocation::channel(method);
        self.dispatch(method, &args, call);
        rx.await
            .unwrap_or_else(|_| Err(Rejection::new(FailureKind::Unknown.as_str(), UNKNOWN_ERROR)))
    }

    /// Blocking variant of [`invoke`](Self::invoke). Dispatch settles before
    /// returning, so the outcome is always ready.
    pub fn call(&self, method: &str, args: Value) -> Outcome {
        let (call, mut rx) = PendingInvocation::channel(method);
        self.dispatch(method, &args, call);
        rx.try_recv()
            .unwrap_or_else(|_| Err(Rejection::new(FailureKind::Unknown.as_str(), UNKNOWN_ERROR)))
    }

    fn handle(&self, method: &str, args: &Value) -> Result<Option<Value>, BridgeError> {
        let ctl = &self.controller;
        match method {
            "initialize" => {
                let opts = InitializeOptions::from_args(args);
                ctl.initialize(opts.api_key, opts.verbose_logging)?;
                Ok(None)
            }
            "start" => {
                let opts = StartOptions::from_args(args);
                self.check_gate()?;
                ctl.start(opts.user_id, opts.propagation_profile)?;
                Ok(None)
            }
            "stop" => {
                ctl.stop()?;
                Ok(None)
            }
            "destroySession" => {
                ctl.destroy_session()?;
                Ok(None)
            }
            "isInitialized" => to_result(IsInitializedResult {
                is_initialized: ctl.is_initialized(),
            }),
            "isStarted" => to_result(IsStartedResult {
                is_started: ctl.is_started(),
            }),
            "currentUserID" => to_result(CurrentUserIdResult {
                user_id: ctl.current_user_id(),
            }),
            "connectedPeers" => to_result(ConnectedPeersResult {
                peers: ctl.connected_peers(),
            }),
            "licenseExpirationDate" => to_result(LicenseExpirationDateResult {
                license_expiration_date: ctl.license_expiration_date()?,
            }),
            "updateLicense" => {
                ctl.update_license()?;
                Ok(None)
            }
            "establishSecureConnection" => {
                let user_id = UserOptions::from_args(args).validate()?;
                ctl.establish_secure_connection(user_id)?;
                Ok(None)
            }
            "fingerprint" => {
                let user_id = UserOptions::from_args(args).validate()?;
                to_result(FingerprintResult {
                    fingerprint: ctl.fingerprint(user_id)?,
                })
            }
            "isFingerprintValid" => {
                let (user_id, fingerprint) = IsFingerprintValidOptions::from_args(args).validate()?;
                to_result(IsFingerprintValidResult {
                    is_valid: ctl.is_fingerprint_valid(user_id, &fingerprint)?,
                })
            }
            "send" => {
                let (data, mode) = SendOptions::from_args(args).validate()?;
                to_result(SendResult {
                    message_id: ctl.send(&data, mode)?,
                })
            }
            "checkPermissions" => {
                let request = CapabilityRequest::new(self.permissions.api_level());
                Ok(Some(request.status_object(&self.permissions.states())))
            }
            "requestPermissions" => {
                let opts = RequestPermissionsOptions::from_args(args);
                let mut request = CapabilityRequest::new(self.permissions.api_level());
                request.add_named(opts.permissions.iter().map(String::as_str));
                let states = self.permissions.request(request.aliases());
                Ok(Some(request.status_object(&states)))
            }
            other => Err(BridgeError::UnknownMethod(other.to_string())),
        }
    }

    fn check_gate(&self) -> Result<(), BridgeError> {
        if !self.permission_gate {
            return Ok(());
        }
        let required = CapabilityRequest::new(self.permissions.api_level());
        let missing = required.missing(&self.permissions.states());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::PermissionsNotGranted(missing))
        }
    }
}

fn to_result<T: Serialize>(result: T) -> Result<Option<Value>, BridgeError> {
    Ok(Some(serde_json::to_value(result)?))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::new()
    };
    if message.is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ApiLevel, CapabilityAlias, GrantAll, StaticPermissions};
    use crate::sdk::{MockMeshSdk, SdkError};
    use serde_json::json;
    use uuid::Uuid;

    fn config() -> AdapterConfig {
        AdapterConfig {
            permission_gate: false,
            ..AdapterConfig::default()
        }
    }

    fn dispatcher(sdk: MockMeshSdk) -> Dispatcher {
        let sink = |_: &str, _: Value| {};
        Dispatcher::new(
            Arc::new(sdk),
            Arc::new(GrantAll::new(ApiLevel::TIRAMISU)),
            Arc::new(sink),
            &config(),
        )
    }

    #[test]
    fn test_unknown_method_rejects() {
        let rejection = dispatcher(MockMeshSdk::new())
            .call("teleport", json!({}))
            .unwrap_err();
        assert_eq!(rejection.code, "unknownMethod");
        assert!(rejection.message.contains("teleport"));
    }

    #[test]
    fn test_validation_never_reaches_sdk() {
        // No expectations set: reaching the SDK would fail the call as `unknown`.
        let d = dispatcher(MockMeshSdk::new());
        assert_eq!(d.call("send", json!({})).unwrap_err().code, "missingPayload");
        assert_eq!(
            d.call("fingerprint", json!({ "userID": "nope" })).unwrap_err().code,
            "missingUserIdentifier"
        );
    }

    struct PanickingSdk;

    impl MeshSdk for PanickingSdk {
        fn initialize(
            &self,
            _: crate::codec::ApiKey,
            _: crate::sdk::LogLevel,
            _: Arc<dyn crate::sdk::SdkDelegate>,
        ) -> Result<(), SdkError> {
            Ok(())
        }
        fn start(
            &self,
            _: Option<crate::codec::UserId>,
            _: crate::codec::PropagationProfile,
        ) -> Result<(), SdkError> {
            Ok(())
        }
        fn stop(&self) -> Result<(), SdkError> {
            Ok(())
        }
        fn destroy_session(&self) -> Result<(), SdkError> {
            Ok(())
        }
        fn establish_secure_connection(&self, _: crate::codec::UserId) -> Result<(), SdkError> {
            Ok(())
        }
        fn fingerprint(&self, _: crate::codec::UserId) -> Result<Vec<u8>, SdkError> {
            Ok(Vec::new())
        }
        fn is_fingerprint_valid(&self, _: crate::codec::UserId, _: &[u8]) -> Result<bool, SdkError> {
            Ok(false)
        }
        fn send(
            &self,
            _: &[u8],
            _: crate::codec::TransmissionMode,
        ) -> Result<crate::codec::MessageId, SdkError> {
            panic!("radio exploded")
        }
    }

    #[test]
    fn test_sdk_panic_becomes_rejection() {
        let sink = |_: &str, _: Value| {};
        let d = Dispatcher::new(
            Arc::new(PanickingSdk),
            Arc::new(GrantAll::new(ApiLevel::TIRAMISU)),
            Arc::new(sink),
            &config(),
        );
        let rejection = d
            .call(
                "send",
                json!({
                    "data": "aGk=",
                    "transmissionMode": { "type": "broadcast", "uuid": Uuid::new_v4().to_string() }
                }),
            )
            .unwrap_err();
        assert_eq!(rejection.code, "unknown");
        assert_eq!(rejection.message, "radio exploded");
        assert_eq!(rejection.reason.unwrap().kind, FailureKind::Unknown);

        // The dispatcher is still usable afterwards.
        assert!(d.call("isStarted", json!({})).is_ok());
    }

    #[test]
    fn test_sdk_error_keeps_kind() {
        let mut sdk = MockMeshSdk::new();
        sdk.expect_send()
            .returning(|_, _| Err(SdkError::SizeLimitExceeded { size: 9, limit: 4 }));
        let d = dispatcher(sdk);
        let rejection = d
            .call(
                "send",
                json!({
                    "data": "aGk=",
                    "transmissionMode": { "type": "mesh", "uuid": Uuid::new_v4().to_string() }
                }),
            )
            .unwrap_err();
        assert_eq!(rejection.code, "sizeLimitExceeded");
        assert_eq!(rejection.reason.unwrap().kind, FailureKind::SizeLimitExceeded);
    }

    #[test]
    fn test_permission_gate_blocks_start() {
        let mut sdk = MockMeshSdk::new();
        sdk.expect_initialize().returning(|_, _, _| Ok(()));
        let sink = |_: &str, _: Value| {};
        let d = Dispatcher::new(
            Arc::new(sdk),
            Arc::new(StaticPermissions::new(ApiLevel::S)),
            Arc::new(sink),
            &AdapterConfig::default(),
        );
        d.call("initialize", json!({ "apiKey": Uuid::new_v4().to_string() }))
            .unwrap();
        let rejection = d.call("start", json!({})).unwrap_err();
        assert_eq!(rejection.code, "permission");
        assert!(rejection.message.contains("bluetoothNearby"));
        assert!(rejection.message.contains("location"));
    }

    #[test]
    fn test_each_permission_call_starts_from_default_set() {
        let sink = |_: &str, _: Value| {};
        let d = Dispatcher::new(
            Arc::new(MockMeshSdk::new()),
            Arc::new(StaticPermissions::new(ApiLevel::TIRAMISU).deny(CapabilityAlias::Location)),
            Arc::new(sink),
            &config(),
        );
        assert_eq!(
            d.call("checkPermissions", json!({})).unwrap(),
            Some(json!({ "bluetoothNearby": "prompt" }))
        );
        assert_eq!(
            d.call("requestPermissions", json!({ "permissions": ["location"] }))
                .unwrap(),
            Some(json!({ "bluetoothNearby": "granted", "location": "denied" }))
        );
        // Earlier requests do not widen later reports.
        assert_eq!(
            d.call("checkPermissions", json!({})).unwrap(),
            Some(json!({ "bluetoothNearby": "granted" }))
        );
        assert_eq!(
            d.call("requestPermissions", json!({})).unwrap(),
            Some(json!({ "bluetoothNearby": "granted" }))
        );
    }

    #[test]
    fn test_only_documented_operations_are_answered() {
        assert_eq!(
            dispatcher(MockMeshSdk::new())
                .call("methods", json!({}))
                .unwrap_err()
                .code,
            "unknownMethod"
        );
        assert!(!METHODS.contains(&"methods"));
    }

    #[tokio::test]
    async fn test_invoke_resolves_queries() {
        let d = dispatcher(MockMeshSdk::new());
        assert_eq!(
            d.invoke("isInitialized", Value::Null).await,
            Ok(Some(json!({ "isInitialized": false })))
        );
        assert_eq!(
            d.invoke("connectedPeers", Value::Null).await,
            Ok(Some(json!({ "peers": [] })))
        );
        assert_eq!(d.invoke("currentUserID", Value::Null).await, Ok(Some(json!({}))));
    }

    #[test]
    fn test_panic_message_fallback() {
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), UNKNOWN_ERROR);
    }
}
