//! Typed views of host argument bags.
//!
//! Parsing never fails. A field that is missing, of the wrong JSON type, or
//! malformed for its codec is simply absent; whether absence is an error is
//! decided by each operation's `validate`.

use crate::codec::{identifier, payload, ApiKey, PropagationProfile, TransmissionMode, UserId};
use crate::BridgeError;
use serde_json::Value;

/// Lenient accessor over a JSON argument object.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a>(Option<&'a serde_json::Map<String, Value>>);

impl<'a> Args<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self(value.as_object())
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.and_then(|object| object.get(key))
    }

    pub fn string(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Booleans are accepted as JSON booleans or as `"true"`/`"false"`.
    pub fn boolean(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn object(&self, key: &str) -> Option<&'a Value> {
        self.get(key).filter(|value| value.is_object())
    }

    pub fn strings(&self, key: &str) -> Vec<&'a str> {
        match self.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn identifier(&self, key: &str) -> Option<uuid::Uuid> {
        identifier::parse_opt(self.string(key))
    }

    pub fn payload(&self, key: &str) -> Option<Vec<u8>> {
        payload::decode_opt(self.string(key))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitializeOptions {
    pub api_key: Option<ApiKey>,
    pub verbose_logging: Option<bool>,
}

impl InitializeOptions {
    pub fn from_args(args: &Value) -> Self {
        let args = Args::new(args);
        Self {
            api_key: args.identifier("apiKey"),
            verbose_logging: args.boolean("verboseLogging"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    pub user_id: Option<UserId>,
    pub propagation_profile: PropagationProfile,
}

impl StartOptions {
    pub fn from_args(args: &Value) -> Self {
        let args = Args::new(args);
        Self {
            user_id: args.identifier("userID"),
            propagation_profile: PropagationProfile::decode(args.string("propagationProfile")),
        }
    }
}

/// Arguments of the operations that only take a peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserOptions {
    pub user_id: Option<UserId>,
}

impl UserOptions {
    pub fn from_args(args: &Value) -> Self {
        Self {
            user_id: Args::new(args).identifier("userID"),
        }
    }

    pub fn validate(&self) -> Result<UserId, BridgeError> {
        self.user_id.ok_or(BridgeError::MissingUserIdentifier)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsFingerprintValidOptions {
    pub user_id: Option<UserId>,
    pub fingerprint: Option<Vec<u8>>,
}

impl IsFingerprintValidOptions {
    pub fn from_args(args: &Value) -> Self {
        let args = Args::new(args);
        Self {
            user_id: args.identifier("userID"),
            fingerprint: args.payload("fingerprint"),
        }
    }

    /// The user is checked before the fingerprint.
    pub fn validate(self) -> Result<(UserId, Vec<u8>), BridgeError> {
        let user_id = self.user_id.ok_or(BridgeError::MissingUserIdentifier)?;
        let fingerprint = self.fingerprint.ok_or(BridgeError::MissingFingerprint)?;
        Ok((user_id, fingerprint))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub data: Option<Vec<u8>>,
    pub transmission_mode: Option<TransmissionMode>,
}

impl SendOptions {
    pub fn from_args(args: &Value) -> Self {
        let args = Args::new(args);
        Self {
            data: args.payload("data"),
            transmission_mode: args.object("transmissionMode").and_then(TransmissionMode::decode),
        }
    }

    pub fn validate(self) -> Result<(Vec<u8>, TransmissionMode), BridgeError> {
        let data = self.data.ok_or(BridgeError::MissingPayload)?;
        let mode = self
            .transmission_mode
            .ok_or(BridgeError::MissingTransmissionMode)?;
        Ok((data, mode))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPermissionsOptions {
    pub permissions: Vec<String>,
}

impl RequestPermissionsOptions {
    pub fn from_args(args: &Value) -> Self {
        Self {
            permissions: Args::new(args)
                .strings("permissions")
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_non_object_args_are_empty() {
        for args in [Value::Null, json!([1, 2]), json!("x")] {
            assert_eq!(InitializeOptions::from_args(&args), InitializeOptions::default());
            assert_eq!(SendOptions::from_args(&args), SendOptions::default());
        }
    }

    #[test]
    fn test_wrong_types_are_absent() {
        let opts = InitializeOptions::from_args(&json!({ "apiKey": 7, "verboseLogging": "yes" }));
        assert_eq!(opts, InitializeOptions::default());
    }

    #[test]
    fn test_boolean_accepts_strings() {
        let opts = InitializeOptions::from_args(&json!({ "verboseLogging": "false" }));
        assert_eq!(opts.verbose_logging, Some(false));
    }

    #[test]
    fn test_start_profile_falls_back() {
        let opts = StartOptions::from_args(&json!({ "propagationProfile": "warp" }));
        assert_eq!(opts.propagation_profile, PropagationProfile::Standard);
        let opts = StartOptions::from_args(&json!({ "propagationProfile": "longReach" }));
        assert_eq!(opts.propagation_profile, PropagationProfile::LongReach);
    }

    #[test]
    fn test_send_validation_order() {
        let receiver = Uuid::new_v4();
        let mode = json!({ "type": "mesh", "uuid": receiver.to_string() });

        let err = SendOptions::from_args(&json!({ "transmissionMode": mode }))
            .validate()
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingPayload));

        let err = SendOptions::from_args(&json!({ "data": "aGk=" }))
            .validate()
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingTransmissionMode));

        let (data, parsed) = SendOptions::from_args(&json!({ "data": "aGk=", "transmissionMode": mode }))
            .validate()
            .unwrap();
        assert_eq!(data, b"hi");
        assert_eq!(parsed, TransmissionMode::Mesh { receiver });
    }

    #[test]
    fn test_empty_payload_is_missing() {
        let opts = SendOptions::from_args(&json!({ "data": "" }));
        assert_eq!(opts.data, None);
    }

    #[test]
    fn test_fingerprint_validation_order() {
        let err = IsFingerprintValidOptions::from_args(&json!({}))
            .validate()
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingUserIdentifier));

        let err = IsFingerprintValidOptions::from_args(&json!({ "userID": Uuid::new_v4().to_string() }))
            .validate()
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingFingerprint));
    }

    #[test]
    fn test_permissions_skip_non_strings() {
        let opts = RequestPermissionsOptions::from_args(&json!({ "permissions": ["bluetooth", 3, "location"] }));
        assert_eq!(opts.permissions, vec!["bluetooth", "location"]);
    }
}
