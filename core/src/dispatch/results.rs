//! Result objects resolved back to the host.

use crate::codec::{payload, MessageId, PeerId, UserId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsInitializedResult {
    #[serde(rename = "isInitialized")]
    pub is_initialized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsStartedResult {
    #[serde(rename = "isStarted")]
    pub is_started: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentUserIdResult {
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectedPeersResult {
    pub peers: Vec<PeerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LicenseExpirationDateResult {
    #[serde(
        rename = "licenseExpirationDate",
        serialize_with = "rfc3339",
        skip_serializing_if = "Option::is_none"
    )]
    pub license_expiration_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FingerprintResult {
    #[serde(serialize_with = "payload::serialize", skip_serializing_if = "Vec::is_empty")]
    pub fingerprint: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsFingerprintValidResult {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendResult {
    #[serde(rename = "messageID")]
    pub message_id: MessageId,
}

fn rfc3339<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(date) => serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => serializer.serialize_none(),
    }
}
