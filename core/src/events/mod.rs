//! Named events the host subscribes to.
//!
//! Every SDK callback maps to exactly one [`BridgeEvent`]. Its payload is the
//! JSON object the host receives; absent values are left out rather than
//! serialized as `null`.

pub mod router;
pub mod sink;

use crate::codec::{payload, FailureReason, MessageId, PeerId, TransmissionMode, UserId};
use serde::Serialize;
use serde_json::Value;

pub use router::EventRouter;
pub use sink::{ChannelSink, EventSink, HostEvent};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BridgeEvent {
    Started {
        #[serde(rename = "userID")]
        user_id: UserId,
    },
    FailToStart {
        reason: FailureReason,
    },
    Stopped {},
    FailToStop {
        reason: FailureReason,
    },
    DestroySession {},
    FailToDestroySession {
        reason: FailureReason,
    },
    Connected {
        #[serde(rename = "peerID")]
        peer_id: PeerId,
    },
    Disconnected {
        #[serde(rename = "peerID")]
        peer_id: PeerId,
    },
    ConnectedPeers {
        #[serde(rename = "peerIDs")]
        peer_ids: Vec<PeerId>,
    },
    EstablishSecureConnection {
        #[serde(rename = "userID")]
        user_id: UserId,
    },
    FailToEstablishSecureConnection {
        #[serde(rename = "userID")]
        user_id: UserId,
        reason: FailureReason,
    },
    Send {
        #[serde(rename = "messageID")]
        message_id: MessageId,
    },
    FailToSend {
        #[serde(rename = "messageID")]
        message_id: MessageId,
        reason: FailureReason,
    },
    ProgressOfSend {
        #[serde(rename = "messageID")]
        message_id: MessageId,
        position: u32,
        total: u32,
    },
    ReceiveData {
        #[serde(rename = "messageID")]
        message_id: MessageId,
        #[serde(
            serialize_with = "payload::serialize",
            skip_serializing_if = "Vec::is_empty"
        )]
        data: Vec<u8>,
        #[serde(rename = "transmissionMode", skip_serializing_if = "Option::is_none")]
        transmission_mode: Option<TransmissionMode>,
    },
}

impl BridgeEvent {
    /// Every event name, in callback declaration order.
    pub const NAMES: [&'static str; 15] = [
        "onStarted",
        "onFailToStart",
        "onStopped",
        "onFailToStop",
        "onDestroySession",
        "onFailToDestroySession",
        "onConnected",
        "onDisconnected",
        "onConnectedPeers",
        "onEstablishSecureConnection",
        "onFailToEstablishSecureConnection",
        "onSend",
        "onFailToSend",
        "onProgressOfSend",
        "onReceiveData",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "onStarted",
            Self::FailToStart { .. } => "onFailToStart",
            Self::Stopped {} => "onStopped",
            Self::FailToStop { .. } => "onFailToStop",
            Self::DestroySession {} => "onDestroySession",
            Self::FailToDestroySession { .. } => "onFailToDestroySession",
            Self::Connected { .. } => "onConnected",
            Self::Disconnected { .. } => "onDisconnected",
            Self::ConnectedPeers { .. } => "onConnectedPeers",
            Self::EstablishSecureConnection { .. } => "onEstablishSecureConnection",
            Self::FailToEstablishSecureConnection { .. } => "onFailToEstablishSecureConnection",
            Self::Send { .. } => "onSend",
            Self::FailToSend { .. } => "onFailToSend",
            Self::ProgressOfSend { .. } => "onProgressOfSend",
            Self::ReceiveData { .. } => "onReceiveData",
        }
    }

    /// The JSON object handed to the host.
    pub fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize {} payload: {}", self.name(), e);
            Value::Object(Default::default())
        })
    }
}
