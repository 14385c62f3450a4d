//! Transmission mode codec.
//!
//! Wire form is always `{"type": "<tag>", "uuid": "<identifier>"}`. The tag
//! selects the variant and the uuid is the sender (broadcast) or the receiver
//! (mesh, p2p).

use super::identifier::{self, PeerId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// How the SDK propagates a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransmissionMode {
    /// Readable by every node that receives it; carries the sender.
    Broadcast {
        #[serde(rename = "uuid")]
        sender: PeerId,
    },
    /// Relayed through the mesh to a single receiver.
    Mesh {
        #[serde(rename = "uuid")]
        receiver: PeerId,
    },
    /// Delivered only while the receiver is in range.
    #[serde(rename = "p2p")]
    P2p {
        #[serde(rename = "uuid")]
        receiver: PeerId,
    },
}

impl TransmissionMode {
    pub const BROADCAST: &'static str = "broadcast";
    pub const MESH: &'static str = "mesh";
    pub const P2P: &'static str = "p2p";

    /// The wire tag for this variant.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Broadcast { .. } => Self::BROADCAST,
            Self::Mesh { .. } => Self::MESH,
            Self::P2p { .. } => Self::P2P,
        }
    }

    /// The single identifier every variant carries.
    pub fn uuid(&self) -> PeerId {
        match self {
            Self::Broadcast { sender } => *sender,
            Self::Mesh { receiver } | Self::P2p { receiver } => *receiver,
        }
    }

    /// Build a variant from its wire parts. Unknown tags are absent; there is
    /// no default variant.
    pub fn from_parts(tag: &str, uuid: PeerId) -> Option<Self> {
        match tag {
            Self::BROADCAST => Some(Self::Broadcast { sender: uuid }),
            Self::MESH => Some(Self::Mesh { receiver: uuid }),
            Self::P2P => Some(Self::P2p { receiver: uuid }),
            _ => None,
        }
    }

    /// Decode the wire object. Missing, empty or unrecognized fields yield
    /// `None`.
    pub fn decode(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let tag = object.get("type")?.as_str()?;
        let uuid = identifier::parse(object.get("uuid")?.as_str()?)?;
        Self::from_parts(tag, uuid)
    }

    /// Encode to the wire object.
    pub fn encode(&self) -> Value {
        json!({
            "type": self.tag(),
            "uuid": identifier::render(&self.uuid()),
        })
    }
}

impl fmt::Display for TransmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tag(), self.uuid())
    }
}
