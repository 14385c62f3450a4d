//! Host notify seam.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Where named events go. Implementations must not block: they are called
/// from SDK threads.
pub trait EventSink: Send + Sync {
    fn notify(&self, name: &str, payload: Value);
}

impl<F> EventSink for F
where
    F: Fn(&str, Value) + Send + Sync,
{
    fn notify(&self, name: &str, payload: Value) {
        self(name, payload)
    }
}

/// An event as queued for an async host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostEvent {
    #[serde(rename = "event")]
    pub name: String,
    pub payload: Value,
}

/// Forwards events into an unbounded tokio channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<HostEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn notify(&self, name: &str, payload: Value) {
        let event = HostEvent {
            name: name.to_string(),
            payload,
        };
        if self.tx.send(event).is_err() {
            tracing::debug!("Event {} dropped: no subscriber", name);
        }
    }
}
