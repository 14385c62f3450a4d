//! SDK delegate that turns callbacks into named host events.

use super::{BridgeEvent, EventSink};
use crate::codec::{FailureReason, MessageId, PeerId, TransmissionMode, UserId};
use crate::sdk::{SdkDelegate, SdkError};
use crate::session::SessionTracker;
use std::sync::Arc;

/// The delegate handed to the SDK.
///
/// Each callback becomes exactly one [`BridgeEvent`]. Session-relevant
/// events update the shared session before the host is notified, so a query
/// issued from an event handler already sees the new state.
pub struct EventRouter {
    sink: Arc<dyn EventSink>,
    session: SessionTracker,
}

impl EventRouter {
    pub fn new(sink: Arc<dyn EventSink>, session: SessionTracker) -> Self {
        Self { sink, session }
    }

    pub fn route(&self, event: BridgeEvent) {
        self.session.observe(&event);
        let name = event.name();
        let payload = event.payload();
        tracing::debug!("Emitting {}: {}", name, payload);
        self.sink.notify(name, payload);
    }
}

impl SdkDelegate for EventRouter {
    fn on_started(&self, user_id: UserId) {
        tracing::info!("Session started as {}", user_id);
        self.route(BridgeEvent::Started { user_id });
    }

    fn on_fail_to_start(&self, error: &SdkError) {
        tracing::warn!("Session failed to start: {}", error);
        self.route(BridgeEvent::FailToStart {
            reason: FailureReason::from(error),
        });
    }

    fn on_stopped(&self) {
        tracing::info!("Session stopped");
        self.route(BridgeEvent::Stopped {});
    }

    fn on_fail_to_stop(&self, error: &SdkError) {
        self.route(BridgeEvent::FailToStop {
            reason: FailureReason::from(error),
        });
    }

    fn on_destroy_session(&self) {
        tracing::info!("Session destroyed");
        self.route(BridgeEvent::DestroySession {});
    }

    fn on_fail_to_destroy_session(&self, error: &SdkError) {
        self.route(BridgeEvent::FailToDestroySession {
            reason: FailureReason::from(error),
        });
    }

    fn on_connected(&self, peer_id: PeerId) {
        self.route(BridgeEvent::Connected { peer_id });
    }

    fn on_disconnected(&self, peer_id: PeerId) {
        self.route(BridgeEvent::Disconnected { peer_id });
    }

    fn on_connected_peers(&self, peers: Vec<PeerId>) {
        self.route(BridgeEvent::ConnectedPeers { peer_ids: peers });
    }

    fn on_establish_secure_connection(&self, user_id: UserId) {
        self.route(BridgeEvent::EstablishSecureConnection { user_id });
    }

    fn on_fail_to_establish_secure_connection(&self, user_id: UserId, error: &SdkError) {
        self.route(BridgeEvent::FailToEstablishSecureConnection {
            user_id,
            reason: FailureReason::from(error),
        });
    }

    fn on_send(&self, message_id: MessageId) {
        self.route(BridgeEvent::Send { message_id });
    }

    fn on_fail_to_send(&self, message_id: MessageId, error: &SdkError) {
        self.route(BridgeEvent::FailToSend {
            message_id,
            reason: FailureReason::from(error),
        });
    }

    fn on_progress_of_send(&self, message_id: MessageId, position: u32, total: u32) {
        self.route(BridgeEvent::ProgressOfSend {
            message_id,
            position,
            total,
        });
    }

    fn on_receive_data(
        &self,
        message_id: MessageId,
        data: Vec<u8>,
        transmission_mode: Option<TransmissionMode>,
    ) {
        self.route(BridgeEvent::ReceiveData {
            message_id,
            data,
            transmission_mode,
        });
    }
}
