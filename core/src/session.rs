//! Session state shared between the controller and the event router.
//!
//! The controller drives transitions from commands; the router applies the
//! transitions the SDK confirms. Each SDK-confirmed transition bumps an
//! epoch so a command that raced with a callback never overwrites it.

use crate::codec::{PeerId, UserId};
use crate::events::BridgeEvent;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initialized,
    Started,
    /// Stop issued, waiting for the SDK to confirm.
    Stopped,
}

impl SessionState {
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub peers: Vec<PeerId>,
}

#[derive(Debug, Default)]
struct Session {
    snapshot: SessionSnapshot,
    epoch: u64,
}

/// Handle to the single session. Cloning shares it.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    inner: Arc<Mutex<Session>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().snapshot.clone()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().snapshot.state
    }

    /// Current state plus the epoch a later [`commit`](Self::commit) is
    /// conditional on.
    pub fn begin(&self) -> (SessionState, u64) {
        let session = self.inner.lock();
        (session.snapshot.state, session.epoch)
    }

    /// Apply a command-driven transition unless the SDK confirmed a
    /// transition since `epoch`. Returns whether it was applied.
    pub fn commit(&self, epoch: u64, apply: impl FnOnce(&mut SessionSnapshot)) -> bool {
        let mut session = self.inner.lock();
        if session.epoch != epoch {
            tracing::debug!(
                "Session moved to {:?} while the command was in flight",
                session.snapshot.state
            );
            return false;
        }
        apply(&mut session.snapshot);
        true
    }

    /// Unconditional teardown.
    pub fn reset(&self) {
        let mut session = self.inner.lock();
        session.snapshot = SessionSnapshot::default();
        session.epoch += 1;
    }

    /// Apply the transition an SDK callback confirms, if any.
    pub fn observe(&self, event: &BridgeEvent) {
        let mut session = self.inner.lock();
        let snapshot = &mut session.snapshot;
        let changed = match event {
            BridgeEvent::Started { user_id } => {
                snapshot.state = SessionState::Started;
                snapshot.user_id = Some(*user_id);
                true
            }
            BridgeEvent::Stopped {} => {
                if snapshot.state.is_initialized() {
                    snapshot.state = SessionState::Initialized;
                }
                snapshot.peers.clear();
                true
            }
            // A late failure (e.g. already started) leaves a running session alone.
            BridgeEvent::FailToStart { .. } => match snapshot.state {
                SessionState::Started => false,
                state => {
                    if state.is_initialized() {
                        snapshot.state = SessionState::Initialized;
                    }
                    snapshot.peers.clear();
                    true
                }
            },
            // The session is still running; also cancels an in-flight stop.
            BridgeEvent::FailToStop { .. } => match snapshot.state {
                SessionState::Started | SessionState::Stopped => {
                    snapshot.state = SessionState::Started;
                    true
                }
                _ => false,
            },
            BridgeEvent::DestroySession {} => {
                *snapshot = SessionSnapshot::default();
                true
            }
            BridgeEvent::Connected { peer_id } => {
                if !snapshot.peers.contains(peer_id) {
                    snapshot.peers.push(*peer_id);
                }
                false
            }
            BridgeEvent::Disconnected { peer_id } => {
                snapshot.peers.retain(|p| p != peer_id);
                false
            }
            BridgeEvent::ConnectedPeers { peer_ids } => {
                snapshot.peers = peer_ids.clone();
                false
            }
            _ => false,
        };
        if changed {
            session.epoch += 1;
        }
    }
}
