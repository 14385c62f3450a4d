//! In-memory SDK for hosts without a radio (CLI harness, tests).
//!
//! Mirrors the observable contract of the real SDK: commands return their
//! immediate outcome and everything else is reported through the delegate.
//! Callbacks are fired after the internal lock is released so a delegate may
//! call straight back into the SDK.

use super::{LogLevel, MeshSdk, SdkDelegate, SdkError};
use crate::codec::{ApiKey, MessageId, PeerId, PropagationProfile, TransmissionMode, UserId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Largest payload the simulated radio accepts.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Bytes reported per progress callback.
pub const PROGRESS_CHUNK_BYTES: usize = 512;

#[derive(Default)]
struct SimState {
    api_key: Option<ApiKey>,
    log_level: LogLevel,
    delegate: Option<Arc<dyn SdkDelegate>>,
    started: bool,
    user_id: Option<UserId>,
    profile: PropagationProfile,
    peers: Vec<PeerId>,
    secure: HashSet<PeerId>,
}

/// A loopback SDK implementation.
#[derive(Default)]
pub struct SimulatedSdk {
    state: Mutex<SimState>,
    license_expiration: Option<DateTime<Utc>>,
}

impl SimulatedSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `licenseExpirationDate`/`updateLicense` with this expiry instead
    /// of reporting them unsupported.
    pub fn with_license(mut self, expires: DateTime<Utc>) -> Self {
        self.license_expiration = Some(expires);
        self
    }

    fn delegate(&self) -> Option<Arc<dyn SdkDelegate>> {
        self.state.lock().delegate.clone()
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    pub fn profile(&self) -> PropagationProfile {
        self.state.lock().profile
    }

    pub fn log_level(&self) -> LogLevel {
        self.state.lock().log_level
    }

    /// Bring a peer into range.
    pub fn connect_peer(&self, peer_id: PeerId) {
        let snapshot = {
            let mut state = self.state.lock();
            if !state.started || state.peers.contains(&peer_id) {
                return;
            }
            state.peers.push(peer_id);
            state.peers.clone()
        };
        if let Some(delegate) = self.delegate() {
            delegate.on_connected(peer_id);
            delegate.on_connected_peers(snapshot);
        }
    }

    /// Take a peer out of range.
    pub fn disconnect_peer(&self, peer_id: PeerId) {
        let snapshot = {
            let mut state = self.state.lock();
            let before = state.peers.len();
            state.peers.retain(|p| *p != peer_id);
            state.secure.remove(&peer_id);
            if state.peers.len() == before {
                return;
            }
            state.peers.clone()
        };
        if let Some(delegate) = self.delegate() {
            delegate.on_disconnected(peer_id);
            delegate.on_connected_peers(snapshot);
        }
    }

    /// Deliver an inbound payload as if it arrived over the air.
    pub fn deliver(&self, data: Vec<u8>, mode: Option<TransmissionMode>) -> MessageId {
        let message_id = Uuid::new_v4();
        if let Some(delegate) = self.delegate() {
            delegate.on_receive_data(message_id, data, mode);
        }
        message_id
    }

    fn require_started(&self) -> Result<UserId, SdkError> {
        let state = self.state.lock();
        match (state.started, state.user_id) {
            (true, Some(user_id)) => Ok(user_id),
            _ => Err(SdkError::Session("the SDK is not started".into())),
        }
    }

    fn fingerprint_for(own: UserId, peer: PeerId) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(32);
        bytes.extend_from_slice(own.as_bytes());
        bytes.extend_from_slice(peer.as_bytes());
        bytes
    }
}

impl MeshSdk for SimulatedSdk {
    fn initialize(
        &self,
        api_key: ApiKey,
        log_level: LogLevel,
        delegate: Arc<dyn SdkDelegate>,
    ) -> Result<(), SdkError> {
        let mut state = self.state.lock();
        if state.started {
            return Err(SdkError::AlreadyStarted);
        }
        state.api_key = Some(api_key);
        state.log_level = log_level;
        state.delegate = Some(delegate);
        tracing::debug!("Simulated SDK initialized (log level {:?})", log_level);
        Ok(())
    }

    fn start(&self, user_id: Option<UserId>, profile: PropagationProfile) -> Result<(), SdkError> {
        let (delegate, user_id, peers) = {
            let mut state = self.state.lock();
            if state.api_key.is_none() {
                return Err(SdkError::Session("the SDK is not initialized".into()));
            }
            if state.started {
                return Err(SdkError::AlreadyStarted);
            }
            let user_id = user_id.or(state.user_id).unwrap_or_else(Uuid::new_v4);
            state.started = true;
            state.user_id = Some(user_id);
            state.profile = profile;
            (state.delegate.clone(), user_id, state.peers.clone())
        };
        if let Some(delegate) = delegate {
            delegate.on_started(user_id);
            delegate.on_connected_peers(peers);
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), SdkError> {
        let (delegate, was_started) = {
            let mut state = self.state.lock();
            let was_started = state.started;
            state.started = false;
            state.peers.clear();
            state.secure.clear();
            (state.delegate.clone(), was_started)
        };
        if let Some(delegate) = delegate {
            if was_started {
                delegate.on_stopped();
            } else {
                delegate.on_fail_to_stop(&SdkError::Session("the SDK is not started".into()));
            }
        }
        Ok(())
    }

    fn destroy_session(&self) -> Result<(), SdkError> {
        let delegate = {
            let mut state = self.state.lock();
            let delegate = state.delegate.take();
            *state = SimState::default();
            delegate
        };
        if let Some(delegate) = delegate {
            delegate.on_destroy_session();
        }
        Ok(())
    }

    fn license_expiration_date(&self) -> Result<Option<DateTime<Utc>>, SdkError> {
        match self.license_expiration {
            Some(expires) => Ok(Some(expires)),
            None => Err(SdkError::Unsupported("licenseExpirationDate")),
        }
    }

    fn update_license(&self) -> Result<(), SdkError> {
        match self.license_expiration {
            Some(_) => Ok(()),
            None => Err(SdkError::Unsupported("updateLicense")),
        }
    }

    fn establish_secure_connection(&self, user_id: UserId) -> Result<(), SdkError> {
        let (delegate, outcome) = {
            let mut state = self.state.lock();
            let outcome = if !state.started {
                Err(SdkError::Session("the SDK is not started".into()))
            } else if !state.peers.contains(&user_id) {
                Err(SdkError::Generic {
                    message: "peer is not connected".into(),
                    code: None,
                })
            } else {
                state.secure.insert(user_id);
                Ok(())
            };
            (state.delegate.clone(), outcome)
        };
        if let Some(delegate) = delegate {
            match outcome {
                Ok(()) => delegate.on_establish_secure_connection(user_id),
                Err(err) => delegate.on_fail_to_establish_secure_connection(user_id, &err),
            }
        }
        Ok(())
    }

    fn fingerprint(&self, user_id: UserId) -> Result<Vec<u8>, SdkError> {
        let own = self.require_started()?;
        if !self.state.lock().secure.contains(&user_id) {
            return Err(SdkError::Session(format!(
                "no secure connection with {user_id}"
            )));
        }
        Ok(Self::fingerprint_for(own, user_id))
    }

    fn is_fingerprint_valid(&self, user_id: UserId, fingerprint: &[u8]) -> Result<bool, SdkError> {
        Ok(self.fingerprint(user_id)? == fingerprint)
    }

    fn send(&self, data: &[u8], mode: TransmissionMode) -> Result<MessageId, SdkError> {
        self.require_started()?;
        if data.len() > MAX_PAYLOAD_BYTES {
            return Err(SdkError::SizeLimitExceeded {
                size: data.len(),
                limit: MAX_PAYLOAD_BYTES,
            });
        }

        let message_id = Uuid::new_v4();
        let (delegate, reachable) = {
            let state = self.state.lock();
            let reachable = match mode {
                TransmissionMode::P2p { receiver } => state.peers.contains(&receiver),
                TransmissionMode::Broadcast { .. } | TransmissionMode::Mesh { .. } => true,
            };
            (state.delegate.clone(), reachable)
        };

        if let Some(delegate) = delegate {
            if reachable {
                let total = data.len().div_ceil(PROGRESS_CHUNK_BYTES).max(1) as u32;
                for position in 1..=total {
                    delegate.on_progress_of_send(message_id, position, total);
                }
                delegate.on_send(message_id);
                if let TransmissionMode::Broadcast { .. } = mode {
                    delegate.on_receive_data(Uuid::new_v4(), data.to_vec(), Some(mode));
                }
            } else {
                delegate.on_fail_to_send(
                    message_id,
                    &SdkError::Generic {
                        message: "peer is not connected".into(),
                        code: None,
                    },
                );
            }
        }
        Ok(message_id)
    }
}
