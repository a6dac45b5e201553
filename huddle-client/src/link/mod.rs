//! One direct link to one remote peer.
//!
//! ```text
//! New ─offer()──────> AwaitingLocalDescription ─> Negotiating ─> Open ─> Closed
//!  └──await_offer()─> AwaitingRemoteOffer ──offer in──┘
//! (connectivity failure before Open) ─> Errored
//! ```
//!
//! A link never calls back into the client. Every method returns the
//! [`LinkEvent`]s it produced and the runtime re-emits them.

mod handle_native_impl;
mod handle_signal_impl;
mod offer_impl;

use crate::error::HuddleError;
use crate::native::{MediaStreamHandle, NativeConnection};
use crate::signaling::SignalOutput;
use huddle_core::{IceCandidate, PeerId, Signal, SignalPayload};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    AwaitingLocalDescription,
    AwaitingRemoteOffer,
    Negotiating,
    Open,
    Closed,
    Errored,
}

impl LinkState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkState::Closed | LinkState::Errored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offerer,
    Answerer,
}

#[derive(Debug, Clone)]
pub enum LinkEvent {
    Open(PeerId),
    Close(PeerId),
    Error(HuddleError),
    Data(serde_json::Value),
    Stream(MediaStreamHandle),
}

pub struct PeerLink {
    local_id: PeerId,
    remote_id: PeerId,
    role: Role,
    state: LinkState,
    is_open: bool,
    generation: u64,
    connection: Box<dyn NativeConnection>,
    signaling: Arc<dyn SignalOutput>,
    remote_description_set: bool,
    /// Remote candidates that arrived before the remote description, in arrival order.
    pending_candidates: Vec<IceCandidate>,
}

impl PeerLink {
    pub fn new(
        local_id: PeerId,
        remote_id: PeerId,
        role: Role,
        connection: Box<dyn NativeConnection>,
        signaling: Arc<dyn SignalOutput>,
        generation: u64,
    ) -> Self {
        Self {
            local_id,
            remote_id,
            role,
            state: LinkState::New,
            is_open: false,
            generation,
            connection,
            signaling,
            remote_description_set: false,
            pending_candidates: Vec::new(),
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub fn remote_id(&self) -> &PeerId {
        &self.remote_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Which native connection this link owns; events tagged with any other
    /// generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    /// Sends `data` as a JSON text message. Dropped silently unless the link
    /// is open and its channel can take writes.
    pub async fn send(&self, data: &serde_json::Value) {
        if self.state != LinkState::Open || !self.connection.is_channel_open() {
            return;
        }
        let text = match serde_json::to_string(data) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode message for {}: {}", self.remote_id, e);
                return;
            }
        };
        if let Err(e) = self.connection.send_text(text).await {
            debug!("Send to {} failed: {}", self.remote_id, e);
        }
    }

    /// Releases the native connection. No events follow.
    pub async fn close(&self) {
        if let Err(e) = self.connection.close().await {
            debug!("Closing connection to {} failed: {}", self.remote_id, e);
        }
    }

    async fn transmit(&self, payload: SignalPayload) {
        let signal = Signal::new(self.local_id.clone(), self.remote_id.clone(), payload);
        self.signaling.send_signal(signal).await;
    }

    fn negotiation_error(&self, err: anyhow::Error) -> LinkEvent {
        warn!("Negotiation with {} failed: {:#}", self.remote_id, err);
        LinkEvent::Error(HuddleError::negotiation(
            &self.remote_id,
            format!("{:#}", err),
        ))
    }
}
