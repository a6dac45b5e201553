use crate::error::HuddleError;
use crate::link::{LinkEvent, LinkState, PeerLink};
use crate::native::{ConnectivityState, NativeEvent};
use bytes::Bytes;
use huddle_core::SignalPayload;
use tracing::{debug, info, warn};

impl PeerLink {
    /// Reconciles what the native connection observed into link events.
    pub async fn handle_native(&mut self, event: NativeEvent) -> Vec<LinkEvent> {
        match event {
            NativeEvent::CandidateDiscovered(candidate) => {
                if !self.state.is_terminal() {
                    self.transmit(SignalPayload::Candidate(candidate)).await;
                }
                Vec::new()
            }
            NativeEvent::ChannelOpen => self.mark_open(),
            NativeEvent::ChannelClose => self.mark_closed("data channel closed"),
            NativeEvent::ChannelError(message) => {
                warn!("Data channel error with {}: {}", self.remote_id, message);
                vec![LinkEvent::Error(HuddleError::negotiation(
                    &self.remote_id,
                    message,
                ))]
            }
            NativeEvent::ChannelMessage(bytes) => self.receive(bytes),
            NativeEvent::Connectivity(state) => self.on_connectivity(state),
            NativeEvent::RemoteStream(stream) => vec![LinkEvent::Stream(stream)],
        }
    }

    fn mark_open(&mut self) -> Vec<LinkEvent> {
        if self.is_open || self.state.is_terminal() {
            return Vec::new();
        }
        self.is_open = true;
        self.state = LinkState::Open;
        info!("Link to {} is open", self.remote_id);
        vec![LinkEvent::Open(self.remote_id.clone())]
    }

    /// Only the first trigger while open produces a `Close`.
    fn mark_closed(&mut self, reason: &str) -> Vec<LinkEvent> {
        if !self.is_open {
            return Vec::new();
        }
        self.is_open = false;
        self.state = LinkState::Closed;
        info!("Link to {} closed: {}", self.remote_id, reason);
        vec![LinkEvent::Close(self.remote_id.clone())]
    }

    fn on_connectivity(&mut self, state: ConnectivityState) -> Vec<LinkEvent> {
        match state {
            ConnectivityState::Disconnected => self.mark_closed("connectivity lost"),
            ConnectivityState::Failed | ConnectivityState::Closed if self.is_open => {
                self.mark_closed("connectivity ended")
            }
            ConnectivityState::Failed if !self.state.is_terminal() => {
                self.state = LinkState::Errored;
                warn!("Connectivity to {} failed before the link opened", self.remote_id);
                vec![LinkEvent::Error(HuddleError::negotiation(
                    &self.remote_id,
                    "connectivity failed",
                ))]
            }
            _ => Vec::new(),
        }
    }

    fn receive(&self, bytes: Bytes) -> Vec<LinkEvent> {
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(data) => vec![LinkEvent::Data(data)],
            Err(e) => {
                debug!("Dropping unparsable message from {}: {}", self.remote_id, e);
                Vec::new()
            }
        }
    }
}
