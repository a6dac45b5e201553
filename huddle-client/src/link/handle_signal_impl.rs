use crate::link::{LinkEvent, LinkState, PeerLink, Role};
use crate::native::SdpKind;
use huddle_core::{IceCandidate, Signal, SignalPayload};
use tracing::{debug, info};

impl PeerLink {
    /// Applies a signal from the remote peer. Anything not written by the
    /// remote for us is ignored without a trace.
    pub async fn handle_signal(&mut self, signal: Signal) -> Vec<LinkEvent> {
        if !signal.is_between(&self.remote_id, &self.local_id) {
            return Vec::new();
        }
        if self.state.is_terminal() {
            debug!("Dropping {} from {}: link is {:?}", signal.kind(), self.remote_id, self.state);
            return Vec::new();
        }

        let mut events = Vec::new();
        let result = match signal.payload {
            SignalPayload::Offer { sdp } => self.accept_offer(sdp, &mut events).await,
            SignalPayload::Answer { sdp } => self.accept_answer(sdp, &mut events).await,
            SignalPayload::Candidate(candidate) => self.accept_candidate(candidate).await,
        };
        if let Err(e) = result {
            events.push(self.negotiation_error(e));
        }
        events
    }

    async fn accept_offer(&mut self, sdp: String, events: &mut Vec<LinkEvent>) -> anyhow::Result<()> {
        let expecting = matches!(self.state, LinkState::New | LinkState::AwaitingRemoteOffer);
        if self.role != Role::Answerer || !expecting {
            debug!("Ignoring offer from {} in {:?}", self.remote_id, self.state);
            return Ok(());
        }

        info!("Answering offer from {}", self.remote_id);
        self.connection
            .set_remote_description(SdpKind::Offer, sdp)
            .await?;
        self.remote_description_set = true;
        self.flush_candidates(events).await;

        let answer = self.connection.create_answer().await?;
        self.connection
            .set_local_description(SdpKind::Answer, answer.clone())
            .await?;
        self.transmit(SignalPayload::Answer { sdp: answer }).await;
        self.state = LinkState::Negotiating;
        Ok(())
    }

    async fn accept_answer(&mut self, sdp: String, events: &mut Vec<LinkEvent>) -> anyhow::Result<()> {
        if self.role != Role::Offerer
            || self.state != LinkState::Negotiating
            || self.remote_description_set
        {
            debug!("Ignoring answer from {} in {:?}", self.remote_id, self.state);
            return Ok(());
        }

        self.connection
            .set_remote_description(SdpKind::Answer, sdp)
            .await?;
        self.remote_description_set = true;
        self.flush_candidates(events).await;
        Ok(())
    }

    async fn accept_candidate(&mut self, candidate: IceCandidate) -> anyhow::Result<()> {
        if !self.remote_description_set {
            self.pending_candidates.push(candidate);
            return Ok(());
        }
        self.connection.add_ice_candidate(candidate).await
    }

    async fn flush_candidates(&mut self, events: &mut Vec<LinkEvent>) {
        if self.pending_candidates.is_empty() {
            return;
        }
        debug!(
            "Applying {} buffered candidates from {}",
            self.pending_candidates.len(),
            self.remote_id
        );
        for candidate in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = self.connection.add_ice_candidate(candidate).await {
                events.push(self.negotiation_error(e));
            }
        }
    }
}
