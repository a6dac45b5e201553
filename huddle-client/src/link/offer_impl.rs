use crate::link::{LinkEvent, LinkState, PeerLink, Role};
use crate::native::SdpKind;
use huddle_core::SignalPayload;
use tracing::{debug, info};

impl PeerLink {
    /// Offering side: opens the data channel and sends our description.
    pub async fn offer(&mut self) -> Vec<LinkEvent> {
        if self.role != Role::Offerer || self.state != LinkState::New {
            debug!(
                "Not offering to {} as {:?} in {:?}",
                self.remote_id, self.role, self.state
            );
            return Vec::new();
        }

        info!("Offering link to {}", self.remote_id);
        self.state = LinkState::AwaitingLocalDescription;

        match self.create_and_send_offer().await {
            Ok(()) => {
                self.state = LinkState::Negotiating;
                Vec::new()
            }
            Err(e) => vec![self.negotiation_error(e)],
        }
    }

    /// Answering side: nothing happens until the host's offer arrives.
    pub fn await_offer(&mut self) {
        if self.role == Role::Answerer && self.state == LinkState::New {
            debug!("Waiting for an offer from {}", self.remote_id);
            self.state = LinkState::AwaitingRemoteOffer;
        }
    }

    async fn create_and_send_offer(&mut self) -> anyhow::Result<()> {
        self.connection.create_data_channel().await?;
        let sdp = self.connection.create_offer().await?;
        self.connection
            .set_local_description(SdpKind::Offer, sdp.clone())
            .await?;
        self.transmit(SignalPayload::Offer { sdp }).await;
        Ok(())
    }
}
