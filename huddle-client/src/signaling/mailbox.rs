use crate::signaling::{SignalOutput, SignalingEvent};
use crate::store::RelayStore;
use async_trait::async_trait;
use huddle_core::Signal;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// The local peer's mailbox. Every member of the room watches it, so each
/// write reaches all of them; receivers filter by `(id, peer)`.
pub struct Mailbox {
    store: Arc<dyn RelayStore>,
    path: String,
    events: mpsc::UnboundedSender<SignalingEvent>,
}

impl Mailbox {
    pub(crate) fn new(
        store: Arc<dyn RelayStore>,
        path: String,
        events: mpsc::UnboundedSender<SignalingEvent>,
    ) -> Self {
        Self {
            store,
            path,
            events,
        }
    }
}

#[async_trait]
impl SignalOutput for Mailbox {
    async fn send_signal(&self, signal: Signal) {
        let json = match signal.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {} signal: {}", signal.kind(), e);
                return;
            }
        };

        debug!("Sending {} to {}", signal.kind(), signal.peer);
        if let Err(e) = self.store.set(&self.path, json).await {
            warn!("Failed to write signal to {}: {}", self.path, e);
            let _ = self.events.send(SignalingEvent::Error(e.into()));
        }
    }
}
