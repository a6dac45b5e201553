use crate::signaling::SignalingEvent;
use crate::store::RelayStore;
use huddle_core::relay::{StoreEvent, WatchKind, mailbox_path};
use huddle_core::{PeerId, RoomId, Signal};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Follows one room's membership. Each remote member gets one mailbox
/// forwarder, keyed by id, until its entry disappears.
pub(super) struct RoomWatch {
    store: Arc<dyn RelayStore>,
    events: mpsc::UnboundedSender<SignalingEvent>,
    room_id: RoomId,
    local_id: PeerId,
    seen: HashMap<PeerId, JoinHandle<()>>,
}

impl RoomWatch {
    pub(super) fn new(
        store: Arc<dyn RelayStore>,
        events: mpsc::UnboundedSender<SignalingEvent>,
        room_id: RoomId,
        local_id: PeerId,
    ) -> Self {
        Self {
            store,
            events,
            room_id,
            local_id,
            seen: HashMap::new(),
        }
    }

    /// Subscribes to the mailbox of every member already queued on
    /// `membership`. The caller admits them once it is ready for events.
    pub(super) async fn prepare_existing(
        &mut self,
        membership: &mut mpsc::UnboundedReceiver<StoreEvent>,
    ) -> Vec<(PeerId, mpsc::UnboundedReceiver<StoreEvent>)> {
        let mut existing: Vec<(PeerId, mpsc::UnboundedReceiver<StoreEvent>)> = Vec::new();

        while let Ok(event) = membership.try_recv() {
            let StoreEvent::ChildAdded { key } = event else {
                continue;
            };
            let remote = PeerId::from(key);
            if remote == self.local_id || existing.iter().any(|(id, _)| id == &remote) {
                continue;
            }
            if let Some(signals) = self.watch_mailbox(&remote).await {
                existing.push((remote, signals));
            }
        }

        existing
    }

    pub(super) fn admit(&mut self, remote: PeerId, signals: mpsc::UnboundedReceiver<StoreEvent>) {
        info!("Peer {} is in room {}", remote, self.room_id);
        let _ = self.events.send(SignalingEvent::RemoteJoin(remote.clone()));

        let forwarder = tokio::spawn(forward_signals(
            remote.clone(),
            signals,
            self.events.clone(),
        ));
        self.seen.insert(remote, forwarder);
    }

    pub(super) async fn run(mut self, mut membership: mpsc::UnboundedReceiver<StoreEvent>) {
        while let Some(event) = membership.recv().await {
            match event {
                StoreEvent::ChildAdded { key } => self.on_child_added(PeerId::from(key)).await,
                StoreEvent::ChildRemoved { key } => self.on_child_removed(PeerId::from(key)),
                StoreEvent::Value { .. } => {}
            }
        }
        debug!("Membership watch for room {} ended", self.room_id);
    }

    async fn on_child_added(&mut self, remote: PeerId) {
        if remote == self.local_id || self.seen.contains_key(&remote) {
            return;
        }
        if let Some(signals) = self.watch_mailbox(&remote).await {
            self.admit(remote, signals);
        }
    }

    fn on_child_removed(&mut self, remote: PeerId) {
        let Some(forwarder) = self.seen.remove(&remote) else {
            return;
        };
        forwarder.abort();

        info!("Peer {} left room {}", remote, self.room_id);
        let _ = self.events.send(SignalingEvent::RemoteLeave(remote));
    }

    async fn watch_mailbox(&self, remote: &PeerId) -> Option<mpsc::UnboundedReceiver<StoreEvent>> {
        let path = mailbox_path(&self.room_id, remote);
        match self.store.subscribe(&path, WatchKind::Value).await {
            Ok(signals) => Some(signals),
            Err(e) => {
                warn!("Failed to watch mailbox of {}: {}", remote, e);
                let _ = self.events.send(SignalingEvent::Error(e.into()));
                None
            }
        }
    }
}

impl Drop for RoomWatch {
    fn drop(&mut self) {
        for (_, forwarder) in self.seen.drain() {
            forwarder.abort();
        }
    }
}

async fn forward_signals(
    remote: PeerId,
    mut signals: mpsc::UnboundedReceiver<StoreEvent>,
    events: mpsc::UnboundedSender<SignalingEvent>,
) {
    while let Some(event) = signals.recv().await {
        let StoreEvent::Value { value: Some(raw) } = event else {
            continue;
        };
        if raw.is_empty() {
            continue;
        }
        match Signal::from_json(&raw) {
            Ok(signal) => {
                if events.send(SignalingEvent::Receive(signal)).is_err() {
                    break;
                }
            }
            Err(e) => debug!("Dropping malformed signal from {}: {}", remote, e),
        }
    }
}
