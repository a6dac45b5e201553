//! Turns a [`RelayStore`] into room membership and signal streams.

mod mailbox;
mod room_watch;

pub use mailbox::Mailbox;

use crate::error::{HuddleError, Result};
use crate::store::{OpenedSession, RelayStore};
use async_trait::async_trait;
use huddle_core::relay::{
    WatchKind, host_path, is_valid_room, mailbox_path, member_path, room_path,
};
use huddle_core::{PeerId, Room, RoomId, Signal};
use room_watch::RoomWatch;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// What the adapter reports to the client runtime.
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    Open(PeerId),
    Close(PeerId),
    Error(HuddleError),
    Join(Room),
    RemoteJoin(PeerId),
    RemoteLeave(PeerId),
    Receive(Signal),
}

/// Outbound half of signaling, as seen by a peer link.
#[async_trait]
pub trait SignalOutput: Send + Sync {
    async fn send_signal(&self, signal: Signal);
}

pub struct SignalingAdapter {
    store: Arc<dyn RelayStore>,
    events: mpsc::UnboundedSender<SignalingEvent>,
    local_id: Option<PeerId>,
    mailbox: Option<Arc<Mailbox>>,
    room_watch: Option<JoinHandle<()>>,
}

impl SignalingAdapter {
    pub fn new(store: Arc<dyn RelayStore>, events: mpsc::UnboundedSender<SignalingEvent>) -> Self {
        Self {
            store,
            events,
            local_id: None,
            mailbox: None,
            room_watch: None,
        }
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.local_id.as_ref()
    }

    /// Where outgoing signals go once a room is joined.
    pub fn mailbox(&self) -> Option<Arc<Mailbox>> {
        self.mailbox.clone()
    }

    /// Opens the relay session. Failures are reported as an `Error` event and
    /// not retried.
    pub async fn open(&mut self) -> Option<PeerId> {
        let OpenedSession { peer_id, closed } = match self.store.open().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Relay session failed to open: {}", e);
                self.emit(SignalingEvent::Error(e.into()));
                return None;
            }
        };

        info!("Relay session open, local id {}", peer_id);
        self.local_id = Some(peer_id.clone());

        let events = self.events.clone();
        let id = peer_id.clone();
        tokio::spawn(async move {
            let _ = closed.await;
            info!("Relay session closed for {}", id);
            let _ = events.send(SignalingEvent::Close(id));
        });

        self.emit(SignalingEvent::Open(peer_id.clone()));
        Some(peer_id)
    }

    /// Joins `room_id`, electing ourselves host when the room is empty.
    /// A populated room without a host record is joined hostless.
    ///
    /// Existing members are subscribed to before our own presence is
    /// published, so no offer addressed to us can slip past. Their
    /// `RemoteJoin`s follow the `Join` event.
    pub async fn join(&mut self, room_id: RoomId) -> Result<Room> {
        let local_id = self
            .local_id
            .clone()
            .ok_or_else(|| HuddleError::Transport("relay session is not open".into()))?;
        if !is_valid_room(&room_id) {
            return Err(HuddleError::InvalidRoom(room_id));
        }
        if let Some(watch) = self.room_watch.take() {
            watch.abort();
        }

        let members = self.store.count(&room_path(&room_id)).await?;
        let host_id = if members == 0 {
            self.claim_host(&room_id, &local_id).await?;
            Some(local_id.clone())
        } else {
            match self.store.get(&host_path(&room_id)).await? {
                Some(host) if !host.is_empty() => Some(PeerId::from(host)),
                _ => {
                    warn!("Room {} has {} members but no host", room_id, members);
                    None
                }
            }
        };

        let mut watch = RoomWatch::new(
            self.store.clone(),
            self.events.clone(),
            room_id.clone(),
            local_id.clone(),
        );
        let mut membership = self
            .store
            .subscribe(&room_path(&room_id), WatchKind::Children)
            .await?;
        let existing = watch.prepare_existing(&mut membership).await;

        self.store
            .set(&mailbox_path(&room_id, &local_id), String::new())
            .await?;
        self.store
            .remove_on_disconnect(&member_path(&room_id, &local_id))
            .await?;

        self.mailbox = Some(Arc::new(Mailbox::new(
            self.store.clone(),
            mailbox_path(&room_id, &local_id),
            self.events.clone(),
        )));

        let room = Room { room_id, host_id };
        match &room.host_id {
            Some(host) => info!("Joined room {} (host {})", room.room_id, host),
            None => info!("Joined room {} without a host", room.room_id),
        }
        self.emit(SignalingEvent::Join(room.clone()));

        for (remote, signals) in existing {
            watch.admit(remote, signals);
        }
        self.room_watch = Some(tokio::spawn(watch.run(membership)));

        Ok(room)
    }

    async fn claim_host(&self, room_id: &RoomId, local_id: &PeerId) -> Result<()> {
        let path = host_path(room_id);
        self.store.set(&path, local_id.to_string()).await?;
        self.store.remove_on_disconnect(&path).await?;
        Ok(())
    }

    fn emit(&self, event: SignalingEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for SignalingAdapter {
    fn drop(&mut self) {
        if let Some(watch) = self.room_watch.take() {
            watch.abort();
        }
    }
}
