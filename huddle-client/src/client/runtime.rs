use crate::client::command::ClientCommand;
use crate::coordinator::RoomCoordinator;
use crate::error::HuddleError;
use crate::event::{Event, Listeners};
use crate::link::{LinkEvent, LinkState, PeerLink, Role};
use crate::native::{NativeBackend, NativeEventSink, TaggedNativeEvent};
use crate::peer_set::PeerSet;
use crate::signaling::{SignalOutput, SignalingAdapter, SignalingEvent};
use crate::store::RelayStore;
use huddle_core::{PeerId, Signal};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Owns every piece of mutable client state. Each message is handled to
/// completion before the next, so a link never sees two signals at once.
pub(crate) struct ClientRuntime {
    adapter: SignalingAdapter,
    backend: Arc<dyn NativeBackend>,
    coordinator: RoomCoordinator,
    local_id: Option<PeerId>,

    /// Links still negotiating, keyed by remote id.
    pending: HashMap<PeerId, PeerLink>,

    /// Open links.
    peers: PeerSet<PeerLink>,

    listeners: Listeners,
    next_generation: u64,

    commands: mpsc::Receiver<ClientCommand>,
    signaling_rx: mpsc::UnboundedReceiver<SignalingEvent>,

    /// Cloned into every native connection's event sink.
    native_tx: mpsc::UnboundedSender<TaggedNativeEvent>,
    native_rx: mpsc::UnboundedReceiver<TaggedNativeEvent>,
}

impl ClientRuntime {
    pub(crate) fn new(
        store: Arc<dyn RelayStore>,
        backend: Arc<dyn NativeBackend>,
        listeners: Listeners,
        commands: mpsc::Receiver<ClientCommand>,
    ) -> Self {
        let (signaling_tx, signaling_rx) = mpsc::unbounded_channel();
        let (native_tx, native_rx) = mpsc::unbounded_channel();

        Self {
            adapter: SignalingAdapter::new(store, signaling_tx),
            backend,
            coordinator: RoomCoordinator::new(),
            local_id: None,
            pending: HashMap::new(),
            peers: PeerSet::new(),
            listeners,
            next_generation: 0,
            commands,
            signaling_rx,
            native_tx,
            native_rx,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Client runtime started");

        if let Some(local_id) = self.adapter.open().await {
            self.peers.set_local_id(local_id.clone());
            self.local_id = Some(local_id);
        }

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All client handles dropped. Shutting down.");
                            break;
                        }
                    }
                }

                Some(evt) = self.signaling_rx.recv() => self.handle_signaling(evt).await,

                Some(evt) = self.native_rx.recv() => self.handle_native(evt).await,
            }
        }

        self.shutdown().await;
        info!("Client runtime finished");
    }

    async fn handle_command(&mut self, cmd: ClientCommand) {
        match cmd {
            ClientCommand::Join { room, reply } => {
                let result = self.adapter.join(room).await;
                if let Err(e) = &result {
                    warn!("Join failed: {}", e);
                }
                let _ = reply.send(result);
            }

            ClientCommand::Connect { remote } => {
                debug!("connect({}) ignored, links are brokered by the host", remote);
            }

            ClientCommand::Send { remote, data } => self.send_to(&remote, &data).await,

            ClientCommand::Broadcast { data } => {
                for remote in self.peers.ids() {
                    self.send_to(&remote, &data).await;
                }
            }

            ClientCommand::HasConnection { remote, reply } => {
                let _ = reply.send(self.peers.contains(&remote));
            }

            ClientCommand::ConnectionCount { reply } => {
                let _ = reply.send(self.peers.len());
            }

            ClientCommand::LocalId { reply } => {
                let _ = reply.send(self.local_id.clone());
            }

            ClientCommand::On { kind, listener } => self.listeners.on(kind, listener),
        }
    }

    async fn handle_signaling(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Open(id) => self.emit(Event::Open(id)),
            SignalingEvent::Close(id) => self.emit(Event::Close(id)),
            SignalingEvent::Error(e) => self.emit(Event::Error(e)),
            SignalingEvent::Join(room) => {
                let host_id = room.host_id.clone();
                self.coordinator.on_join(room);
                self.emit(Event::Join(host_id));
            }
            SignalingEvent::RemoteJoin(remote) => self.on_remote_join(remote).await,
            SignalingEvent::RemoteLeave(remote) => {
                // A link that never opened has nobody left to open with.
                if let Some(link) = self.pending.remove(&remote) {
                    link.close().await;
                }
                self.emit(Event::RemoteLeave(remote));
            }
            SignalingEvent::Receive(signal) => self.route_signal(signal).await,
        }
    }

    async fn on_remote_join(&mut self, remote: PeerId) {
        let Some(local_id) = self.local_id.clone() else {
            return;
        };
        if remote == local_id || self.peers.contains(&remote) {
            debug!("Ignoring remote join of {}", remote);
            return;
        }
        self.emit(Event::RemoteJoin(remote.clone()));

        let Some(role) = self.coordinator.link_role(&local_id, &remote) else {
            debug!("No link to {}: neither side hosts", remote);
            return;
        };
        let Some(mailbox) = self.adapter.mailbox() else {
            return;
        };

        if let Some(stale) = self.pending.remove(&remote) {
            debug!("Replacing pending link to {}", remote);
            stale.close().await;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let sink = NativeEventSink::new(remote.clone(), generation, self.native_tx.clone());
        let connection = match self.backend.connect(sink).await {
            Ok(connection) => connection,
            Err(e) => {
                error!("Failed to create connection to {}: {:#}", remote, e);
                self.emit(Event::Error(HuddleError::negotiation(
                    &remote,
                    format!("{:#}", e),
                )));
                return;
            }
        };

        let signaling: Arc<dyn SignalOutput> = mailbox;
        let mut link = PeerLink::new(
            local_id,
            remote.clone(),
            role,
            connection,
            signaling,
            generation,
        );
        let events = match role {
            Role::Offerer => link.offer().await,
            Role::Answerer => {
                link.await_offer();
                Vec::new()
            }
        };
        self.pending.insert(remote.clone(), link);
        self.apply_link_events(&remote, events).await;
    }

    async fn route_signal(&mut self, signal: Signal) {
        if self.local_id.as_ref() != Some(&signal.peer) {
            return;
        }
        let remote = signal.id.clone();
        let Some(link) = self.link_mut(&remote) else {
            debug!("No link for {} from {}", signal.kind(), remote);
            return;
        };
        let events = link.handle_signal(signal).await;
        self.apply_link_events(&remote, events).await;
    }

    async fn handle_native(&mut self, tagged: TaggedNativeEvent) {
        let TaggedNativeEvent {
            remote,
            generation,
            event,
        } = tagged;
        let Some(link) = self.link_mut(&remote) else {
            return;
        };
        if link.generation() != generation {
            debug!("Dropping stale native event for {}", remote);
            return;
        }
        let events = link.handle_native(event).await;
        self.apply_link_events(&remote, events).await;
    }

    async fn apply_link_events(&mut self, remote: &PeerId, events: Vec<LinkEvent>) {
        for event in events {
            match event {
                LinkEvent::Open(id) => self.on_link_open(id).await,
                LinkEvent::Close(id) => {
                    if let Some(link) = self.peers.remove(&id) {
                        link.close().await;
                    }
                    self.emit(Event::Disconnect(id));
                }
                LinkEvent::Error(e) => self.emit(Event::Error(e)),
                LinkEvent::Data(data) => self.emit(Event::Receive {
                    from: remote.clone(),
                    data,
                }),
                LinkEvent::Stream(stream) => self.emit(Event::RemoteStream {
                    from: remote.clone(),
                    stream,
                }),
            }
        }

        let errored = self
            .pending
            .get(remote)
            .is_some_and(|link| link.state() == LinkState::Errored);
        if !errored {
            return;
        }
        if let Some(link) = self.pending.remove(remote) {
            info!("Dropping failed link to {}", remote);
            link.close().await;
        }
    }

    async fn on_link_open(&mut self, remote: PeerId) {
        let Some(link) = self.pending.remove(&remote) else {
            return;
        };
        if let Err(link) = self.peers.add(remote.clone(), link) {
            warn!("Link to {} opened twice, closing the newer one", remote);
            link.close().await;
            return;
        }
        self.emit(Event::Connect(remote));
    }

    async fn send_to(&mut self, remote: &PeerId, data: &serde_json::Value) {
        if let Some(link) = self.peers.get(remote) {
            link.send(data).await;
        }
    }

    fn link_mut(&mut self, remote: &PeerId) -> Option<&mut PeerLink> {
        match self.pending.get_mut(remote) {
            Some(link) => Some(link),
            None => self.peers.get_mut(remote),
        }
    }

    fn emit(&mut self, event: Event) {
        self.listeners.emit(&event);
    }

    async fn shutdown(&mut self) {
        for (_, link) in self.pending.drain() {
            link.close().await;
        }
        for (_, link) in self.peers.drain() {
            link.close().await;
        }
    }
}
