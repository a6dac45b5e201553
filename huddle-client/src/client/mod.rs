//! Application-facing handle. All state lives in one runtime task; a
//! [`Client`] only sends it commands.

mod command;
mod runtime;

use crate::config::ClientConfig;
use crate::error::{HuddleError, Result};
use crate::event::{Event, EventKind, Listener, Listeners};
use crate::native::{NativeBackend, WebRtcBackend};
use crate::store::RelayStore;
use command::ClientCommand;
use huddle_core::{PeerId, Room, RoomId};
use runtime::ClientRuntime;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

pub struct ClientBuilder {
    store: Arc<dyn RelayStore>,
    backend: Arc<dyn NativeBackend>,
    listeners: Listeners,
}

impl ClientBuilder {
    pub fn new(store: Arc<dyn RelayStore>, backend: Arc<dyn NativeBackend>) -> Self {
        Self {
            store,
            backend,
            listeners: Listeners::new(),
        }
    }

    /// Registers a listener before the relay session opens, so it sees `Open`.
    pub fn on<F>(mut self, kind: EventKind, listener: F) -> Self
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.listeners.on(kind, Box::new(listener));
        self
    }

    /// Starts the client runtime on the current tokio runtime. The relay
    /// session opens in the background; watch for `Open` or `Error`.
    pub fn spawn(self) -> Result<Client> {
        let handle = Handle::try_current().map_err(|_| {
            HuddleError::CapabilityMissing("no tokio runtime to run the client on".into())
        })?;

        let (command_tx, command_rx) = mpsc::channel(64);
        let runtime = ClientRuntime::new(self.store, self.backend, self.listeners, command_rx);
        handle.spawn(runtime.run());

        Ok(Client { commands: command_tx })
    }
}

/// Handle to a running client. Cheap to clone; the runtime stops and closes
/// every link once the last handle is dropped.
#[derive(Clone)]
pub struct Client {
    commands: mpsc::Sender<ClientCommand>,
}

impl Client {
    pub fn builder(store: Arc<dyn RelayStore>, backend: Arc<dyn NativeBackend>) -> ClientBuilder {
        ClientBuilder::new(store, backend)
    }

    /// Client on the `webrtc` backend with no listeners registered up front.
    pub fn new(config: &ClientConfig, store: Arc<dyn RelayStore>) -> Result<Self> {
        let backend = WebRtcBackend::new(config)?;
        ClientBuilder::new(store, Arc::new(backend)).spawn()
    }

    /// Joins a room; resolves with the room and its host once our presence
    /// is published.
    pub async fn join(&self, room: impl Into<RoomId>) -> Result<Room> {
        let (reply, rx) = oneshot::channel();
        self.command(ClientCommand::Join {
            room: room.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| HuddleError::Closed)?
    }

    /// Reserved. Links are only brokered through the room host.
    pub async fn connect(&self, remote: &PeerId) -> Result<()> {
        self.command(ClientCommand::Connect {
            remote: remote.clone(),
        })
        .await
    }

    /// No-op when no open link to `remote` exists.
    pub async fn send(&self, remote: &PeerId, data: serde_json::Value) -> Result<()> {
        self.command(ClientCommand::Send {
            remote: remote.clone(),
            data,
        })
        .await
    }

    pub async fn broadcast(&self, data: serde_json::Value) -> Result<()> {
        self.command(ClientCommand::Broadcast { data }).await
    }

    pub async fn has_connection(&self, remote: &PeerId) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.command(ClientCommand::HasConnection {
            remote: remote.clone(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| HuddleError::Closed)
    }

    pub async fn connection_count(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.command(ClientCommand::ConnectionCount { reply }).await?;
        rx.await.map_err(|_| HuddleError::Closed)
    }

    /// `None` until the relay session has opened.
    pub async fn local_id(&self) -> Result<Option<PeerId>> {
        let (reply, rx) = oneshot::channel();
        self.command(ClientCommand::LocalId { reply }).await?;
        rx.await.map_err(|_| HuddleError::Closed)
    }

    pub async fn on<F>(&self, kind: EventKind, listener: F) -> Result<()>
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let listener: Listener = Box::new(listener);
        self.command(ClientCommand::On { kind, listener }).await
    }

    async fn command(&self, command: ClientCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HuddleError::Closed)
    }
}
