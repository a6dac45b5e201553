use crate::error::HuddleError;
use crate::native::MediaStreamHandle;
use huddle_core::PeerId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Close,
    Error,
    Join,
    RemoteJoin,
    RemoteLeave,
    Connect,
    Disconnect,
    Receive,
    RemoteStream,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Close => "close",
            EventKind::Error => "error",
            EventKind::Join => "join",
            EventKind::RemoteJoin => "remote_join",
            EventKind::RemoteLeave => "remote_leave",
            EventKind::Connect => "connect",
            EventKind::Disconnect => "disconnect",
            EventKind::Receive => "receive",
            EventKind::RemoteStream => "remote_stream",
        }
    }
}

/// Everything a client reports to the application.
#[derive(Debug, Clone)]
pub enum Event {
    /// Relay session opened; carries the local id.
    Open(PeerId),
    /// Relay session dropped; carries the local id.
    Close(PeerId),
    Error(HuddleError),
    /// Room joined; carries the host id, if the room has one.
    Join(Option<PeerId>),
    RemoteJoin(PeerId),
    RemoteLeave(PeerId),
    /// Direct link to this peer is open.
    Connect(PeerId),
    Disconnect(PeerId),
    Receive {
        from: PeerId,
        data: serde_json::Value,
    },
    RemoteStream {
        from: PeerId,
        stream: MediaStreamHandle,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Open(_) => EventKind::Open,
            Event::Close(_) => EventKind::Close,
            Event::Error(_) => EventKind::Error,
            Event::Join(_) => EventKind::Join,
            Event::RemoteJoin(_) => EventKind::RemoteJoin,
            Event::RemoteLeave(_) => EventKind::RemoteLeave,
            Event::Connect(_) => EventKind::Connect,
            Event::Disconnect(_) => EventKind::Disconnect,
            Event::Receive { .. } => EventKind::Receive,
            Event::RemoteStream { .. } => EventKind::RemoteStream,
        }
    }
}

pub type Listener = Box<dyn FnMut(&Event) + Send>;

/// Per-kind listener lists. Lists only grow; listeners run in registration order.
#[derive(Default)]
pub struct Listeners {
    table: HashMap<EventKind, Vec<Listener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.table.entry(kind).or_default().push(listener);
    }

    pub fn emit(&mut self, event: &Event) {
        let Some(listeners) = self.table.get_mut(&event.kind()) else {
            return;
        };
        for listener in listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.table.get(&kind).map_or(0, Vec::len)
    }
}
