use crate::error::Result;
use crate::event::{EventKind, Listener};
use huddle_core::{PeerId, Room, RoomId};
use tokio::sync::oneshot;

/// Requests from [`Client`](crate::Client) handles to the runtime.
pub(crate) enum ClientCommand {
    Join {
        room: RoomId,
        reply: oneshot::Sender<Result<Room>>,
    },
    /// Reserved; links are brokered by the host.
    Connect {
        remote: PeerId,
    },
    Send {
        remote: PeerId,
        data: serde_json::Value,
    },
    Broadcast {
        data: serde_json::Value,
    },
    HasConnection {
        remote: PeerId,
        reply: oneshot::Sender<bool>,
    },
    ConnectionCount {
        reply: oneshot::Sender<usize>,
    },
    LocalId {
        reply: oneshot::Sender<Option<PeerId>>,
    },
    On {
        kind: EventKind,
        listener: Listener,
    },
}
