//! Key-value relay shared by every signaling store implementation: the
//! watchable tree, the path layout rooms use inside it, and the frames the
//! WebSocket relay speaks.

mod paths;
mod protocol;
mod tree;

pub use paths::{HOST_ROOT, host_path, is_valid_room, mailbox_path, member_path, room_path};
pub use protocol::{ClientFrame, RelayFrame, StoreReply, StoreRequest};
pub use tree::{Change, StoreTree, is_root, normalize};

use serde::{Deserialize, Serialize};

/// What a subscription at a path observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchKind {
    /// Direct children appearing and disappearing.
    Children,
    /// The value stored at exactly this path.
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    ChildAdded { key: String },
    ChildRemoved { key: String },
    Value { value: Option<String> },
}

impl StoreEvent {
    pub fn watch_kind(&self) -> WatchKind {
        match self {
            StoreEvent::ChildAdded { .. } | StoreEvent::ChildRemoved { .. } => WatchKind::Children,
            StoreEvent::Value { .. } => WatchKind::Value,
        }
    }
}
