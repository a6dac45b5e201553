use crate::model::PeerId;
use crate::relay::{StoreEvent, WatchKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum StoreRequest {
    Get {
        path: String,
    },
    Count {
        path: String,
    },
    Set {
        path: String,
        value: String,
    },
    Remove {
        path: String,
    },
    RemoveOnDisconnect {
        path: String,
    },
    /// The relay pushes the current state as `Event`s before it answers.
    Subscribe {
        sub_id: u64,
        path: String,
        kind: WatchKind,
    },
}

impl StoreRequest {
    /// The path a mutating request changes, now or on disconnect.
    pub fn written_path(&self) -> Option<&str> {
        match self {
            StoreRequest::Set { path, .. }
            | StoreRequest::Remove { path }
            | StoreRequest::RemoveOnDisconnect { path } => Some(path),
            StoreRequest::Get { .. } | StoreRequest::Count { .. } | StoreRequest::Subscribe { .. } => {
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum StoreReply {
    Ok,
    Value { value: Option<String> },
    Count { count: usize },
    Error { message: String },
}

/// Frames a peer sends to the relay.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ClientFrame {
    Hello { token: Option<String> },
    Request { req_id: u64, request: StoreRequest },
}

/// Frames the relay sends to a peer.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum RelayFrame {
    Welcome { peer_id: PeerId },
    Rejected { reason: String },
    Response { req_id: u64, reply: StoreReply },
    Event { sub_id: u64, event: StoreEvent },
}
