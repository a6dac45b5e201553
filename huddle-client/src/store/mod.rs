//! Key-value publish/subscribe stores the signaling adapter runs on.

mod memory;
mod ws;

pub use memory::{MemoryRelay, MemorySession};
pub use ws::WsRelayStore;

use async_trait::async_trait;
use huddle_core::PeerId;
use huddle_core::relay::{StoreEvent, WatchKind};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("relay rejected the session: {0}")]
    Rejected(String),
    #[error("relay session is not open")]
    NotOpen,
    #[error("relay session dropped")]
    Disconnected,
    #[error("relay request failed: {0}")]
    Request(String),
    #[error("relay protocol error: {0}")]
    Protocol(String),
}

/// A live relay session.
pub struct OpenedSession {
    /// Identity the relay assigned to this session.
    pub peer_id: PeerId,
    /// Resolves once the session is gone.
    pub closed: oneshot::Receiver<()>,
}

#[async_trait]
pub trait RelayStore: Send + Sync {
    async fn open(&self) -> Result<OpenedSession, StoreError>;

    async fn get(&self, path: &str) -> Result<Option<String>, StoreError>;

    /// Number of direct children under `path`.
    async fn count(&self, path: &str) -> Result<usize, StoreError>;

    async fn set(&self, path: &str, value: String) -> Result<(), StoreError>;

    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Remove `path` when this session ends.
    async fn remove_on_disconnect(&self, path: &str) -> Result<(), StoreError>;

    /// The current state is already queued on the receiver when this returns:
    /// one `ChildAdded` per existing child, or the current `Value`.
    async fn subscribe(
        &self,
        path: &str,
        kind: WatchKind,
    ) -> Result<mpsc::UnboundedReceiver<StoreEvent>, StoreError>;
}
