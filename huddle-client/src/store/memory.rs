use crate::store::{OpenedSession, RelayStore, StoreError};
use async_trait::async_trait;
use huddle_core::PeerId;
use huddle_core::relay::{Change, StoreEvent, StoreTree, WatchKind, is_root, normalize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

struct Subscriber {
    path: String,
    kind: WatchKind,
    tx: mpsc::UnboundedSender<StoreEvent>,
}

struct SessionEntry {
    on_disconnect: Vec<String>,
    closed: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct HubState {
    tree: StoreTree,
    subscribers: Vec<Subscriber>,
    sessions: HashMap<PeerId, SessionEntry>,
}

impl HubState {
    fn publish(&mut self, changes: Vec<Change>) {
        for change in changes {
            let kind = change.event.watch_kind();
            self.subscribers.retain(|sub| {
                if sub.path != change.path || sub.kind != kind {
                    return !sub.tx.is_closed();
                }
                sub.tx.send(change.event.clone()).is_ok()
            });
        }
    }
}

/// In-process relay. Every [`MemorySession`] made from the same relay shares
/// one tree, so several clients in one process can find each other.
#[derive(Clone, Default)]
pub struct MemoryRelay {
    state: Arc<Mutex<HubState>>,
    auth_token: Option<String>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions must present `token` to open.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            auth_token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn session(&self) -> MemorySession {
        MemorySession::new(self.clone(), None, None)
    }

    pub fn session_with_token(&self, token: impl Into<String>) -> MemorySession {
        MemorySession::new(self.clone(), Some(token.into()), None)
    }

    /// Session that opens with a fixed id instead of a random one.
    pub fn session_as(&self, peer_id: impl Into<PeerId>) -> MemorySession {
        MemorySession::new(self.clone(), None, Some(peer_id.into()))
    }

    pub fn value(&self, path: &str) -> Option<String> {
        self.lock().tree.get(path)
    }

    pub fn children(&self, path: &str) -> Vec<String> {
        self.lock().tree.children(path)
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One peer's view of a [`MemoryRelay`]. Dropping it ends the session.
pub struct MemorySession {
    relay: MemoryRelay,
    token: Option<String>,
    requested_id: Option<PeerId>,
    peer_id: Mutex<Option<PeerId>>,
}

impl MemorySession {
    fn new(relay: MemoryRelay, token: Option<String>, requested_id: Option<PeerId>) -> Self {
        Self {
            relay,
            token,
            requested_id,
            peer_id: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<PeerId>> {
        self.peer_id.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current(&self) -> Result<PeerId, StoreError> {
        self.slot().clone().ok_or(StoreError::NotOpen)
    }

    /// Ends the session as if its connection dropped: registered paths are
    /// removed and watchers notified.
    pub fn disconnect(&self) {
        let Some(peer_id) = self.slot().take() else {
            return;
        };

        let mut hub = self.relay.lock();
        let Some(entry) = hub.sessions.remove(&peer_id) else {
            return;
        };
        for path in entry.on_disconnect {
            let changes = hub.tree.remove(&path);
            hub.publish(changes);
        }
        drop(hub);

        if let Some(closed) = entry.closed {
            let _ = closed.send(());
        }
        info!("Memory relay session {} closed", peer_id);
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[async_trait]
impl RelayStore for MemorySession {
    async fn open(&self) -> Result<OpenedSession, StoreError> {
        if let Some(expected) = &self.relay.auth_token {
            if self.token.as_ref() != Some(expected) {
                return Err(StoreError::Rejected("invalid auth token".into()));
            }
        }

        let mut slot = self.slot();
        if slot.is_some() {
            return Err(StoreError::Request("session already open".into()));
        }

        let peer_id = self.requested_id.clone().unwrap_or_else(PeerId::random);
        let (closed_tx, closed) = oneshot::channel();

        let mut hub = self.relay.lock();
        if hub.sessions.contains_key(&peer_id) {
            return Err(StoreError::Rejected(format!("peer id {} is taken", peer_id)));
        }
        hub.sessions.insert(
            peer_id.clone(),
            SessionEntry {
                on_disconnect: Vec::new(),
                closed: Some(closed_tx),
            },
        );
        *slot = Some(peer_id.clone());

        debug!("Memory relay session {} opened", peer_id);
        Ok(OpenedSession { peer_id, closed })
    }

    async fn get(&self, path: &str) -> Result<Option<String>, StoreError> {
        self.current()?;
        Ok(self.relay.lock().tree.get(path))
    }

    async fn count(&self, path: &str) -> Result<usize, StoreError> {
        self.current()?;
        Ok(self.relay.lock().tree.count(path))
    }

    async fn set(&self, path: &str, value: String) -> Result<(), StoreError> {
        self.current()?;
        writable(path)?;
        let mut hub = self.relay.lock();
        let changes = hub.tree.set(path, value);
        hub.publish(changes);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.current()?;
        writable(path)?;
        let mut hub = self.relay.lock();
        let changes = hub.tree.remove(path);
        hub.publish(changes);
        Ok(())
    }

    async fn remove_on_disconnect(&self, path: &str) -> Result<(), StoreError> {
        let peer_id = self.current()?;
        writable(path)?;
        let mut hub = self.relay.lock();
        let entry = hub.sessions.get_mut(&peer_id).ok_or(StoreError::Disconnected)?;
        entry.on_disconnect.push(normalize(path));
        Ok(())
    }

    async fn subscribe(
        &self,
        path: &str,
        kind: WatchKind,
    ) -> Result<mpsc::UnboundedReceiver<StoreEvent>, StoreError> {
        self.current()?;
        let path = normalize(path);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut hub = self.relay.lock();
        for event in hub.tree.snapshot(&path, kind) {
            let _ = tx.send(event);
        }
        hub.subscribers.push(Subscriber { path, kind, tx });
        Ok(rx)
    }
}

fn writable(path: &str) -> Result<(), StoreError> {
    if is_root(path) {
        return Err(StoreError::Request("the root is not writable".into()));
    }
    Ok(())
}
