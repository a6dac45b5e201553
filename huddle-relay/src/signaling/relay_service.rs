use crate::RelayConfig;
use crate::signaling::relay_state::{Outbox, RelayState};
use dashmap::DashMap;
use huddle_core::PeerId;
use huddle_core::relay::{StoreReply, StoreRequest, is_root, normalize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

struct RelayInner {
    sessions: DashMap<PeerId, Outbox>,
    state: Mutex<RelayState>,
    auth_token: Option<String>,
}

/// Shared relay state handed to every WebSocket handler.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                sessions: DashMap::new(),
                state: Mutex::new(RelayState::default()),
                auth_token: config.auth_token.clone(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RelayState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Admits a hello, handing out a fresh peer id.
    pub fn authorize(&self, token: Option<&str>) -> Result<PeerId, String> {
        if let Some(expected) = &self.inner.auth_token {
            if token != Some(expected.as_str()) {
                return Err("invalid auth token".into());
            }
        }

        let mut peer_id = PeerId::random();
        while self.inner.sessions.contains_key(&peer_id) {
            peer_id = PeerId::random();
        }
        Ok(peer_id)
    }

    pub(crate) fn add_session(&self, peer_id: PeerId, outbox: Outbox) {
        self.inner.sessions.insert(peer_id, outbox);
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn value(&self, path: &str) -> Option<String> {
        self.state().tree.get(path)
    }

    pub fn children(&self, path: &str) -> Vec<String> {
        self.state().tree.children(path)
    }

    pub(crate) fn handle_request(
        &self,
        peer_id: &PeerId,
        outbox: &Outbox,
        request: StoreRequest,
    ) -> StoreReply {
        if request.written_path().is_some_and(is_root) {
            return StoreReply::Error {
                message: "the root is not writable".into(),
            };
        }
        let mut state = self.state();

        match request {
            StoreRequest::Get { path } => StoreReply::Value {
                value: state.tree.get(&path),
            },
            StoreRequest::Count { path } => StoreReply::Count {
                count: state.tree.count(&path),
            },
            StoreRequest::Set { path, value } => {
                let changes = state.tree.set(&path, value);
                state.publish(changes);
                StoreReply::Ok
            }
            StoreRequest::Remove { path } => {
                let changes = state.tree.remove(&path);
                state.publish(changes);
                StoreReply::Ok
            }
            StoreRequest::RemoveOnDisconnect { path } => {
                state.remove_on_disconnect(peer_id, normalize(&path));
                StoreReply::Ok
            }
            StoreRequest::Subscribe { sub_id, path, kind } => {
                debug!("{} watches {:?} at '{}'", peer_id, kind, path);
                state.watch(peer_id.clone(), sub_id, normalize(&path), kind, outbox.clone());
                StoreReply::Ok
            }
        }
    }

    /// Ends a session: its watchers go away and its registered paths are
    /// removed, notifying everyone else.
    pub(crate) fn disconnect(&self, peer_id: &PeerId) {
        self.inner.sessions.remove(peer_id);
        let removed = self.state().disconnect(peer_id);
        info!(
            "Relay session {} ended, removed {} registered paths",
            peer_id, removed
        );
    }

    #[cfg(test)]
    fn watcher_count(&self) -> usize {
        self.state().watcher_count()
    }
}
