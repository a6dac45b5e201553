use axum::extract::ws::Message;
use huddle_core::PeerId;
use huddle_core::relay::{Change, RelayFrame, StoreEvent, StoreTree, WatchKind};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::error;

pub(crate) type Outbox = mpsc::UnboundedSender<Message>;

struct Watcher {
    peer_id: PeerId,
    sub_id: u64,
    path: String,
    kind: WatchKind,
    outbox: Outbox,
}

/// The tree and everything that depends on it. Lives behind one mutex so a
/// write and its notifications are never interleaved with another write.
#[derive(Default)]
pub(crate) struct RelayState {
    pub(crate) tree: StoreTree,
    watchers: Vec<Watcher>,
    on_disconnect: HashMap<PeerId, Vec<String>>,
}

impl RelayState {
    pub(crate) fn watch(
        &mut self,
        peer_id: PeerId,
        sub_id: u64,
        path: String,
        kind: WatchKind,
        outbox: Outbox,
    ) {
        for event in self.tree.snapshot(&path, kind) {
            send_frame(&outbox, &RelayFrame::Event { sub_id, event });
        }
        self.watchers.push(Watcher {
            peer_id,
            sub_id,
            path,
            kind,
            outbox,
        });
    }

    pub(crate) fn remove_on_disconnect(&mut self, peer_id: &PeerId, path: String) {
        self.on_disconnect
            .entry(peer_id.clone())
            .or_default()
            .push(path);
    }

    pub(crate) fn publish(&mut self, changes: Vec<Change>) {
        for Change { path, event } in changes {
            self.notify(&path, event);
        }
    }

    fn notify(&mut self, path: &str, event: StoreEvent) {
        let kind = event.watch_kind();
        self.watchers.retain(|watcher| {
            if watcher.path != path || watcher.kind != kind {
                return !watcher.outbox.is_closed();
            }
            send_frame(
                &watcher.outbox,
                &RelayFrame::Event {
                    sub_id: watcher.sub_id,
                    event: event.clone(),
                },
            )
        });
    }

    /// Drops the session's watchers and removes every path it registered.
    pub(crate) fn disconnect(&mut self, peer_id: &PeerId) -> usize {
        self.watchers.retain(|watcher| &watcher.peer_id != peer_id);

        let paths = self.on_disconnect.remove(peer_id).unwrap_or_default();
        let removed = paths.len();
        for path in paths {
            let changes = self.tree.remove(&path);
            self.publish(changes);
        }
        removed
    }

    pub(crate) fn watcher_count(&self) -> usize {
        self.watchers.len()
    }
}

/// False once the receiving socket is gone.
pub(crate) fn send_frame(outbox: &Outbox, frame: &RelayFrame) -> bool {
    match serde_json::to_string(frame) {
        Ok(json) => outbox.send(Message::Text(json.into())).is_ok(),
        Err(e) => {
            error!("Failed to serialize relay frame: {}", e);
            true
        }
    }
}
