use crate::relay::{StoreEvent, WatchKind};
use std::collections::{BTreeMap, BTreeSet};

/// A notification for watchers of `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: String,
    pub event: StoreEvent,
}

/// Hierarchical string store. Only leaves hold values; inner nodes exist as
/// long as at least one leaf lives below them.
#[derive(Debug, Default)]
pub struct StoreTree {
    leaves: BTreeMap<String, String>,
}

/// Drops empty segments so `"a//b/"` and `"a/b"` address the same node.
pub fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// True for every spelling of the tree root, which is never written or removed.
pub fn is_root(path: &str) -> bool {
    normalize(path).is_empty()
}

impl StoreTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.leaves.get(&normalize(path)).cloned()
    }

    /// Keys of the direct children of `path`, sorted.
    pub fn children(&self, path: &str) -> Vec<String> {
        let prefix = child_prefix(&normalize(path));
        let mut keys = BTreeSet::new();
        for key in self.keys_under(&prefix) {
            if let Some(child) = key[prefix.len()..].split('/').next() {
                keys.insert(child.to_owned());
            }
        }
        keys.into_iter().collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.children(path).len()
    }

    /// Events a new watcher receives before any live change.
    pub fn snapshot(&self, path: &str, kind: WatchKind) -> Vec<StoreEvent> {
        match kind {
            WatchKind::Children => self
                .children(path)
                .into_iter()
                .map(|key| StoreEvent::ChildAdded { key })
                .collect(),
            WatchKind::Value => vec![StoreEvent::Value {
                value: self.get(path),
            }],
        }
    }

    /// Writes a leaf, replacing anything stored below or above it.
    pub fn set(&mut self, path: &str, value: String) -> Vec<Change> {
        let path = normalize(path);
        if path.is_empty() {
            return Vec::new();
        }

        let mut replaced = self.keys_under(&child_prefix(&path));
        replaced.extend(
            node_paths(&path)
                .into_iter()
                .filter(|node| node != &path && self.leaves.contains_key(node)),
        );

        let mut affected = replaced.clone();
        affected.push(path.clone());
        let before = self.presence(&affected);

        for leaf in &replaced {
            self.leaves.remove(leaf);
        }
        self.leaves.insert(path.clone(), value.clone());

        let mut changes = self.membership_changes(before);
        changes.extend(replaced.into_iter().map(cleared));
        changes.push(Change {
            path,
            event: StoreEvent::Value { value: Some(value) },
        });
        changes
    }

    /// Removes `path` and everything below it. The root is left alone.
    pub fn remove(&mut self, path: &str) -> Vec<Change> {
        let path = normalize(path);
        if path.is_empty() {
            return Vec::new();
        }
        let mut removed = self.keys_under(&child_prefix(&path));
        if self.leaves.contains_key(&path) {
            removed.push(path);
        }
        if removed.is_empty() {
            return Vec::new();
        }

        let before = self.presence(&removed);
        for leaf in &removed {
            self.leaves.remove(leaf);
        }

        let mut changes = self.membership_changes(before);
        changes.extend(removed.into_iter().map(cleared));
        changes
    }

    fn keys_under(&self, prefix: &str) -> Vec<String> {
        self.leaves
            .range(prefix.to_owned()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn has_node(&self, node: &str) -> bool {
        self.leaves.contains_key(node) || !self.keys_under(&child_prefix(node)).is_empty()
    }

    fn presence(&self, leaves: &[String]) -> BTreeMap<String, bool> {
        let mut presence = BTreeMap::new();
        for leaf in leaves {
            for node in node_paths(leaf) {
                presence
                    .entry(node)
                    .or_insert_with_key(|node| self.has_node(node));
            }
        }
        presence
    }

    fn membership_changes(&self, before: BTreeMap<String, bool>) -> Vec<Change> {
        let mut changes = Vec::new();
        for (node, was_present) in before {
            let present = self.has_node(&node);
            if present == was_present {
                continue;
            }
            let (parent, key) = split_parent(&node);
            let event = if present {
                StoreEvent::ChildAdded { key }
            } else {
                StoreEvent::ChildRemoved { key }
            };
            changes.push(Change {
                path: parent,
                event,
            });
        }
        changes
    }
}

fn child_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{}/", path)
    }
}

/// `"a/b/c"` -> `["a", "a/b", "a/b/c"]`
fn node_paths(leaf: &str) -> Vec<String> {
    let segments: Vec<&str> = leaf.split('/').collect();
    (1..=segments.len())
        .map(|depth| segments[..depth].join("/"))
        .collect()
}

fn split_parent(node: &str) -> (String, String) {
    match node.rsplit_once('/') {
        Some((parent, key)) => (parent.to_owned(), key.to_owned()),
        None => (String::new(), node.to_owned()),
    }
}

fn cleared(path: String) -> Change {
    Change {
        path,
        event: StoreEvent::Value { value: None },
    }
}
