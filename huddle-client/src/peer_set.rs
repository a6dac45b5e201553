use huddle_core::PeerId;
use std::collections::HashMap;

/// Remote id to value, in insertion order. Never holds the local id.
#[derive(Debug)]
pub struct PeerSet<T> {
    local_id: Option<PeerId>,
    order: Vec<PeerId>,
    table: HashMap<PeerId, T>,
}

impl<T> Default for PeerSet<T> {
    fn default() -> Self {
        Self {
            local_id: None,
            order: Vec::new(),
            table: HashMap::new(),
        }
    }
}

impl<T> PeerSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local_id(local_id: PeerId) -> Self {
        Self {
            local_id: Some(local_id),
            ..Self::default()
        }
    }

    /// Binds the local id. The first id sticks.
    pub fn set_local_id(&mut self, local_id: PeerId) {
        if self.local_id.is_none() {
            self.local_id = Some(local_id);
        }
    }

    fn is_local(&self, id: &PeerId) -> bool {
        self.local_id.as_ref() == Some(id)
    }

    /// Hands `value` back when `id` is the local id or already present.
    pub fn add(&mut self, id: PeerId, value: T) -> Result<(), T> {
        if self.is_local(&id) || self.table.contains_key(&id) {
            return Err(value);
        }
        self.order.push(id.clone());
        self.table.insert(id, value);
        Ok(())
    }

    pub fn remove(&mut self, id: &PeerId) -> Option<T> {
        if self.is_local(id) {
            return None;
        }
        let value = self.table.remove(id)?;
        self.order.retain(|entry| entry != id);
        Some(value)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.table.contains_key(id)
    }

    pub fn get(&self, id: &PeerId) -> Option<&T> {
        self.table.get(id)
    }

    pub fn get_mut(&mut self, id: &PeerId) -> Option<&mut T> {
        self.table.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Snapshot of the ids, in insertion order.
    pub fn ids(&self) -> Vec<PeerId> {
        self.order.clone()
    }

    pub fn drain(&mut self) -> Vec<(PeerId, T)> {
        let mut drained = Vec::with_capacity(self.order.len());
        for id in std::mem::take(&mut self.order) {
            if let Some(value) = self.table.remove(&id) {
                drained.push((id, value));
            }
        }
        drained
    }
}
