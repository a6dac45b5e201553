use crate::link::Role;
use huddle_core::{PeerId, Room};

/// Star topology rooted at the host: only host-involving pairs get a link,
/// and the host always offers.
///
/// Host election is first-come: a joiner that counts zero members claims
/// the room. Two peers joining within one relay round trip can both claim
/// it; nothing breaks the tie.
#[derive(Debug, Default)]
pub struct RoomCoordinator {
    room: Option<Room>,
}

impl RoomCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_join(&mut self, room: Room) {
        self.room = Some(room);
    }

    pub fn host_id(&self) -> Option<&PeerId> {
        self.room.as_ref()?.host_id.as_ref()
    }

    /// Our side of a link to `remote`, or `None` when no link belongs there.
    pub fn link_role(&self, local: &PeerId, remote: &PeerId) -> Option<Role> {
        let room = self.room.as_ref()?;
        if local == remote {
            return None;
        }
        if room.is_host(local) {
            Some(Role::Offerer)
        } else if room.is_host(remote) {
            Some(Role::Answerer)
        } else {
            None
        }
    }
}
