use crate::Session;
use qzs_core::*;
use std::collections::BTreeMap;
use std::collections::HashSet;

/// Membership and occupancy for the static difficulty rooms.
///
/// This is the core's own view of who is where; the transport keeps a
/// parallel map for fan-out. Invariant: a session appears in at most one
/// room, and occupancy equals the registry's count of players whose record
/// points at that room.
#[derive(Debug)]
pub struct Rooms {
    members: BTreeMap<RoomId, HashSet<ID<Session>>>,
}

impl Default for Rooms {
    fn default() -> Self {
        Self {
            members: RoomId::all().map(|room| (room, HashSet::new())).collect(),
        }
    }
}

impl Rooms {
    pub fn join(&mut self, session: ID<Session>, room: RoomId) {
        self.members
            .get_mut(&room)
            .expect("static room")
            .insert(session);
    }
    pub fn leave(&mut self, session: ID<Session>, room: RoomId) {
        self.members
            .get_mut(&room)
            .expect("static room")
            .remove(&session);
    }
    pub fn occupancy(&self, room: RoomId) -> usize {
        self.members.get(&room).map(HashSet::len).unwrap_or(0)
    }
    pub fn members(&self, room: RoomId) -> impl Iterator<Item = ID<Session>> + '_ {
        self.members
            .get(&room)
            .into_iter()
            .flat_map(|sessions| sessions.iter().copied())
    }
}
