use qzs_core::*;
use std::collections::HashMap;

/// Marker for session identity. A session outlives any one socket: every
/// open tab of the same client holds the same `ID<Session>`.
pub struct Session;

/// The single authoritative record for one confirmed session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    /// Display name; synthesized `"Guest <n>"` when the client sent none.
    pub tag: String,
    /// The one room this session currently occupies.
    pub room: RoomId,
    /// Last score reported by the client this round.
    pub points: Points,
    /// True until the player has been present for a full round.
    pub incomplete_round: bool,
    /// Live transport endpoints bound to this session; record dies at zero.
    pub ref_count: u32,
}

/// Outcome of decrementing a session's endpoint refcount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Detach {
    /// Session was never attached; the decrement is a no-op.
    Absent,
    /// Other endpoints remain; carries the new refcount.
    Retained(u32),
    /// Last endpoint went away; the record has been removed.
    Removed(Player),
}

/// Session-id-keyed player records with multi-tab refcounting.
#[derive(Debug, Default)]
pub struct Registry {
    players: HashMap<ID<Session>, Player>,
    next_guest: u64,
}

impl Registry {
    /// Bind an endpoint to a session. A repeat session only gains a
    /// refcount; a new one gets a fresh record, with `incomplete_round` set
    /// when a round is already running. Returns the record and whether the
    /// session was already attached.
    pub fn attach(
        &mut self,
        session: ID<Session>,
        tag: Option<&str>,
        room: RoomId,
        round_in_progress: bool,
    ) -> (&Player, bool) {
        if self.players.contains_key(&session) {
            let player = self.players.get_mut(&session).expect("checked present");
            player.ref_count += 1;
            log::debug!("[registry] {} now {} endpoints", player.tag, player.ref_count);
            (&*player, true)
        } else {
            let tag = match tag.map(str::trim).filter(|t| !t.is_empty()) {
                Some(tag) => tag.to_string(),
                None => self.guest_tag(),
            };
            log::info!("[registry] {} attached to room {}", tag, room);
            let player = Player {
                tag,
                room,
                points: 0,
                incomplete_round: round_in_progress,
                ref_count: 1,
            };
            (&*self.players.entry(session).or_insert(player), false)
        }
    }
    /// Drop one endpoint; the record is removed when the count hits zero.
    pub fn detach(&mut self, session: ID<Session>) -> Detach {
        match self.players.get_mut(&session) {
            None => Detach::Absent,
            Some(player) if player.ref_count > 1 => {
                player.ref_count -= 1;
                Detach::Retained(player.ref_count)
            }
            Some(_) => {
                let player = self.players.remove(&session).expect("checked present");
                log::info!("[registry] {} detached", player.tag);
                Detach::Removed(player)
            }
        }
    }
    pub fn get(&self, session: ID<Session>) -> Option<&Player> {
        self.players.get(&session)
    }
    pub fn get_mut(&mut self, session: ID<Session>) -> Option<&mut Player> {
        self.players.get_mut(&session)
    }
    pub fn contains(&self, session: ID<Session>) -> bool {
        self.players.contains_key(&session)
    }
    pub fn set_room(&mut self, session: ID<Session>, room: RoomId) {
        if let Some(player) = self.players.get_mut(&session) {
            player.room = room;
        }
    }
    /// Zero every score and clear every incomplete flag; runs at Play start.
    pub fn reset_round(&mut self) {
        for player in self.players.values_mut() {
            player.points = 0;
            player.incomplete_round = false;
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = (&ID<Session>, &Player)> {
        self.players.iter()
    }
    pub fn len(&self) -> usize {
        self.players.len()
    }
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
    fn guest_tag(&mut self) -> String {
        self.next_guest += 1;
        format!("Guest {}", self.next_guest)
    }
}
