use crate::*;
use qzs_core::*;
use serde_json::Value;

const UNRECOGNIZED: &str = "No player is attached to this session";
const MISSING_POINTS: &str = "Score update is missing a points value";

/// Inbound message handling. Every input is validated before any state
/// change, and every error goes back to the originating session only.
impl ServerCore {
    /// `client_ready`: validate, attach (or refcount an additional tab),
    /// join the room, then bring the newcomer up to date on the round.
    pub(crate) fn on_ready(&mut self, session: ID<Session>, request: Option<Value>) {
        let room = match protocol::determine_room(request.as_ref()) {
            Ok(room) => room,
            Err(e) => {
                log::info!("[router] rejected client_ready from {}: {}", session, e);
                let error = ServerMessage::error_client_ready(e.as_str(), request);
                self.bus.unicast(session, &error);
                return;
            }
        };
        let tag = request
            .as_ref()
            .and_then(protocol::requested_tag)
            .map(str::to_string);
        let in_progress = self.round.round_in_progress;
        let (player, already) = self
            .registry
            .attach(session, tag.as_deref(), room, in_progress);
        if already {
            // Additional tab of an attached session; nothing else changes.
            return;
        }
        let confirmed = ServerMessage::confirmed(player);
        let tag = player.tag.clone();
        let points = player.points;
        self.bus.unicast(session, &confirmed);
        self.join_room(session, room, &tag, points);
        self.round_sync(session, room);
    }

    /// `change_room`: validated move between rooms. The round sync at the
    /// end deliberately carries the *old* room's standings, matching what a
    /// disconnect-then-rejoin would have shown the player.
    pub(crate) fn on_change_room(&mut self, session: ID<Session>, request: Option<Value>) {
        let new_room = match protocol::determine_room(request.as_ref()) {
            Ok(room) => room,
            Err(e) => {
                log::info!("[router] rejected change_room from {}: {}", session, e);
                let error = ServerMessage::error_client_ready(e.as_str(), request);
                self.bus.unicast(session, &error);
                return;
            }
        };
        let Some(player) = self.registry.get(session) else {
            let error = ServerMessage::error_unrecognized_player(UNRECOGNIZED);
            self.bus.unicast(session, &error);
            return;
        };
        let old_room = player.room;
        if new_room == old_room {
            return;
        }
        let tag = player.tag.clone();
        let points = player.points;
        log::info!("[router] {} moves room {} -> {}", tag, old_room, new_room);
        self.rooms.leave(session, old_room);
        self.bus.leave(session, old_room);
        if self.rooms.occupancy(old_room) > 0 {
            self.bus.room(old_room, &ServerMessage::exited(&tag));
        }
        self.registry.set_room(session, new_room);
        self.join_room(session, new_room, &tag, points);
        self.round_sync(session, old_room);
    }

    /// Transport endpoint gone: drop one refcount, tear down at zero.
    pub(crate) fn on_disconnect(&mut self, session: ID<Session>) {
        match self.registry.detach(session) {
            Detach::Absent => {}
            Detach::Retained(endpoints) => {
                log::debug!("[router] {} still has {} endpoints", session, endpoints);
            }
            Detach::Removed(player) => {
                self.rooms.leave(session, player.room);
                self.bus.leave(session, player.room);
                if self.rooms.occupancy(player.room) > 0 {
                    self.bus.room(player.room, &ServerMessage::exited(&player.tag));
                }
            }
        }
    }

    /// `player_scored`: accepted during Play, dropped during Lobby.
    pub(crate) fn on_scored(&mut self, session: ID<Session>, request: Option<Value>) {
        if !self.registry.contains(session) {
            let error = ServerMessage::error_unrecognized_player(UNRECOGNIZED);
            self.bus.unicast(session, &error);
            return;
        }
        let Some(points) = protocol::reported_points(request.as_ref()) else {
            let error = ServerMessage::error_player_scored(MISSING_POINTS);
            self.bus.unicast(session, &error);
            return;
        };
        if self.round.round_in_progress {
            if let Some(player) = self.registry.get_mut(session) {
                player.points = points;
            }
        } else {
            log::debug!("[router] score during lobby ignored for {}", session);
        }
    }

    /// `request_final_score`: asking mid-Play forfeits round completion.
    pub(crate) fn on_final_score(&mut self, session: ID<Session>) {
        let in_progress = self.round.round_in_progress;
        let Some(player) = self.registry.get_mut(session) else {
            let error = ServerMessage::error_unrecognized_player(UNRECOGNIZED);
            self.bus.unicast(session, &error);
            return;
        };
        if in_progress {
            player.incomplete_round = true;
        }
        let reply = ServerMessage::final_score(player.points, !player.incomplete_round);
        self.bus.unicast(session, &reply);
    }

    fn join_room(&mut self, session: ID<Session>, room: RoomId, tag: &str, points: Points) {
        self.rooms.join(session, room);
        self.bus.join(session, room);
        if self.rooms.occupancy(room) > 1 {
            self.bus
                .room_except(room, session, &ServerMessage::entered(tag, points));
        }
        let roster = ServerMessage::already_in_room(self.leaders(room));
        self.bus.unicast(session, &roster);
    }

    /// Catch a session up on the round in progress (or just ended).
    fn round_sync(&self, session: ID<Session>, results_room: RoomId) {
        if self.round.round_in_progress {
            let started = ServerMessage::round_started(self.config.play());
            self.bus.unicast(session, &started);
        } else {
            let ended = ServerMessage::round_ended(self.config.lobby);
            self.bus.unicast(session, &ended);
            if let Some(results) = self.round.last_results.get(&results_room) {
                if !results.is_empty() {
                    self.bus.unicast(session, &ServerMessage::results(results.clone()));
                }
            }
        }
    }
}
