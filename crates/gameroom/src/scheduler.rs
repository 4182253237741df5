use crate::*;
use qzs_core::*;

/// Round scheduling: consumes clock ticks, drives the Play/Lobby machine,
/// and fans the per-second state out to occupied rooms.
impl ServerCore {
    pub(crate) fn on_tick(&mut self, tick: Tick, now_ms: EpochMs) {
        match tick {
            Tick::First { secs_remaining } => self.on_first_tick(secs_remaining),
            Tick::Periodic => self.on_periodic_tick(now_ms),
        }
    }

    /// The aligning one-shot. Lands on (just before) a cycle boundary in the
    /// common case, mid-cycle only when the host started mid-cycle.
    fn on_first_tick(&mut self, secs_at_fire: Secs) {
        self.round.secs_remaining = secs_at_fire;
        if self.round.secs_remaining == 0 {
            self.begin_cycle();
        }
        if self.round.secs_remaining <= self.config.lobby {
            self.enter_lobby();
        } else {
            self.enter_play();
        }
        self.round.secs_remaining -= 1;
    }

    fn on_periodic_tick(&mut self, now_ms: EpochMs) {
        let lobby = self.config.lobby;
        if self.round.secs_remaining > lobby {
            self.play_tick();
            if self.round.secs_remaining == lobby + 1 {
                // Last play second; lobby starts within the same tick.
                self.round.secs_remaining = lobby;
                self.enter_lobby();
            }
        } else if self.round.secs_remaining + 1 == lobby {
            self.coarse_adjust(now_ms);
            self.lobby_tick();
        } else {
            self.lobby_tick();
            if self.round.secs_remaining == 0 {
                self.begin_cycle();
                self.enter_play();
            }
        }
        self.round.secs_remaining = self.round.secs_remaining.saturating_sub(1);
    }

    fn begin_cycle(&mut self) {
        self.round.secs_remaining = self.config.cycle;
        self.round.next_cycle_ms += self.config.cycle as EpochMs * 1000;
    }

    /// Play begins: zero the scoreboard, lift the incomplete flags, announce
    /// to every connection, then emit the first scoreboard second.
    fn enter_play(&mut self) {
        self.registry.reset_round();
        self.round.round_in_progress = true;
        log::info!(
            "[round] play started with {} players",
            self.registry.len()
        );
        self.bus.all(&ServerMessage::round_started(self.config.play()));
        self.play_tick();
    }

    /// Play ends: freeze scores, announce, compile per-room standings, then
    /// emit the first lobby second.
    fn enter_lobby(&mut self) {
        self.round.round_in_progress = false;
        log::info!(
            "[round] lobby started with {} players",
            self.registry.len()
        );
        self.bus.all(&ServerMessage::round_ended(self.config.lobby));
        let results: std::collections::HashMap<_, _> = RoomId::all()
            .map(|room| (room, self.leaders(room)))
            .collect();
        self.round.last_results = results;
        for room in RoomId::all() {
            if self.rooms.occupancy(room) > 0 {
                let results = &self.round.last_results[&room];
                if !results.is_empty() {
                    self.bus.room(room, &ServerMessage::results(results.clone()));
                }
            }
        }
        self.lobby_tick();
    }

    fn play_tick(&self) {
        let time_remaining = self.round.secs_remaining - self.config.lobby;
        for room in RoomId::all() {
            if self.rooms.occupancy(room) > 0 {
                let update = ServerMessage::play_timer(time_remaining, self.leaders(room));
                self.bus.room(room, &update);
            }
        }
    }

    fn lobby_tick(&self) {
        for room in RoomId::all() {
            if self.rooms.occupancy(room) > 0 {
                let update = ServerMessage::lobby_timer(self.round.secs_remaining);
                self.bus.room(room, &update);
            }
        }
    }

    /// Once per cycle, one second into Lobby: retime the countdown against
    /// the wall clock. Forward skips are capped per cycle so a long host
    /// pause is absorbed a few seconds at a time; backward skew at worst
    /// restarts Lobby from its beginning.
    fn coarse_adjust(&mut self, now_ms: EpochMs) {
        let until = self.round.next_cycle_ms - now_ms;
        let actual = (until + 500).div_euclid(1000);
        let current = self.round.secs_remaining as i64;
        if actual != current {
            let floor = current - self.config.max_skip_fwd as i64;
            let target = floor.max((self.config.lobby as i64).min(actual));
            log::info!(
                "[round] coarse adjustment {}s -> {}s (wall clock says {}s)",
                current,
                target,
                actual
            );
            self.round.secs_remaining = target.max(0) as Secs;
        }
    }

    /// Current standings for one room, best first.
    pub(crate) fn leaders(&self, room: RoomId) -> Vec<Leader> {
        let mut leaders: Vec<Leader> = self
            .rooms
            .members(room)
            .filter_map(|session| self.registry.get(session))
            .map(|player| Leader {
                tag: player.tag.clone(),
                points: player.points,
            })
            .collect();
        leaders.sort_by(|a, b| b.points.cmp(&a.points));
        leaders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::testing::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn room(level: i64) -> RoomId {
        RoomId::parse(level).unwrap()
    }

    fn core(secs: Secs, next_cycle_ms: EpochMs) -> (ServerCore, Arc<RecordingBus>) {
        let bus = Arc::new(RecordingBus::default());
        let config = RoundConfig::default();
        let core = ServerCore {
            round: RoundState {
                secs_remaining: secs,
                round_in_progress: secs > config.lobby,
                next_cycle_ms,
                last_results: HashMap::new(),
            },
            registry: Registry::default(),
            rooms: Rooms::default(),
            config,
            bus: bus.clone(),
        };
        (core, bus)
    }

    fn seat(core: &mut ServerCore, tag: &str, level: i64, points: Points) -> ID<Session> {
        let session = ID::default();
        core.registry
            .attach(session, Some(tag), room(level), core.round.round_in_progress);
        core.registry.get_mut(session).unwrap().points = points;
        core.rooms.join(session, room(level));
        session
    }

    #[test]
    fn play_tick_reaches_only_occupied_rooms() {
        let (mut core, bus) = core(120, 0);
        seat(&mut core, "Alice", 1, 7);
        core.on_tick(Tick::Periodic, 0);
        let sent = bus.take();
        assert_eq!(
            sent,
            vec![Sent::Room(
                "1".into(),
                json!({
                    "type": "play_timer_update",
                    "time_remaining": 90,
                    "leaders": [{"tag": "Alice", "points": 7}],
                }),
            )]
        );
        assert_eq!(core.round.secs_remaining, 119);
        assert!(core.round.round_in_progress);
    }

    #[test]
    fn leaders_sort_descending_by_points() {
        let (mut core, _) = core(120, 0);
        seat(&mut core, "Bob", 2, 4);
        seat(&mut core, "Carol", 2, 9);
        seat(&mut core, "Dan", 2, 1);
        let leaders = core.leaders(room(2));
        let points: Vec<Points> = leaders.iter().map(|l| l.points).collect();
        assert_eq!(points, vec![9, 4, 1]);
    }

    #[test]
    fn last_play_second_rolls_into_lobby() {
        let (mut core, bus) = core(31, 0);
        seat(&mut core, "Alice", 2, 7);
        core.on_tick(Tick::Periodic, 0);
        let sent = bus.take();
        assert_eq!(
            sent,
            vec![
                Sent::Room(
                    "2".into(),
                    json!({
                        "type": "play_timer_update",
                        "time_remaining": 1,
                        "leaders": [{"tag": "Alice", "points": 7}],
                    }),
                ),
                Sent::All(json!({"type": "round_ended", "secs": 30})),
                Sent::Room(
                    "2".into(),
                    json!({
                        "type": "room_round_results",
                        "results": [{"tag": "Alice", "points": 7}],
                    }),
                ),
                Sent::Room("2".into(), json!({"type": "lobby_timer_update", "secs": 30})),
            ]
        );
        assert_eq!(core.round.secs_remaining, 29);
        assert!(!core.round.round_in_progress);
        assert_eq!(
            core.round.last_results[&room(2)],
            vec![Leader {
                tag: "Alice".into(),
                points: 7,
            }]
        );
    }

    #[test]
    fn empty_room_results_are_suppressed() {
        let (mut core, bus) = core(31, 0);
        core.on_tick(Tick::Periodic, 0);
        // Nobody connected: only the global lifecycle event goes out.
        assert_eq!(
            bus.take(),
            vec![Sent::All(json!({"type": "round_ended", "secs": 30}))]
        );
    }

    #[test]
    fn lobby_expiry_starts_the_next_round() {
        let (mut core, bus) = core(0, 180_000);
        let session = seat(&mut core, "Carol", 1, 5);
        core.registry.get_mut(session).unwrap().incomplete_round = true;
        core.on_tick(Tick::Periodic, 0);
        let sent = bus.take();
        assert_eq!(
            sent,
            vec![
                Sent::Room("1".into(), json!({"type": "lobby_timer_update", "secs": 0})),
                Sent::All(json!({"type": "round_started", "secs": 150})),
                Sent::Room(
                    "1".into(),
                    json!({
                        "type": "play_timer_update",
                        "time_remaining": 150,
                        "leaders": [{"tag": "Carol", "points": 0}],
                    }),
                ),
            ]
        );
        let player = core.registry.get(session).unwrap();
        assert_eq!(player.points, 0);
        assert!(!player.incomplete_round);
        assert!(core.round.round_in_progress);
        assert_eq!(core.round.secs_remaining, 179);
        assert_eq!(core.round.next_cycle_ms, 360_000);
    }

    #[test]
    fn coarse_adjustment_is_a_noop_when_aligned() {
        // One second into lobby, wall clock agrees: 29s to the boundary.
        let (mut core, bus) = core(29, 1_000_000);
        seat(&mut core, "Alice", 0, 2);
        core.on_tick(Tick::Periodic, 971_000);
        assert_eq!(
            bus.take(),
            vec![Sent::Room("0".into(), json!({"type": "lobby_timer_update", "secs": 29}))]
        );
        assert_eq!(core.round.secs_remaining, 28);
    }

    #[test]
    fn coarse_adjustment_caps_forward_skip() {
        // A 45s wall-clock jump: the boundary passed 16s ago, but only 9s
        // of lobby may be dropped this cycle.
        let (mut core, bus) = core(29, 1_000_000);
        seat(&mut core, "Alice", 0, 2);
        core.on_tick(Tick::Periodic, 1_016_000);
        assert_eq!(
            bus.take(),
            vec![Sent::Room("0".into(), json!({"type": "lobby_timer_update", "secs": 20}))]
        );
        assert_eq!(core.round.secs_remaining, 19);
    }

    #[test]
    fn coarse_adjustment_caps_backward_skew_at_lobby_start() {
        // Wall clock says 40s remain: lobby restarts from its beginning.
        let (mut core, bus) = core(29, 1_000_000);
        seat(&mut core, "Alice", 0, 2);
        core.on_tick(Tick::Periodic, 960_000);
        assert_eq!(
            bus.take(),
            vec![Sent::Room("0".into(), json!({"type": "lobby_timer_update", "secs": 30}))]
        );
        assert_eq!(core.round.secs_remaining, 29);
    }

    #[test]
    fn first_tick_on_the_boundary_starts_a_round() {
        let (mut core, bus) = core(0, 180_000);
        core.round.round_in_progress = false;
        core.on_tick(Tick::First { secs_remaining: 0 }, 0);
        assert_eq!(
            bus.take(),
            vec![Sent::All(json!({"type": "round_started", "secs": 150}))]
        );
        assert_eq!(core.round.secs_remaining, 179);
        assert_eq!(core.round.next_cycle_ms, 360_000);
        assert!(core.round.round_in_progress);
    }

    #[test]
    fn first_tick_mid_lobby_enters_lobby() {
        let (mut core, bus) = core(47, 180_000);
        core.on_tick(Tick::First { secs_remaining: 15 }, 0);
        assert_eq!(
            bus.take(),
            vec![Sent::All(json!({"type": "round_ended", "secs": 30}))]
        );
        assert_eq!(core.round.secs_remaining, 14);
        assert!(!core.round.round_in_progress);
    }

    #[test]
    fn phase_tracks_the_countdown_across_a_cycle() {
        let (mut core, _) = core(32, 1_000_000);
        for _ in 0..3 {
            core.on_tick(Tick::Periodic, 0);
            let lobby = core.config.lobby;
            assert_eq!(core.round.round_in_progress, core.round.secs_remaining > lobby);
        }
    }
}
