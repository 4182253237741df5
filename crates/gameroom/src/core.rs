use crate::*;
use qzs_core::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Round geometry. Defaults give a 150s Play window and a 30s Lobby.
#[derive(Debug, Clone, Copy)]
pub struct RoundConfig {
    pub cycle: Secs,
    pub lobby: Secs,
    pub max_skip_fwd: Secs,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            cycle: CYCLE_SECS,
            lobby: LOBBY_SECS,
            max_skip_fwd: MAX_SKIP_FWD,
        }
    }
}

impl RoundConfig {
    pub fn play(&self) -> Secs {
        self.cycle - self.lobby
    }
}

/// The single global round record shared by every room.
#[derive(Debug)]
pub struct RoundState {
    /// Whole seconds until the next round start; Play while above the lobby
    /// length, Lobby at or below it.
    pub secs_remaining: Secs,
    /// True exactly during Play.
    pub round_in_progress: bool,
    /// Absolute epoch of the upcoming round start; the coarse adjustment
    /// measures drift against this, so it survives wall-clock jumps.
    pub next_cycle_ms: EpochMs,
    /// Standings compiled at each round end, per room; overwritten each
    /// cycle and empty before the first round completes.
    pub last_results: HashMap<RoomId, Vec<Leader>>,
}

impl RoundState {
    fn seeded(alignment: Alignment, config: &RoundConfig) -> Self {
        Self {
            secs_remaining: alignment.secs_remaining,
            round_in_progress: alignment.secs_remaining > config.lobby,
            next_cycle_ms: alignment.next_cycle_ms,
            last_results: HashMap::new(),
        }
    }
}

/// Owning value for all mutable game state.
///
/// Every mutation — clock ticks, round transitions, registry and room
/// changes, inbound client events — runs on the one task that owns this
/// struct, so none of the fields need locks. The bus is the only outward
/// edge and it only ever receives snapshots.
pub struct ServerCore {
    pub(crate) config: RoundConfig,
    pub(crate) registry: Registry,
    pub(crate) rooms: Rooms,
    pub(crate) round: RoundState,
    pub(crate) bus: Arc<dyn Bus>,
}

impl ServerCore {
    /// Build a core seeded from the clock's startup alignment, so clients
    /// joining before the first tick still get a sensible round sync.
    pub fn new(config: RoundConfig, bus: Arc<dyn Bus>, alignment: Alignment) -> Self {
        Self {
            round: RoundState::seeded(alignment, &config),
            registry: Registry::default(),
            rooms: Rooms::default(),
            config,
            bus,
        }
    }
    /// Serial actor loop. Ticks win over inbound commands so the cadence
    /// never falls behind a chatty client.
    pub async fn run(
        mut self,
        mut ticks: UnboundedReceiver<Tick>,
        mut commands: UnboundedReceiver<Command>,
    ) {
        log::info!(
            "[core] running, {}s cycle / {}s lobby",
            self.config.cycle,
            self.config.lobby
        );
        loop {
            tokio::select! {
                biased;
                tick = ticks.recv() => match tick {
                    Some(tick) => self.on_tick(tick, unix_ms()),
                    None => break,
                },
                command = commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
            }
        }
        log::info!("[core] shutting down");
    }
    /// Dispatch one inbound command to its handler.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Ready { session, request } => self.on_ready(session, request),
            Command::ChangeRoom { session, request } => self.on_change_room(session, request),
            Command::Scored { session, request } => self.on_scored(session, request),
            Command::FinalScore { session } => self.on_final_score(session),
            Command::Disconnect { session } => self.on_disconnect(session),
        }
    }
}
