use qzs_core::*;
use serde::Serialize;

/// One scoreboard entry; also the shape of room-entry announcements.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Leader {
    pub tag: String,
    pub points: Points,
}

/// Messages sent from server to client over WebSocket.
///
/// Round-lifecycle events (`round_started`/`round_ended`) are always emitted
/// before the timer update for the same second, so clients can key their UI
/// off the lifecycle event alone.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join accepted; echoes the full player record.
    ClientConfirmed {
        tag: String,
        points: Points,
        room: RoomId,
        incomplete_round: bool,
        ref_count: u32,
    },
    /// Join rejected; the offending input is echoed back when present.
    ErrorClientReady {
        error_str: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_input: Option<serde_json::Value>,
    },
    /// A message presumed an attached player and none was found.
    ErrorUnrecognizedPlayer { error_str: String },
    /// A score update arrived without a points value.
    ErrorPlayerScored { error_str: String },
    /// Someone else joined your room.
    GamerEnteredRoom { tag: String, points: Points },
    /// Someone else left your room.
    GamerExitedRoom { tag: String },
    /// Everyone currently in the room you just joined, yourself included.
    GamersAlreadyInRoom { leaders: Vec<Leader> },
    /// A Play phase began; payload is the seconds of play ahead.
    RoundStarted { secs: Secs },
    /// A Play phase ended; payload is the seconds of lobby ahead.
    RoundEnded { secs: Secs },
    /// Per-second Play scoreboard for one room.
    PlayTimerUpdate {
        time_remaining: Secs,
        leaders: Vec<Leader>,
    },
    /// Per-second Lobby countdown.
    LobbyTimerUpdate { secs: Secs },
    /// Final standings of the round that just ended, for one room.
    RoomRoundResults { results: Vec<Leader> },
    /// Reply to an explicit final-score request.
    FinalRoundScore {
        points: Points,
        round_complete: bool,
    },
}

impl ServerMessage {
    pub fn confirmed(player: &crate::Player) -> Self {
        Self::ClientConfirmed {
            tag: player.tag.clone(),
            points: player.points,
            room: player.room,
            incomplete_round: player.incomplete_round,
            ref_count: player.ref_count,
        }
    }
    pub fn error_client_ready(error_str: &str, user_input: Option<serde_json::Value>) -> Self {
        Self::ErrorClientReady {
            error_str: error_str.to_string(),
            user_input,
        }
    }
    pub fn error_unrecognized_player(error_str: &str) -> Self {
        Self::ErrorUnrecognizedPlayer {
            error_str: error_str.to_string(),
        }
    }
    pub fn error_player_scored(error_str: &str) -> Self {
        Self::ErrorPlayerScored {
            error_str: error_str.to_string(),
        }
    }
    pub fn entered(tag: &str, points: Points) -> Self {
        Self::GamerEnteredRoom {
            tag: tag.to_string(),
            points,
        }
    }
    pub fn exited(tag: &str) -> Self {
        Self::GamerExitedRoom {
            tag: tag.to_string(),
        }
    }
    pub fn already_in_room(leaders: Vec<Leader>) -> Self {
        Self::GamersAlreadyInRoom { leaders }
    }
    pub fn round_started(secs: Secs) -> Self {
        Self::RoundStarted { secs }
    }
    pub fn round_ended(secs: Secs) -> Self {
        Self::RoundEnded { secs }
    }
    pub fn play_timer(time_remaining: Secs, leaders: Vec<Leader>) -> Self {
        Self::PlayTimerUpdate {
            time_remaining,
            leaders,
        }
    }
    pub fn lobby_timer(secs: Secs) -> Self {
        Self::LobbyTimerUpdate { secs }
    }
    pub fn results(results: Vec<Leader>) -> Self {
        Self::RoomRoundResults { results }
    }
    pub fn final_score(points: Points, round_complete: bool) -> Self {
        Self::FinalRoundScore {
            points,
            round_complete,
        }
    }
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialize server message")
    }
}
