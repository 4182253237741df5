use crate::Session;
use qzs_core::*;
use serde_json::Value;

/// Validation failures for a join or room-change request, in ladder order:
/// each rung is only reachable once every rung above it passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    MissingRequest,
    MissingProfile,
    MissingRoom,
    NotInteger,
    OutOfRange,
}

impl JoinError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequest => "Request is missing",
            Self::MissingProfile => "Request is missing a profile",
            Self::MissingRoom => "Profile is missing a difficulty level",
            Self::NotInteger => "Difficulty level is not an integer",
            Self::OutOfRange => "Difficulty level is out of range",
        }
    }
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for JoinError {}

/// Inbound work for the serial core: decoded client events plus the
/// transport's endpoint-gone notification.
#[derive(Debug, Clone)]
pub enum Command {
    Ready {
        session: ID<Session>,
        request: Option<Value>,
    },
    ChangeRoom {
        session: ID<Session>,
        request: Option<Value>,
    },
    Scored {
        session: ID<Session>,
        request: Option<Value>,
    },
    FinalScore {
        session: ID<Session>,
    },
    /// Emitted by the transport when an endpoint closes, never off the wire.
    Disconnect {
        session: ID<Session>,
    },
}

/// Decode one inbound text frame. Unknown or malformed frames are dropped
/// with a log line; they carry no session state to clean up.
pub fn decode(session: ID<Session>, text: &str) -> Option<Command> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("[protocol] unparseable frame from {}: {}", session, e);
            return None;
        }
    };
    let request = value.get("request").cloned();
    match value.get("type").and_then(Value::as_str) {
        Some("client_ready") => Some(Command::Ready { session, request }),
        Some("change_room") => Some(Command::ChangeRoom { session, request }),
        Some("player_scored") => Some(Command::Scored { session, request }),
        Some("request_final_score") => Some(Command::FinalScore { session }),
        other => {
            log::warn!("[protocol] unknown event {:?} from {}", other, session);
            None
        }
    }
}

/// Walk the request down to a validated room id.
pub fn determine_room(request: Option<&Value>) -> Result<RoomId, JoinError> {
    let request = request
        .filter(|v| !v.is_null())
        .ok_or(JoinError::MissingRequest)?;
    let profile = request
        .get("profile")
        .filter(|v| !v.is_null())
        .ok_or(JoinError::MissingProfile)?;
    let room = profile
        .get("room")
        .filter(|v| !v.is_null())
        .ok_or(JoinError::MissingRoom)?;
    let level = match room {
        Value::Number(n) => n.as_i64().ok_or(JoinError::NotInteger)?,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| JoinError::NotInteger)?,
        _ => return Err(JoinError::NotInteger),
    };
    RoomId::parse(level).ok_or(JoinError::OutOfRange)
}

/// The profile's display tag, if it holds a non-blank one.
pub fn requested_tag(request: &Value) -> Option<&str> {
    request
        .get("profile")
        .and_then(|profile| profile.get("tag"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
}

/// The points value of a score report, if present and a non-negative integer.
pub fn reported_points(request: Option<&Value>) -> Option<Points> {
    request?
        .get("points")
        .and_then(Value::as_u64)
        .and_then(|points| Points::try_from(points).ok())
}
