use crate::ServerMessage;
use crate::Session;
use qzs_core::*;

/// Targeted message fan-out, implemented by the transport layer.
///
/// Sends are fire-and-forget pushes onto per-endpoint channels; a failed
/// write means the endpoint is gone and its own disconnect will clean up.
/// Room operations address rooms by [`RoomId`] only, which renders as a
/// decimal string at the transport boundary — a raw integer room key cannot
/// reach a fan-out call site.
///
/// Implementations must snapshot room membership before writing so the
/// serial core never races its own broadcasts.
pub trait Bus: Send + Sync {
    /// Send to every endpoint of one session.
    fn unicast(&self, session: ID<Session>, message: &ServerMessage);
    /// Send to every session currently in the room.
    fn room(&self, room: RoomId, message: &ServerMessage);
    /// Send to every session in the room except the originating one.
    fn room_except(&self, room: RoomId, sender: ID<Session>, message: &ServerMessage);
    /// Send to every connected session.
    fn all(&self, message: &ServerMessage);
    /// Add a session to a transport room.
    fn join(&self, session: ID<Session>, room: RoomId);
    /// Remove a session from a transport room.
    fn leave(&self, session: ID<Session>, room: RoomId);
}
