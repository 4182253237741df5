//! Serial coordination core for the synchronized quiz game.
//!
//! All mutable game state lives in one owning value, [`ServerCore`], driven
//! by a single actor loop: clock ticks on one channel, inbound client
//! commands on another. Transport writes fan out through the [`Bus`] trait so
//! the core never touches sockets directly.
//!
//! ## Architecture
//!
//! - [`Clock`] — self-calibrating once-per-second tick source
//! - [`ServerCore`] — owning actor for registry, rooms, and round state
//! - [`Registry`] — authoritative player records with multi-tab refcounting
//! - [`Rooms`] — static difficulty-room membership and occupancy
//! - [`Bus`] — targeted fan-out seam implemented by the transport layer
//!
//! ## Wire protocol
//!
//! - [`ServerMessage`] — outbound events (tagged JSON)
//! - [`Command`] — decoded inbound events, produced by [`decode`]
mod bus;
mod clock;
mod core;
mod message;
mod protocol;
mod registry;
mod rooms;
mod router;
mod scheduler;

pub use bus::*;
pub use clock::*;
pub use self::core::*;
pub use message::*;
pub use protocol::*;
pub use registry::*;
pub use rooms::*;
