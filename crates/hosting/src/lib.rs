//! WebSocket hosting infrastructure.
//!
//! The [`Gateway`] owns every live endpoint channel and the transport-side
//! room membership, and implements the core's `Bus` seam. [`bridge`] pumps
//! one WebSocket connection: outbound JSON from the gateway to the socket,
//! inbound frames through the protocol decoder into the core's command
//! channel, and a disconnect command when the socket goes away.
mod bridge;
mod gateway;

pub use bridge::*;
pub use gateway::*;
