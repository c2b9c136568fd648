use std::fmt;

use crate::messages::Channel;

/// Identifies one connected player. Assigned by the host engine's player
/// directory; opaque to this subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

/// Abstract reliable message bus as seen from the server. Sending is
/// fire-and-forget; delivery ordering is guaranteed per channel per
/// destination only. Receiving is the host engine handing packets to
/// `handle_packet` on the server frontend.
pub trait ServerTransport {
    fn send_to(&mut self, player: PlayerId, channel: Channel, payload: &[u8]);
    fn broadcast(&mut self, channel: Channel, payload: &[u8]);
}

/// The client's view of the bus: a single reliable link to the server.
pub trait ClientTransport {
    fn send(&mut self, channel: Channel, payload: &[u8]);
}
