use crate::{
    class::ClassId,
    instance::{InstanceAddr, InstanceId},
    transport::PlayerId,
    value::WireValue,
};

/// Destinations for an outbound remote event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTargets {
    /// Client → server; the only legal direction from a client registry
    Server,
    /// Server → every connected player
    All,
    /// Server → one player
    Player(PlayerId),
    /// Server → an explicit list of players
    Players(Vec<PlayerId>),
}

/// A replication side effect recorded by the registry, in mutation order.
///
/// The registry never touches a socket; the server/client frontends drain
/// this queue after every mutating call and translate each entry into wire
/// packets. Queuing instead of calling out keeps cascaded effects (a
/// bind-triggered destroy, a hook writing a synced value) on the wire even
/// though they happen deep inside a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingSync {
    /// A replication-default instance spawned; the server marks it
    /// observed-by-all and broadcasts its construct-sync.
    SpawnReplicated(InstanceAddr),
    /// An instance completed teardown. Carries the class name because the
    /// instance is gone by the time the frontend drains the queue.
    Despawn {
        class: ClassId,
        class_name: String,
        id: InstanceId,
    },
    /// A synced key changed; the current value is read back at drain time.
    ValueSync { addr: InstanceAddr, key: String },
    /// A custom event to carry across the wire, args already encoded.
    RemoteEvent {
        addr: InstanceAddr,
        event: String,
        args: Vec<WireValue>,
        targets: RemoteTargets,
    },
}
