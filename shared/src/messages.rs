use serde::{Deserialize, Serialize};

use crate::{instance::InstanceId, value::WireValue};

/// The named wire channels this protocol occupies on the host transport.
/// Each maps to a distinct string token so an engine multiplexing many
/// subsystems over one bus can route without parsing payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Constructor,
    Destructor,
    SetValue,
    ClientToServer,
    ServerToClient,
}

impl Channel {
    pub fn token(&self) -> &'static str {
        match self {
            Channel::Constructor => "mimic:construct",
            Channel::Destructor => "mimic:destruct",
            Channel::SetValue => "mimic:set_value",
            Channel::ClientToServer => "mimic:event_c2s",
            Channel::ServerToClient => "mimic:event_s2c",
        }
    }
}

/// One message of the replication protocol.
///
/// `Construct`/`Destruct`/`SetValue` flow server → client(s) and manage the
/// client's local mirrors; the two event shapes carry custom remote events
/// in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WirePacket {
    Construct {
        class: String,
        id: InstanceId,
        /// Full synced-value snapshot at send time
        values: Vec<(String, WireValue)>,
    },
    Destruct {
        class: String,
        id: InstanceId,
    },
    SetValue {
        class: String,
        id: InstanceId,
        key: String,
        value: WireValue,
    },
    EventToServer {
        class: String,
        id: InstanceId,
        event: String,
        args: Vec<WireValue>,
    },
    EventToClient {
        class: String,
        id: InstanceId,
        event: String,
        args: Vec<WireValue>,
    },
}

impl WirePacket {
    pub fn channel(&self) -> Channel {
        match self {
            WirePacket::Construct { .. } => Channel::Constructor,
            WirePacket::Destruct { .. } => Channel::Destructor,
            WirePacket::SetValue { .. } => Channel::SetValue,
            WirePacket::EventToServer { .. } => Channel::ClientToServer,
            WirePacket::EventToClient { .. } => Channel::ServerToClient,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
