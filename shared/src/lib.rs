//! # Mimic Shared
//! Class/instance registry, value store and replication protocol shared
//! between the mimic-server & mimic-client crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod bridge;
pub mod class;
pub mod codec;
pub mod error;
pub mod event;
pub mod instance;
pub mod messages;
pub mod outgoing;
pub mod transport;
pub mod value;

pub use bridge::waitlist::{DeferredRemote, RemoteWaitlist};
pub use class::{
    Class, ClassFlags, ClassId, EventTarget, HookSlot, HookTable, HostRole, Registry,
    ROOT_CLASS_NAME,
};
pub use error::{ClassError, CodecError, InstanceError};
pub use event::{events, EventBus};
pub use instance::{DestroyOutcome, Instance, InstanceAddr, InstanceId};
pub use messages::{Channel, WirePacket};
pub use outgoing::{OutgoingSync, RemoteTargets};
pub use transport::{ClientTransport, PlayerId, ServerTransport};
pub use value::{HookOutcome, OpaqueValue, ScriptFn, Value, WireValue};
