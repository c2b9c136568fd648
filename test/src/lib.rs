//! End-to-end harness: an in-memory loopback network plus the test protocol
//! shared by the integration tests.

pub mod network;
pub mod protocol;

pub use network::{ClientSide, Network, ServerSide};
pub use protocol::{register_protocol, Protocol};
