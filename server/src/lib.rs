//! # Mimic Server
//! The authoritative side of the replication protocol: tracks which players
//! observe which instances and syncs construct/destroy/value changes and
//! remote events to them.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod roster;
mod scope;
mod server;

pub use roster::{PlayerRecord, PlayerRoster};
pub use server::{ReplicationServer, ScopeTarget, ScopeUpdate};
