//! # Mimic Client
//! The mirroring side of the replication protocol: applies
//! construct/destroy/value sync from the server to the local registry and
//! forwards client-originated remote events.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod client;

pub use client::ReplicationClient;
