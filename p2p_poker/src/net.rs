//! Networking layer for the peer overlay.
//!
//! Every node listens for and dials plain TCP connections. Frames are
//! length-prefixed bincode; the first frame in each direction is a
//! handshake and everything after it is a [`messages::Message`].

/// Node actor inbox.
pub mod commands;

/// Directory of active peer links keyed by declared listen address.
pub mod directory;

/// Link, framing, and node errors.
pub mod errors;

/// A single authenticated connection to a peer.
pub mod link;

/// Message envelope and payloads exchanged after the handshake.
pub mod messages;

/// The overlay node and its control loop.
pub mod node;

/// Handshake and admission check.
pub mod protocol_version;

/// Length-prefixed frame encoding.
pub mod utils;
