//! # pp_node
//!
//! A runnable P2P poker node: configuration, logging, and the local HTTP
//! control surface on top of the `p2p_poker` library.

pub mod api;
pub mod config;
pub mod logging;
