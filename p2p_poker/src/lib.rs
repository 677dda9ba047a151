//! # P2P Poker
//!
//! A leaderless peer-to-peer card table. Every process is both a network
//! node and a full replica of the shared game state; there is no server.
//!
//! ## Core Modules
//!
//! - [`net`]: handshake, peer links, the peer directory, gossip, and the
//!   node control loop
//! - [`table`]: the circular seat map used for turn order and for routing
//!   the deck around the table
//! - [`game`]: the per-node game engine, the deck, and the shuffle chain
//!
//! ## Example
//!
//! ```no_run
//! use p2p_poker::{Node, NodeConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NodeConfig::new(":3000");
//! let (node, handle) = Node::bind(config).await?;
//! tokio::spawn(node.run());
//!
//! handle.connect(":4000".into()).await?;
//! handle.set_ready().await?;
//! # Ok(())
//! # }
//! ```

/// Peer overlay networking.
pub mod net;
pub use net::{
    errors::{NetError, NodeError, SerializationError},
    messages::{self, Message, Payload},
    node::{Node, NodeConfig, NodeHandle},
    protocol_version::{GameVariant, Handshake, PROTOCOL_VERSION},
};

/// Seating and table configuration.
pub mod table;
pub use table::{Table, TableConfig};

/// Game engine, entities, deck, and shuffle chain.
pub mod game;
pub use game::{
    Address, GameEngine, GameError, GamePhase, GameSnapshot, PlayerAction,
    entities::{self, SeatView},
};
