//! Messages consumed by the node's control loop.

use tokio::sync::oneshot;

use super::{
    errors::{NetError, NodeError},
    link::PendingLink,
};
use crate::game::entities::{Address, PlayerAction};

/// Reply channel for a command.
pub type Responder = oneshot::Sender<Result<(), NodeError>>;

/// Locally issued requests.
#[derive(Debug)]
pub enum NodeMessage {
    /// The local player is ready for the next hand.
    SetReady { response: Responder },

    /// The local player acts in the current betting round.
    TakeAction {
        action: PlayerAction,
        response: Responder,
    },

    /// Dial a peer. Answered once the handshake finished or failed.
    Connect { addr: Address, response: Responder },

    /// The deal timer armed for `hand` went off.
    DealTimerFired { hand: u64 },

    /// Stop the node and drop every link.
    Shutdown,
}

/// Outcome of a handshake task. Callers waiting on a dial are answered
/// by the node when it sees this.
#[derive(Debug)]
pub enum Connection {
    Established {
        link: PendingLink,
        /// Set when we dialed.
        dialed: Option<Address>,
    },
    Failed {
        dialed: Option<Address>,
        error: NetError,
    },
}
