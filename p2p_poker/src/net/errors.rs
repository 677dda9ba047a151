//! Connection-level and node errors.

use std::io;
use thiserror::Error;

use crate::game::{GameError, entities::Address};

/// Errors from frame encoding and decoding.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode message: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("message size {actual} exceeds maximum allowed size of {max} bytes")]
    MessageTooLarge { actual: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SerializationError {
    /// Whether the stream simply ended (the peer hung up).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            )
        )
    }
}

/// Errors that terminate a single peer link. None of these stop the node.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: Address,
        #[source]
        source: io::Error,
    },

    #[error("failed to dial {addr}: {source}")]
    DialFailed {
        addr: Address,
        #[source]
        source: io::Error,
    },

    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    #[error("no handshake from {0} in time")]
    HandshakeTimedOut(Address),

    #[error("decode failed: {0}")]
    DecodeFailed(#[from] SerializationError),

    #[error("write to {0} failed")]
    WriteFailed(Address),

    #[error("node is shut down")]
    NodeClosed,
}

impl NetError {
    /// A copy for every caller waiting on the same dial. I/O sources keep
    /// their kind and message.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let io_copy = |e: &io::Error| io::Error::new(e.kind(), e.to_string());
        match self {
            Self::BindFailed { addr, source } => Self::BindFailed {
                addr: addr.clone(),
                source: io_copy(source),
            },
            Self::DialFailed { addr, source } => Self::DialFailed {
                addr: addr.clone(),
                source: io_copy(source),
            },
            Self::HandshakeRejected(reason) => Self::HandshakeRejected(reason.clone()),
            Self::HandshakeTimedOut(addr) => Self::HandshakeTimedOut(addr.clone()),
            Self::DecodeFailed(SerializationError::Io(e)) => {
                Self::DecodeFailed(SerializationError::Io(io_copy(e)))
            }
            Self::DecodeFailed(other) => Self::HandshakeRejected(other.to_string()),
            Self::WriteFailed(addr) => Self::WriteFailed(addr.clone()),
            Self::NodeClosed => Self::NodeClosed,
        }
    }
}

/// Errors returned through the node handle.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Net(#[from] NetError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_counts_as_closed() {
        let err = SerializationError::Io(io::ErrorKind::UnexpectedEof.into());
        assert!(err.is_closed());

        let err = SerializationError::MessageTooLarge { actual: 2, max: 1 };
        assert!(!err.is_closed());
    }

    #[test]
    fn duplicate_keeps_variant_and_message() {
        let err = NetError::DialFailed {
            addr: Address::new(":4000"),
            source: io::ErrorKind::TimedOut.into(),
        };
        let copy = err.duplicate();
        assert_eq!(copy.to_string(), err.to_string());
        assert!(matches!(
            copy,
            NetError::DialFailed { ref source, .. } if source.kind() == io::ErrorKind::TimedOut
        ));

        let err = NetError::HandshakeTimedOut(Address::new(":5000"));
        assert_eq!(err.duplicate().to_string(), "no handshake from :5000 in time");
    }

    #[test]
    fn node_error_is_transparent() {
        let err: NodeError = GameError::OutOfTurn.into();
        assert_eq!(err.to_string(), "not your turn");

        let err: NodeError = NetError::NodeClosed.into();
        assert_eq!(err.to_string(), "node is shut down");
    }
}
