//! Peer links.
//!
//! A raw TCP stream becomes a [`PendingLink`] once both sides exchanged
//! and accepted handshakes. The node turns a pending link into a running
//! [`PeerLink`] when it registers the peer, which is when the link's read
//! loop starts. Until then nothing the peer sends is decoded.

use std::time::Duration;
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};

use super::{
    errors::NetError,
    messages::Message,
    protocol_version::Handshake,
    utils::{read_prefixed, write_prefixed},
};
use crate::game::entities::Address;

/// Frames a link can have queued for writing before sends start failing.
pub const LINK_QUEUE_SIZE: usize = 256;

/// What a link reports back to the node.
#[derive(Debug)]
pub enum LinkEvent {
    Message { link: u64, message: Message },
    Closed { link: u64, addr: Address, reason: String },
}

/// A connection whose handshake succeeded but that isn't running yet.
#[derive(Debug)]
pub struct PendingLink {
    stream: TcpStream,
    remote: Handshake,
    outbound: bool,
}

impl PendingLink {
    /// The peer's declared listen address.
    #[must_use]
    pub fn addr(&self) -> &Address {
        &self.remote.listen_addr
    }

    #[must_use]
    pub fn remote(&self) -> &Handshake {
        &self.remote
    }

    /// Whether we dialed this connection.
    #[must_use]
    pub fn is_outbound(&self) -> bool {
        self.outbound
    }
}

/// Dial `addr` and exchange handshakes. `dial_timeout` bounds the whole
/// exchange, not just the connect.
pub async fn dial(
    addr: &Address,
    ours: &Handshake,
    dial_timeout: Duration,
) -> Result<PendingLink, NetError> {
    let exchange = async {
        let stream = TcpStream::connect(addr.dial_target())
            .await
            .map_err(|source| NetError::DialFailed {
                addr: addr.clone(),
                source,
            })?;
        handshake(stream, ours, true).await
    };
    match timeout(dial_timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(NetError::DialFailed {
            addr: addr.clone(),
            source: std::io::ErrorKind::TimedOut.into(),
        }),
    }
}

/// Send our handshake, read theirs, and check it.
pub async fn handshake(
    mut stream: TcpStream,
    ours: &Handshake,
    outbound: bool,
) -> Result<PendingLink, NetError> {
    let peer = stream
        .peer_addr()
        .map(|a| Address::new(&a.to_string()))
        .unwrap_or_else(|_| Address::new("unknown"));

    if let Err(e) = write_prefixed(&mut stream, ours).await {
        log::debug!("[{}] failed to send handshake to {}: {}", ours.listen_addr, peer, e);
        return Err(NetError::WriteFailed(peer));
    }

    let remote: Handshake = read_prefixed(&mut stream).await?;
    if let Err(reason) = ours.verify(&remote) {
        // Best effort; the connection is dropped either way.
        let _ = stream.shutdown().await;
        return Err(NetError::HandshakeRejected(reason));
    }

    Ok(PendingLink {
        stream,
        remote,
        outbound,
    })
}

/// A running link to a registered peer.
///
/// Reads and writes happen on two tasks of their own. Both are aborted
/// when the link is dropped, which closes the connection.
#[derive(Debug)]
pub struct PeerLink {
    addr: Address,
    id: u64,
    outbound: bool,
    frames: mpsc::Sender<Vec<u8>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl PeerLink {
    pub fn spawn(pending: PendingLink, id: u64, events: mpsc::Sender<LinkEvent>) -> Self {
        let PendingLink {
            stream,
            remote,
            outbound,
        } = pending;
        let addr = remote.listen_addr;
        let (read_half, write_half) = stream.into_split();
        let (frames, queue) = mpsc::channel(LINK_QUEUE_SIZE);

        let reader = tokio::spawn(read_loop(read_half, addr.clone(), id, events.clone()));
        let writer = tokio::spawn(write_loop(write_half, queue, addr.clone(), id, events));

        Self {
            addr,
            id,
            outbound,
            frames,
            reader,
            writer,
        }
    }

    #[must_use]
    pub fn addr(&self) -> &Address {
        &self.addr
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn is_outbound(&self) -> bool {
        self.outbound
    }

    /// Queue an encoded frame. Never waits; a full or closed queue drops
    /// the frame.
    pub fn send(&self, frame: Vec<u8>) -> Result<(), NetError> {
        self.frames
            .try_send(frame)
            .map_err(|_| NetError::WriteFailed(self.addr.clone()))
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn read_loop(
    read_half: OwnedReadHalf,
    addr: Address,
    link: u64,
    events: mpsc::Sender<LinkEvent>,
) {
    let mut reader = BufReader::new(read_half);
    let reason = loop {
        match read_prefixed::<Message, _>(&mut reader).await {
            Ok(message) if message.from != addr => {
                log::warn!(
                    "dropping message from {} claiming to be from {}",
                    addr,
                    message.from
                );
            }
            Ok(message) => {
                if events
                    .send(LinkEvent::Message { link, message })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(e) if e.is_closed() => break "connection closed".to_string(),
            Err(e) => break NetError::DecodeFailed(e).to_string(),
        }
    };

    let _ = events.send(LinkEvent::Closed { link, addr, reason }).await;
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut queue: mpsc::Receiver<Vec<u8>>,
    addr: Address,
    link: u64,
    events: mpsc::Sender<LinkEvent>,
) {
    while let Some(frame) = queue.recv().await {
        if let Err(e) = write_half.write_all(&frame).await {
            let reason = format!("{}: {}", NetError::WriteFailed(addr.clone()), e);
            let _ = events.send(LinkEvent::Closed { link, addr, reason }).await;
            return;
        }
    }
}
