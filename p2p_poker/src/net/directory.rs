//! Peer directory.
//!
//! Maps each peer's declared listen address to its running link. Only the
//! node mutates it; everyone else gets read access.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use super::{errors::NetError, link::PeerLink};
use crate::game::entities::Address;

#[derive(Clone, Debug, Default)]
pub struct PeerDirectory {
    links: Arc<RwLock<HashMap<Address, PeerLink>>>,
}

impl PeerDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Known peer addresses, sorted.
    pub async fn addresses(&self) -> Vec<Address> {
        let links = self.links.read().await;
        let mut addrs: Vec<Address> = links.keys().cloned().collect();
        addrs.sort();
        addrs
    }

    pub async fn contains(&self, addr: &Address) -> bool {
        self.links.read().await.contains_key(addr)
    }

    pub async fn len(&self) -> usize {
        self.links.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.links.read().await.is_empty()
    }

    /// Direction of the registered link to `addr`, if any.
    pub async fn is_outbound(&self, addr: &Address) -> Option<bool> {
        self.links.read().await.get(addr).map(PeerLink::is_outbound)
    }

    /// Register a link, returning the one it replaced.
    pub(super) async fn insert(&self, link: PeerLink) -> Option<PeerLink> {
        let mut links = self.links.write().await;
        links.insert(link.addr().clone(), link)
    }

    /// Remove the link to `addr` if it is still link `id`. A link that was
    /// already replaced by a newer one is left alone.
    pub(super) async fn remove(&self, addr: &Address, id: u64) -> Option<PeerLink> {
        let mut links = self.links.write().await;
        match links.get(addr) {
            Some(link) if link.id() == id => links.remove(addr),
            _ => None,
        }
    }

    pub(super) async fn clear(&self) {
        self.links.write().await.clear();
    }

    pub(super) async fn send(&self, addr: &Address, frame: Vec<u8>) -> Result<(), NetError> {
        let links = self.links.read().await;
        let link = links
            .get(addr)
            .ok_or_else(|| NetError::WriteFailed(addr.clone()))?;
        link.send(frame)
    }

    /// Queue `frame` on every link in `to`. Unknown addresses are skipped
    /// and a failed send doesn't affect the others. Returns how many links
    /// accepted the frame.
    pub(super) async fn broadcast(&self, to: &[Address], frame: &[u8]) -> usize {
        let links = self.links.read().await;
        let mut sent = 0;
        for addr in to {
            match links.get(addr) {
                Some(link) => match link.send(frame.to_vec()) {
                    Ok(()) => sent += 1,
                    Err(e) => log::warn!("broadcast: {}", e),
                },
                None => log::debug!("broadcast: skipping unknown peer {}", addr),
            }
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        game::entities::GamePhase,
        net::{
            link::{self, LinkEvent, PendingLink},
            messages::{Message, Payload},
            protocol_version::{GameVariant, Handshake, PROTOCOL_VERSION},
            utils::encode_frame,
        },
    };
    use std::time::Duration;
    use tokio::{net::TcpListener, sync::mpsc};

    fn handshake_for(addr: &str) -> Handshake {
        Handshake {
            version: PROTOCOL_VERSION.to_string(),
            variant: GameVariant::TexasHoldem,
            phase: GamePhase::Connected,
            listen_addr: Address::new(addr),
        }
    }

    /// A pending link from `local` to a peer declaring `remote`, plus the
    /// peer's side of the same connection.
    async fn pending_pair(local: &str, remote: &str) -> (PendingLink, PendingLink) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = Address::new(&listener.local_addr().unwrap().to_string());
        let theirs = handshake_for(remote);
        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            link::handshake(stream, &theirs, false).await.unwrap()
        });
        let ours = link::dial(&target, &handshake_for(local), Duration::from_secs(5))
            .await
            .unwrap();
        (ours, accept.await.unwrap())
    }

    #[tokio::test]
    async fn insert_and_list() {
        let directory = PeerDirectory::new();
        let (events, _rx) = mpsc::channel(16);

        let (to_b, _b) = pending_pair(":3000", ":5000").await;
        let (to_c, _c) = pending_pair(":3000", ":4000").await;
        assert!(directory.insert(PeerLink::spawn(to_b, 1, events.clone())).await.is_none());
        assert!(directory.insert(PeerLink::spawn(to_c, 2, events)).await.is_none());

        assert_eq!(
            directory.addresses().await,
            vec![Address::new(":4000"), Address::new(":5000")]
        );
        assert_eq!(directory.len().await, 2);
        assert_eq!(directory.is_outbound(&Address::new(":4000")).await, Some(true));
    }

    #[tokio::test]
    async fn stale_removal_keeps_newer_link() {
        let directory = PeerDirectory::new();
        let (events, _rx) = mpsc::channel(16);
        let addr = Address::new(":4000");

        let (first, _peer_first) = pending_pair(":3000", ":4000").await;
        let (second, _peer_second) = pending_pair(":3000", ":4000").await;
        directory.insert(PeerLink::spawn(first, 1, events.clone())).await;
        let replaced = directory.insert(PeerLink::spawn(second, 2, events)).await;
        assert_eq!(replaced.map(|link| link.id()), Some(1));

        assert!(directory.remove(&addr, 1).await.is_none());
        assert!(directory.contains(&addr).await);
        assert!(directory.remove(&addr, 2).await.is_some());
        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn broadcast_skips_unknown_peers() {
        let directory = PeerDirectory::new();
        let (events, _rx) = mpsc::channel(16);
        let (to_b, peer_b) = pending_pair(":3000", ":4000").await;
        directory.insert(PeerLink::spawn(to_b, 1, events)).await;

        let (peer_events, mut peer_rx) = mpsc::channel(16);
        let _b = PeerLink::spawn(peer_b, 7, peer_events);

        let frame = encode_frame(&Message::new(Address::new(":3000"), Payload::Ready)).unwrap();
        let sent = directory
            .broadcast(&[Address::new(":4000"), Address::new(":9999")], &frame)
            .await;
        assert_eq!(sent, 1);

        match peer_rx.recv().await.unwrap() {
            LinkEvent::Message { link, message } => {
                assert_eq!(link, 7);
                assert_eq!(message.payload, Payload::Ready);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_to_unknown_peer_fails() {
        let directory = PeerDirectory::new();
        assert!(matches!(
            directory.send(&Address::new(":4000"), vec![]).await,
            Err(NetError::WriteFailed(_))
        ));
    }
}
