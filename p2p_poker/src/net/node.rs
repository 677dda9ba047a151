//! The overlay node.
//!
//! A [`Node`] owns the listener, the peer directory, and the game engine,
//! and runs a single control loop that is the only mutator of game state.
//! The loop consumes three queues, one event at a time:
//!
//! - connections whose handshake finished (accepted or dialed)
//! - events from running links (decoded messages, closed links)
//! - local commands from [`NodeHandle`]s, including deal timer firings
//!
//! Handshakes and dials run on tasks of their own so the loop never waits
//! on the network. After every event the engine's effects are executed and
//! a fresh [`GameSnapshot`] is published for readers on other tasks.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{RwLock, mpsc, oneshot},
    time::{MissedTickBehavior, interval, timeout},
};

use super::{
    commands::{Connection, NodeMessage, Responder},
    directory::PeerDirectory,
    errors::{NetError, NodeError},
    link::{self, LinkEvent, PeerLink, PendingLink},
    messages::{Message, Payload},
    protocol_version::{GameVariant, Handshake, PROTOCOL_VERSION},
    utils::encode_frame,
};
use crate::{
    game::{
        Effect, GameEngine,
        entities::{Address, GameSnapshot, PlayerAction},
    },
    table::TableConfig,
};

pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(5);

const COMMAND_QUEUE_SIZE: usize = 64;
const CONNECTION_QUEUE_SIZE: usize = 64;
const EVENT_QUEUE_SIZE: usize = 1024;

/// Node configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfig {
    /// Protocol version announced in the handshake
    pub version: String,

    /// Game variant announced in the handshake
    pub variant: GameVariant,

    /// Declared listen address. Port 0 picks a free port.
    pub listen_addr: Address,

    /// Give up on a dial after this long
    pub dial_timeout: Duration,

    /// How often the control loop logs its status line
    pub status_interval: Duration,

    pub table: TableConfig,
}

impl NodeConfig {
    #[must_use]
    pub fn new(listen_addr: impl Into<Address>) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            variant: GameVariant::default(),
            listen_addr: listen_addr.into(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            status_interval: DEFAULT_STATUS_INTERVAL,
            table: TableConfig::default(),
        }
    }
}

/// Cloneable front for a running [`Node`].
#[derive(Clone, Debug)]
pub struct NodeHandle {
    address: Address,
    commands: mpsc::Sender<NodeMessage>,
    snapshot: Arc<RwLock<GameSnapshot>>,
    directory: PeerDirectory,
}

impl NodeHandle {
    /// The node's declared listen address.
    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    async fn request(
        &self,
        build: impl FnOnce(Responder) -> NodeMessage,
    ) -> Result<(), NodeError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| NetError::NodeClosed)?;
        rx.await.map_err(|_| NetError::NodeClosed)?
    }

    pub async fn set_ready(&self) -> Result<(), NodeError> {
        self.request(|response| NodeMessage::SetReady { response })
            .await
    }

    pub async fn take_action(&self, action: PlayerAction) -> Result<(), NodeError> {
        self.request(|response| NodeMessage::TakeAction { action, response })
            .await
    }

    /// Dial `addr`. Returns once the handshake finished.
    pub async fn connect(&self, addr: Address) -> Result<(), NodeError> {
        self.request(|response| NodeMessage::Connect { addr, response })
            .await
    }

    /// The game state as of the last processed event.
    pub async fn snapshot(&self) -> GameSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Addresses of every connected peer.
    pub async fn peers(&self) -> Vec<Address> {
        self.directory.addresses().await
    }

    pub async fn shutdown(&self) -> Result<(), NodeError> {
        self.commands
            .send(NodeMessage::Shutdown)
            .await
            .map_err(|_| NetError::NodeClosed)?;
        Ok(())
    }
}

pub struct Node {
    config: NodeConfig,
    address: Address,
    listener: TcpListener,
    engine: GameEngine,
    directory: PeerDirectory,
    snapshot: Arc<RwLock<GameSnapshot>>,
    connections_tx: mpsc::Sender<Connection>,
    connections: mpsc::Receiver<Connection>,
    events_tx: mpsc::Sender<LinkEvent>,
    events: mpsc::Receiver<LinkEvent>,
    /// Weak so that dropping every handle stops the loop.
    commands_tx: mpsc::WeakSender<NodeMessage>,
    commands: mpsc::Receiver<NodeMessage>,
    /// Dials whose handshake hasn't finished yet, with every caller
    /// waiting on each.
    dialing: HashMap<Address, Vec<Responder>>,
    next_link_id: u64,
}

impl Node {
    /// Bind the listener. The node does nothing until [`Node::run`] is
    /// spawned.
    pub async fn bind(mut config: NodeConfig) -> Result<(Self, NodeHandle), NetError> {
        let listener = TcpListener::bind(config.listen_addr.bind_target())
            .await
            .map_err(|source| NetError::BindFailed {
                addr: config.listen_addr.clone(),
                source,
            })?;

        if config.listen_addr.port() == Some(0) {
            let local = listener
                .local_addr()
                .map_err(|source| NetError::BindFailed {
                    addr: config.listen_addr.clone(),
                    source,
                })?;
            config.listen_addr = config.listen_addr.with_port(local.port());
        }

        let address = config.listen_addr.clone();
        let engine = GameEngine::new(address.clone(), config.table.clone());
        let snapshot = Arc::new(RwLock::new(engine.snapshot()));
        let directory = PeerDirectory::new();

        let (connections_tx, connections) = mpsc::channel(CONNECTION_QUEUE_SIZE);
        let (events_tx, events) = mpsc::channel(EVENT_QUEUE_SIZE);
        let (commands_tx, commands) = mpsc::channel(COMMAND_QUEUE_SIZE);

        let handle = NodeHandle {
            address: address.clone(),
            commands: commands_tx.clone(),
            snapshot: Arc::clone(&snapshot),
            directory: directory.clone(),
        };

        let node = Self {
            config,
            address,
            listener,
            engine,
            directory,
            snapshot,
            connections_tx,
            connections,
            events_tx,
            events,
            commands_tx: commands_tx.downgrade(),
            commands,
            dialing: HashMap::new(),
            next_link_id: 0,
        };

        Ok((node, handle))
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Run the control loop until shut down or every handle is dropped.
    pub async fn run(mut self) {
        log::info!(
            "[{}] listening ({}, {})",
            self.address,
            self.config.version,
            self.config.variant
        );

        let mut status = interval(self.config.status_interval);
        status.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        log::debug!("[{}] accepted connection from {}", self.address, peer);
                        self.spawn_handshake(stream);
                    }
                    Err(e) => log::warn!("[{}] accept failed: {}", self.address, e),
                },

                Some(connection) = self.connections.recv() => {
                    self.handle_connection(connection).await;
                }

                Some(event) = self.events.recv() => {
                    self.handle_link_event(event).await;
                }

                command = self.commands.recv() => match command {
                    Some(NodeMessage::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },

                _ = status.tick() => {
                    self.log_status().await;
                }
            }

            self.flush_effects().await;
            self.publish_snapshot().await;
        }

        self.directory.clear().await;
        log::info!("[{}] stopped", self.address);
    }

    fn handshake(&self) -> Handshake {
        Handshake {
            version: self.config.version.clone(),
            variant: self.config.variant,
            phase: self.engine.phase(),
            listen_addr: self.address.clone(),
        }
    }

    /// Run the accept side of the handshake. A peer that stays silent for
    /// longer than the dial timeout is dropped.
    fn spawn_handshake(&self, stream: TcpStream) {
        let ours = self.handshake();
        let handshake_timeout = self.config.dial_timeout;
        let connections = self.connections_tx.clone();
        tokio::spawn(async move {
            let peer = stream
                .peer_addr()
                .map(|a| Address::new(&a.to_string()))
                .unwrap_or_else(|_| Address::new("unknown"));
            let result = match timeout(handshake_timeout, link::handshake(stream, &ours, false))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(NetError::HandshakeTimedOut(peer)),
            };
            let connection = match result {
                Ok(link) => Connection::Established { link, dialed: None },
                Err(error) => Connection::Failed {
                    dialed: None,
                    error,
                },
            };
            let _ = connections.send(connection).await;
        });
    }

    /// Dial `addr` unless it is us or already connected. A caller asking
    /// for an address that is already being dialed waits for that dial.
    async fn dial(&mut self, addr: Address, response: Option<Responder>) {
        if addr == self.address {
            let error = NetError::HandshakeRejected(format!("connection to self ({addr})"));
            respond(response, Err(error.into()));
            return;
        }
        if self.directory.contains(&addr).await {
            log::debug!("[{}] already connected to {}", self.address, addr);
            respond(response, Ok(()));
            return;
        }
        if let Some(waiters) = self.dialing.get_mut(&addr) {
            log::debug!("[{}] already dialing {}", self.address, addr);
            waiters.extend(response);
            return;
        }

        log::info!("[{}] dialing {}", self.address, addr);
        self.dialing
            .insert(addr.clone(), response.into_iter().collect());

        let ours = self.handshake();
        let dial_timeout = self.config.dial_timeout;
        let connections = self.connections_tx.clone();
        tokio::spawn(async move {
            let connection = match link::dial(&addr, &ours, dial_timeout).await {
                Ok(link) => Connection::Established {
                    link,
                    dialed: Some(addr),
                },
                Err(error) => Connection::Failed {
                    dialed: Some(addr),
                    error,
                },
            };
            let _ = connections.send(connection).await;
        });
    }

    async fn handle_connection(&mut self, connection: Connection) {
        match connection {
            Connection::Established { link, dialed } => {
                let waiters = self.take_waiters(dialed.as_ref());
                self.register(link).await;
                for waiter in waiters {
                    respond(Some(waiter), Ok(()));
                }
            }
            Connection::Failed { dialed, error } => {
                let waiters = self.take_waiters(dialed.as_ref());
                log::warn!("[{}] connection failed: {}", self.address, error);
                for waiter in waiters {
                    respond(Some(waiter), Err(error.duplicate().into()));
                }
            }
        }
    }

    fn take_waiters(&mut self, dialed: Option<&Address>) -> Vec<Responder> {
        dialed
            .and_then(|addr| self.dialing.remove(addr))
            .unwrap_or_default()
    }

    /// Start the link's read loop and add the peer to the directory.
    async fn register(&mut self, pending: PendingLink) {
        let addr = pending.addr().clone();
        let outbound = pending.is_outbound();
        let remote_phase = pending.remote().phase;

        let existing = self.directory.is_outbound(&addr).await;
        if let Some(existing_outbound) = existing {
            // Both ends keep the connection dialed by the lower address.
            let keep_outbound = self.address < addr;
            if existing_outbound == keep_outbound || outbound != keep_outbound {
                log::debug!("[{}] dropping duplicate link to {}", self.address, addr);
                return;
            }
            log::debug!("[{}] replacing link to {}", self.address, addr);
        }

        self.next_link_id += 1;
        let link = PeerLink::spawn(pending, self.next_link_id, self.events_tx.clone());
        self.directory.insert(link).await;
        if existing.is_some() {
            return;
        }

        log::info!(
            "[{}] new peer {} ({}, {})",
            self.address,
            addr,
            if outbound { "outbound" } else { "inbound" },
            remote_phase
        );
        self.engine.add_player(&addr);

        if !outbound {
            self.push_peer_list(&addr).await;
        }
    }

    async fn push_peer_list(&self, to: &Address) {
        let peers: Vec<Address> = self
            .directory
            .addresses()
            .await
            .into_iter()
            .filter(|addr| addr != to)
            .collect();
        let message = Message::new(self.address.clone(), Payload::PeerList { peers });

        match encode_frame(&message) {
            Ok(frame) => {
                if let Err(e) = self.directory.send(to, frame).await {
                    log::warn!("[{}] could not send peer list: {}", self.address, e);
                }
            }
            Err(e) => log::error!("[{}] failed to encode peer list: {}", self.address, e),
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Message { message, .. } => self.dispatch(message).await,
            LinkEvent::Closed { link, addr, reason } => {
                if self.directory.remove(&addr, link).await.is_some() {
                    log::info!("[{}] lost peer {}: {}", self.address, addr, reason);
                    self.engine.remove_player(&addr);
                }
            }
        }
    }

    async fn dispatch(&mut self, message: Message) {
        let Message { from, payload } = message;
        log::debug!("[{}] received {} from {}", self.address, payload, from);

        let result = match payload {
            Payload::PeerList { peers } => {
                for peer in peers {
                    self.dial(peer, None).await;
                }
                Ok(())
            }
            Payload::EncryptedDeck { deck } => self.engine.handle_encrypted_deck(&from, deck),
            Payload::PreFlopComplete => self.engine.handle_preflop_complete(&from),
            Payload::Ready => self.engine.handle_ready(&from),
            Payload::PlayerAction(msg) => self.engine.handle_player_action(&from, msg),
        };

        if let Err(e) = result {
            log::warn!("[{}] rejected message from {}: {}", self.address, from, e);
        }
    }

    async fn handle_command(&mut self, command: NodeMessage) {
        match command {
            NodeMessage::SetReady { response } => {
                let _ = response.send(self.engine.set_ready().map_err(NodeError::from));
            }
            NodeMessage::TakeAction { action, response } => {
                let _ = response.send(self.engine.take_action(action).map_err(NodeError::from));
            }
            NodeMessage::Connect { addr, response } => self.dial(addr, Some(response)).await,
            NodeMessage::DealTimerFired { hand } => {
                if let Err(e) = self.engine.on_deal_timer(hand) {
                    log::warn!("[{}] could not deal: {}", self.address, e);
                }
            }
            NodeMessage::Shutdown => {}
        }
    }

    async fn flush_effects(&mut self) {
        for effect in self.engine.drain_effects() {
            match effect {
                Effect::Broadcast { to, payload } => self.broadcast(&to, payload).await,
                Effect::ArmDealTimer { hand, delay } => self.arm_deal_timer(hand, delay),
            }
        }
    }

    async fn broadcast(&self, to: &[Address], payload: Payload) {
        let message = Message::new(self.address.clone(), payload);
        let frame = match encode_frame(&message) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("[{}] failed to encode {}: {}", self.address, message.payload, e);
                return;
            }
        };
        let sent = self.directory.broadcast(to, &frame).await;
        log::debug!(
            "[{}] sent {} to {}/{} peers",
            self.address,
            message.payload,
            sent,
            to.len()
        );
    }

    fn arm_deal_timer(&self, hand: u64, delay: Duration) {
        let Some(commands) = self.commands_tx.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(NodeMessage::DealTimerFired { hand }).await;
        });
    }

    async fn publish_snapshot(&self) {
        *self.snapshot.write().await = self.engine.snapshot();
    }

    async fn log_status(&self) {
        let players: Vec<String> = self.engine.roster().iter().map(ToString::to_string).collect();
        log::info!(
            "[{}] phase: {}, dealer: {}, turn: {}, hand: {}, peers: {}, players: [{}], table: {}",
            self.address,
            self.engine.phase(),
            self.engine.dealer(),
            self.engine
                .turn()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            self.engine.hand(),
            self.directory.len().await,
            players.join(", "),
            self.engine.table()
        );
    }
}

fn respond(response: Option<Responder>, result: Result<(), NodeError>) {
    if let Some(response) = response {
        let _ = response.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GamePhase;

    fn local_config() -> NodeConfig {
        NodeConfig::new("127.0.0.1:0")
    }

    #[tokio::test]
    async fn bind_resolves_port_zero() {
        let (node, handle) = Node::bind(local_config()).await.unwrap();
        let port = handle.address().port().unwrap();
        assert_ne!(port, 0);
        assert_eq!(node.address(), handle.address());

        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.address.as_ref(), Some(handle.address()));
        assert_eq!(snapshot.phase, GamePhase::Connected);
    }

    #[tokio::test]
    async fn connect_to_self_is_rejected() {
        let (node, handle) = Node::bind(local_config()).await.unwrap();
        tokio::spawn(node.run());

        let err = handle.connect(handle.address().clone()).await.unwrap_err();
        assert!(matches!(
            err,
            NodeError::Net(NetError::HandshakeRejected(_))
        ));
        assert!(handle.peers().await.is_empty());
    }

    #[tokio::test]
    async fn dial_failure_is_reported() {
        let (node, handle) = Node::bind(local_config()).await.unwrap();
        tokio::spawn(node.run());

        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = Address::new(&closed.local_addr().unwrap().to_string());
        drop(closed);

        let err = handle.connect(addr).await.unwrap_err();
        assert!(matches!(err, NodeError::Net(NetError::DialFailed { .. })));
    }

    #[tokio::test]
    async fn silent_peer_fails_every_pending_connect() {
        let mut config = local_config();
        config.dial_timeout = Duration::from_millis(300);
        let (node, handle) = Node::bind(config).await.unwrap();
        tokio::spawn(node.run());

        let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = Address::new(&silent.local_addr().unwrap().to_string());
        let held = tokio::spawn(async move {
            let mut streams = Vec::new();
            while let Ok((stream, _)) = silent.accept().await {
                streams.push(stream);
            }
        });

        let started = tokio::time::Instant::now();
        let (first, second) = tokio::join!(handle.connect(addr.clone()), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.connect(addr.clone()).await
        });
        assert!(started.elapsed() < Duration::from_secs(5));
        for result in [first, second] {
            assert!(matches!(
                result,
                Err(NodeError::Net(NetError::DialFailed { .. }))
            ));
        }
        assert!(handle.peers().await.is_empty());

        // Nothing is left pending, so the next attempt dials again.
        assert!(handle.connect(addr).await.is_err());
        held.abort();
    }

    #[tokio::test]
    async fn silent_inbound_connection_is_dropped() {
        let mut config = local_config();
        config.dial_timeout = Duration::from_millis(200);
        let (node, handle) = Node::bind(config).await.unwrap();
        tokio::spawn(node.run());

        let mut stream = TcpStream::connect(handle.address().dial_target())
            .await
            .unwrap();
        // The node's handshake arrives, then the connection is closed.
        let _: Handshake = crate::net::utils::read_prefixed(&mut stream).await.unwrap();
        let mut rest = Vec::new();
        let read = tokio::time::timeout(
            Duration::from_secs(5),
            tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut rest),
        )
        .await;
        assert!(read.is_ok(), "connection was never closed");
        assert!(handle.peers().await.is_empty());
    }

    #[tokio::test]
    async fn action_without_a_hand_is_out_of_turn() {
        let (node, handle) = Node::bind(local_config()).await.unwrap();
        tokio::spawn(node.run());

        let err = handle.take_action(PlayerAction::Check).await.unwrap_err();
        assert!(matches!(err, NodeError::Game(crate::GameError::OutOfTurn)));
    }

    #[tokio::test]
    async fn shutdown_closes_the_handle() {
        let (node, handle) = Node::bind(local_config()).await.unwrap();
        let task = tokio::spawn(node.run());

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(matches!(
            handle.set_ready().await,
            Err(NodeError::Net(NetError::NodeClosed))
        ));
    }
}
