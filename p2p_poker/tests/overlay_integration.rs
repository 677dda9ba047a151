//! Integration tests: several nodes over loopback TCP forming a mesh and
//! playing through the first betting round.

use p2p_poker::{
    Address, GameError, GamePhase, GameSnapshot, NetError, Node, NodeConfig, NodeError,
    NodeHandle, PlayerAction, net::protocol_version::GameVariant,
};
use std::time::Duration;
use tokio::time::{Instant, sleep};

const DEADLINE: Duration = Duration::from_secs(10);

fn local_config() -> NodeConfig {
    let mut config = NodeConfig::new("127.0.0.1:0");
    config.table.deal_delay = Duration::from_millis(300);
    config.status_interval = Duration::from_secs(60);
    config
}

async fn start(config: NodeConfig) -> NodeHandle {
    let (node, handle) = Node::bind(config).await.unwrap();
    tokio::spawn(node.run());
    handle
}

/// Poll `handle` until `check` holds or the deadline passes.
async fn eventually<F>(handle: &NodeHandle, what: &str, check: F)
where
    F: Fn(&GameSnapshot, &[Address]) -> bool,
{
    let deadline = Instant::now() + DEADLINE;
    loop {
        let snapshot = handle.snapshot().await;
        let peers = handle.peers().await;
        if check(&snapshot, &peers) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "{} never saw {}: {:?} peers {:?}",
            handle.address(),
            what,
            snapshot,
            peers
        );
        sleep(Duration::from_millis(20)).await;
    }
}

async fn all_eventually<F>(handles: &[NodeHandle], what: &str, check: F)
where
    F: Fn(&GameSnapshot, &[Address]) -> bool,
{
    for handle in handles {
        eventually(handle, what, &check).await;
    }
}

/// Three nodes joined through one introduction each, sorted by address.
async fn mesh_of_three() -> Vec<NodeHandle> {
    let a = start(local_config()).await;
    let b = start(local_config()).await;
    let c = start(local_config()).await;

    b.connect(a.address().clone()).await.unwrap();
    c.connect(b.address().clone()).await.unwrap();

    let mut handles = vec![a, b, c];
    all_eventually(&handles, "a full mesh", |snapshot, peers| {
        peers.len() == 2 && snapshot.players.len() == 3
    })
    .await;

    handles.sort_by(|x, y| x.address().cmp(y.address()));
    handles
}

fn is_turn_of(addr: &Address) -> impl Fn(&GameSnapshot, &[Address]) -> bool + '_ {
    move |snapshot: &GameSnapshot, _: &[Address]| snapshot.turn.as_ref() == Some(addr)
}

#[tokio::test]
async fn peer_list_completes_the_mesh() {
    let handles = mesh_of_three().await;
    let lowest = handles[0].address().clone();

    for handle in &handles {
        let snapshot = handle.snapshot().await;
        let mut expected: Vec<Address> = handles.iter().map(|h| h.address().clone()).collect();
        expected.sort();
        assert_eq!(snapshot.players, expected);
        assert_eq!(snapshot.dealer, Some(lowest.clone()));
        assert_eq!(snapshot.phase, GamePhase::Connected);
    }
}

#[tokio::test]
async fn three_nodes_play_the_first_betting_round() {
    let handles = mesh_of_three().await;
    let (dealer, first, second) = (&handles[0], &handles[1], &handles[2]);

    first.set_ready().await.unwrap();
    second.set_ready().await.unwrap();

    all_eventually(&handles, "pre flop", |snapshot, _| {
        snapshot.phase == GamePhase::PreFlop
    })
    .await;
    all_eventually(&handles, "first seat to act", is_turn_of(first.address())).await;

    for handle in &handles {
        let snapshot = handle.snapshot().await;
        assert_eq!(snapshot.dealer.as_ref(), Some(dealer.address()));
        assert_eq!(snapshot.seats.len(), 3);
        for (position, handle) in handles.iter().enumerate() {
            assert!(
                snapshot
                    .seats
                    .iter()
                    .any(|seat| seat.position == position && &seat.address == handle.address())
            );
        }
    }

    assert!(matches!(
        second.take_action(PlayerAction::Check).await,
        Err(NodeError::Game(GameError::OutOfTurn))
    ));

    first.take_action(PlayerAction::Check).await.unwrap();
    all_eventually(&handles, "second seat to act", is_turn_of(second.address())).await;

    second.take_action(PlayerAction::Check).await.unwrap();
    all_eventually(&handles, "dealer to act", is_turn_of(dealer.address())).await;

    dealer.take_action(PlayerAction::Bet(50)).await.unwrap();
    all_eventually(&handles, "the flop", |snapshot, _| {
        snapshot.phase == GamePhase::Flop
    })
    .await;
    all_eventually(&handles, "first seat to act", is_turn_of(first.address())).await;

    assert!(matches!(
        dealer.take_action(PlayerAction::Check).await,
        Err(NodeError::Game(GameError::OutOfTurn))
    ));
}

#[tokio::test]
async fn variant_mismatch_is_rejected() {
    let a = start(local_config()).await;
    let mut config = local_config();
    config.variant = GameVariant::Other;
    let b = start(config).await;

    let err = b.connect(a.address().clone()).await.unwrap_err();
    assert!(matches!(err, NodeError::Net(NetError::HandshakeRejected(_))));
    assert!(b.peers().await.is_empty());

    sleep(Duration::from_millis(100)).await;
    assert!(a.peers().await.is_empty());
    assert_eq!(a.snapshot().await.players.len(), 1);
}

#[tokio::test]
async fn departing_node_is_forgotten() {
    let handles = mesh_of_three().await;
    let leaving = handles[2].clone();
    let staying = &handles[..2];

    leaving.shutdown().await.unwrap();

    all_eventually(staying, "the departure", |snapshot, peers| {
        peers.len() == 1 && !snapshot.players.contains(leaving.address())
    })
    .await;
}

#[tokio::test]
async fn departing_dealer_hands_over_the_button() {
    let handles = mesh_of_three().await;
    let leaving = handles[0].clone();
    let staying = &handles[1..];
    let successor = staying[0].address().clone();

    leaving.shutdown().await.unwrap();

    all_eventually(staying, "a new dealer", |snapshot, _| {
        snapshot.dealer.as_ref() == Some(&successor)
    })
    .await;
}

#[tokio::test]
async fn connecting_twice_keeps_one_link() {
    let a = start(local_config()).await;
    let b = start(local_config()).await;

    b.connect(a.address().clone()).await.unwrap();
    b.connect(a.address().clone()).await.unwrap();
    a.connect(b.address().clone()).await.unwrap();

    all_eventually(&[a.clone(), b.clone()], "each other", |snapshot, peers| {
        peers.len() == 1 && snapshot.players.len() == 2
    })
    .await;
}
