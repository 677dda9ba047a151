//! P2P poker node with a local HTTP control surface.
//!
//! Binds the overlay listener, dials any configured peers, and serves the
//! control surface until Ctrl+C.

use anyhow::{Context, Error};
use p2p_poker::Node;
use pico_args::Arguments;
use pp_node::{
    api,
    config::{CliOverrides, NodeSettings},
    logging,
};

const HELP: &str = "\
Run a peer-to-peer poker node

USAGE:
  pp_node [OPTIONS]

OPTIONS:
  --listen     ADDR        Overlay listen address        [default: env NODE_LISTEN or :3000]
  --api        IP:PORT     Control surface bind address  [default: env NODE_API_BIND or 127.0.0.1:8080]
  --peer       ADDR        Peer to dial on startup, repeatable  [default: env NODE_PEERS]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  NODE_LISTEN              Overlay listen address (e.g., :3000 or 10.0.0.2:3000)
  NODE_API_BIND            Control surface bind address
  NODE_PEERS               Comma-separated peers to dial on startup
  GAME_VERSION             Protocol version announced in the handshake
  GAME_VARIANT             Game variant announced in the handshake
  TABLE_MAX_SEATS          Seats at the table
  TABLE_MIN_PLAYERS        Ready players needed to deal
  DEAL_DELAY_SECS          Wait before dealing once enough players are ready
  DIAL_TIMEOUT_SECS        Give up on a dial after this long
  STATUS_INTERVAL_SECS     Period of the status log line
  RUST_LOG                 Log filter (e.g., info,p2p_poker=debug)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let overrides = CliOverrides {
        listen: pargs.opt_value_from_str("--listen")?,
        api: pargs.opt_value_from_str("--api")?,
        peers: pargs.values_from_str("--peer")?,
    };

    logging::init();

    let settings = NodeSettings::from_env(overrides)?;
    settings.validate()?;

    let (node, handle) = Node::bind(settings.node_config())
        .await
        .with_context(|| format!("Failed to start node at {}", settings.listen))?;
    tokio::spawn(node.run());
    tracing::info!("Node {} is up", handle.address());

    // Dials run in the background so the control surface comes up at once.
    // A missing peer isn't fatal; others may introduce us later.
    for peer in settings.peers.clone() {
        let handle = handle.clone();
        tokio::spawn(async move {
            match handle.connect(peer.clone()).await {
                Ok(()) => tracing::info!("Connected to {}", peer),
                Err(e) => tracing::warn!("Could not connect to {}: {}", peer, e),
            }
        });
    }

    let app = api::create_router(api::AppState {
        node: handle.clone(),
    });

    let listener = tokio::net::TcpListener::bind(settings.api_bind)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.api_bind))?;

    tracing::info!(
        "Control surface is running at http://{}. Press Ctrl+C to stop.",
        settings.api_bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down node...");
    handle.shutdown().await?;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
