//! Read-only handlers.

use axum::{Json, extract::State, response::IntoResponse};
use p2p_poker::{Address, GameSnapshot};
use serde_json::json;

use super::AppState;

/// The node's game state as of the last processed event.
pub async fn status(State(state): State<AppState>) -> Json<GameSnapshot> {
    Json(state.node.snapshot().await)
}

/// Addresses of every connected peer.
pub async fn peers(State(state): State<AppState>) -> Json<Vec<Address>> {
    Json(state.node.peers().await)
}

/// Health check endpoint for monitoring.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"0.1.0","protocol":"P2P-POKER v0.1-alpha","address":":3000","peers":2,"timestamp":"..."}
/// ```
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let peers = state.node.peers().await.len();
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": p2p_poker::PROTOCOL_VERSION,
        "address": state.node.address(),
        "peers": peers,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
