//! Player action handlers.
//!
//! Each endpoint forwards to the node and reports the engine's verdict.
//! Game rule violations (out of turn, wrong phase, full table) come back as
//! `400 Bad Request`.
//!
//! # Examples
//!
//! ```bash
//! curl -X POST http://localhost:8080/ready
//! curl -X POST http://localhost:8080/bet/50
//! curl -X POST http://localhost:8080/connect/127.0.0.1:4000
//! ```

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};
use p2p_poker::{Address, NodeError, PlayerAction};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState, bad_request};

#[derive(Debug, Deserialize, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

fn respond(result: Result<(), NodeError>, status: String) -> Result<Json<StatusResponse>, ApiError> {
    match result {
        Ok(()) => Ok(Json(StatusResponse { status })),
        Err(e) => {
            tracing::debug!("action rejected: {}", e);
            Err(bad_request(e))
        }
    }
}

async fn act(state: &AppState, action: PlayerAction) -> Result<Json<StatusResponse>, ApiError> {
    respond(state.node.take_action(action).await, action.to_string())
}

/// Ready for the next hand. Takes a seat if we don't have one yet.
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    respond(state.node.set_ready().await, "READY".to_string())
}

pub async fn fold(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    act(&state, PlayerAction::Fold).await
}

pub async fn check(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    act(&state, PlayerAction::Check).await
}

/// Bet `value` chips. A value that isn't a number is a JSON `400`.
pub async fn bet(
    State(state): State<AppState>,
    value: Result<Path<u32>, PathRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Path(value) = value.map_err(|rejection| bad_request(rejection.body_text()))?;
    act(&state, PlayerAction::Bet(value)).await
}

/// Dial a peer. Answers once the handshake finished.
pub async fn connect(
    State(state): State<AppState>,
    Path(addr): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let addr = Address::new(&addr);
    let status = format!("CONNECTED {addr}");
    respond(state.node.connect(addr).await, status)
}
