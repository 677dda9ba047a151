//! Local HTTP control surface.
//!
//! Lets the operator sitting at this node play: every action endpoint maps
//! to one call on the node handle. Nothing here talks to other peers
//! directly; the node gossips whatever the engine decides.
//!
//! # Endpoints
//!
//! ```text
//! POST /ready           - Ready for the next hand
//! POST /fold            - Fold in the current betting round
//! POST /check           - Check in the current betting round
//! POST /bet/{value}     - Bet `value` in the current betting round
//! POST /connect/{addr}  - Dial a peer
//! GET  /status          - Game snapshot
//! GET  /peers           - Connected peers
//! GET  /health          - Liveness
//! ```
//!
//! Successful actions answer `{"status": ...}`; rejected ones answer
//! `400 Bad Request` with `{"error": ...}`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use p2p_poker::{Node, NodeConfig};
//! use pp_node::api::{create_router, AppState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (node, handle) = Node::bind(NodeConfig::new(":3000")).await?;
//! tokio::spawn(node.run());
//!
//! let app = create_router(AppState { node: handle });
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod middleware;
pub mod status;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use p2p_poker::NodeHandle;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub node: NodeHandle,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler's result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn bad_request(error: impl ToString) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Create the API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ready", post(actions::ready))
        .route("/fold", post(actions::fold))
        .route("/check", post(actions::check))
        .route("/bet/{value}", post(actions::bet))
        .route("/connect/{addr}", post(actions::connect))
        .route("/status", get(status::status))
        .route("/peers", get(status::peers))
        .route("/health", get(status::health_check))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
