//! Request logging middleware.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::logging::log_api_request;

/// Log every request with its status and duration.
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use pp_node::api::middleware::log_requests;
///
/// # async fn example() {
/// let app: Router = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .layer(middleware::from_fn(log_requests));
/// # }
/// ```
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    log_api_request(&method, &path, response.status().as_u16(), duration_ms);
    response
}
