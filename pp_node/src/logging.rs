//! Structured logging configuration.
//!
//! The library logs through the `log` facade; those records are bridged into
//! the tracing subscriber installed here.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,tower_http=warn,hyper=warn";

/// Initialize logging
///
/// Levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use pp_node::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Node starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // `init` also installs the `log` bridge.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a control surface request
pub fn log_api_request(method: &str, path: &str, status_code: u16, duration_ms: u64) {
    if status_code >= 400 {
        tracing::warn!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request rejected"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}
