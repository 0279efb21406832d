/// Tabinator - summarizes open browser tabs through a conversational web service
/// that is only reachable by UI automation.
///
/// This crate is the native-messaging host behind the Tabinator browser extension:
/// 1. The extension forwards popup requests (`getSummary`, `reloadSettings`, ...)
/// 2. A per-tab pipeline checks the cache, extracts page content, and queues an
///    automated session against the external service
/// 3. A bounded queue keeps at most two sessions running; failures fall back to a
///    local extractive summary so every tab ends up with something to show
///
/// # Architecture
///
/// The system uses:
/// - Tokio for the async runtime, timeouts and the queue's worker tasks
/// - tokio-retry for the bounded UI polling loops
/// - serde for the native-messaging wire format
/// - tracing for structured JSON logs on stderr
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tabinator::bridge::NativeHost;
/// use tabinator::core::config::AppConfig;
/// use tabinator::external::ExternalSummaryClient;
/// use tabinator::pipeline::SummaryPipeline;
/// use tabinator::queue::RequestQueue;
/// use tabinator::transport::TransportAdapter;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     tabinator::setup_logging();
///     let config = AppConfig::default();
///
///     let host = NativeHost::new(tabinator::bridge::client::CALL_TIMEOUT);
///     let bridge = host.client();
///     let client = Arc::new(ExternalSummaryClient::new(bridge.clone()));
///     let pipeline = Arc::new(SummaryPipeline::new(
///         bridge.clone(),
///         bridge.clone(),
///         client,
///         RequestQueue::with_capacity(config.max_concurrent),
///     ));
///     let adapter = Arc::new(TransportAdapter::new(pipeline, bridge));
///
///     host.serve(adapter, tokio::io::stdin(), tokio::io::stdout()).await?;
///     Ok(())
/// }
/// ```
// Module declarations
pub mod bridge;
pub mod cache;
pub mod core;
pub mod errors;
pub mod external;
pub mod fallback;
pub mod pipeline;
pub mod prompt;
pub mod queue;
pub mod store;
pub mod tabs;
pub mod transport;

pub use errors::{ErrorKind, SummaryError};
pub use pipeline::SummaryPipeline;
pub use queue::RequestQueue;

/// Configure structured JSON logging on stderr.
///
/// Stdout carries the native-messaging protocol, so nothing else may write there.
/// The level comes from `RUST_LOG` and defaults to `info`. Safe to call more than once.
///
/// # Example
///
/// ```
/// tabinator::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_writer(std::io::stderr);

    // A second call finds a global subscriber already installed; that's fine
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
