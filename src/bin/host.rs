use anyhow::{Result, anyhow};
use std::sync::Arc;
use tabinator::bridge::NativeHost;
use tabinator::bridge::client::CALL_TIMEOUT;
use tabinator::core::config::AppConfig;
use tabinator::external::{ClientTimings, ExternalSummaryClient, LoginProbe};
use tabinator::pipeline::SummaryPipeline;
use tabinator::queue::RequestQueue;
use tabinator::transport::{Request, TransportAdapter};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tabinator::setup_logging();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        anyhow!("Config error: {e}")
    })?;
    info!("Starting native host with {:?}", config);

    let host = NativeHost::new(CALL_TIMEOUT);
    let bridge = host.client();

    let client = ExternalSummaryClient::with_timings(
        bridge.clone(),
        config.service_url.clone(),
        ClientTimings {
            timeout: config.summary_timeout,
            ..ClientTimings::default()
        },
    );
    let pipeline = SummaryPipeline::new(
        bridge.clone(),
        bridge.clone(),
        Arc::new(client),
        RequestQueue::with_capacity(config.max_concurrent),
    )
    .with_max_content_chars(config.max_content_chars);

    let adapter = Arc::new(
        TransportAdapter::new(Arc::new(pipeline), bridge)
            .with_request_timeout(config.request_timeout)
            .with_login_probe(LoginProbe::new(config.service_url.clone())?),
    );

    // Settings come from extension storage, so this completes once serve() is reading replies
    let startup = Arc::clone(&adapter);
    tokio::spawn(async move {
        startup.dispatch(Request::ReloadSettings).await;
    });

    host.serve(adapter, tokio::io::stdin(), tokio::io::stdout()).await?;
    info!("Native host stopped");
    Ok(())
}
