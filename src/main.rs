use std::sync::Arc;

use tokio::net::TcpListener;

use api_relay::config::{load_config, ConfigError};
use api_relay::lifecycle::{signals, Shutdown};
use api_relay::observability::{logging, metrics};
use api_relay::{HttpServer, Recorder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config() {
        Ok(config) => config,
        // --help, --version and usage errors print and exit the clap way.
        Err(ConfigError::Args(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    logging::init_logging(&config.observability.log_filter);

    tracing::info!("api-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        upstream = %config.upstream.base_url,
        api_key_configured = config.upstream.api_key.is_some(),
        log_requests = config.logging.log_requests,
        log_responses = config.logging.log_responses,
        log_to_stdout = config.logging.log_to_stdout,
        log_file = ?config.logging.log_file,
        "Configuration loaded"
    );

    if let Some(addr) = config.observability.metrics_address {
        metrics::init_metrics(addr);
    }

    let recorder = Arc::new(Recorder::open(&config.logging)?);

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::forward_signals(shutdown.clone()));

    let server = HttpServer::new(config, Arc::clone(&recorder))?;
    let in_flight = server.in_flight();
    server.run(listener, shutdown).await?;

    let remaining = in_flight.active();
    if remaining > 0 {
        tracing::warn!(remaining, "Closing traffic sinks with relays still running");
    }
    recorder.close();

    tracing::info!("Shutdown complete");
    Ok(())
}
