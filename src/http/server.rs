//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the relay handler on every path
//! - Wire up middleware (tracing, inbound body read timeout)
//! - Build the upstream client with the round-trip timeout
//! - Serve until the shutdown signal, letting open connections finish
//!   within the drain deadline

use std::future::IntoFuture;
use std::sync::Arc;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tower_http::{timeout::RequestBodyTimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::relay::relay_handler;
use crate::lifecycle::{InFlight, Shutdown};
use crate::recorder::Recorder;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub client: reqwest::Client,
    pub recorder: Arc<Recorder>,
    pub in_flight: InFlight,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and recorder.
    pub fn new(config: ProxyConfig, recorder: Arc<Recorder>) -> Result<Self, reqwest::Error> {
        let client = Self::build_client(&config)?;

        let state = AppState {
            config: Arc::new(config),
            client,
            recorder,
            in_flight: InFlight::new(),
        };

        let router = Self::build_router(&state);
        Ok(Self { router, state })
    }

    /// One client for the process lifetime; pooling is whatever reqwest does.
    fn build_client(config: &ProxyConfig) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder().timeout(config.timeouts.upstream());
        if !config.upstream.use_system_proxy {
            builder = builder.no_proxy();
        }
        builder.build()
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: &AppState) -> Router {
        Router::new()
            .route("/", any(relay_handler))
            .route("/{*path}", any(relay_handler))
            .with_state(state.clone())
            .layer(RequestBodyTimeoutLayer::new(state.config.timeouts.client_read()))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving the relay without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Tracker of relays still in progress; used as the shutdown drain barrier.
    pub fn in_flight(&self) -> InFlight {
        self.state.in_flight.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.state.config
    }

    /// Run the server until `shutdown` fires, then let open connections
    /// finish for at most `timeouts.drain_secs`. Connections still open at
    /// the deadline are abandoned and their relays left in flight.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let deadline = self.state.config.timeouts.drain();
        let in_flight = self.state.in_flight.clone();
        tracing::info!(
            address = %addr,
            upstream = %self.state.config.upstream.base_url,
            "HTTP server starting"
        );

        let graceful = shutdown.clone();
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { graceful.wait().await })
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => result?,
            _ = shutdown.wait() => {
                tracing::info!(
                    in_flight = in_flight.active(),
                    deadline_secs = deadline.as_secs(),
                    "Draining open connections"
                );
                match tokio::time::timeout(deadline, &mut serve).await {
                    Ok(result) => result?,
                    Err(_) => tracing::warn!(
                        in_flight = in_flight.active(),
                        "Drain deadline passed, abandoning open connections"
                    ),
                }
            }
        }

        tracing::info!(in_flight = in_flight.active(), "HTTP server stopped");
        Ok(())
    }
}
