//! Relay failures and their client-visible form.
//!
//! Only failures that happen before the status line is committed end up
//! here. Anything after that point (a broken stream, a client that went
//! away) is logged where it happens and cuts the body short.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The inbound body could not be read (client error or read timeout).
    #[error("Error reading request body")]
    ReadBody(#[source] axum::Error),

    /// The outbound request could not be constructed.
    #[error("Error creating proxy request: {0}")]
    BuildRequest(#[source] reqwest::Error),

    /// Transport failure talking to the upstream: refused, timed out, TLS.
    #[error("Error forwarding request to upstream API: {0}")]
    Upstream(#[source] reqwest::Error),

    /// The upstream's buffered body could not be read.
    #[error("Error reading response from upstream API")]
    ReadUpstream(#[source] reqwest::Error),
}

impl RelayError {
    /// Classify a `send()` failure.
    pub fn from_send(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::BuildRequest(err)
        } else {
            Self::Upstream(err)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::ReadBody(_) | Self::BuildRequest(_) | Self::ReadUpstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Log with the correlation id of the failed relay.
    pub fn log(&self, request_id: &str) {
        match self {
            Self::Upstream(e) => {
                metrics::record_upstream_error();
                tracing::error!(
                    request_id = %request_id,
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    error = %e,
                    "Upstream request failed"
                );
            }
            Self::ReadBody(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            }
            Self::BuildRequest(e) | Self::ReadUpstream(e) => {
                tracing::error!(request_id = %request_id, error = %e, "{}", self);
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), format!("{}\n", self)).into_response()
    }
}
