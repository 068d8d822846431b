//! The relay handler: one inbound request, start to finish.
//!
//! ```text
//! buffer body → correlation id → record request → build outbound
//!     → dispatch → status + headers → body (streamed | buffered) → done
//! ```
//!
//! Everything before the response is returned can still fail cleanly with
//! a 500/502. Once the response is returned the status line belongs to the
//! client and streamed bodies can only be cut short.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{request::Parts, Request},
    response::{IntoResponse, Response},
};

use crate::http::error::RelayError;
use crate::http::request::{ensure_request_id, forward_headers, upstream_url};
use crate::http::response::{
    is_event_stream, passthrough_stream, recorded_stream, response_headers, ResponseMeta,
};
use crate::http::server::AppState;
use crate::lifecycle::RelayGuard;
use crate::observability::metrics;

/// Per-request state, owned by a single handler invocation.
struct RelayContext {
    request_id: String,
    body: Bytes,
    guard: RelayGuard,
}

/// Axum handler mounted on every method and path.
pub async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let guard = state.in_flight.track();
    let (mut parts, body) = request.into_parts();
    let request_id = ensure_request_id(&mut parts.headers);
    let method = parts.method.to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %parts.uri.path(),
        "Relaying request"
    );

    let response = match relay(&state, parts, body, request_id.clone(), guard).await {
        Ok(response) => response,
        Err(e) => {
            e.log(&request_id);
            e.into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), started);
    response
}

async fn relay(
    state: &AppState,
    parts: Parts,
    body: Body,
    request_id: String,
    guard: RelayGuard,
) -> Result<Response, RelayError> {
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(RelayError::ReadBody)?;
    let ctx = RelayContext {
        request_id,
        body,
        guard,
    };

    let config = &state.config;
    if config.logging.log_requests {
        state.recorder.record_request(
            &ctx.request_id,
            &parts.method,
            parts.uri.path(),
            parts.version,
            &parts.headers,
            &ctx.body,
        );
    }

    let url = upstream_url(&config.upstream.base_url, &parts.uri);
    let headers = forward_headers(&parts.headers, config.upstream.api_key.as_deref());

    let upstream = state
        .client
        .request(parts.method, url.as_str())
        .headers(headers)
        .body(ctx.body)
        .send()
        .await
        .map_err(RelayError::from_send)?;

    let status = upstream.status();
    let version = upstream.version();
    let headers = response_headers(upstream.headers());

    tracing::debug!(
        request_id = %ctx.request_id,
        url = %url,
        status = %status,
        "Upstream responded"
    );

    let body = if is_event_stream(&headers) {
        if config.logging.log_responses {
            let meta = ResponseMeta {
                request_id: ctx.request_id,
                version,
                status,
                headers: headers.clone(),
            };
            Body::from_stream(recorded_stream(
                upstream.bytes_stream(),
                meta,
                Arc::clone(&state.recorder),
                ctx.guard,
            ))
        } else {
            Body::from_stream(passthrough_stream(upstream.bytes_stream(), ctx.guard))
        }
    } else {
        let bytes = upstream.bytes().await.map_err(RelayError::ReadUpstream)?;
        if config.logging.log_responses {
            state
                .recorder
                .record_response(&ctx.request_id, version, status, &headers, &bytes);
        }
        Body::from(bytes)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
