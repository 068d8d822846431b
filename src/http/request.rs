//! Request handling and transformation.
//!
//! # Responsibilities
//! - Resolve the correlation id (caller's `X-Request-ID` or a synthesized one)
//! - Derive the upstream URL from the configured base and the inbound URI
//! - Prepare the outbound header set, injecting the upstream credential
//!
//! # Design Decisions
//! - The correlation id is written back into the inbound headers, so it is
//!   both recorded and forwarded upstream
//! - A caller-supplied `Authorization` always wins over the configured key

use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Uri};
use chrono::Utc;

/// Correlation header shared with the caller and the upstream.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Last synthesized id, in nanoseconds since the Unix epoch.
static LAST_REQUEST_NANOS: AtomicU64 = AtomicU64::new(0);

/// Synthesize `req-<nanos>`, strictly increasing for the process lifetime
/// even when two requests land in the same clock tick or the clock steps
/// backwards.
pub fn next_request_id() -> String {
    let now = Utc::now()
        .timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or_default();
    let prev = LAST_REQUEST_NANOS
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |prev| {
            Some(now.max(prev + 1))
        })
        .unwrap_or(now);
    format!("req-{}", now.max(prev + 1))
}

/// Return the caller's `X-Request-ID`, or synthesize one and store it in
/// `headers`.
pub fn ensure_request_id(headers: &mut HeaderMap) -> String {
    if let Some(id) = headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty())
    {
        return id.to_string();
    }

    let id = next_request_id();
    // `req-<digits>` is always a valid header value.
    if let Ok(value) = HeaderValue::from_str(&id) {
        headers.insert(X_REQUEST_ID, value);
    }
    id
}

/// `base_url + path [+ "?" + query]`.
pub fn upstream_url(base_url: &str, uri: &Uri) -> String {
    match uri.query() {
        Some(query) if !query.is_empty() => format!("{}{}?{}", base_url, uri.path(), query),
        _ => format!("{}{}", base_url, uri.path()),
    }
}

/// Outbound headers: everything the caller sent except `Host` (derived
/// from the target URL) and `Transfer-Encoding` (the buffered body is
/// re-framed), plus `Authorization: Bearer <api_key>` when the caller sent
/// no `Authorization` of its own. An empty `Authorization` counts as absent
/// and is replaced.
pub fn forward_headers(inbound: &HeaderMap, api_key: Option<&str>) -> HeaderMap {
    let mut headers = inbound.clone();
    headers.remove(header::HOST);
    headers.remove(header::TRANSFER_ENCODING);

    let has_credential = headers
        .get_all(header::AUTHORIZATION)
        .iter()
        .any(|v| !v.as_bytes().is_empty());

    if !has_credential {
        if let Some(key) = api_key {
            match HeaderValue::from_str(&format!("Bearer {}", key)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Configured api key is not a valid header value");
                }
            }
        }
    }

    headers
}
