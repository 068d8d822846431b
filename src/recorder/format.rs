//! Text layout of traffic records.
//!
//! The layout is consumed by people tailing the log and by scripts that
//! grep it, so it is kept stable line for line:
//!
//! ```text
//! ==== REQUEST [req-1718000000000000000] 2024-06-10T08:13:20+00:00 ====
//! POST /chat/completions HTTP/1.1
//! Headers:
//!   Content-Type: application/json
//!   Authorization: Bearer [REDACTED]
//! Body:
//! {"model":"gpt-4o"}
//!
//! ```

use std::borrow::Cow;
use std::fmt::Write as _;

use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode, Version};
use chrono::{Local, SecondsFormat};

/// Response bodies beyond this many bytes are cut in the record.
pub const MAX_LOGGED_BODY: usize = 10_000;

/// Replacement rendered for every request `Authorization` header.
pub const REDACTED_AUTHORIZATION: &str = "Bearer [REDACTED]";

/// Render a request record.
pub fn format_request(
    id: &str,
    method: &Method,
    path: &str,
    version: Version,
    headers: &HeaderMap,
    body: &[u8],
) -> String {
    let mut out = String::with_capacity(256 + body.len());
    let _ = writeln!(out, "==== REQUEST [{}] {} ====", id, timestamp());
    let _ = writeln!(out, "{} {} {}", method, path, version_str(version));
    write_headers(&mut out, headers, true);
    write_body(&mut out, body, None);
    out.push('\n');
    out
}

/// Render a response record for one body unit (whole body or one chunk).
pub fn format_response(
    id: &str,
    version: Version,
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> String {
    let mut out = String::with_capacity(256 + body.len().min(MAX_LOGGED_BODY));
    let _ = writeln!(out, "==== RESPONSE [{}] {} ====", id, timestamp());
    let _ = writeln!(out, "{} {}", version_str(version), status_line(status));
    write_headers(&mut out, headers, false);
    write_body(&mut out, body, Some(MAX_LOGGED_BODY));
    out.push('\n');
    out
}

fn timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_str(), reason),
        None => status.as_str().to_string(),
    }
}

fn write_headers(out: &mut String, headers: &HeaderMap, redact_authorization: bool) {
    out.push_str("Headers:\n");
    for name in headers.keys() {
        let display = canonical_header_name(name);
        if redact_authorization && *name == header::AUTHORIZATION {
            let _ = writeln!(out, "  {}: {}", display, REDACTED_AUTHORIZATION);
            continue;
        }
        for value in headers.get_all(name) {
            let _ = writeln!(out, "  {}: {}", display, String::from_utf8_lossy(value.as_bytes()));
        }
    }
}

fn write_body(out: &mut String, body: &[u8], cap: Option<usize>) {
    if body.is_empty() {
        return;
    }
    match cap {
        Some(cap) if body.len() > cap => {
            let _ = writeln!(out, "Body (truncated to {} bytes):", cap);
            out.push_str(&lossy(&body[..cap]));
            out.push('\n');
            let _ = writeln!(out, "... [{} more bytes]", body.len() - cap);
        }
        _ => {
            out.push_str("Body:\n");
            out.push_str(&lossy(body));
            out.push('\n');
        }
    }
}

fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// `x-request-id` → `X-Request-Id`. Header maps store lowercase names.
pub fn canonical_header_name(name: &HeaderName) -> String {
    let mut out = String::with_capacity(name.as_str().len());
    let mut upper = true;
    for c in name.as_str().chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        upper = c == '-';
    }
    out
}
