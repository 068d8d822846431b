//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay upstream status and headers to the client
//! - Classify the body as streaming (`text/event-stream`) or buffered
//! - Re-chunk and record streamed bodies without delaying delivery
//!
//! # Design Decisions
//! - Streamed pieces are at most `STREAM_CHUNK_SIZE` bytes and each becomes
//!   its own body frame, which the connection flushes as it is produced
//! - A piece is recorded once the connection asks for the next one, that
//!   is, after it was handed to the client
//! - A failing upstream read ends the body cleanly; the status line is
//!   already out, so there is nothing better to tell the client

use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::{header, HeaderMap, StatusCode, Version};
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};

use crate::lifecycle::RelayGuard;
use crate::observability::metrics;
use crate::recorder::Recorder;

/// Upper bound for one relayed and recorded piece of a streamed body.
pub const STREAM_CHUNK_SIZE: usize = 4096;

/// Headers sent back to the client: all upstream headers except
/// `Transfer-Encoding`, which the serving connection derives itself.
pub fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    headers.remove(header::TRANSFER_ENCODING);
    headers
}

/// Whether the upstream answered with a server-sent event stream.
pub fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("text/event-stream"))
}

/// The part of a response record that is shared by every chunk.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub request_id: String,
    pub version: Version,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

struct RecordedStream<S> {
    upstream: Pin<Box<S>>,
    pending: Bytes,
    delivered: Option<Bytes>,
    finished: bool,
    meta: ResponseMeta,
    recorder: Arc<Recorder>,
    _guard: RelayGuard,
}

impl<S> RecordedStream<S> {
    fn record_delivered(&mut self) {
        if let Some(chunk) = self.delivered.take() {
            self.recorder.record_response(
                &self.meta.request_id,
                self.meta.version,
                self.meta.status,
                &self.meta.headers,
                &chunk,
            );
        }
    }
}

/// Relay `upstream` in pieces of at most [`STREAM_CHUNK_SIZE`] bytes,
/// writing one response record per piece. The guard is held until the
/// stream ends or the client goes away.
pub fn recorded_stream<S, E>(
    upstream: S,
    meta: ResponseMeta,
    recorder: Arc<Recorder>,
    guard: RelayGuard,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = RecordedStream {
        upstream: Box::pin(upstream),
        pending: Bytes::new(),
        delivered: None,
        finished: false,
        meta,
        recorder,
        _guard: guard,
    };

    stream::unfold(state, |mut state| async move {
        state.record_delivered();

        loop {
            if !state.pending.is_empty() {
                let len = state.pending.len().min(STREAM_CHUNK_SIZE);
                let piece = state.pending.split_to(len);
                metrics::record_stream_chunk(piece.len());
                state.delivered = Some(piece.clone());
                return Some((Ok(piece), state));
            }

            if state.finished {
                return None;
            }

            match state.upstream.next().await {
                Some(Ok(bytes)) => state.pending = bytes,
                Some(Err(e)) => {
                    tracing::warn!(
                        request_id = %state.meta.request_id,
                        error = %e,
                        "Upstream stream failed; ending relay"
                    );
                    state.finished = true;
                }
                None => state.finished = true,
            }
        }
    })
}

/// Plain pass-through used when responses are not recorded. The guard is
/// held until the body is dropped.
pub fn passthrough_stream<S>(upstream: S, guard: RelayGuard) -> impl Stream<Item = S::Item> + Send + 'static
where
    S: Stream + Send + 'static,
{
    upstream.map(move |item| {
        let _held = &guard;
        item
    })
}
