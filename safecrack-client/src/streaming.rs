//! Drives one NDJSON stream from open to settlement.
//!
//! The solver emits one JSON object per line, any number of progress reports
//! followed by exactly one completion:
//! ```text
//! {"type":"progress","attempts":10,"current_attempt":"1000000000","correct_digits":1,"total_digits":10}
//! {"type":"progress","attempts":20,"current_attempt":"1200000000","correct_digits":2,"total_digits":10}
//! {"type":"complete","attempts":55,"time_taken":12.34}
//! ```
//!
//! Two consumers share the framing and decoding:
//! - [`drive`] pushes progress into a [`ProgressSink`] and resolves to the completion.
//! - [`event_stream`] yields every event as a [`Stream`] item.
//!
//! Both stop at the first completion, even if more lines are buffered.

use std::pin::Pin;
use std::time::Instant;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use safecrack_types::{Completion, CrackError, MalformedLinePolicy, StreamEvent, TransportError};
use tokio_util::sync::CancellationToken;

use crate::dispatch::{Dispatch, Dispatcher, ProgressSink, decode_event};
use crate::framer::{DEFAULT_MAX_LINE_BYTES, LineFramer};

/// How a settled operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// A completion event was received.
    Success,
    /// Transport failure, protocol violation, or cancellation.
    Failure,
}

/// Lifecycle of one streaming operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not started.
    Idle,
    /// Request sent, waiting for the status line.
    Connecting,
    /// Success status received, reading the body.
    Streaming,
    /// Terminal.
    Settled(Settlement),
}

impl Phase {
    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Idle, Phase::Connecting)
                | (Phase::Connecting, Phase::Streaming)
                | (Phase::Connecting, Phase::Settled(_))
                | (Phase::Streaming, Phase::Settled(_))
        )
    }
}

/// Tracks the phase of one operation and logs each transition.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    started: Instant,
}

impl Session {
    /// Start in [`Phase::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            started: Instant::now(),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`. Transitions out of a settled phase are ignored.
    pub fn advance(&mut self, next: Phase) {
        if !self.phase.can_advance_to(next) {
            tracing::warn!(from = ?self.phase, to = ?next, "ignoring illegal phase transition");
            return;
        }
        tracing::debug!(
            from = ?self.phase,
            to = ?next,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "stream phase"
        );
        self.phase = next;
    }

    /// Record the outcome of the operation and pass it through.
    pub fn settle<T>(&mut self, result: Result<T, CrackError>) -> Result<T, CrackError> {
        let settlement = match &result {
            Ok(_) => Settlement::Success,
            Err(_) => Settlement::Failure,
        };
        self.advance(Phase::Settled(settlement));
        result
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-stream decoding options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Cap on the unterminated tail. `None` = unbounded.
    pub max_line_bytes: Option<usize>,
    /// What to do with lines that are not a known event.
    pub malformed_lines: MalformedLinePolicy,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            max_line_bytes: Some(DEFAULT_MAX_LINE_BYTES),
            malformed_lines: MalformedLinePolicy::Skip,
        }
    }
}

/// Read `body` until the first completion event.
///
/// Progress reports go to `sink` in arrival order. Cancellation is checked
/// before every read; lines already framed from the current chunk are still
/// dispatched.
///
/// # Errors
///
/// - [`TransportError::Network`] if a read fails.
/// - [`TransportError::StreamEnded`] if the body ends without a completion.
/// - [`CrackError::Protocol`] on a tail over the cap, or a malformed line under
///   [`MalformedLinePolicy::Fail`].
/// - [`CrackError::Cancelled`] once `cancel` fires.
pub async fn drive<S, E, P>(
    body: S,
    sink: P,
    options: StreamOptions,
    cancel: &CancellationToken,
) -> Result<Completion, CrackError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
    P: ProgressSink,
{
    let mut body = std::pin::pin!(body);
    let mut framer = LineFramer::with_limit(options.max_line_bytes);
    let mut dispatcher = Dispatcher::new(sink).with_policy(options.malformed_lines);

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(progress = dispatcher.progress_count(), "stream cancelled");
                return Err(CrackError::Cancelled);
            }
            next = body.next() => next,
        };

        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| TransportError::Network(e.into()))?;

        for line in framer.push(&chunk) {
            if let Dispatch::Complete(completion) = dispatcher.dispatch(&line?)? {
                tracing::debug!(
                    attempts = completion.attempts,
                    progress = dispatcher.progress_count(),
                    "stream completed"
                );
                return Ok(completion);
            }
        }
    }

    if let Some(line) = framer.finish() {
        if let Dispatch::Complete(completion) = dispatcher.dispatch(&line)? {
            tracing::debug!(attempts = completion.attempts, "stream completed on final line");
            return Ok(completion);
        }
    }

    tracing::debug!(
        progress = dispatcher.progress_count(),
        "stream ended without completion"
    );
    Err(TransportError::StreamEnded.into())
}

/// A pull-style stream of events for one operation.
///
/// Yields progress events, then exactly one [`StreamEvent::Complete`], then
/// ends. A failure is yielded as a single `Err` item, after which the stream
/// ends. Dropping the stream abandons the body; to stop it while it is still
/// being polled, use [`event_stream_with_cancel`].
pub struct CrackStream {
    /// The underlying event stream.
    pub receiver: Pin<Box<dyn Stream<Item = Result<StreamEvent, CrackError>> + Send>>,
}

impl std::fmt::Debug for CrackStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrackStream").finish_non_exhaustive()
    }
}

/// Wrap a byte stream into a [`CrackStream`].
pub fn event_stream<S, E>(body: S, options: StreamOptions) -> CrackStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
{
    event_stream_with_cancel(body, options, CancellationToken::new())
}

/// Like [`event_stream`], yielding [`CrackError::Cancelled`] once `cancel` fires.
///
/// Cancellation is checked before every read, as in [`drive`].
pub fn event_stream_with_cancel<S, E>(
    body: S,
    options: StreamOptions,
    cancel: CancellationToken,
) -> CrackStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
{
    // The body is already open.
    let mut session = Session::new();
    session.advance(Phase::Connecting);
    session.advance(Phase::Streaming);
    tracked_event_stream(body, options, cancel, session)
}

/// Build a [`CrackStream`] that settles `session` when it ends.
pub(crate) fn tracked_event_stream<S, E>(
    body: S,
    options: StreamOptions,
    cancel: CancellationToken,
    session: Session,
) -> CrackStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
{
    CrackStream {
        receiver: Box::pin(parse_ndjson_stream(body, options, cancel, session)),
    }
}

fn parse_ndjson_stream<S, E>(
    body: S,
    options: StreamOptions,
    cancel: CancellationToken,
    mut session: Session,
) -> impl Stream<Item = Result<StreamEvent, CrackError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
{
    async_stream::stream! {
        let mut body = std::pin::pin!(body);
        let mut framer = LineFramer::with_limit(options.max_line_bytes);

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                next = body.next() => Some(next),
            };
            let Some(next) = next else {
                yield session.settle(Err(CrackError::Cancelled));
                return;
            };
            let Some(chunk_result) = next else {
                break;
            };

            let chunk = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    yield session.settle(Err(TransportError::Network(e.into()).into()));
                    return;
                }
            };

            for line in framer.push(&chunk) {
                let decoded = line.and_then(|line| decode_event(&line, options.malformed_lines));
                match decoded {
                    Ok(Some(event)) if event.is_terminal() => {
                        yield session.settle(Ok(event));
                        return;
                    }
                    Ok(Some(event)) => {
                        yield Ok(event);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        yield session.settle(Err(e.into()));
                        return;
                    }
                }
            }
        }

        if let Some(line) = framer.finish() {
            match decode_event(&line, options.malformed_lines) {
                Ok(Some(event)) if event.is_terminal() => {
                    yield session.settle(Ok(event));
                    return;
                }
                Ok(Some(event)) => {
                    yield Ok(event);
                }
                Ok(None) => {}
                Err(e) => {
                    yield session.settle(Err(e.into()));
                    return;
                }
            }
        }

        yield session.settle(Err(TransportError::StreamEnded.into()));
    }
}
