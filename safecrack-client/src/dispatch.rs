//! Classifies NDJSON lines and routes them to the progress sink or settles the stream.

use safecrack_types::{Completion, MalformedLinePolicy, Progress, ProtocolError, StreamEvent};

/// Receives progress reports while a stream is open.
///
/// Called inline from the read loop, before the next chunk is requested.
/// Implementations should only record state; slow work here delays delivery
/// of later updates.
pub trait ProgressSink {
    /// Handle one progress report.
    fn on_progress(&mut self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: FnMut(Progress),
{
    fn on_progress(&mut self, progress: Progress) {
        self(progress)
    }
}

/// What [`Dispatcher::dispatch`] did with a line.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A progress report was delivered to the sink.
    Progress,
    /// The completion event settled the stream.
    Complete(Completion),
    /// The line was skipped (malformed, unknown, or after settlement).
    Ignored,
}

/// Parse one line into an event.
///
/// Returns `Ok(None)` for lines the `policy` allows to be skipped.
pub fn decode_event(
    line: &str,
    policy: MalformedLinePolicy,
) -> Result<Option<StreamEvent>, ProtocolError> {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return match policy {
                MalformedLinePolicy::Skip => {
                    tracing::warn!(error = %e, line_len = line.len(), "skipping malformed NDJSON line");
                    Ok(None)
                }
                MalformedLinePolicy::Fail => Err(ProtocolError::MalformedLine {
                    reason: e.to_string(),
                }),
            };
        }
    };

    match serde_json::from_value::<StreamEvent>(value) {
        Ok(event) => Ok(Some(event)),
        Err(e) => match policy {
            MalformedLinePolicy::Skip => {
                tracing::trace!(error = %e, "ignoring unrecognized event");
                Ok(None)
            }
            MalformedLinePolicy::Fail => Err(ProtocolError::UnrecognizedEvent {
                reason: e.to_string(),
            }),
        },
    }
}

/// Routes lines of one stream. Settles at most once.
pub struct Dispatcher<P> {
    sink: P,
    policy: MalformedLinePolicy,
    settled: bool,
    progress_count: u64,
}

impl<P: ProgressSink> Dispatcher<P> {
    /// Create a dispatcher that skips malformed lines.
    pub fn new(sink: P) -> Self {
        Self {
            sink,
            policy: MalformedLinePolicy::Skip,
            settled: false,
            progress_count: 0,
        }
    }

    /// Override the malformed-line policy.
    #[must_use]
    pub fn with_policy(mut self, policy: MalformedLinePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether a completion event has been seen.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Progress reports delivered so far.
    pub fn progress_count(&self) -> u64 {
        self.progress_count
    }

    /// Handle one complete line.
    ///
    /// After the first completion every further line is ignored and the sink
    /// is never called again.
    pub fn dispatch(&mut self, line: &str) -> Result<Dispatch, ProtocolError> {
        if self.settled {
            tracing::trace!("ignoring line after completion");
            return Ok(Dispatch::Ignored);
        }

        match decode_event(line, self.policy)? {
            Some(StreamEvent::Progress(progress)) => {
                self.progress_count += 1;
                self.sink.on_progress(progress);
                Ok(Dispatch::Progress)
            }
            Some(StreamEvent::Complete(completion)) => {
                self.settled = true;
                Ok(Dispatch::Complete(completion))
            }
            None => Ok(Dispatch::Ignored),
        }
    }

    /// Give back the sink.
    pub fn into_sink(self) -> P {
        self.sink
    }
}
