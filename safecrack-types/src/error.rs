//! Error types for all safecrack crates.

use std::time::Duration;

/// Failures below the NDJSON protocol: the request or the byte stream itself.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Response body text, verbatim. Empty for the streaming endpoint,
        /// whose error body is never read.
        body: String,
    },
    /// Network-level error (connection refused, reset mid-stream, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Connecting to the server timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// The body ended before a completion event was seen.
    #[error("stream ended without completion")]
    StreamEnded,
}

impl TransportError {
    /// Whether this error is likely transient and the request can be retried.
    ///
    /// The client never retries on its own; this is a hint for callers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::StreamEnded => true,
            Self::Status { status, .. } => *status >= 500,
        }
    }
}

/// Violations of the NDJSON protocol that abort a stream.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A line was not valid JSON (strict policy only).
    #[error("malformed line: {reason}")]
    MalformedLine {
        /// Parser error message.
        reason: String,
    },
    /// Valid JSON with a missing or unknown `type`, or missing fields (strict policy only).
    #[error("unrecognized event: {reason}")]
    UnrecognizedEvent {
        /// Why the record could not be classified.
        reason: String,
    },
    /// The unterminated tail grew beyond the configured cap.
    #[error("line exceeds {limit} bytes without a newline (buffered {len})")]
    LineTooLong {
        /// Bytes currently buffered.
        len: usize,
        /// Configured cap.
        limit: usize,
    },
}

/// Errors from safe-cracker client operations.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CrackError {
    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Protocol violation.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// The caller cancelled the operation.
    #[error("cancelled")]
    Cancelled,
    /// A response that is not a stream could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The client is misconfigured (missing API key, bad header value, etc.).
    #[error("configuration error: {0}")]
    Config(String),
}

impl CrackError {
    /// Whether this error is likely transient and the request can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(t) if t.is_retryable())
    }

    /// The HTTP status carried by a [`TransportError::Status`], if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_displays_code_and_body() {
        let err = CrackError::from(TransportError::Status {
            status: 401,
            body: "Unauthorized: Invalid API key".into(),
        });
        let msg = err.to_string();
        assert!(msg.contains("401"), "expected status in message: {msg}");
        assert!(msg.contains("Invalid API key"), "expected body in message: {msg}");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn status_is_none_for_other_errors() {
        assert_eq!(CrackError::Cancelled.status(), None);
        assert_eq!(
            CrackError::from(TransportError::StreamEnded).status(),
            None
        );
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = CrackError::from(TransportError::Status {
            status: 503,
            body: String::new(),
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err = CrackError::from(TransportError::Status {
            status: 400,
            body: "actual_combination is required".into(),
        });
        assert!(!err.is_retryable());
    }

    #[test]
    fn protocol_errors_are_not_retryable() {
        let err = CrackError::from(ProtocolError::LineTooLong { len: 10, limit: 4 });
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("4 bytes"));
    }

    #[test]
    fn network_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = TransportError::Network(Box::new(io));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.is_retryable());
    }
}
