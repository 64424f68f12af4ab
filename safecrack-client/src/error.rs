//! Internal error helpers for mapping HTTP/reqwest errors to [`CrackError`].

use std::time::Duration;

use safecrack_types::{CrackError, TransportError};

/// Map a non-success HTTP status to a [`CrackError`].
///
/// The body is kept verbatim; the server sends `{"error": ...}` JSON for
/// 400/401/500 but the client does not interpret it.
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> CrackError {
    TransportError::Status {
        status: status.as_u16(),
        body: body.to_string(),
    }
    .into()
}

/// Map a [`reqwest::Error`] to a [`CrackError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Option<Duration>) -> CrackError {
    if err.is_timeout() {
        TransportError::Timeout(timeout.unwrap_or_default()).into()
    } else if err.is_decode() {
        CrackError::InvalidResponse(err.to_string())
    } else {
        TransportError::Network(Box::new(err)).into()
    }
}
