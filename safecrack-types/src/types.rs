//! Protocol records, request bodies and the API key wrapper.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Header carrying the API key on authenticated endpoints.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Content type of the streaming response body.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Intermediate report emitted while the solver searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Attempts made so far.
    pub attempts: u64,
    /// The combination tried at this attempt (fixed-length digit string).
    pub current_attempt: String,
    /// How many positions of `current_attempt` are correct.
    pub correct_digits: u32,
    /// Length of the combination.
    pub total_digits: u32,
}

impl Progress {
    /// Share of positions already correct, in `[0.0, 1.0]`.
    ///
    /// Returns `0.0` when `total_digits` is zero.
    #[must_use]
    pub fn fraction_correct(&self) -> f64 {
        if self.total_digits == 0 {
            return 0.0;
        }
        (f64::from(self.correct_digits) / f64::from(self.total_digits)).min(1.0)
    }
}

/// Terminal report: the combination was found.
///
/// Also the body of the non-streaming endpoint, which omits the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Total attempts needed.
    pub attempts: u64,
    /// Time the solver spent, as reported by the server.
    pub time_taken: f64,
}

/// One NDJSON record, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// `{"type":"progress", ...}`
    #[serde(rename = "progress")]
    Progress(Progress),
    /// `{"type":"complete", ...}`
    #[serde(rename = "complete")]
    Complete(Completion),
}

impl StreamEvent {
    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// Request body for both crack endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrackRequest {
    /// The combination the solver should find.
    pub actual_combination: String,
}

impl CrackRequest {
    /// Build a request for `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            actual_combination: target.into(),
        }
    }
}

/// Body of the unauthenticated `GET /` health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// `"connected"` when the service is up.
    pub status: String,
    /// Human-readable banner.
    pub message: String,
    /// Endpoint name to description.
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
}

/// What to do with a line that cannot be classified as a known event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedLinePolicy {
    /// Log and continue with the next line.
    #[default]
    Skip,
    /// Abort the stream with a protocol error.
    Fail,
}

/// An API key. Cannot be displayed, serialized or cloned.
/// Memory is zeroed on drop via [`Zeroizing`].
pub struct ApiKey {
    inner: Zeroizing<String>,
}

impl ApiKey {
    /// Wrap a key. The input string is moved, not copied.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            inner: Zeroizing::new(key.into()),
        }
    }

    /// Scoped exposure. The key is only visible inside the closure.
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.inner)
    }

    /// Length of the key in bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the key is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}
