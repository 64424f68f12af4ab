//! Client configuration, loadable from serde or the environment.

use std::time::Duration;

use safecrack_types::{ApiKey, CrackError, MalformedLinePolicy};
use serde::{Deserialize, Serialize};

use crate::framer::DEFAULT_MAX_LINE_BYTES;
use crate::streaming::StreamOptions;

/// Default solver base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Environment variable holding the API key, unless overridden.
pub const DEFAULT_API_KEY_ENV: &str = "SAFECRACK_API_KEY";

/// Environment variable overriding the base URL in [`ClientConfig::from_env`].
pub const BASE_URL_ENV: &str = "SAFECRACK_BASE_URL";

/// Settings for [`SafeCracker`](crate::SafeCracker).
///
/// Every field has a default, so a partial document deserializes:
/// ```json
/// { "base_url": "https://solver.internal", "malformed_lines": "fail" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Solver base URL, without the `/api/...` path.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// TCP connect timeout. The stream itself has no overall timeout.
    pub connect_timeout_secs: Option<u64>,
    /// Cap on an unterminated NDJSON line. `None` = unbounded.
    pub max_line_bytes: Option<usize>,
    /// What to do with lines that are not a known event.
    pub malformed_lines: MalformedLinePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key_env: DEFAULT_API_KEY_ENV.into(),
            connect_timeout_secs: None,
            max_line_bytes: Some(DEFAULT_MAX_LINE_BYTES),
            malformed_lines: MalformedLinePolicy::Skip,
        }
    }
}

impl ClientConfig {
    /// Defaults, with the base URL taken from `SAFECRACK_BASE_URL` when set.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.is_empty()) {
            config.base_url = url;
        }
        config
    }

    /// Read the API key from the variable named by `api_key_env`.
    pub fn resolve_api_key(&self) -> Result<ApiKey, CrackError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Like [`resolve_api_key`](Self::resolve_api_key) with a custom variable lookup.
    pub fn resolve_api_key_with(
        &self,
        lookup: impl FnOnce(&str) -> Option<String>,
    ) -> Result<ApiKey, CrackError> {
        match lookup(&self.api_key_env) {
            Some(value) if !value.is_empty() => Ok(ApiKey::new(value)),
            _ => Err(CrackError::Config(format!(
                "env var {} not set",
                self.api_key_env
            ))),
        }
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Decoding options for each stream.
    #[must_use]
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            max_line_bytes: self.max_line_bytes,
            malformed_lines: self.malformed_lines,
        }
    }
}
