//! Safe-cracker API client struct and builder.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use safecrack_types::{
    API_KEY_HEADER, ApiKey, Completion, CrackError, CrackRequest, MalformedLinePolicy,
    NDJSON_CONTENT_TYPE, ServiceStatus,
};
use tokio_util::sync::CancellationToken;

use crate::config::{ClientConfig, DEFAULT_BASE_URL};
use crate::dispatch::ProgressSink;
use crate::error::{map_http_status, map_reqwest_error};
use crate::streaming::{
    CrackStream, Phase, Session, StreamOptions, drive, tracked_event_stream,
};

/// Client for the safe-cracker solver API.
///
/// # Example
///
/// ```no_run
/// use safecrack_client::{Progress, SafeCracker};
///
/// # async fn run() -> Result<(), safecrack_client::CrackError> {
/// let client = SafeCracker::new()
///     .base_url("http://localhost:5000")
///     .api_key("dev-safe-cracker-key-12345");
///
/// let result = client
///     .stream_crack("0806666612", |p: Progress| {
///         println!("{}: {}/{}", p.current_attempt, p.correct_digits, p.total_digits);
///     })
///     .await?;
/// println!("cracked in {} attempts", result.attempts);
/// # Ok(())
/// # }
/// ```
pub struct SafeCracker {
    /// API base URL (override for testing or remote solvers).
    pub(crate) base_url: String,
    /// Key sent in the `X-API-Key` header.
    pub(crate) api_key: Option<ApiKey>,
    /// Decoding options applied to every stream.
    pub(crate) options: StreamOptions,
    /// Connect timeout, reported in timeout errors.
    pub(crate) connect_timeout: Option<Duration>,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl SafeCracker {
    /// Create a new client with defaults and no API key.
    ///
    /// Default base URL: `http://localhost:5000`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: None,
            options: StreamOptions::default(),
            connect_timeout: None,
            client: reqwest::Client::new(),
        }
    }

    /// Build a client from `config`, resolving the API key from the environment.
    pub fn from_config(config: &ClientConfig) -> Result<Self, CrackError> {
        let api_key = config.resolve_api_key()?;
        Self::with_config(config, api_key)
    }

    /// Build a client from `config` with an explicitly supplied key.
    pub fn with_config(config: &ClientConfig, api_key: ApiKey) -> Result<Self, CrackError> {
        let connect_timeout = config.connect_timeout();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CrackError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            api_key: Some(api_key),
            options: config.stream_options(),
            connect_timeout,
            client,
        })
    }

    /// Build a client from [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self, CrackError> {
        Self::from_config(&ClientConfig::from_env())
    }

    /// Override the API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(ApiKey::new(key));
        self
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, timeouts).
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Cap on an unterminated NDJSON line. `None` disables the cap.
    #[must_use]
    pub fn max_line_bytes(mut self, limit: Option<usize>) -> Self {
        self.options.max_line_bytes = limit;
        self
    }

    /// What to do with lines that are not a known event.
    #[must_use]
    pub fn malformed_lines(mut self, policy: MalformedLinePolicy) -> Self {
        self.options.malformed_lines = policy;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Build the streaming endpoint URL.
    pub(crate) fn stream_url(&self) -> String {
        self.endpoint("/api/crack_safe/stream")
    }

    /// Build the request/response endpoint URL.
    pub(crate) fn crack_url(&self) -> String {
        self.endpoint("/api/crack_safe/")
    }

    fn api_key_header(&self) -> Result<HeaderValue, CrackError> {
        let key = self
            .api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CrackError::Config("API key not configured".into()))?;
        let mut value = key
            .with_str(HeaderValue::from_str)
            .map_err(|e| CrackError::Config(format!("invalid API key header value: {e}")))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Check that the solver is up. Does not send the API key.
    pub async fn status(&self) -> Result<ServiceStatus, CrackError> {
        let url = self.endpoint("/");
        tracing::debug!(url = %url, "checking solver status");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.connect_timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, self.connect_timeout))?;

        if !status.is_success() {
            return Err(map_http_status(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| CrackError::InvalidResponse(format!("invalid status JSON: {e}")))
    }

    /// Crack `target` without progress reporting.
    pub async fn crack_safe(&self, target: &str) -> Result<Completion, CrackError> {
        let url = self.crack_url();
        let key = self.api_key_header()?;
        tracing::debug!(url = %url, digits = target.len(), "sending crack request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, key)
            .json(&CrackRequest::new(target))
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.connect_timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, self.connect_timeout))?;

        if !status.is_success() {
            return Err(map_http_status(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| CrackError::InvalidResponse(format!("invalid JSON response: {e}")))
    }

    /// Crack `target`, reporting progress to `on_progress` until completion.
    pub async fn stream_crack<P: ProgressSink>(
        &self,
        target: &str,
        on_progress: P,
    ) -> Result<Completion, CrackError> {
        self.stream_crack_with_cancel(target, on_progress, &CancellationToken::new())
            .await
    }

    /// Like [`stream_crack`](Self::stream_crack), stopping once `cancel` fires.
    ///
    /// Cancellation is observed while connecting and between chunk reads.
    pub async fn stream_crack_with_cancel<P: ProgressSink>(
        &self,
        target: &str,
        on_progress: P,
        cancel: &CancellationToken,
    ) -> Result<Completion, CrackError> {
        let mut session = Session::new();
        session.advance(Phase::Connecting);

        let result = async {
            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CrackError::Cancelled),
                response = self.open_stream(target) => response?,
            };
            session.advance(Phase::Streaming);
            drive(response.bytes_stream(), on_progress, self.options, cancel).await
        }
        .await;

        session.settle(result)
    }

    /// Crack `target` and consume the events as a stream.
    ///
    /// Dropping the returned stream abandons the response body.
    pub async fn crack_events(&self, target: &str) -> Result<CrackStream, CrackError> {
        self.crack_events_with_cancel(target, CancellationToken::new())
            .await
    }

    /// Like [`crack_events`](Self::crack_events), stopping once `cancel` fires.
    ///
    /// Cancellation while connecting returns [`CrackError::Cancelled`];
    /// afterwards the stream yields it as its last item.
    pub async fn crack_events_with_cancel(
        &self,
        target: &str,
        cancel: CancellationToken,
    ) -> Result<CrackStream, CrackError> {
        let mut session = Session::new();
        session.advance(Phase::Connecting);

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CrackError::Cancelled),
            response = self.open_stream(target) => response,
        };
        let response = match opened {
            Ok(response) => response,
            Err(e) => return session.settle(Err(e)),
        };

        session.advance(Phase::Streaming);
        Ok(tracked_event_stream(
            response.bytes_stream(),
            self.options,
            cancel,
            session,
        ))
    }

    /// Send the streaming request and check the status before any body is read.
    ///
    /// A non-success response settles with an empty body: the error body may
    /// never terminate, so it is not read.
    async fn open_stream(&self, target: &str) -> Result<reqwest::Response, CrackError> {
        let url = self.stream_url();
        let key = self.api_key_header()?;
        tracing::debug!(url = %url, digits = target.len(), "opening crack stream");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, key)
            .header(ACCEPT, NDJSON_CONTENT_TYPE)
            .json(&CrackRequest::new(target))
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.connect_timeout))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = %status, "crack stream rejected");
            return Err(map_http_status(status, ""));
        }

        Ok(response)
    }
}

impl Default for SafeCracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SafeCracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeCracker")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
