//! Knowledge backend client struct and builder.

use std::time::Duration;

use graphlens_types::TransportError;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::envelope::open_envelope;
use crate::error::{map_http_status, map_reqwest_error};

/// Default backend base URL.
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Locale sent when none is configured.
const DEFAULT_LOCALE: &str = "en-US";

/// Client for the knowledge-graph backend's HTTP API.
///
/// Implements [`QueryBackend`](graphlens_types::QueryBackend), so a
/// `QuerySession` can drive it directly. Non-streaming endpoints answer with
/// a `{code, msg, data}` envelope, which the client unwraps; a non-zero code
/// becomes a [`TransportError`].
///
/// # Example
///
/// ```no_run
/// use graphlens_client::KnowledgeClient;
///
/// let client = KnowledgeClient::new()
///     .base_url("http://localhost:8000")
///     .token("eyJhbGciOi...")
///     .locale("zh-CN");
/// ```
#[derive(Debug, Clone)]
pub struct KnowledgeClient {
    /// API base URL, without a trailing slash.
    pub(crate) base_url: String,
    /// Bearer token sent on every request when set.
    pub(crate) token: Option<String>,
    /// Value of the `accept-language` header.
    pub(crate) locale: String,
    /// Limit for non-streaming requests. Streams are never timed out.
    pub(crate) request_timeout: Option<Duration>,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl KnowledgeClient {
    /// Create a client for a local backend with no token.
    ///
    /// Default base URL: `http://localhost:8000`.
    /// Default locale: `en-US`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            token: None,
            locale: DEFAULT_LOCALE.into(),
            request_timeout: None,
            client: reqwest::Client::new(),
        }
    }

    /// Create a client configured from the environment.
    ///
    /// Reads `GRAPHLENS_BASE_URL`, `GRAPHLENS_TOKEN` and `GRAPHLENS_LOCALE`;
    /// unset or empty variables keep the defaults of [`new`](Self::new).
    #[must_use]
    pub fn from_env() -> Self {
        let mut client = Self::new();
        if let Some(url) = env_var("GRAPHLENS_BASE_URL") {
            client = client.base_url(url);
        }
        if let Some(token) = env_var("GRAPHLENS_TOKEN") {
            client = client.token(token);
        }
        if let Some(locale) = env_var("GRAPHLENS_LOCALE") {
            client = client.locale(locale);
        }
        client
    }

    /// Override the API base URL.
    ///
    /// Useful for testing with a local mock server.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the locale the backend localizes messages into.
    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Bound the duration of non-streaming requests.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, ...).
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Build a full endpoint URL from an API path.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Start a request carrying the headers every endpoint expects.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header("accept-language", &self.locale);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send an enveloped request and decode its `data`.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, TransportError> {
        let builder = match self.request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.request_timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, self.request_timeout))?;

        if !status.is_success() {
            return Err(map_http_status(status, &body));
        }

        open_envelope(&body)
    }
}

impl Default for KnowledgeClient {
    fn default() -> Self {
        Self::new()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
