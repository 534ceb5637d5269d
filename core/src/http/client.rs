use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value as JsonValue;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::config::RuntimeConfig;

use super::envelope::{ApiFailure, ApiSuccess, Envelope, empty_body, is_truthy};
use super::error::ClientConfigError;
use super::options::{RequestOptions, json_headers, redacted};

/// Environment variable holding the default API base URL.
pub const API_BASE_URL_ENV: &str = "AVA_API_BASE_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the effective base URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseUrlSource {
    /// Set directly through [`ClientConfig::base_url`].
    Explicit,
    /// The `apiServer` override resolved from the widget configuration.
    ApiServer,
    /// The environment-level default.
    Environment,
    /// The origin of the page the widget was loaded from.
    Page,
}

/// Configuration for [`ApiClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub(crate) base_url: Option<(Url, BaseUrlSource)>,
    pub(crate) timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    /// No base URL: request paths must then be absolute URLs.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the base URL request paths are resolved against.
    pub fn base_url(self, url: &str) -> Result<Self, ClientConfigError> {
        self.with_base(url, BaseUrlSource::Explicit)
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL from `apiServer` when the widget configuration has one,
    /// otherwise from `env_default`, otherwise the origin of `page`.
    ///
    /// The page fallback mirrors a browser resolving `/v1/chat` against the
    /// document; pages with an opaque origin (`file:`, `data:`) give no base.
    pub fn for_runtime(
        config: &RuntimeConfig,
        env_default: Option<&str>,
        page: Option<&Url>,
    ) -> Result<Self, ClientConfigError> {
        let base = Self::new();
        if let Some(api_server) = config.api_server.as_deref() {
            return base.with_base(api_server, BaseUrlSource::ApiServer);
        }
        if let Some(default) = env_default.filter(|s| !s.is_empty()) {
            return base.with_base(default, BaseUrlSource::Environment);
        }
        match page.map(Url::origin) {
            Some(origin) if origin.is_tuple() => base.with_base(&origin.ascii_serialization(), BaseUrlSource::Page),
            _ => Ok(base),
        }
    }

    /// Like [`for_runtime`](Self::for_runtime), reading the default from
    /// [`API_BASE_URL_ENV`] (a `.env` file is loaded if present).
    pub fn from_env(config: &RuntimeConfig, page: Option<&Url>) -> Result<Self, ClientConfigError> {
        dotenv::dotenv().ok();
        let env_default = std::env::var(API_BASE_URL_ENV).ok();
        Self::for_runtime(config, env_default.as_deref(), page)
    }

    pub fn base(&self) -> Option<&Url> {
        self.base_url.as_ref().map(|(url, _)| url)
    }

    pub fn base_source(&self) -> Option<BaseUrlSource> {
        self.base_url.as_ref().map(|(_, source)| *source)
    }

    fn with_base(mut self, url: &str, source: BaseUrlSource) -> Result<Self, ClientConfigError> {
        let parsed = Url::parse(url).map_err(|e| ClientConfigError::InvalidBaseUrl {
            url: url.to_string(),
            source: e,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientConfigError::NotABase(url.to_string()));
        }
        self.base_url = Some((parsed, source));
        Ok(self)
    }
}

/// JSON-over-HTTP client producing uniform [`Envelope`]s.
///
/// Cookies received from the backend are kept and sent back on later calls.
#[derive(Clone, Debug)]
pub struct ApiClient {
    config: ClientConfig,
    http_client: Client,
}

impl ApiClient {
    #[instrument(name = "api_client_new", skip(config))]
    pub fn new(config: ClientConfig) -> Result<Self, ClientConfigError> {
        debug!(target: "ava::http", timeout = ?config.timeout, "Building default HTTP client.");
        let http_client = Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .build()
            .map_err(ClientConfigError::ClientBuild)?;
        Ok(Self::with_client(config, http_client))
    }

    /// Uses a caller-provided `reqwest` client as is.
    pub fn with_client(config: ClientConfig, http_client: Client) -> Self {
        debug!(
            target: "ava::http",
            base_url = ?config.base().map(Url::as_str),
            base_source = ?config.base_source(),
            "API client initialized."
        );
        Self { config, http_client }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Resolves `path` against the base URL, or parses it as an absolute URL
    /// when there is no base.
    pub fn resolve_url(&self, path: &str) -> Result<Url, url::ParseError> {
        match self.config.base() {
            Some(base) => base.join(path),
            None => Url::parse(path),
        }
    }

    /// Sends a JSON request and normalizes every outcome into an [`Envelope`].
    ///
    /// 2xx responses become `Ok(ApiSuccess { data })`. Anything else, including
    /// failures to connect, becomes `Err(ApiFailure)`. Response bodies that are
    /// empty or not JSON are read as `{}`; that never fails the call.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request(&self, path: &str, options: RequestOptions) -> Envelope {
        let url = match self.resolve_url(path) {
            Ok(url) => url,
            Err(e) => {
                let failure = ApiFailure::transport(format!("Invalid request URL '{path}': {e}"), None);
                log_failure(path, &failure);
                return Err(failure);
            }
        };
        let headers = match json_headers(&options.headers) {
            Ok(headers) => headers,
            Err(message) => {
                let failure = ApiFailure::transport(message, Some(url.to_string()));
                log_failure(url.as_str(), &failure);
                return Err(failure);
            }
        };
        debug!(
            target: "ava::http",
            url = %url,
            base_source = ?self.config.base_source(),
            headers = ?redacted(&headers),
            "Sending request"
        );

        let mut builder = self.http_client.request(options.method, url.clone()).headers(headers);
        // A falsy body (null, false, 0, "") is left off the request entirely.
        if let Some(body) = options.body.as_ref().filter(|body| is_truthy(body)) {
            builder = builder.body(body.to_string());
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let failure = ApiFailure::transport(e.to_string(), Some(url.to_string()));
                log_failure(url.as_str(), &failure);
                return Err(failure);
            }
        };

        // Classify first; the failure message depends on the parsed body.
        let status = response.status();
        let final_url = response.url().to_string();
        let response_headers = response.headers().clone();
        let data = parse_body(response).await;

        if status.is_success() {
            debug!(target: "ava::http", status = status.as_u16(), "Request successful");
            Ok(ApiSuccess { data })
        } else {
            let failure = ApiFailure::status(status, final_url, &response_headers, data);
            log_failure(url.as_str(), &failure);
            Err(failure)
        }
    }
}

/// Reads a response body as JSON, substituting `{}` for anything unreadable.
async fn parse_body(response: Response) -> JsonValue {
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(target: "ava::http", error = %e, "Failed to read response body");
            return empty_body();
        }
    };
    if bytes.is_empty() {
        return empty_body();
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            debug!(target: "ava::http", error = %e, "Response body is not JSON, using {{}}");
            empty_body()
        }
    }
}

fn log_failure(url: &str, failure: &ApiFailure) {
    if cfg!(debug_assertions) {
        error!(target: "ava::http", %url, status = ?failure.status_code(), error = %failure.error, "Request failed");
    } else {
        debug!(target: "ava::http", %url, status = ?failure.status_code(), error = %failure.error, "Request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, resolve_config};

    #[test]
    fn api_server_beats_environment_default() {
        let runtime = resolve_config(&ConfigSource::from_query("apiServer=http%3A%2F%2Fx"));
        let config = ClientConfig::for_runtime(&runtime, Some("http://env.example"), None).unwrap();
        assert_eq!(config.base().unwrap().as_str(), "http://x/");
        assert_eq!(config.base_source(), Some(BaseUrlSource::ApiServer));
    }

    #[test]
    fn environment_default_is_the_fallback() {
        let runtime = resolve_config(&ConfigSource::from_query(""));
        let config = ClientConfig::for_runtime(&runtime, Some("http://env.example/api/"), None).unwrap();
        assert_eq!(config.base_source(), Some(BaseUrlSource::Environment));

        let config = ClientConfig::for_runtime(&runtime, None, None).unwrap();
        assert!(config.base().is_none());
    }

    #[test]
    fn page_origin_is_the_last_resort() {
        let page = Url::parse("https://widget.example:8443/ava/index.html?preview").unwrap();
        let runtime = resolve_config(&ConfigSource::from_url(&page));

        let config = ClientConfig::for_runtime(&runtime, None, Some(&page)).unwrap();
        assert_eq!(config.base_source(), Some(BaseUrlSource::Page));
        let client = ApiClient::new(config).unwrap();
        assert_eq!(
            client.resolve_url("/v1/chat").unwrap().as_str(),
            "https://widget.example:8443/v1/chat"
        );

        let config = ClientConfig::for_runtime(&runtime, Some("http://env.example"), Some(&page)).unwrap();
        assert_eq!(config.base_source(), Some(BaseUrlSource::Environment));

        let opaque = Url::parse("file:///tmp/widget.html").unwrap();
        let config = ClientConfig::for_runtime(&runtime, None, Some(&opaque)).unwrap();
        assert!(config.base().is_none());
    }

    #[test]
    fn rejects_unusable_base() {
        assert!(matches!(
            ClientConfig::new().base_url("not a url"),
            Err(ClientConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            ClientConfig::new().base_url("mailto:ops@example.com"),
            Err(ClientConfigError::NotABase(_))
        ));
    }

    #[test]
    fn resolves_paths_like_a_browser() {
        let client = ApiClient::new(ClientConfig::new().base_url("http://host.example/app/").unwrap()).unwrap();
        assert_eq!(client.resolve_url("/v1/chat").unwrap().as_str(), "http://host.example/v1/chat");
        assert_eq!(client.resolve_url("chat").unwrap().as_str(), "http://host.example/app/chat");

        let bare = ApiClient::new(ClientConfig::new()).unwrap();
        assert!(bare.resolve_url("/v1/chat").is_err());
        assert_eq!(bare.resolve_url("http://a.example/x").unwrap().as_str(), "http://a.example/x");
    }

    #[tokio::test]
    async fn relative_path_without_base_is_a_failure_envelope() {
        let client = ApiClient::new(ClientConfig::new()).unwrap();
        let failure = client.request("/v1/chat", RequestOptions::post()).await.unwrap_err();
        assert!(failure.error.contains("/v1/chat"));
        assert_eq!(failure.response.data, empty_body());
        assert_eq!(failure.status_code(), None);
    }
}
