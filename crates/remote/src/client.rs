//! HTTP client for the automation platform's public REST API.

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use tracing::{debug, info};
use url::Url;

use crate::RemoteError;

/// Header the platform reads the API key from.
pub const API_KEY_HEADER: &str = "x-n8n-api-key";

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, including the version prefix
    /// (for example `http://localhost:5678/api/v1`).
    pub base_url: String,
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5678/api/v1".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Thin wrapper around a configured `reqwest::Client`.
///
/// Cheap to clone; the inner client shares its connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
}

/// Build an [`ApiClient`] from `config`.
///
/// The base URL must parse and use `http` or `https`; the API key must be
/// non-empty and header-safe.
pub fn create_client(config: &ClientConfig) -> Result<ApiClient, RemoteError> {
    let base_url = validate_base_url(&config.base_url)?;

    if config.api_key.trim().is_empty() {
        return Err(RemoteError::InvalidConfig("API key must not be empty".into()));
    }

    let mut default_headers = header::HeaderMap::new();
    let key = header::HeaderValue::from_str(&config.api_key)
        .map_err(|e| RemoteError::InvalidConfig(format!("API key is not a valid header value: {e}")))?;
    default_headers.insert(API_KEY_HEADER, key);
    default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    let http = Client::builder()
        .default_headers(default_headers)
        .timeout(config.timeout)
        .build()?;

    info!("Remote client configured for {} (timeout={:?})", base_url.as_str(), config.timeout);
    Ok(ApiClient { base_url, http })
}

impl ApiClient {
    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build a request for the API path made of `segments`.
    ///
    /// Each segment is percent-encoded on its own, so a `/` inside an id
    /// cannot reach another endpoint.
    pub fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!(%method, %url, "building request");
        self.http.request(method, url)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // http(s) base URLs always have path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Map a non-success response onto a [`RemoteError`].
///
/// `subject` names the resource for not-found errors.
pub(crate) async fn check_status(response: Response, subject: &str) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        404 => Err(RemoteError::NotFound(subject.to_owned())),
        401 | 403 => Err(RemoteError::Unauthorized),
        code => {
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::Rejected {
                status: code,
                message: extract_message(&body),
            })
        }
    }
}

/// The platform wraps errors as `{"message": "..."}`; fall back to the raw body.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}

fn validate_base_url(base: &str) -> Result<Url, RemoteError> {
    let parsed = Url::parse(base.trim_end_matches('/'))
        .map_err(|e| RemoteError::InvalidConfig(format!("invalid base URL '{base}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(RemoteError::InvalidConfig(format!(
                "base URL must use http or https, got '{other}'"
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(RemoteError::InvalidConfig("base URL must include a host".into()));
    }

    Ok(parsed)
}
