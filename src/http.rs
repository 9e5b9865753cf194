use serde_json::Value as JsonValue;
use url::Url;

use crate::config::GatewayConfig;
use crate::error::{Error, ExecutorFailure};
use crate::request::{ApiResponse, Encoding, Method, RequestDescriptor, ResponseType};
use crate::traits::RequestExecutor;

/// reqwest-backed [`RequestExecutor`].
///
/// Sends each request once, exactly as described. Credentials are the
/// gateway's job.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpExecutor {
    /// Executor with reqwest defaults (no request timeout).
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            http: reqwest::Client::new(),
        }
    }

    /// Executor using the base URL and request timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;
        Ok(Self::new(config.base_url.clone()).with_http_client(http))
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `target`: absolute URLs pass through, paths are
    /// joined onto the base URL.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutorFailure`] without status if the URL is invalid.
    pub fn resolve(&self, target: &str) -> Result<Url, ExecutorFailure> {
        let resolved = if target.starts_with("http://") || target.starts_with("https://") {
            Url::parse(target)
        } else {
            self.base_url.join(target.trim_start_matches('/'))
        };
        resolved.map_err(|e| ExecutorFailure::transport(format!("invalid URL '{target}': {e}")))
    }

    fn build(&self, request: &RequestDescriptor) -> Result<reqwest::RequestBuilder, ExecutorFailure> {
        let url = self.resolve(&request.target)?;
        let mut builder = self.http.request(to_reqwest_method(request.method), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = match request.encoding {
                Encoding::Json => builder.json(body),
                Encoding::Form => builder.form(body),
            };
        }
        Ok(builder)
    }

    /// Maps a 2xx response into an [`ApiResponse`], anything else into a failure.
    async fn read_response(
        response: reqwest::Response,
        response_type: ResponseType,
    ) -> Result<ApiResponse, ExecutorFailure> {
        let status = response.status();

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("request failed");
            // The status line already arrived; a broken body must not hide it.
            return Err(match response.text().await {
                Ok(body) => failure_from_body(status.as_u16(), reason, &body),
                Err(e) => {
                    tracing::debug!(
                        error = %e,
                        status = status.as_u16(),
                        "Failed to read error body"
                    );
                    ExecutorFailure::http(status.as_u16(), reason)
                }
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExecutorFailure::transport(format!("reading response body: {e}")))?;

        match response_type {
            ResponseType::Text => {
                Ok(ApiResponse::new(status.as_u16()).with_data(JsonValue::String(body)))
            }
            ResponseType::Json => Ok(parse_envelope(status.as_u16(), &body)),
        }
    }
}

impl RequestExecutor for HttpExecutor {
    async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse, ExecutorFailure> {
        let builder = self.build(request)?;
        let response = builder.send().await.map_err(|e| {
            tracing::debug!(error = %e, path = %request.target, "Request transport failure");
            ExecutorFailure::transport(e.to_string())
        })?;
        Self::read_response(response, request.response_type).await
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

// `Url::join` drops the last path segment unless the base ends in '/'.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Success body: `{message?, data}` envelopes are unpacked, any other JSON
/// becomes `data` as a whole. Non-JSON bodies are kept as a string.
fn parse_envelope(status: u16, body: &str) -> ApiResponse {
    let mut response = ApiResponse::new(status);
    if body.trim().is_empty() {
        return response;
    }

    let Ok(json) = serde_json::from_str::<JsonValue>(body) else {
        return response.with_data(JsonValue::String(body.to_string()));
    };

    match json {
        JsonValue::Object(mut map) if map.contains_key("data") => {
            response.message = map
                .remove("message")
                .and_then(|m| m.as_str().map(ToString::to_string));
            response.data = map.remove("data").filter(|d| !d.is_null());
        }
        other => response.data = Some(other),
    }
    response
}

fn failure_from_body(status: u16, reason: &str, body: &str) -> ExecutorFailure {
    let Ok(JsonValue::Object(map)) = serde_json::from_str::<JsonValue>(body) else {
        let text = body.trim();
        let message = if text.is_empty() { reason } else { text };
        return ExecutorFailure::http(status, message);
    };

    let message = ["message", "error"]
        .iter()
        .find_map(|key| map.get(*key).and_then(JsonValue::as_str))
        .unwrap_or(reason);
    let details = map.get("errors").or_else(|| map.get("details")).cloned();

    let failure = ExecutorFailure::http(status, message);
    match details {
        Some(details) => failure.with_details(details),
        None => failure,
    }
}
