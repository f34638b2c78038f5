//! Shared HTTP backend for REST-style vendor APIs.
//!
//! [`HttpBackend`] wraps a `reqwest::Client` that is built on first request,
//! so constructing a connector never touches the network. Every response is
//! returned as `serde_json::Value`; connectors reshape it where needed.
//!
//! ## Error handling
//!
//! Non-2xx responses are parsed for a vendor error message (`error`,
//! `error.message`, `message`, `errors[0]`). If none is found, the raw body
//! becomes the message. Transport failures map to [`BackendError::Request`].

use std::borrow::Cow;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use crate::error::BackendError;

/// How requests are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Bearer(String),
    Header { name: &'static str, value: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Bearer(_) => f.write_str("Bearer(****)"),
            Auth::Header { name, .. } => write!(f, "Header({name}: ****)"),
        }
    }
}

/// HTTP client for one vendor API.
#[derive(Debug)]
pub struct HttpBackend {
    vendor: &'static str,
    base_url: String,
    auth: Auth,
    headers: Vec<(&'static str, String)>,
    client: OnceLock<reqwest::Client>,
}

impl HttpBackend {
    pub fn new(vendor: &'static str, base_url: &str, auth: Auth) -> Self {
        Self {
            vendor,
            // Strip trailing slash for consistent URL construction
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            headers: Vec::new(),
            client: OnceLock::new(),
        }
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn vendor(&self) -> &'static str {
        self.vendor
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the underlying client has been built yet.
    pub fn is_initialized(&self) -> bool {
        self.client.get().is_some()
    }

    fn http(&self) -> Result<&reqwest::Client, BackendError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let built = reqwest::Client::builder()
            .user_agent(concat!("vendor-connectors/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        debug!(vendor = self.vendor, base_url = %self.base_url, "HTTP client initialized");
        // Another task may have won the race; either client is fine.
        let _ = self.client.set(built);
        self.client
            .get()
            .ok_or_else(|| BackendError::Other(format!("{} HTTP client unavailable", self.vendor)))
    }

    /// Full URL for `path`. Absolute URLs pass through; an empty path is the
    /// base URL itself.
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// A request with auth and default headers applied.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BackendError> {
        let mut builder = self.http()?.request(method, self.url(path));
        builder = match &self.auth {
            Auth::None => builder,
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Header { name, value } => builder.header(*name, value),
        };
        for (name, value) in &self.headers {
            builder = builder.header(*name, value);
        }
        Ok(builder)
    }

    /// Send a prepared request and decode the response.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Value, BackendError> {
        let resp = builder.send().await?;
        self.handle_response(resp).await
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, BackendError> {
        let builder = self.request(Method::GET, path)?.query(query);
        self.send(builder).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, BackendError> {
        let builder = self.request(Method::POST, path)?.json(body);
        self.send(builder).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, BackendError> {
        let builder = self.request(Method::PUT, path)?.json(body);
        self.send(builder).await
    }

    /// Returns the JSON body on success (`null` for an empty body), or a
    /// [`BackendError::Vendor`] with the vendor's message on failure.
    async fn handle_response(&self, resp: reqwest::Response) -> Result<Value, BackendError> {
        let status = resp.status();
        let body = resp.text().await?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&body).map_err(|e| {
                BackendError::Protocol(format!("invalid JSON from {}: {e}", self.vendor))
            })
        } else {
            Err(BackendError::Vendor {
                vendor: self.vendor,
                status: status.as_u16(),
                message: error_message(body),
            })
        }
    }
}

/// Percent-encode one URL path segment, so IDs containing `/`, `?` or `#`
/// cannot change the request target.
pub fn segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Pull the most specific error message out of a vendor error body.
fn error_message(body: String) -> String {
    let Ok(v) = serde_json::from_str::<Value>(&body) else {
        return body;
    };
    let candidates = [
        v.pointer("/error/message"),
        v.get("error"),
        v.get("message"),
        v.pointer("/errors/0/message"),
        v.pointer("/errors/0"),
    ];
    let found = candidates
        .into_iter()
        .flatten()
        .find_map(|c| c.as_str().map(String::from));
    found.unwrap_or(body)
}
