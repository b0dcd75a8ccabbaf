//! HTTP transport for the aggregation API.
//!
//! One call per operation, no retries. Request bodies are XML for POST/PUT
//! and a flat query string for GET; responses come back unparsed.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::errors::{FinicityError, Result};
use crate::xml;

pub const APP_KEY_HEADER: &str = "Finicity-App-Key";
pub const APP_TOKEN_HEADER: &str = "Finicity-App-Token";
pub const MFA_SESSION_HEADER: &str = "MFA-Session";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Status, headers and body of a response, untouched.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a single request. `headers` are added on top of the fixed
    /// content-type and app-key headers.
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        headers: &[(&'static str, String)],
    ) -> Result<RawResponse>;
}

/// Flatten a GET body into query parameters. Only top-level scalars are
/// representable; nulls are dropped.
pub fn query_pairs(body: &Value) -> Result<Vec<(String, String)>> {
    let map = body
        .as_object()
        .ok_or_else(|| FinicityError::Encode("query body must be an object".into()))?;

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(FinicityError::Encode(format!(
                    "query parameter {} must be a scalar",
                    key
                )))
            }
        };
        pairs.push((key.clone(), text));
    }
    Ok(pairs)
}

/// reqwest-backed transport rooted at a fixed base URL.
pub struct HttpTransport {
    base_url: String,
    app_key: String,
    http: Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, app_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, app_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        app_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            base_url,
            app_key: app_key.into(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        headers: &[(&'static str, String)],
    ) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, path.trim_start_matches('/'));

        let mut req = self
            .http
            .request(method.into(), &url)
            .header("Content-Type", "application/xml")
            .header(APP_KEY_HEADER, self.app_key.as_str());

        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }

        match (method, body) {
            (HttpMethod::Post | HttpMethod::Put, Some(body)) => {
                req = req.body(xml::encode(body)?);
            }
            (HttpMethod::Get, Some(body)) => {
                req = req.query(&query_pairs(body)?);
            }
            _ => {}
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(method = method.as_str(), path, "request failed: {}", e);
            FinicityError::Transport(e)
        })?;

        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.text().await?;

        tracing::debug!(method = method.as_str(), path, status, "finicity response");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
