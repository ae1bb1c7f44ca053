//! Remote API seam: the request shape the data-sync layer sends and the
//! reqwest-backed implementation that talks to the REST API.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use shared::error::ApiErrorBody;
use tracing::{info, warn};
use url::Url;

use crate::error::RemoteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base url, e.g. `v1/dishes/D1`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, RemoteError> {
        let value = serde_json::to_value(body)
            .map_err(|err| RemoteError::transport(format!("failed to encode request body: {err}")))?;
        self.body = Some(value);
        Ok(self)
    }
}

#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, RemoteError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    /// `base_url` must end with `/` for relative paths to join under it;
    /// `Settings::api_base_url` guarantees that.
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self, RemoteError> {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| RemoteError::transport(format!("failed to build http client: {err}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| RemoteError::transport(format!("invalid endpoint path {path}: {err}")))
    }
}

#[async_trait]
impl RemoteApi for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, RemoteError> {
        let url = self.endpoint(&request.path)?;
        info!(method = %request.method, path = %request.path, "api: sending request");

        let mut builder = match request.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Put => self.http.put(url),
            Method::Delete => self.http.delete(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| RemoteError::transport(format!("request failed: {err}")))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| RemoteError::transport(format!("failed to read response: {err}")))?;

        if status.is_success() {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(RemoteError::malformed);
        }

        let err = decode_error(status, &bytes);
        warn!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            kind = ?err.kind,
            "api: request rejected"
        );
        Err(err)
    }
}

fn decode_error(status: StatusCode, bytes: &[u8]) -> RemoteError {
    match serde_json::from_slice::<ApiErrorBody>(bytes) {
        Ok(body) => RemoteError::from_body(status.as_u16(), body),
        Err(_) => {
            let text = String::from_utf8_lossy(bytes);
            let message = if text.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                text.trim().to_string()
            };
            RemoteError::from_status(status.as_u16(), message)
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
