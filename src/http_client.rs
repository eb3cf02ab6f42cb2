use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{KronosError, Result, TransportError};

/// Body of an outbound request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as `application/json`
    Json(serde_json::Value),
    /// Serialized as `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

/// Transport-agnostic outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Set a header, replacing any previous value
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        self.set_header(name, value)?;
        Ok(self)
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| KronosError::Validation(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| KronosError::Validation(format!("invalid value for header {}: {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }
}

/// Fully buffered response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            KronosError::Serialization(format!("invalid JSON response body: {}", e))
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests on behalf of the client.
///
/// Timeouts and cancellation belong to the implementation; failures come back
/// as [`TransportError`] and are never retried by the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// [`Transport`] over a pooled reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Shared HTTP client with connection pooling
    client: Client,
}

impl ReqwestTransport {
    /// Create a new transport
    pub fn new(
        max_connections: usize,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        tracing::debug!(
            method = %method,
            url = %url,
            "Sending HTTP request"
        );

        let mut builder = self.client.request(method, &url).headers(headers);
        builder = match body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Form(fields)) => builder.form(&fields),
            None => builder,
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = TransportError::from_reqwest(&e);
                tracing::warn!(
                    error_kind = err.kind,
                    error = %e,
                    url = %url,
                    "HTTP request error"
                );
                return Err(err);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        tracing::debug!(
            status = %status,
            "Received HTTP response"
        );

        let body = response.bytes().await.map_err(|e| {
            let err = TransportError::from_reqwest(&e);
            tracing::warn!(
                error_kind = err.kind,
                error = %e,
                url = %url,
                "Failed to read response body"
            );
            err
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::post("https://example.com/x")
            .header("Api-Key", "k")
            .unwrap()
            .json(json!({ "a": 1 }));

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers.get("api-key").unwrap(), "k");
        assert_eq!(request.body, Some(RequestBody::Json(json!({ "a": 1 }))));
    }

    #[test]
    fn test_request_rejects_invalid_header_value() {
        let result = HttpRequest::get("https://example.com").header("X-Test", "line\nbreak");
        assert!(matches!(result, Err(KronosError::Validation(_))));
    }

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::new(StatusCode::OK, r#"{"token":"abc"}"#);
        assert!(response.is_success());
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["token"], "abc");

        let response = HttpResponse::new(StatusCode::UNAUTHORIZED, "nope");
        assert!(!response.is_success());
        assert_eq!(response.text(), "nope");
        assert!(matches!(
            response.json::<serde_json::Value>(),
            Err(KronosError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let transport = ReqwestTransport::new(4, 1, 2).unwrap();

        // Port 9 (discard) on localhost is practically never listening
        let result = transport.send(HttpRequest::get("http://127.0.0.1:9/")).await;
        let err = result.unwrap_err();
        assert!(!err.message.is_empty());
    }
}
