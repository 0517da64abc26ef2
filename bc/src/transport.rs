//! HTTP transport seam
//!
//! A single-method trait between the client and the wire so retry behavior
//! can be exercised with scripted responses instead of a live server.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::ClientError;

/// HTTP methods the backend API needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

/// Request payload variants.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Plain JSON body.
    Json(serde_json::Value),
    /// JSON Patch body; carries a distinct content type on the wire.
    JsonPatch(serde_json::Value),
    /// URL-encoded form body (token exchange).
    Form(Vec<(String, String)>),
}

/// An outbound API request before authentication is attached.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub auth: Option<String>,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            auth: None,
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            auth: None,
            body: Some(RequestBody::Json(body)),
        }
    }

    pub fn post_patch(url: impl Into<String>, patch: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            auth: None,
            body: Some(RequestBody::JsonPatch(patch)),
        }
    }

    pub fn patch(url: impl Into<String>, patch: serde_json::Value) -> Self {
        Self {
            method: Method::Patch,
            url: url.into(),
            auth: None,
            body: Some(RequestBody::JsonPatch(patch)),
        }
    }

    pub fn form(url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            auth: None,
            body: Some(RequestBody::Form(fields)),
        }
    }
}

/// A fully-read API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Raw Retry-After header value, when the server sent one.
    pub retry_after: Option<String>,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body, mapping parse failures to `InvalidResponse`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_str(&self.body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// Network-level failure: no HTTP response was received.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The wire boundary. One call in, one response (or connectivity error) out.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Production transport backed by a shared reqwest client.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
            Method::Patch => self.http.patch(&request.url),
        };

        if let Some(auth) = &request.auth {
            builder = builder.header(reqwest::header::AUTHORIZATION, auth);
        }

        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::JsonPatch(value)) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json-patch+json")
                .body(value.to_string()),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await.map_err(|e| TransportError(e.to_string()))?;

        Ok(ApiResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success_bounds() {
        let mut response = ApiResponse {
            status: 200,
            retry_after: None,
            body: String::new(),
        };
        assert!(response.is_success());
        response.status = 299;
        assert!(response.is_success());
        response.status = 300;
        assert!(!response.is_success());
        response.status = 199;
        assert!(!response.is_success());
    }

    #[test]
    fn test_json_parse_error_maps_to_invalid_response() {
        let response = ApiResponse {
            status: 200,
            retry_after: None,
            body: "not json".to_string(),
        };
        let result: Result<serde_json::Value, _> = response.json();
        assert!(matches!(result, Err(ClientError::InvalidResponse(_))));
    }

    #[test]
    fn test_request_constructors() {
        let get = ApiRequest::get("http://example.test/a");
        assert_eq!(get.method, Method::Get);
        assert!(get.body.is_none());

        let post = ApiRequest::post("http://example.test/b", serde_json::json!({"x": 1}));
        assert_eq!(post.method, Method::Post);
        assert!(matches!(post.body, Some(RequestBody::Json(_))));

        let patch = ApiRequest::patch("http://example.test/c", serde_json::json!([]));
        assert_eq!(patch.method, Method::Patch);
        assert!(matches!(patch.body, Some(RequestBody::JsonPatch(_))));
    }
}
