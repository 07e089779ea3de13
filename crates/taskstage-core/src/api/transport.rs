//! Request/response plumbing between the session client and the network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::ApiError;

/// Identity the client presents to the service.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// A request relative to the service base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(HeaderName, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// How a response steers the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    NotModified,
    AuthExpired,
    Rejected(StatusCode),
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `Set-Cookie` pairs, in arrival order
    pub cookies: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    pub fn with_etag(mut self, etag: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(etag) {
            self.headers.insert(header::ETAG, value);
        }
        self
    }

    pub fn classify(&self) -> ResponseClass {
        match self.status {
            StatusCode::NOT_MODIFIED => ResponseClass::NotModified,
            StatusCode::UNAUTHORIZED => ResponseClass::AuthExpired,
            s if s.is_success() => ResponseClass::Success,
            s => ResponseClass::Rejected(s),
        }
    }

    /// Latest non-empty value of a cookie set by this response.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .rev()
            .find(|(n, v)| n == name && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    pub fn etag(&self) -> Option<String> {
        self.headers
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Sends requests to the service.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );

        // No cookie jar: tokens live in SessionState and are attached per request
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self.client.request(request.method, &url);
        for (name, value) in request.headers {
            let value = HeaderValue::from_str(&value)
                .map_err(|e| ApiError::InvalidRequest(format!("Bad value for {}: {}", name, e)))?;
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let cookies = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let body = response.text().await?;

        debug!(status = %status, bytes = body.len(), "Response received");
        Ok(ApiResponse {
            status,
            headers,
            cookies,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(ApiResponse::new(StatusCode::OK).classify(), ResponseClass::Success);
        assert_eq!(ApiResponse::new(StatusCode::CREATED).classify(), ResponseClass::Success);
        assert_eq!(
            ApiResponse::new(StatusCode::NOT_MODIFIED).classify(),
            ResponseClass::NotModified
        );
        assert_eq!(
            ApiResponse::new(StatusCode::UNAUTHORIZED).classify(),
            ResponseClass::AuthExpired
        );
        assert_eq!(
            ApiResponse::new(StatusCode::FORBIDDEN).classify(),
            ResponseClass::Rejected(StatusCode::FORBIDDEN)
        );
    }

    #[test]
    fn test_cookie_prefers_latest_non_empty() {
        let response = ApiResponse::new(StatusCode::OK)
            .with_cookie("AuthenticationToken", "old")
            .with_cookie("AuthenticationToken", "new")
            .with_cookie("RefreshToken", "");
        assert_eq!(response.cookie("AuthenticationToken"), Some("new"));
        assert_eq!(response.cookie("RefreshToken"), None);
    }

    #[test]
    fn test_etag_and_request_headers() {
        let response = ApiResponse::new(StatusCode::OK).with_etag("W/\"E7\"");
        assert_eq!(response.etag().as_deref(), Some("W/\"E7\""));

        let request = ApiRequest::get("/x").with_header(header::IF_NONE_MATCH, "E7");
        assert_eq!(request.header(&header::IF_NONE_MATCH), Some("E7"));
        assert_eq!(request.header(&header::COOKIE), None);
    }
}
