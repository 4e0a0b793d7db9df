//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The core builds `HttpRequest`
//! values and interprets `HttpResponse` values; a `Transport` supplied by the
//! host performs the round-trip. Owned `String` / `Vec` fields let values
//! cross the C boundary without lifetime concerns.

use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "X-API-KEY";
pub const ACCEPT: &str = "application/ld+json";
pub const JSON: &str = "application/json";
pub const MERGE_PATCH_JSON: &str = "application/merge-patch+json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// Constructed fresh for every call and never reused.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Build an authenticated request.
    ///
    /// Every request carries the API key and asks for JSON-LD. When a body is
    /// given, PATCH requests are sent as merge-patch JSON and everything else
    /// as plain JSON.
    pub fn build(
        method: HttpMethod,
        url: impl Into<String>,
        api_key: &str,
        body: Option<&serde_json::Value>,
    ) -> Self {
        let mut headers = vec![
            (API_KEY_HEADER.to_string(), api_key.to_string()),
            ("Accept".to_string(), ACCEPT.to_string()),
        ];
        let body = body.map(|value| {
            let content_type = match method {
                HttpMethod::Patch => MERGE_PATCH_JSON,
                _ => JSON,
            };
            headers.push(("Content-Type".to_string(), content_type.to_string()));
            value.to_string()
        });
        Self {
            method,
            url: url.into(),
            headers,
            body,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes requests on behalf of the core.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status, and `ApiError::Transport` when no response arrived.
/// Timeouts and cancellation are the implementation's concern.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).send(request)
    }
}
