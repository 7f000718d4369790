//! HTTP Transport
//!
//! HTTP client interface and implementations used by both session types.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::encoding::{decode_form, form_urlencode, FORM_CONTENT_TYPE};
use crate::error::{ConfigurationError, NetworkError, OAuthError, ProtocolError};

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Methods whose bodies must not carry parameters.
    pub fn forbids_body_params(&self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File attached to a multipart request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name.
    pub field: String,
    /// File name sent to the server.
    pub file_name: String,
    /// Raw content.
    pub content: Vec<u8>,
    /// Content type of the part.
    pub content_type: Option<String>,
}

impl FilePart {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content,
            content_type: None,
        }
    }
}

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Files sent as multipart parts.
    pub files: Vec<FilePart>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            files: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Look up a header, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Set a header, replacing any existing header with the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// Media type of the body without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a form-encoded body and its content type.
    pub fn with_form<K, V>(mut self, params: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.body = Some(form_urlencode(params));
        self.set_header("Content-Type", FORM_CONTENT_TYPE);
        self
    }

    pub fn with_file(mut self, file: FilePart) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP response definition.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Response headers (lowercased names).
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text(status).to_string(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// JSON response with the matching content type.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string()).with_header("content-type", "application/json")
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OAuthError>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    /// Create new transport with default settings.
    pub fn new() -> Result<Self, OAuthError> {
        Self::with_options(Duration::from_secs(30), 10 * 1024 * 1024)
    }

    /// Create transport with custom options.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> Result<Self, OAuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigurationError::HttpClient {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
            max_response_size,
        })
    }

    fn multipart_form(request: &HttpRequest) -> Result<reqwest::multipart::Form, OAuthError> {
        let mut form = reqwest::multipart::Form::new();

        if let Some(fields) = request.body.as_deref().and_then(decode_form) {
            for (name, value) in fields {
                form = form.text(name, value);
            }
        }

        for file in &request.files {
            let mut part = reqwest::multipart::Part::bytes(file.content.clone())
                .file_name(file.file_name.clone());
            if let Some(content_type) = &file.content_type {
                part = part.mime_str(content_type).map_err(|e| {
                    OAuthError::Network(NetworkError::InvalidRequest {
                        message: e.to_string(),
                    })
                })?;
            }
            form = form.part(file.field.clone(), part);
        }

        Ok(form)
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OAuthError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let mut req_builder = self.client.request(method, &request.url);

        let multipart = !request.files.is_empty();
        for (key, value) in &request.headers {
            // reqwest generates the multipart boundary itself
            if multipart && key.eq_ignore_ascii_case("content-type") {
                continue;
            }
            req_builder = req_builder.header(key, value);
        }

        if multipart {
            req_builder = req_builder.multipart(Self::multipart_form(&request)?);
        } else if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        req_builder = req_builder.timeout(timeout);

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                OAuthError::Network(NetworkError::Timeout { timeout })
            } else {
                OAuthError::Network(NetworkError::ConnectionFailed {
                    message: e.to_string(),
                })
            }
        })?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        if (300..400).contains(&status) {
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            return Err(OAuthError::Protocol(ProtocolError::UnexpectedRedirect {
                location,
            }));
        }

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string().to_lowercase(), v.to_string());
            }
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_response_size {
                return Err(OAuthError::Protocol(ProtocolError::ResponseTooLarge {
                    size: len as usize,
                }));
            }
        }

        let body = response.text().await.map_err(|e| {
            OAuthError::Protocol(ProtocolError::InvalidResponse {
                message: e.to_string(),
            })
        })?;

        if body.len() > self.max_response_size {
            return Err(OAuthError::Protocol(ProtocolError::ResponseTooLarge {
                size: body.len(),
            }));
        }

        Ok(HttpResponse {
            status,
            status_text,
            headers,
            body,
        })
    }
}

/// Mock HTTP transport for testing. Responses are returned in the order queued.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    request_history: Mutex<Vec<HttpRequest>>,
    default_response: Mutex<Option<HttpResponse>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response(&self, status: u16, body: &serde_json::Value) -> &Self {
        self.queue_response(HttpResponse::json(status, body))
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        if let Ok(mut default) = self.default_response.lock() {
            *default = Some(response);
        }
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.request_history
            .lock()
            .ok()
            .and_then(|history| history.last().cloned())
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.request_history.lock().map(|h| h.len()).unwrap_or(0)
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OAuthError> {
        if let Ok(mut history) = self.request_history.lock() {
            history.push(request);
        }

        let queued = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());
        let response = queued.or_else(|| {
            self.default_response
                .lock()
                .ok()
                .and_then(|default| default.clone())
        });

        response.ok_or_else(|| {
            OAuthError::Network(NetworkError::ConnectionFailed {
                message: "No mock response available".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_returns_in_order() {
        let transport = MockHttpTransport::new();
        transport.queue_json_response(200, &serde_json::json!({"n": 1}));
        transport.queue_json_response(201, &serde_json::json!({"n": 2}));

        let first = transport.send(HttpRequest::get("https://example.com/1")).await.unwrap();
        let second = transport.send(HttpRequest::get("https://example.com/2")).await.unwrap();
        assert_eq!(first.status, 200);
        assert_eq!(second.status, 201);

        let history = transport.get_requests();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].url, "https://example.com/1");
        assert!(transport.send(HttpRequest::get("https://example.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_transport_default_response() {
        let transport = MockHttpTransport::new();
        transport.set_default_response(HttpResponse::new(204, ""));
        let response = transport.send(HttpRequest::get("https://example.com")).await.unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let mut request = HttpRequest::post("https://example.com")
            .with_header("content-type", "application/x-www-form-urlencoded; charset=UTF-8");
        assert_eq!(
            request.content_type().as_deref(),
            Some("application/x-www-form-urlencoded")
        );

        request.set_header("Content-Type", "application/json");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_with_form_sets_content_type() {
        let request = HttpRequest::post("https://example.com").with_form(&[("a", "1")]);
        assert_eq!(request.body.as_deref(), Some("a=1"));
        assert_eq!(request.header("Content-Type"), Some(FORM_CONTENT_TYPE));
    }

    #[test]
    fn test_http_method() {
        assert_eq!(HttpMethod::Patch.as_str(), "PATCH");
        assert!(HttpMethod::Head.forbids_body_params());
        assert!(!HttpMethod::Post.forbids_body_params());
    }

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::json(200, &serde_json::json!({"ok": true}));
        assert!(response.is_success());
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert!(!HttpResponse::new(401, "").is_success());
    }
}
