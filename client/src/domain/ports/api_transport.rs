//! Driven port for calling the storefront REST API.
//!
//! The domain owns the request shape and the error taxonomy so coordinators
//! and services stay independent of the HTTP library behind the adapter.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::define_port_error;

/// Path of the login endpoint; it is the only call sent without a bearer token.
pub const LOGIN_PATH: &str = "/users/login";

/// HTTP verbs used by the storefront API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Read a resource.
    Get,
    /// Create a resource or trigger an action.
    Post,
    /// Replace or update a resource.
    Put,
    /// Remove a resource.
    Delete,
}

impl HttpMethod {
    /// Upper-case verb as written on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartValue {
    /// Plain text field.
    Text(String),
    /// File upload.
    File {
        /// File name reported to the server.
        file_name: String,
        /// Optional MIME type, e.g. `image/png`.
        content_type: Option<String>,
        /// Raw file contents.
        bytes: Vec<u8>,
    },
}

/// Named multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartField {
    /// Form field name.
    pub name: String,
    /// Field payload.
    pub value: MultipartValue,
}

impl MultipartField {
    /// Build a text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: MultipartValue::Text(value.into()),
        }
    }

    /// Build a file field.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: MultipartValue::File {
                file_name: file_name.into(),
                content_type,
                bytes,
            },
        }
    }
}

/// Request payload.
///
/// JSON bodies are serialised and sent with `Content-Type: application/json`
/// unless the caller overrides the header; multipart bodies carry their own
/// boundary content type.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured JSON payload.
    Json(Value),
    /// Raw multipart form payload.
    Multipart(Vec<MultipartField>),
}

/// Domain-owned API request passed to the transport adapter.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Path relative to the configured API base, e.g. `/admin/boxes/3`.
    pub path: String,
    /// HTTP verb.
    pub method: HttpMethod,
    /// Optional payload.
    pub body: Option<RequestBody>,
    /// Extra headers; a caller-supplied `Content-Type` wins over the default.
    pub headers: Vec<(String, String)>,
    /// External cancellation signal that aborts the network call.
    pub cancel: Option<CancellationToken>,
    /// Per-request timeout overriding the adapter default.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Build a request with no body.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            body: None,
            headers: Vec::new(),
            cancel: None,
            timeout: None,
        }
    }

    /// `GET path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// `POST path` with a JSON body.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).with_json(body)
    }

    /// `PUT path` with a JSON body.
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, path).with_json(body)
    }

    /// `DELETE path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Attach a multipart body.
    #[must_use]
    pub fn with_multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.body = Some(RequestBody::Multipart(fields));
        self
    }

    /// Add an extra header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Abort the call when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Bound the call by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether this request targets the login endpoint.
    pub fn is_login(&self) -> bool {
        self.path == LOGIN_PATH
    }

    /// Whether the caller supplied its own `Content-Type` header.
    pub fn has_content_type_override(&self) -> bool {
        self.headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
    }
}

define_port_error! {
    /// Errors surfaced by the API transport.
    pub enum ApiError {
        /// The server answered with a non-2xx status.
        Request { status: u16, message: String } => "{message}",
        /// The server answered 401; the session has been cleared.
        SessionExpired { message: String } => "{message}",
        /// The response body was not valid JSON.
        ResponseParse { message: String } => "response parse error: {message}",
        /// Network transport failed before a response arrived.
        Transport { message: String } => "network error, unable to reach server: {message}",
        /// The call exceeded its timeout.
        Timeout { message: String } => "request timed out: {message}",
        /// The caller cancelled the call.
        Cancelled => "request cancelled",
        /// The adapter rejected the request before sending it.
        InvalidRequest { message: String } => "request invalid: {message}",
    }
}

impl ApiError {
    /// HTTP status carried by the error, when the server answered.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::SessionExpired { .. } => Some(401),
            _ => None,
        }
    }
}

/// Port for issuing requests against the storefront API.
///
/// Implementations resolve with the parsed JSON body. An empty body resolves
/// to `{"success": <2xx>}`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Send `request` and return the parsed response body.
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(LOGIN_PATH, true)]
    #[case("/users/login/", false)]
    #[case("/users/me", false)]
    fn login_detection_is_exact(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(ApiRequest::get(path).is_login(), expected);
    }

    #[test]
    fn content_type_override_is_case_insensitive() {
        let request = ApiRequest::post("/comments", json!({}))
            .with_header("content-TYPE", "text/plain");
        assert!(request.has_content_type_override());
        assert!(!ApiRequest::get("/blind-boxes").has_content_type_override());
    }

    #[rstest]
    #[case(ApiError::request(404_u16, "missing"), Some(404))]
    #[case(ApiError::session_expired("expired"), Some(401))]
    #[case(ApiError::transport("refused"), None)]
    #[case(ApiError::cancelled(), None)]
    fn status_reflects_server_answers_only(#[case] error: ApiError, #[case] expected: Option<u16>) {
        assert_eq!(error.status(), expected);
    }

    #[test]
    fn request_error_displays_server_message() {
        let error = ApiError::request(400_u16, "stock must not be negative");
        assert_eq!(error.to_string(), "stock must not be negative");
        assert_eq!(error.kind(), "request");
    }
}
