//! Reqwest-backed storefront API transport.
//!
//! This adapter owns transport details only: URL joining, bearer and
//! content-type headers, body serialisation, timeout and cancellation, status
//! mapping and JSON decoding. It is also the single place that reacts to a
//! `401` by clearing the session and scheduling the login redirect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::domain::Session;
use crate::domain::ports::{
    ApiError, ApiRequest, ApiTransport, HttpMethod, LoginRedirect, MultipartField,
    MultipartValue, Notice, Notifier, RequestBody, SessionKey, SessionStore, Sleeper,
};

/// Notice shown when the server ends the session.
pub const SESSION_EXPIRED_NOTICE: &str = "session expired, please log in again";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(1000);
const APPLICATION_JSON: &str = "application/json";

/// Base URL and timing settings for [`HttpApiClient`].
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// API root every request path is appended to, e.g. `http://host/api`.
    pub base: Url,
    /// Timeout applied to requests that do not set their own.
    pub request_timeout: Duration,
    /// Delay between a `401` and the login redirect.
    pub redirect_delay: Duration,
}

impl HttpApiConfig {
    /// Settings with default timings for `base`.
    pub fn new(base: Url) -> Self {
        Self {
            base,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }
}

/// Collaborators the transport drives as side effects.
#[derive(Clone)]
pub struct HttpApiPorts {
    /// Source of the bearer token; cleared on `401`.
    pub session: Arc<dyn SessionStore>,
    /// Receives a notice for every failure.
    pub notifier: Arc<dyn Notifier>,
    /// Invoked after the redirect delay following a `401`.
    pub redirect: Arc<dyn LoginRedirect>,
    /// Drives the redirect delay.
    pub sleeper: Arc<dyn Sleeper>,
}

/// Storefront API transport over HTTP.
pub struct HttpApiClient {
    client: Client,
    base: String,
    redirect_delay: Duration,
    ports: HttpApiPorts,
}

impl HttpApiClient {
    /// Build a transport with its own reqwest client.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: HttpApiConfig, ports: HttpApiPorts) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base: config.base.as_str().trim_end_matches('/').to_owned(),
            redirect_delay: config.redirect_delay,
            ports,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        if !path.starts_with('/') {
            return Err(ApiError::invalid_request(format!(
                "path must start with '/': {path}"
            )));
        }
        Url::parse(&format!("{}{path}", self.base))
            .map_err(|error| ApiError::invalid_request(format!("{path}: {error}")))
    }

    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.endpoint(&request.path)?;
        let mut builder = self.client.request(method(request.method), url);

        if !request.is_login() {
            let session = Session::read(self.ports.session.as_ref());
            match session.token() {
                Some(token) => builder = builder.bearer_auth(token),
                None => debug!(path = %request.path, "no bearer token available"),
            }
        }
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|error| ApiError::invalid_request(format!("header {name}: {error}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|error| ApiError::invalid_request(format!("header {name}: {error}")))?;
            builder = builder.header(name, value);
        }

        let overridden = request.has_content_type_override();
        builder = match request.body {
            Some(RequestBody::Multipart(fields)) => builder.multipart(multipart_form(fields)?),
            Some(RequestBody::Json(body)) => {
                let encoded = serde_json::to_vec(&body)
                    .map_err(|error| ApiError::invalid_request(error.to_string()))?;
                let builder = builder.body(encoded);
                if overridden {
                    builder
                } else {
                    builder.header(CONTENT_TYPE, APPLICATION_JSON)
                }
            }
            None if overridden => builder,
            None => builder.header(CONTENT_TYPE, APPLICATION_JSON),
        };
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let exchange = async {
            let response = builder.send().await.map_err(map_transport_error)?;
            let status = response.status();
            let body = response.bytes().await.map_err(map_transport_error)?;
            Ok::<_, ApiError>((status, body))
        };
        let (status, body) = match request.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => return Err(ApiError::cancelled()),
                result = exchange => result?,
            },
            None => exchange.await?,
        };

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            bytes = body.len(),
            "response received"
        );
        let parsed = match parse_body(status, body.as_ref()) {
            Ok(parsed) => parsed,
            Err(error) if !status.is_success() => {
                debug!(status = status.as_u16(), %error, "ignoring undecodable error body");
                Value::Null
            }
            Err(error) => return Err(error),
        };
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.expire_session(&parsed));
        }
        if !status.is_success() {
            return Err(ApiError::request(status.as_u16(), failure_message(status, &parsed)));
        }
        Ok(parsed)
    }

    fn expire_session(&self, body: &Value) -> ApiError {
        if let Err(error) = self.ports.session.clear(&SessionKey::ALL) {
            warn!(error = %error, "failed to clear session after 401");
        }
        self.ports.notifier.notify(Notice::error(SESSION_EXPIRED_NOTICE));

        let redirect = Arc::clone(&self.ports.redirect);
        let sleeper = Arc::clone(&self.ports.sleeper);
        let delay = self.redirect_delay;
        tokio::spawn(async move {
            sleeper.sleep(delay).await;
            redirect.redirect_to_login();
        });

        ApiError::session_expired(failure_message(StatusCode::UNAUTHORIZED, body))
    }
}

#[async_trait]
impl ApiTransport for HttpApiClient {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let method = request.method;
        let path = request.path.clone();
        debug!(%method, %path, "request started");

        let result = self.execute(request).await;
        if let Err(error) = &result {
            warn!(%method, %path, kind = error.kind(), status = ?error.status(), %error, "request failed");
            self.ports.notifier.notify(Notice::error(error.to_string()));
        }
        result
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn multipart_form(fields: Vec<MultipartField>) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for field in fields {
        form = match field.value {
            MultipartValue::Text(text) => form.text(field.name, text),
            MultipartValue::File {
                file_name,
                content_type,
                bytes,
            } => {
                let mut part = Part::bytes(bytes).file_name(file_name);
                if let Some(content_type) = content_type {
                    part = part.mime_str(&content_type).map_err(|error| {
                        ApiError::invalid_request(format!("content type {content_type}: {error}"))
                    })?;
                }
                form.part(field.name, part)
            }
        };
    }
    Ok(form)
}

/// Decode a response body. Empty bodies stand for `{"success": <2xx>}`.
fn parse_body(status: StatusCode, body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({ "success": status.is_success() }));
    }
    serde_json::from_slice(body).map_err(|error| {
        ApiError::response_parse(format!("{error} (body: {})", body_preview(body)))
    })
}

fn failure_message(status: StatusCode, body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .map_or_else(
            || format!("request failed: {}", status.as_u16()),
            str::to_owned,
        )
}

fn map_transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::timeout(error.to_string())
    } else {
        ApiError::transport(error.to_string())
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network mapping helpers.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty(StatusCode::OK, b"".as_slice(), json!({"success": true}))]
    #[case::whitespace(StatusCode::NO_CONTENT, b"  \n".as_slice(), json!({"success": true}))]
    #[case::empty_failure(StatusCode::NOT_FOUND, b"".as_slice(), json!({"success": false}))]
    #[case::json(StatusCode::OK, br#"{"id": 3}"#.as_slice(), json!({"id": 3}))]
    fn parses_bodies(#[case] status: StatusCode, #[case] body: &[u8], #[case] expected: Value) {
        assert_eq!(parse_body(status, body).expect("body should parse"), expected);
    }

    #[test]
    fn non_json_bodies_are_parse_errors() {
        let error = parse_body(StatusCode::OK, b"<html>gateway</html>").expect_err("html");
        assert_eq!(error.kind(), "response_parse");
        assert!(error.to_string().contains("<html>gateway</html>"));
    }

    #[rstest]
    #[case(json!({"message": "stock must not be negative"}), "stock must not be negative")]
    #[case(json!({"message": "  "}), "request failed: 400")]
    #[case(json!({"success": false}), "request failed: 400")]
    #[case(json!([1, 2]), "request failed: 400")]
    fn failure_messages_prefer_the_server_text(#[case] body: Value, #[case] expected: &str) {
        assert_eq!(failure_message(StatusCode::BAD_REQUEST, &body), expected);
    }

    #[test]
    fn previews_are_compacted_and_truncated() {
        let long = format!("a  \n{}", "b".repeat(400));
        let preview = body_preview(long.as_bytes());
        assert!(preview.starts_with("a b"));
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 163);
    }
}
