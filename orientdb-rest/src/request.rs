//! Request value objects and eagerly-captured responses

use crate::Result;
use reqwest::Method;

/// One HTTP request to be dispatched against a pool node
///
/// A value object: building one has no side effects, and per-call credential
/// overrides here win over the session credentials during dispatch.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// HTTP method
    pub method: Method,
    /// Server-relative path, already percent-encoded where needed
    pub path: String,
    /// Content type of `body`, when a body is present
    pub content_type: Option<String>,
    /// Request body
    pub body: Option<String>,
    /// Per-call user override
    pub user_override: Option<String>,
    /// Per-call password override
    pub password_override: Option<String>,
}

impl RequestSpec {
    /// Create a request spec
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            content_type: None,
            body: None,
            user_override: None,
            password_override: None,
        }
    }

    /// GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// PUT request
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a body with its content type
    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = Some(body.into());
        self
    }

    /// Override the session credentials for this call only
    pub fn with_auth_override(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user_override = Some(user.into());
        self.password_override = Some(password.into());
        self
    }
}

/// A transport response captured in full
///
/// Header lookup is case-insensitive; different transport stacks disagree on
/// header-name casing.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers as received
    pub headers: Vec<(String, String)>,
    /// Response body as text
    pub body: String,
}

impl RawResponse {
    /// Capture a reqwest response, reading the body eagerly
    pub async fn capture(response: reqwest::Response) -> Result<Self> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// First header value with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The response content type, if any
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Whether the status code is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
