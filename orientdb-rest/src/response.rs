//! Response classification and body decoding

use crate::request::RawResponse;
use crate::{Error, Result};
use regex::Regex;
use serde_json::Value;

/// Maximum length of the diagnostic body snippet in error messages
const MAX_SNIPPET_LEN: usize = 200;

/// Marker appended when the snippet was truncated
const SNIPPET_ELLIPSIS: &str = " ...";

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain-text body, returned verbatim
    Text(String),
    /// JSON body, parsed into a generic value
    Json(Value),
}

impl Payload {
    /// Unwrap a JSON payload
    pub fn into_json(self) -> Result<Value> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(_) => Err(Error::protocol("expected JSON response body")),
        }
    }

    /// Unwrap a plain-text payload
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Json(_) => Err(Error::protocol("expected plain text response body")),
        }
    }
}

/// Error kind raised when a body pattern matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainErrorKind {
    /// Record or class absent
    NotFound,
    /// Validation failure or concurrent-modification conflict
    Data,
}

/// A caller-supplied body-pattern rule
///
/// The server sometimes reports domain conditions under generic or misleading
/// status codes, so these run against the raw body before any status
/// classification.
#[derive(Debug, Clone)]
pub struct BodyCheck {
    pattern: Regex,
    kind: DomainErrorKind,
    message: &'static str,
}

impl BodyCheck {
    /// Rule raising [`Error::NotFound`] on match
    pub fn not_found(pattern: Regex, message: &'static str) -> Self {
        Self {
            pattern,
            kind: DomainErrorKind::NotFound,
            message,
        }
    }

    /// Rule raising [`Error::Data`] on match
    pub fn data(pattern: Regex, message: &'static str) -> Self {
        Self {
            pattern,
            kind: DomainErrorKind::Data,
            message,
        }
    }

    fn matches(&self, body: &str) -> bool {
        self.pattern.is_match(body)
    }

    fn to_error(&self) -> Error {
        match self.kind {
            DomainErrorKind::NotFound => Error::not_found(self.message),
            DomainErrorKind::Data => Error::data(self.message),
        }
    }
}

/// Classify and decode a captured response
///
/// Order matters: domain checks first regardless of status, then status
/// classification, then content-type decoding. Only a 2xx response with a
/// recognized content type yields a payload.
pub fn process(response: &RawResponse, checks: &[BodyCheck]) -> Result<Payload> {
    for check in checks {
        if check.matches(&response.body) {
            return Err(check.to_error());
        }
    }

    match response.status {
        401 => return Err(Error::unauthorized(snippet(&response.body))),
        500 => return Err(Error::server(snippet(&response.body))),
        status if !response.is_success() => {
            return Err(Error::protocol(format!(
                "unexpected return code, code={status}, body={}",
                snippet(&response.body)
            )));
        }
        _ => {}
    }

    let content_type = response.content_type().unwrap_or("text/plain");
    if content_type.starts_with("text/plain") {
        Ok(Payload::Text(response.body.clone()))
    } else if content_type.starts_with("application/json") {
        Ok(Payload::Json(serde_json::from_str(&response.body)?))
    } else {
        Err(Error::protocol(format!(
            "unsupported content type: {content_type}"
        )))
    }
}

/// Diagnostic snippet of a response body: newlines collapsed, truncated with
/// an ellipsis marker past [`MAX_SNIPPET_LEN`] characters
pub fn snippet(body: &str) -> String {
    let flat = body.replace('\n', " ");
    if flat.chars().count() > MAX_SNIPPET_LEN {
        let truncated: String = flat.chars().take(MAX_SNIPPET_LEN).collect();
        format!("{truncated}{SNIPPET_ELLIPSIS}")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, content_type: Option<&str>, body: &str) -> RawResponse {
        let headers = content_type
            .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
            .unwrap_or_default();
        RawResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_unauthorized_regardless_of_body() {
        for body in ["", "denied", r#"{"errors":[]}"#] {
            let result = process(&response(401, Some("application/json"), body), &[]);
            assert!(matches!(result, Err(Error::Unauthorized { .. })));
        }
    }

    #[test]
    fn test_server_error() {
        let result = process(&response(500, Some("text/plain"), "boom"), &[]);
        assert!(matches!(result, Err(Error::Server { .. })));
    }

    #[test]
    fn test_unexpected_status_carries_snippet() {
        let result = process(&response(404, Some("text/plain"), "no such thing"), &[]);
        match result {
            Err(Error::Protocol { reason }) => {
                assert!(reason.contains("code=404"));
                assert!(reason.contains("no such thing"));
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_json_decoding() {
        let payload = process(
            &response(200, Some("application/json"), r#"{"result":[]}"#),
            &[],
        )
        .unwrap();
        let value = payload.into_json().unwrap();
        assert_eq!(value["result"], serde_json::json!([]));
    }

    #[test]
    fn test_json_content_type_with_charset() {
        let payload = process(
            &response(200, Some("application/json;charset=utf-8"), "[1,2]"),
            &[],
        )
        .unwrap();
        assert!(matches!(payload, Payload::Json(_)));
    }

    #[test]
    fn test_text_decoding() {
        let payload = process(&response(200, Some("text/plain"), "#12:0"), &[]).unwrap();
        assert_eq!(payload.into_text().unwrap(), "#12:0");
    }

    #[test]
    fn test_missing_content_type_defaults_to_text() {
        let payload = process(&response(204, None, ""), &[]).unwrap();
        assert_eq!(payload, Payload::Text(String::new()));
    }

    #[test]
    fn test_unsupported_content_type() {
        let result = process(&response(200, Some("application/xml"), "<a/>"), &[]);
        match result {
            Err(Error::Protocol { reason }) => {
                assert!(reason.contains("unsupported content type"));
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_domain_check_beats_status() {
        let checks = [BodyCheck::not_found(
            Regex::new("ORecordNotFoundException").unwrap(),
            "record not found",
        )];
        let result = process(
            &response(
                500,
                Some("text/plain"),
                "com.orientechnologies.ORecordNotFoundException: #9:9",
            ),
            &checks,
        );
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_domain_checks_in_order() {
        let checks = [
            BodyCheck::data(
                Regex::new("OConcurrentModificationException").unwrap(),
                "concurrent modification",
            ),
            BodyCheck::data(Regex::new("OValidationException").unwrap(), "validation problem"),
        ];
        let result = process(
            &response(
                409,
                Some("text/plain"),
                "OConcurrentModificationException and OValidationException",
            ),
            &checks,
        );
        match result {
            Err(Error::Data { reason }) => assert_eq!(reason, "concurrent modification"),
            other => panic!("expected data error, got {other:?}"),
        }
    }

    #[test]
    fn test_snippet_collapses_newlines() {
        assert_eq!(snippet("a\nb\nc"), "a b c");
    }

    #[test]
    fn test_snippet_truncation_bound() {
        let body = "x".repeat(500);
        let s = snippet(&body);
        assert!(s.chars().count() <= 205);
        assert!(s.ends_with(" ..."));

        let short = "y".repeat(200);
        assert_eq!(snippet(&short), short);
    }
}
