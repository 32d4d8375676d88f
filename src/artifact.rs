//! Response artifacts and the builders personas use to produce them.
//!
//! Artifacts are serialised byte-for-byte as written: header order and casing
//! are part of a persona's fingerprint, so nothing is normalised on the way out.

use chrono::{DateTime, Utc};
use hyper::StatusCode;
use std::borrow::Cow;

pub const HTTP_1_1: &str = "HTTP/1.1";
pub const RTSP_1_0: &str = "RTSP/1.0";

/// Emulated web server banner
pub const SERVER_NAME: &str = "Apache/2.4.41 (Ubuntu)";
pub const PHP_VERSION: &str = "PHP/7.4.3";
pub const DEFAULT_CACHE_AGE: u64 = 3600;

/// A complete protocol response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub protocol: &'static str,
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Artifact {
    pub fn new(status: StatusCode) -> Self {
        Self {
            protocol: HTTP_1_1,
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn rtsp(status: StatusCode) -> Self {
        Self {
            protocol: RTSP_1_0,
            ..Self::new(status)
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Append a `Content-Length` header matching the current body
    pub fn with_content_length(self) -> Self {
        let len = self.body.len();
        self.header("Content-Length", len.to_string())
    }

    pub fn status_line(&self) -> String {
        format!(
            "{} {} {}",
            self.protocol,
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("")
        )
    }

    /// First header value with a case-insensitive name match
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 256);
        out.extend_from_slice(self.status_line().as_bytes());
        out.extend_from_slice(b"\r\n");
        for (name, value) in &self.headers {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

/// RFC 7231 date, e.g. `Sat, 01 Jun 2024 12:00:00 GMT`
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Content ETag: first 16 hex chars of the body's MD5
pub fn etag(body: &[u8]) -> String {
    let digest = format!("{:x}", md5::compute(body));
    digest[..16].to_string()
}

/// Response with the full Apache/PHP header set
pub fn build_response(
    now: DateTime<Utc>,
    status: StatusCode,
    content_type: &str,
    body: impl Into<Vec<u8>>,
    cache_age: Option<u64>,
) -> Artifact {
    let body = body.into();
    let etag = etag(&body);
    Artifact::new(status)
        .header("Server", SERVER_NAME)
        .header("Date", http_date(now))
        .header("Content-Type", content_type)
        .header("Content-Length", body.len().to_string())
        .header("ETag", format!("\"{}\"", etag))
        .header("X-Powered-By", PHP_VERSION)
        .header("Connection", "keep-alive")
        .header(
            "Cache-Control",
            format!("max-age={}", cache_age.unwrap_or(DEFAULT_CACHE_AGE)),
        )
        .body(body)
}

/// Full HTML document
pub fn html(now: DateTime<Utc>, document: impl Into<String>) -> Artifact {
    build_response(
        now,
        StatusCode::OK,
        "text/html; charset=UTF-8",
        document.into(),
        None,
    )
}

/// Minimal titled HTML page around `body_html`
pub fn html_page(now: DateTime<Utc>, status: StatusCode, title: &str, body_html: &str) -> Artifact {
    let document = format!(
        "<html>\n<head>\n    <meta charset=\"UTF-8\">\n    <title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>",
        title, body_html
    );
    build_response(now, status, "text/html; charset=UTF-8", document, None)
}

pub fn json(now: DateTime<Utc>, status: StatusCode, value: &serde_json::Value) -> Artifact {
    let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    build_response(now, status, "application/json", body, None)
}

pub fn text(now: DateTime<Utc>, text: impl Into<String>) -> Artifact {
    build_response(
        now,
        StatusCode::OK,
        "text/plain; charset=UTF-8",
        text.into(),
        None,
    )
}

/// Plain artifact with a single `Content-Type`, as bare legacy servers send
pub fn simple(status: StatusCode, content_type: &str, body: impl Into<Vec<u8>>) -> Artifact {
    Artifact::new(status)
        .header("Content-Type", content_type)
        .body(body)
}

/// Generic 404 shared by unmapped and persona-invisible paths
pub fn not_found() -> Artifact {
    simple(
        StatusCode::NOT_FOUND,
        "text/html",
        "<html><body><h1>404 Not Found</h1><p>The requested URL was not found on this server.</p></body></html>",
    )
}

/// Substitute for a producer that failed
pub fn internal_error() -> Artifact {
    simple(
        StatusCode::INTERNAL_SERVER_ERROR,
        "text/html",
        "<html><body><h1>500 Internal Server Error</h1><p>The server encountered an internal error and was unable to complete your request.</p></body></html>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_serialisation_preserves_header_order() {
        let artifact = Artifact::new(StatusCode::OK)
            .header("Server", "TP-LINK Router WR841N")
            .header("Content-Type", "text/plain")
            .body("hi");
        assert_eq!(
            artifact.to_bytes(),
            b"HTTP/1.1 200 OK\r\nServer: TP-LINK Router WR841N\r\nContent-Type: text/plain\r\n\r\nhi".to_vec()
        );
    }

    #[test]
    fn test_rtsp_status_line() {
        let artifact = Artifact::rtsp(StatusCode::UNAUTHORIZED);
        assert_eq!(artifact.status_line(), "RTSP/1.0 401 Unauthorized");
    }

    #[test]
    fn test_build_response_headers() {
        let artifact = build_response(now(), StatusCode::OK, "text/plain", "hello", None);
        assert_eq!(artifact.header_value("server"), Some(SERVER_NAME));
        assert_eq!(artifact.header_value("Date"), Some("Sat, 01 Jun 2024 12:00:00 GMT"));
        assert_eq!(artifact.header_value("Content-Length"), Some("5"));
        assert_eq!(artifact.header_value("Cache-Control"), Some("max-age=3600"));
        // md5("hello") = 5d41402abc4b2a76b9719d911017c592
        assert_eq!(artifact.header_value("ETag"), Some("\"5d41402abc4b2a76\""));
    }

    #[test]
    fn test_custom_cache_age() {
        let artifact = build_response(now(), StatusCode::OK, "image/x-icon", vec![0u8, 1, 2], Some(86400));
        assert_eq!(artifact.header_value("Cache-Control"), Some("max-age=86400"));
        assert_eq!(artifact.header_value("Content-Length"), Some("3"));
    }

    #[test]
    fn test_json_builder() {
        let artifact = json(now(), StatusCode::UNAUTHORIZED, &serde_json::json!({"error": "nope"}));
        assert_eq!(artifact.status, StatusCode::UNAUTHORIZED);
        assert_eq!(artifact.header_value("Content-Type"), Some("application/json"));
        let parsed: serde_json::Value = serde_json::from_slice(&artifact.body).unwrap();
        assert_eq!(parsed["error"], "nope");
    }

    #[test]
    fn test_not_found_is_stable() {
        assert_eq!(not_found().to_bytes(), not_found().to_bytes());
        assert!(not_found().status_line().ends_with("404 Not Found"));
    }

    #[test]
    fn test_content_length_helper() {
        let artifact = simple(StatusCode::OK, "text/css", "/* css */").with_content_length();
        assert_eq!(artifact.header_value("Content-Length"), Some("9"));
    }
}
