//! HTTP Basic-auth gate for the TP-Link persona.
//!
//! Only configuration pages are challenged; the login page, help pages and
//! static assets stay open, and so do exploit paths. Credentials are checked
//! against a short list of factory defaults. There is no lockout: each request
//! is evaluated on its own.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hyper::StatusCode;

use crate::artifact::Artifact;

pub const DEVICE_SERVER: &str = "TP-LINK Router WR841N";
pub const DEVICE_REALM: &str = "TP-LINK Wireless N Router WR841N";

/// Accepted (username, password) pairs
pub const DEFAULT_CREDENTIALS: &[(&str, &str)] = &[
    ("admin", "admin"),
    ("admin", ""),
    ("root", "admin"),
    ("admin", "password"),
    ("admin", "1234"),
];

const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/robots.txt",
    "/favicon.ico",
    "/humans.txt",
    "/userRpm/LoginRpm.htm",
];

const PROTECTED_PREFIXES: &[&str] = &["/userRpm/", "/goform/"];

pub fn requires_auth(path: &str) -> bool {
    if PUBLIC_PATHS.contains(&path) || path.starts_with("/help") {
        return false;
    }
    PROTECTED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Decode `Basic <base64(user:pass)>`; `None` for anything malformed
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

pub fn check(auth_header: Option<&str>) -> bool {
    let Some((username, password)) = auth_header.and_then(parse_basic) else {
        return false;
    };
    DEFAULT_CREDENTIALS
        .iter()
        .any(|(u, p)| *u == username && *p == password)
}

/// 401 challenge naming the emulated router
pub fn unauthorized_response() -> Artifact {
    let body = "<html>\n<head><title>401 Unauthorized</title></head>\n<body>\n<h1>401 - Unauthorized</h1>\n<p>Access to this resource requires authentication.</p>\n</body>\n</html>";
    Artifact::new(StatusCode::UNAUTHORIZED)
        .header("Server", DEVICE_SERVER)
        .header(
            "WWW-Authenticate",
            format!("Basic realm=\"{}\"", DEVICE_REALM),
        )
        .header("Content-Type", "text/html")
        .header("Connection", "close")
        .body(body)
        .with_content_length()
}
