//! HTTP honeypot: one request per connection, answered from the persona
//! router and recorded afterwards.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::Config;
use crate::detection::{self, tag_names};
use crate::events::{truncate_chars, EventRecorder, Service};
use crate::listener::ConnectionHandler;
use crate::router::Router;
use crate::scanner;

/// Raw request as read off the socket. Nothing is validated: a garbled
/// request line just yields the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn parse(raw: &str) -> Self {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
        let mut lines = head.split("\r\n");

        let mut request_line = lines.next().unwrap_or("").split(' ');
        let method = request_line
            .next()
            .filter(|m| !m.is_empty())
            .unwrap_or("UNKNOWN")
            .to_string();
        let path = request_line
            .next()
            .filter(|p| !p.is_empty())
            .unwrap_or("/")
            .to_string();

        let headers = lines
            .take_while(|line| !line.is_empty())
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        Self {
            method,
            path,
            headers,
            body: body.to_string(),
        }
    }

    /// Case-insensitive lookup; a repeated header reports its last value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers_json(&self) -> Value {
        let map: Map<String, Value> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

pub struct HttpService {
    router: Arc<Router>,
    recorder: EventRecorder,
    buffer_size: usize,
    body_max_len: usize,
}

impl HttpService {
    pub fn new(router: Arc<Router>, recorder: EventRecorder, config: &Config) -> Self {
        Self {
            router,
            recorder,
            buffer_size: config.network.buffer_size,
            body_max_len: config.logging.body_max_len,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn handle_stream<S>(&self, mut stream: S, peer: SocketAddr) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut buf = vec![0u8; self.buffer_size];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        let raw = String::from_utf8_lossy(&buf[..n]).into_owned();
        let request = HttpRequest::parse(&raw);
        let attacks = detection::detect_http(&raw);
        let tool = scanner::identify(request.header("User-Agent"));
        if !attacks.is_empty() {
            debug!("{} {} from {}: {:?}", request.method, request.path, peer, attacks);
        }

        let response = self.router.respond(&request);
        let written = async {
            stream.write_all(&response.to_bytes()).await?;
            stream.flush().await
        }
        .await;

        let mut extra = json!({
            "method": request.method,
            "path": request.path,
            "user_agent": request.header("User-Agent").unwrap_or("Unknown"),
            "all_headers": request.headers_json(),
            "payload_body": truncate_chars(&request.body, self.body_max_len),
            "attacks_detected": tag_names(&attacks),
            "status": response.status.as_u16(),
        });
        if let Some(tool) = tool {
            extra["scanner"] = json!(tool);
        }
        self.recorder.record(Service::Http, peer, &raw, extra).await;

        written?;
        Ok(())
    }
}

#[async_trait]
impl ConnectionHandler for HttpService {
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) -> anyhow::Result<()> {
        self.handle_stream(stream, peer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{InstanceInfo, MemorySink};
    use crate::geolocation::GeoLocator;

    #[test]
    fn test_parse_request() {
        let req = HttpRequest::parse(
            "POST /login?next=/ HTTP/1.1\r\nHost: example\r\nUser-Agent:  curl/8.0 \r\nX-Note: a:b\r\n\r\nuser=admin",
        );
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/login?next=/");
        assert_eq!(req.header("user-agent"), Some("curl/8.0"));
        assert_eq!(req.header("X-NOTE"), Some("a:b"));
        assert_eq!(req.body, "user=admin");
    }

    #[test]
    fn test_parse_garbage_uses_defaults() {
        let req = HttpRequest::parse("");
        assert_eq!(req.method, "UNKNOWN");
        assert_eq!(req.path, "/");
        assert!(req.headers.is_empty());

        let req = HttpRequest::parse("GET");
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/");
    }

    #[test]
    fn test_header_lines_without_colon_are_skipped() {
        let req = HttpRequest::parse("GET / HTTP/1.1\r\nbroken\r\nHost: h\r\n\r\n");
        assert_eq!(req.headers, vec![("Host".to_string(), "h".to_string())]);
    }

    #[test]
    fn test_repeated_header_last_wins() {
        let req = HttpRequest::parse("GET / HTTP/1.1\r\nX-A: 1\r\nx-a: 2\r\n\r\n");
        assert_eq!(req.header("X-A"), Some("2"));
    }

    fn service(sink: Arc<MemorySink>) -> HttpService {
        let mut config = Config::default();
        config.set_profile("devops");
        let recorder = EventRecorder::new(
            sink,
            Arc::new(GeoLocator::disabled()),
            InstanceInfo::from(&config.instance),
            &config.logging,
        );
        HttpService::new(Arc::new(Router::from_config(&config)), recorder, &config)
    }

    #[tokio::test]
    async fn test_request_is_answered_then_recorded() {
        let sink = Arc::new(MemorySink::new());
        let svc = service(sink.clone());
        let (mut client, server) = tokio::io::duplex(8192);

        client
            .write_all(b"GET /.env HTTP/1.1\r\nUser-Agent: curl/8.0\r\n\r\n")
            .await
            .unwrap();
        svc.handle_stream(server, "127.0.0.1:40000".parse().unwrap())
            .await
            .unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8(response).unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("DB_PASS=secret123"));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].service, Service::Http);
        assert_eq!(events[0].extra["path"], "/.env");
        assert_eq!(events[0].extra["user_agent"], "curl/8.0");
        assert!(events[0].extra.get("scanner").is_none());
    }

    #[tokio::test]
    async fn test_scanner_is_logged() {
        let sink = Arc::new(MemorySink::new());
        let svc = service(sink.clone());
        let (mut client, server) = tokio::io::duplex(8192);

        client
            .write_all(b"GET /.env?id=1' OR '1'='1 HTTP/1.1\r\nUser-Agent: sqlmap/1.6\r\n\r\n")
            .await
            .unwrap();
        svc.handle_stream(server, "127.0.0.1:40001".parse().unwrap())
            .await
            .unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.starts_with(b"HTTP/1.1 500 Internal Server Error\r\n"));

        let extra = &sink.events()[0].extra;
        assert_eq!(extra["scanner"]["name"], "sqlmap");
        let attacks = extra["attacks_detected"].as_array().unwrap();
        assert!(attacks.contains(&json!("sql_injection")));
    }

    #[tokio::test]
    async fn test_empty_read_records_nothing() {
        let sink = Arc::new(MemorySink::new());
        let svc = service(sink.clone());
        let (client, server) = tokio::io::duplex(64);
        drop(client);

        svc.handle_stream(server, "127.0.0.1:40002".parse().unwrap())
            .await
            .unwrap();
        assert!(sink.events().is_empty());
    }
}
