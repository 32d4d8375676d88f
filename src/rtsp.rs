//! RTSP camera honeypot. Only `OPTIONS` succeeds; every other method is
//! challenged so clients keep throwing credentials at it.

use async_trait::async_trait;
use hyper::StatusCode;
use serde_json::json;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::artifact::Artifact;
use crate::events::{EventRecorder, Service};
use crate::http_service::HttpRequest;
use crate::listener::ConnectionHandler;

pub const CAMERA_REALM: &str = "IP Camera(A2497)";
pub const DIGEST_NONCE: &str = "5f9a6e12";
pub const PUBLIC_METHODS: &str =
    "OPTIONS, DESCRIBE, SETUP, TEARDOWN, PLAY, PAUSE, GET_PARAMETER, SET_PARAMETER";

/// Response to a single RTSP request
pub fn respond(method: &str, cseq: &str) -> Artifact {
    if method == "OPTIONS" {
        Artifact::rtsp(StatusCode::OK)
            .header("CSeq", cseq)
            .header("Public", PUBLIC_METHODS)
    } else {
        Artifact::rtsp(StatusCode::UNAUTHORIZED)
            .header("CSeq", cseq)
            .header(
                "WWW-Authenticate",
                format!(
                    "Digest realm=\"{}\", nonce=\"{}\", algorithm=\"MD5\"",
                    CAMERA_REALM, DIGEST_NONCE
                ),
            )
            .header("WWW-Authenticate", format!("Basic realm=\"{}\"", CAMERA_REALM))
    }
}

pub struct RtspService {
    recorder: EventRecorder,
    buffer_size: usize,
}

impl RtspService {
    pub fn new(recorder: EventRecorder, buffer_size: usize) -> Self {
        Self {
            recorder,
            buffer_size,
        }
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
        // RTSP shares HTTP's request-line and header syntax
        let request = HttpRequest::parse(&raw);
        let cseq = request.header("CSeq").unwrap_or("1");
        let response = respond(&request.method, cseq);

        let written = async {
            stream.write_all(&response.to_bytes()).await?;
            stream.flush().await
        }
        .await;

        let extra = json!({
            "method": request.method,
            "url": request.path,
            "cseq": cseq,
            "status": response.status.as_u16(),
        });
        self.recorder.record(Service::Rtsp, peer, &raw, extra).await;

        written?;
        Ok(())
    }
}

#[async_trait]
impl ConnectionHandler for RtspService {
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) -> anyhow::Result<()> {
        self.handle_stream(stream, peer).await
    }
}
