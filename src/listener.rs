//! Accept loop shared by the raw TCP services.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::HoneypotError;

/// Per-connection protocol handler
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) -> anyhow::Result<()>;
}

pub async fn bind(service: &'static str, host: &str, port: u16) -> Result<TcpListener, HoneypotError> {
    let addr = format!("{}:{}", host, port);
    TcpListener::bind(&addr)
        .await
        .map_err(|source| HoneypotError::Bind { service, addr, source })
}

/// Accept forever, one task per connection. A connection is dropped (and its
/// socket closed) when the handler returns, fails, or exceeds `timeout`.
pub async fn serve<H: ConnectionHandler>(
    listener: TcpListener,
    name: &'static str,
    timeout: Duration,
    handler: Arc<H>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("{} honeypot listening on {}", name, addr);
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("{} accept error: {}", name, e);
                continue;
            }
        };

        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, handler.handle(stream, peer)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("{} error handling {}: {}", name, peer, e),
                Err(_) => debug!("{} connection from {} timed out", name, peer),
            }
        });
    }
}
