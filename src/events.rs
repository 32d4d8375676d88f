//! Attack telemetry.
//!
//! Services build a [`HoneypotEvent`] after the response has been written and
//! hand it to an [`EventSink`]. Sinks never report failure back to the caller:
//! a log that cannot be written is logged through `tracing` and dropped.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::{InstanceConfig, LoggingConfig};
use crate::geolocation::{GeoInfo, GeoLocator};
use crate::lock_utils::lock_or_recover;

pub const LOG_FILE_NAME: &str = "honeypot.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Service {
    Http,
    Ssh,
    Rtsp,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Service::Http => "HTTP",
            Service::Ssh => "SSH",
            Service::Rtsp => "RTSP",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub instance_name: String,
    pub environment: String,
}

impl From<&InstanceConfig> for InstanceInfo {
    fn from(config: &InstanceConfig) -> Self {
        Self {
            instance_name: config.name.clone(),
            environment: config.environment.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoneypotEvent {
    pub timestamp: DateTime<Utc>,
    pub instance: InstanceInfo,
    pub service: Service,
    pub source_ip: String,
    pub source_port: u16,
    pub geolocation: GeoInfo,
    pub data: String,
    pub extra: serde_json::Value,
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, event: HoneypotEvent);
}

struct OpenLog {
    date: NaiveDate,
    file: File,
}

/// One JSON object per line under `<root>/<YYYY-MM-DD>/honeypot.jsonl`
pub struct JsonlEventLog {
    root: PathBuf,
    current: tokio::sync::Mutex<Option<OpenLog>>,
}

impl JsonlEventLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            current: tokio::sync::Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(date.format("%Y-%m-%d").to_string())
            .join(LOG_FILE_NAME)
    }

    async fn open(&self, date: NaiveDate) -> std::io::Result<File> {
        let path = self.path_for(date);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        info!("Event log rotated to: {}", path.display());
        OpenOptions::new().create(true).append(true).open(&path).await
    }

    async fn append(&self, event: &HoneypotEvent) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let date = event.timestamp.date_naive();
        let mut current = self.current.lock().await;
        if current.as_ref().map(|log| log.date) != Some(date) {
            *current = Some(OpenLog {
                date,
                file: self.open(date).await?,
            });
        }

        if let Some(log) = current.as_mut() {
            log.file.write_all(&line).await?;
            log.file.flush().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventSink for JsonlEventLog {
    async fn record(&self, event: HoneypotEvent) {
        info!(
            "[{}:{}] [{}] Connection from {}:{} ({})",
            event.instance.environment,
            event.instance.instance_name,
            event.service,
            event.source_ip,
            event.source_port,
            event.geolocation.country
        );

        if let Err(e) = self.append(&event).await {
            warn!("Failed to write event log: {}", e);
        }
    }
}

/// Keeps events in memory; used by tests
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<HoneypotEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HoneypotEvent> {
        lock_or_recover(&self.events, "memory sink").clone()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn record(&self, event: HoneypotEvent) {
        lock_or_recover(&self.events, "memory sink").push(event);
    }
}

/// Builds events (instance metadata, geolocation, truncation) for a sink
#[derive(Clone)]
pub struct EventRecorder {
    sink: Arc<dyn EventSink>,
    geo: Arc<GeoLocator>,
    instance: InstanceInfo,
    payload_max_len: usize,
}

impl EventRecorder {
    pub fn new(
        sink: Arc<dyn EventSink>,
        geo: Arc<GeoLocator>,
        instance: InstanceInfo,
        logging: &LoggingConfig,
    ) -> Self {
        Self {
            sink,
            geo,
            instance,
            payload_max_len: logging.payload_max_len,
        }
    }

    pub async fn record(
        &self,
        service: Service,
        peer: SocketAddr,
        data: &str,
        extra: serde_json::Value,
    ) {
        let event = HoneypotEvent {
            timestamp: Utc::now(),
            instance: self.instance.clone(),
            service,
            source_ip: peer.ip().to_string(),
            source_port: peer.port(),
            geolocation: self.geo.locate(peer.ip()).await,
            data: truncate_chars(data, self.payload_max_len),
            extra,
        };
        self.sink.record(event).await;
    }
}

/// First `max` chars of `s`, never splitting a code point
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
