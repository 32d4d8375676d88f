use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::HoneypotError;
use crate::profile_filter::{builtin_keyword_map, MissingConfigPolicy, ALL_PROFILES};

/// Honeypot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub ssh: SshConfig,
    pub rtsp: RtspConfig,
    pub management: ManagementConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
    pub geolocation: GeoConfig,
    pub profile: ProfileConfig,
    pub instance: InstanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Challenge TP-Link configuration pages with HTTP Basic auth
    pub iot_basic_auth: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Where the host key is loaded from (and saved to when generated)
    pub host_key_path: PathBuf,
    /// Password attempts before a login "succeeds"
    pub auth_threshold: u32,
    /// Identification string sent during version exchange
    pub server_id: String,
    /// Upper bound on a whole SSH session, shell included
    pub session_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RtspConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Upper bound on a single connection's lifetime
    pub socket_timeout_secs: u64,
    /// Maximum bytes read from a client per request
    pub buffer_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Root directory for JSONL event logs
    pub dir: PathBuf,
    /// Max chars of raw payload stored per event
    pub payload_max_len: usize,
    /// Max chars of HTTP body stored per event
    pub body_max_len: usize,
    /// Default tracing filter when RUST_LOG is unset
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub cache_capacity: usize,
    /// Lookup base URL, the IP is appended
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Active persona, or "all"
    pub active: String,
    /// Optional JSON keyword map; the built-in map is used when unset
    pub keywords_path: Option<PathBuf>,
    /// Behaviour when the keyword map cannot be loaded
    pub on_missing: MissingConfigPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub name: String,
    pub environment: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            iot_basic_auth: true,
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 2222,
            host_key_path: PathBuf::from("ssh_host_key"),
            auth_threshold: 2,
            server_id: "SSH-2.0-OpenSSH_8.2p1 Ubuntu-4ubuntu0.5".to_string(),
            session_timeout_secs: 600,
        }
    }
}

impl Default for RtspConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "0.0.0.0".to_string(),
            port: 554,
        }
    }
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            socket_timeout_secs: 30,
            buffer_size: 4096,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            payload_max_len: 500,
            body_max_len: 1024,
            level: "info".to_string(),
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 2,
            cache_capacity: 10_000,
            endpoint: "http://ip-api.com/json/".to_string(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            active: ALL_PROFILES.to_string(),
            keywords_path: None,
            on_missing: MissingConfigPolicy::FailOpen,
        }
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            environment: "LOCAL".to_string(),
        }
    }
}

impl SshConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

impl NetworkConfig {
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs)
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| HoneypotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| HoneypotError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(&self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Apply the `HONEYPOT_PROFILE` override, if set
    pub fn apply_env(&mut self) {
        if let Ok(profile) = std::env::var("HONEYPOT_PROFILE") {
            self.set_profile(&profile);
        }
    }

    pub fn set_profile(&mut self, profile: &str) {
        let profile = profile.trim().to_lowercase();
        if !profile.is_empty() {
            self.profile.active = profile;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.http.port == 0 {
            anyhow::bail!(HoneypotError::InvalidConfig("Invalid http port: cannot be 0".to_string()));
        }

        if self.ssh.enabled && self.ssh.port == 0 {
            anyhow::bail!(HoneypotError::InvalidConfig("Invalid ssh port: cannot be 0".to_string()));
        }

        if self.ssh.auth_threshold == 0 {
            anyhow::bail!(HoneypotError::InvalidConfig("Invalid ssh auth_threshold: must be > 0".to_string()));
        }

        if self.rtsp.enabled && self.rtsp.port == 0 {
            anyhow::bail!(HoneypotError::InvalidConfig("Invalid rtsp port: cannot be 0".to_string()));
        }

        if self.management.enabled && self.management.port == 0 {
            anyhow::bail!(HoneypotError::InvalidConfig("Invalid management port: cannot be 0".to_string()));
        }

        if self.network.buffer_size == 0 {
            anyhow::bail!(HoneypotError::InvalidConfig("Invalid buffer_size: must be > 0".to_string()));
        }

        if self.network.socket_timeout_secs == 0 {
            anyhow::bail!(HoneypotError::InvalidConfig("Invalid socket_timeout_secs: must be > 0".to_string()));
        }

        if self.ssh.enabled && self.ssh.session_timeout_secs == 0 {
            anyhow::bail!(HoneypotError::InvalidConfig("Invalid ssh session_timeout_secs: must be > 0".to_string()));
        }

        // A custom keyword file may define its own personas
        if self.profile.keywords_path.is_none()
            && self.profile.active != ALL_PROFILES
            && !builtin_keyword_map().contains_key(&self.profile.active)
        {
            anyhow::bail!(HoneypotError::InvalidConfig(format!("Unknown profile: {}", self.profile.active)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.ssh.port, 2222);
        assert_eq!(config.ssh.auth_threshold, 2);
        assert_eq!(config.profile.active, "all");
        assert_eq!(config.profile.on_missing, MissingConfigPolicy::FailOpen);
        assert!(!config.rtsp.enabled);
        assert!(!config.management.enabled);
    }

    #[test]
    fn test_config_validation_succeeds() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_fails_zero_port() {
        let mut config = Config::default();
        config.http.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_fails_zero_threshold() {
        let mut config = Config::default();
        config.ssh.auth_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_errors_are_typed() {
        let mut config = Config::default();
        config.network.buffer_size = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HoneypotError>(),
            Some(HoneypotError::InvalidConfig(msg)) if msg.contains("buffer_size")
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[http]\nport = \"eighty\"\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err.downcast_ref::<HoneypotError>(), Some(HoneypotError::ConfigParse { .. })));

        let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err.downcast_ref::<HoneypotError>(), Some(HoneypotError::Io { .. })));
    }

    #[test]
    fn test_config_validation_ssh_session_timeout() {
        let mut config = Config::default();
        config.ssh.session_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.ssh.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_fails_unknown_profile() {
        let mut config = Config::default();
        config.set_profile("mainframe");
        assert!(config.validate().is_err());

        config.profile.keywords_path = Some(PathBuf::from("custom.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_set_profile_lowercases() {
        let mut config = Config::default();
        config.set_profile("  WordPress ");
        assert_eq!(config.profile.active, "wordpress");

        config.set_profile("");
        assert_eq!(config.profile.active, "wordpress");
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [http]
            host = "127.0.0.1"
            port = 9090

            [ssh]
            auth_threshold = 5

            [profile]
            active = "devops"
            on_missing = "closed"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.http.host, "127.0.0.1");
        assert_eq!(config.http.port, 9090);
        assert!(config.http.iot_basic_auth);
        assert_eq!(config.ssh.auth_threshold, 5);
        assert_eq!(config.ssh.port, 2222);
        assert_eq!(config.profile.active, "devops");
        assert_eq!(config.profile.on_missing, MissingConfigPolicy::FailClosed);
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("honeypot.toml");

        let defaults = Config::default();
        defaults.to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(defaults.http.port, loaded.http.port);
        assert_eq!(defaults.ssh.server_id, loaded.ssh.server_id);
        assert_eq!(defaults.logging.dir, loaded.logging.dir);
    }
}
