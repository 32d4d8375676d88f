//! SSH honeypot: password-only login through [`AuthGate`], then a
//! [`FakeShell`] whose every command is recorded.

pub mod auth_gate;
pub mod server;
pub mod shell;

pub use auth_gate::{AuthAttempt, AuthDecision, AuthGate};
pub use server::{SshService, SshSession};
pub use shell::{FakeShell, LineEditor, LineEvent, DEFAULT_LINE_LIMIT};

use russh_keys::key::KeyPair;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use tracing::{info, warn};

use crate::error::HoneypotError;

/// Load the host key, or generate an Ed25519 key and try to persist it.
/// A key that cannot be saved is still used for this run.
pub fn load_or_generate_host_key(path: &Path) -> Result<KeyPair, HoneypotError> {
    if path.exists() {
        match russh_keys::load_secret_key(path, None) {
            Ok(key) => {
                info!("Loaded SSH host key from {}", path.display());
                return Ok(key);
            }
            Err(e) => warn!("Unreadable SSH host key at {}, regenerating: {}", path.display(), e),
        }
    }

    let key = KeyPair::generate_ed25519()
        .ok_or_else(|| HoneypotError::HostKey("Ed25519 key generation failed".to_string()))?;

    match create_private(path) {
        Ok(file) => match russh_keys::encode_pkcs8_pem(&key, file) {
            Ok(()) => info!("Generated SSH host key at {}", path.display()),
            Err(e) => warn!("Could not encode SSH host key: {}", e),
        },
        Err(e) => warn!("Could not save SSH host key to {}: {}", path.display(), e),
    }

    Ok(key)
}

/// Create (or truncate) a file readable only by the owner
fn create_private(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}
