//! Fake bash shell served after a login is accepted.

use chrono::{DateTime, Utc};
use std::net::IpAddr;

pub const HOSTNAME: &str = "honeypot";
pub const KERNEL: &str = "Linux honeypot 5.4.0-42-generic #46-Ubuntu SMP Fri Jul 10 00:24:02 UTC 2020 x86_64 x86_64 x86_64 GNU/Linux";

const FILESYSTEM: &[(&str, &[&str])] = &[
    ("/", &["bin", "etc", "home", "root", "tmp", "usr", "var"]),
    ("/root", &[".bashrc", ".profile", "passwords.txt", "database.sql"]),
    ("/etc", &["passwd", "shadow", "hosts", "ssh"]),
    ("/home", &["user"]),
];

// Matched in order by substring in either direction, so `cat passwd` and
// `cat /root/passwords.txt` both hit something.
const FILES: &[(&str, &str)] = &[
    ("passwords.txt", "admin:P@ssw0rd123\nroot:toor\nuser:welcome123"),
    (".bashrc", "# ~/.bashrc\nalias ll=\"ls -la\"\nexport PATH=/usr/local/bin:$PATH"),
    ("database.sql", "CREATE TABLE users (id INT, username VARCHAR(50), password VARCHAR(50));"),
    ("/etc/passwd", "root:x:0:0:root:/root:/bin/bash\nuser:x:1000:1000::/home/user:/bin/bash"),
];

const EXIT_COMMANDS: &[&str] = &["exit", "logout", "quit"];

pub fn is_exit(command: &str) -> bool {
    EXIT_COMMANDS.iter().any(|c| command.eq_ignore_ascii_case(c))
}

#[derive(Debug, Clone)]
pub struct FakeShell {
    username: String,
    client_ip: IpAddr,
    current_dir: String,
}

impl FakeShell {
    pub fn new(username: &str, client_ip: IpAddr) -> Self {
        let current_dir = if username == "root" {
            "/root".to_string()
        } else {
            format!("/home/{}", username)
        };
        Self {
            username: username.to_string(),
            client_ip,
            current_dir,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn current_dir(&self) -> &str {
        &self.current_dir
    }

    pub fn banner(&self, now: DateTime<Utc>) -> String {
        format!(
            "Welcome to Ubuntu 20.04.5 LTS (GNU/Linux 5.4.0-42-generic x86_64)\r\n\r\nLast login: {} from {}\r\n",
            now.format("%a %b %d %H:%M:%S %Y"),
            self.client_ip
        )
    }

    pub fn prompt(&self) -> String {
        let sigil = if self.username == "root" { '#' } else { '$' };
        format!("{}@{}:{}{} ", self.username, HOSTNAME, self.current_dir, sigil)
    }

    /// Output of one command line, without the trailing newline
    pub fn execute(&mut self, command: &str) -> String {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return String::new();
        };
        let cmd = first.to_lowercase();

        match cmd.as_str() {
            "whoami" => self.username.clone(),
            "pwd" => self.current_dir.clone(),
            "ls" => self.ls(&parts),
            "cd" => self.cd(&parts),
            "cat" => cat(&parts),
            "id" => self.id(),
            "uname" => {
                if parts.contains(&"-a") {
                    KERNEL.to_string()
                } else {
                    "Linux".to_string()
                }
            }
            "hostname" => HOSTNAME.to_string(),
            "help" | "--help" => {
                "Available commands: ls, pwd, whoami, cat, id, uname, hostname, exit".to_string()
            }
            _ => format!("bash: {}: command not found", cmd),
        }
    }

    fn ls(&self, parts: &[&str]) -> String {
        let dir = parts.get(1).copied().unwrap_or(self.current_dir.as_str());
        match listing(dir) {
            Some(entries) => entries.join("  "),
            None => format!("ls: cannot access '{}': No such file or directory", dir),
        }
    }

    fn cd(&mut self, parts: &[&str]) -> String {
        let target = parts.get(1).copied().unwrap_or("~");
        let target = match target {
            "~" => {
                if self.username == "root" {
                    "/root".to_string()
                } else {
                    format!("/home/{}", self.username)
                }
            }
            path if path.starts_with('/') => path.trim_end_matches('/').to_string(),
            name => format!("{}/{}", self.current_dir.trim_end_matches('/'), name),
        };
        let target = if target.is_empty() { "/".to_string() } else { target };

        if listing(&target).is_some() || target.starts_with("/home/") {
            self.current_dir = target;
            String::new()
        } else {
            format!("bash: cd: {}: No such file or directory", parts.get(1).unwrap_or(&"~"))
        }
    }

    fn id(&self) -> String {
        if self.username == "root" {
            "uid=0(root) gid=0(root) groups=0(root)".to_string()
        } else {
            format!(
                "uid=1000({0}) gid=1000({0}) groups=1000({0})",
                self.username
            )
        }
    }
}

fn listing(dir: &str) -> Option<&'static [&'static str]> {
    FILESYSTEM
        .iter()
        .find(|(path, _)| *path == dir)
        .map(|(_, entries)| *entries)
}

fn cat(parts: &[&str]) -> String {
    let Some(filename) = parts.get(1) else {
        return "cat: missing file operand".to_string();
    };
    FILES
        .iter()
        .find(|(key, _)| filename.contains(key) || key.contains(filename))
        .map(|(_, content)| content.to_string())
        .unwrap_or_else(|| format!("cat: {}: No such file or directory", filename))
}

/// Terminal input decoded by [`LineEditor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Bytes to echo back to the terminal
    Echo(Vec<u8>),
    /// A complete, trimmed command line
    Line(String),
    /// Ctrl+C; the pending line is discarded
    Interrupt,
}

/// Longest pending line kept by a default [`LineEditor`]
pub const DEFAULT_LINE_LIMIT: usize = 4096;

/// Minimal cooked-mode line discipline for a raw PTY channel.
///
/// At most `limit` bytes of a pending line are held; input past that is
/// dropped without echo until the line ends.
#[derive(Debug)]
pub struct LineEditor {
    buffer: Vec<u8>,
    last_was_cr: bool,
    limit: usize,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::with_limit(DEFAULT_LINE_LIMIT)
    }
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            last_was_cr: false,
            limit: limit.max(1),
        }
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn feed(&mut self, data: &[u8]) -> Vec<LineEvent> {
        let mut events = Vec::new();
        for &byte in data {
            let after_cr = std::mem::replace(&mut self.last_was_cr, byte == b'\r');
            match byte {
                b'\n' if after_cr => {}
                b'\r' | b'\n' => {
                    events.push(LineEvent::Echo(b"\r\n".to_vec()));
                    let line = String::from_utf8_lossy(&self.buffer).trim().to_string();
                    self.buffer.clear();
                    events.push(LineEvent::Line(line));
                }
                0x03 => {
                    self.buffer.clear();
                    events.push(LineEvent::Interrupt);
                }
                0x7f | 0x08 => {
                    if self.buffer.pop().is_some() {
                        events.push(LineEvent::Echo(b"\x08 \x08".to_vec()));
                    }
                }
                b if (b >= 0x20 || b == b'\t') && self.buffer.len() < self.limit => {
                    self.buffer.push(b);
                    events.push(LineEvent::Echo(vec![b]));
                }
                // Other control bytes, and input past the limit, are dropped
                _ => {}
            }
        }
        events
    }
}
