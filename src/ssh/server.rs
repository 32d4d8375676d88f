use async_trait::async_trait;
use chrono::Utc;
use russh::server::{Auth, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, MethodSet, Pty, SshId};
use russh_keys::key::KeyPair;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info};

use super::auth_gate::{AuthDecision, AuthGate};
use super::shell::{is_exit, FakeShell, LineEditor, LineEvent, DEFAULT_LINE_LIMIT};
use crate::config::SshConfig;
use crate::detection::{self, attack_details, is_brute_force, tag_names, DEFAULT_BRUTE_FORCE_THRESHOLD};
use crate::events::{EventRecorder, Service};
use crate::listener::ConnectionHandler;

/// Shared SSH listener state; hands out one [`SshSession`] per connection
pub struct SshService {
    config: Arc<russh::server::Config>,
    recorder: EventRecorder,
    auth_threshold: u32,
    line_limit: usize,
}

impl SshService {
    pub fn new(ssh: &SshConfig, host_key: KeyPair, recorder: EventRecorder, idle_timeout: Duration) -> Self {
        let config = russh::server::Config {
            server_id: SshId::Standard(ssh.server_id.clone()),
            methods: MethodSet::PASSWORD,
            keys: vec![host_key],
            inactivity_timeout: Some(idle_timeout),
            auth_rejection_time: Duration::from_secs(1),
            auth_rejection_time_initial: Some(Duration::from_secs(0)),
            ..Default::default()
        };

        Self {
            config: Arc::new(config),
            recorder,
            auth_threshold: ssh.auth_threshold,
            line_limit: DEFAULT_LINE_LIMIT,
        }
    }

    /// Cap on a pending shell input line, normally `network.buffer_size`
    pub fn with_line_limit(mut self, limit: usize) -> Self {
        self.line_limit = limit;
        self
    }

    pub fn session(&self, peer: SocketAddr) -> SshSession {
        SshSession::new(peer, self.recorder.clone(), self.auth_threshold).with_line_limit(self.line_limit)
    }
}

#[async_trait]
impl ConnectionHandler for SshService {
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) -> anyhow::Result<()> {
        debug!("SSH connection from {}", peer);
        let running = russh::server::run_stream(self.config.clone(), stream, self.session(peer)).await?;
        running.await?;
        Ok(())
    }
}

/// Terminal output of a command line (prompt excluded) and whether the
/// channel closes afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub output: String,
    pub close: bool,
}

/// Per-connection SSH state
pub struct SshSession {
    peer: SocketAddr,
    recorder: EventRecorder,
    gate: AuthGate,
    shell: Option<FakeShell>,
    editor: LineEditor,
}

impl SshSession {
    pub fn new(peer: SocketAddr, recorder: EventRecorder, auth_threshold: u32) -> Self {
        Self {
            peer,
            recorder,
            gate: AuthGate::new(auth_threshold),
            shell: None,
            editor: LineEditor::new(),
        }
    }

    pub fn with_line_limit(mut self, limit: usize) -> Self {
        self.editor = LineEditor::with_limit(limit);
        self
    }

    pub fn identity(&self) -> Option<&str> {
        self.gate.identity()
    }

    pub fn shell(&self) -> Option<&FakeShell> {
        self.shell.as_ref()
    }

    /// Run the auth gate for one password submission and record it
    pub async fn submit_password(&mut self, user: &str, password: &str) -> AuthDecision {
        let decision = self.gate.submit(user, password);
        let attempt = self.gate.attempt_count();

        self.recorder
            .record(
                Service::Ssh,
                self.peer,
                &format!("Auth attempt #{}", attempt),
                json!({
                    "username": user,
                    "password": password,
                    "attempt_number": attempt,
                    "authenticated": false,
                    "type": "auth_attempt",
                    "brute_force": is_brute_force(attempt, DEFAULT_BRUTE_FORCE_THRESHOLD),
                }),
            )
            .await;

        if decision == AuthDecision::Authenticated {
            info!("SSH login accepted for '{}' from {} after {} attempts", user, self.peer, attempt);
            self.recorder
                .record(
                    Service::Ssh,
                    self.peer,
                    &format!("Successful login: {}", user),
                    json!({
                        "username": user,
                        "password": password,
                        "auth_attempts": attempt,
                        "authenticated": true,
                    }),
                )
                .await;
            self.shell = Some(FakeShell::new(user, self.peer.ip()));
        }
        decision
    }

    /// Record and execute one command line typed into the shell
    pub async fn run_command(&mut self, command: &str) -> CommandOutcome {
        let Some(shell) = self.shell.as_mut() else {
            return CommandOutcome {
                output: String::new(),
                close: true,
            };
        };

        let attacks = detection::detect_ssh(command);
        let details: Vec<_> = attacks.iter().map(|&tag| attack_details(tag, command)).collect();
        let extra = json!({
            "username": shell.username(),
            "command": command,
            "current_dir": shell.current_dir(),
            "type": "command_execution",
            "attacks_detected": tag_names(&attacks),
            "attack_details": details,
        });

        let outcome = if is_exit(command) {
            CommandOutcome {
                output: "logout\r\n".to_string(),
                close: true,
            }
        } else {
            let output = shell.execute(command).replace('\n', "\r\n");
            CommandOutcome {
                output: if output.is_empty() { output } else { output + "\r\n" },
                close: false,
            }
        };

        self.recorder.record(Service::Ssh, self.peer, command, extra).await;
        outcome
    }

    fn send(session: &mut Session, channel: ChannelId, text: &str) {
        session.data(channel, CryptoVec::from(text.as_bytes().to_vec()));
    }
}

#[async_trait]
impl russh::server::Handler for SshSession {
    type Error = anyhow::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        Ok(match self.submit_password(user, password).await {
            AuthDecision::Authenticated => Auth::Accept,
            AuthDecision::Rejected => Auth::Reject {
                proceed_with_methods: Some(MethodSet::PASSWORD),
            },
        })
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(self.shell.is_some())
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        _term: &str,
        _col_width: u32,
        _row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(&mut self, channel: ChannelId, session: &mut Session) -> Result<(), Self::Error> {
        session.channel_success(channel);
        if let Some(shell) = &self.shell {
            let greeting = format!("{}{}", shell.banner(Utc::now()), shell.prompt());
            Self::send(session, channel, &greeting);
        }
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        session.channel_success(channel);
        let command = String::from_utf8_lossy(data).trim().to_string();
        let outcome = self.run_command(&command).await;
        Self::send(session, channel, &outcome.output);
        session.exit_status_request(channel, 0);
        session.eof(channel);
        session.close(channel);
        Ok(())
    }

    async fn data(&mut self, channel: ChannelId, data: &[u8], session: &mut Session) -> Result<(), Self::Error> {
        for event in self.editor.feed(data) {
            match event {
                LineEvent::Echo(bytes) => {
                    session.data(channel, CryptoVec::from(bytes));
                }
                LineEvent::Interrupt => {
                    let prompt = self.shell.as_ref().map(FakeShell::prompt).unwrap_or_default();
                    Self::send(session, channel, &format!("^C\r\n{}", prompt));
                }
                LineEvent::Line(line) if line.is_empty() => {
                    let prompt = self.shell.as_ref().map(FakeShell::prompt).unwrap_or_default();
                    Self::send(session, channel, &prompt);
                }
                LineEvent::Line(line) => {
                    let outcome = self.run_command(&line).await;
                    if outcome.close {
                        Self::send(session, channel, &outcome.output);
                        session.eof(channel);
                        session.close(channel);
                        return Ok(());
                    }
                    let prompt = self.shell.as_ref().map(FakeShell::prompt).unwrap_or_default();
                    Self::send(session, channel, &format!("{}{}", outcome.output, prompt));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{InstanceInfo, MemorySink};
    use crate::geolocation::GeoLocator;

    fn session(sink: Arc<MemorySink>, threshold: u32) -> SshSession {
        let recorder = EventRecorder::new(
            sink,
            Arc::new(GeoLocator::disabled()),
            InstanceInfo {
                instance_name: "test".to_string(),
                environment: "TEST".to_string(),
            },
            &Default::default(),
        );
        SshSession::new("198.51.100.4:51000".parse().unwrap(), recorder, threshold)
    }

    #[tokio::test]
    async fn test_login_takes_last_identity() {
        let sink = Arc::new(MemorySink::new());
        let mut ssh = session(sink.clone(), 2);

        assert!(matches!(
            russh::server::Handler::auth_password(&mut ssh, "root", "x").await.unwrap(),
            Auth::Reject { .. }
        ));
        assert!(ssh.shell().is_none());
        assert!(matches!(
            russh::server::Handler::auth_password(&mut ssh, "admin", "y").await.unwrap(),
            Auth::Accept
        ));
        assert_eq!(ssh.identity(), Some("admin"));
        assert_eq!(ssh.shell().unwrap().username(), "admin");

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].extra["type"], "auth_attempt");
        assert_eq!(events[0].extra["username"], "root");
        assert_eq!(events[1].extra["attempt_number"], 2);
        assert_eq!(events[2].data, "Successful login: admin");
        assert_eq!(events[2].extra["authenticated"], true);
    }

    #[tokio::test]
    async fn test_commands_are_recorded_with_detection() {
        let sink = Arc::new(MemorySink::new());
        let mut ssh = session(sink.clone(), 1);
        ssh.submit_password("root", "toor").await;

        let outcome = ssh.run_command("cat /etc/passwd").await;
        assert!(!outcome.close);
        assert!(outcome.output.starts_with("root:x:0:0:root:/root:/bin/bash\r\nuser:x:"));
        assert!(outcome.output.ends_with("/bin/bash\r\n"));

        let event = sink.events().pop().unwrap();
        assert_eq!(event.extra["type"], "command_execution");
        assert_eq!(event.extra["current_dir"], "/root");
        assert_eq!(event.extra["attacks_detected"], json!(["reconnaissance"]));
        assert_eq!(event.extra["attack_details"][0]["severity"], "low");
    }

    #[tokio::test]
    async fn test_exit_closes_channel() {
        let sink = Arc::new(MemorySink::new());
        let mut ssh = session(sink.clone(), 1);
        ssh.submit_password("admin", "admin").await;

        let outcome = ssh.run_command("exit").await;
        assert_eq!(
            outcome,
            CommandOutcome {
                output: "logout\r\n".to_string(),
                close: true
            }
        );
        assert_eq!(sink.events().last().unwrap().extra["command"], "exit");
    }

    #[test]
    fn test_session_line_limit_bounds_pending_input() {
        let sink = Arc::new(MemorySink::new());
        let mut ssh = session(sink, 1).with_line_limit(8);
        for _ in 0..32 {
            ssh.editor.feed(&[b'a'; 4096]);
        }
        assert_eq!(ssh.editor.pending_len(), 8);
    }

    #[tokio::test]
    async fn test_commands_before_login_are_refused() {
        let sink = Arc::new(MemorySink::new());
        let mut ssh = session(sink.clone(), 2);
        let outcome = ssh.run_command("id").await;
        assert!(outcome.close);
        assert!(sink.events().is_empty());
    }
}
