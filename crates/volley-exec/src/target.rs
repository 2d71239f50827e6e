//! Target descriptors

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Host key verification policy.
///
/// Threaded through from configuration for each target. The shipped
/// transport currently accepts every server key regardless of this value
/// (the `StrictHostKeyChecking=no` posture); see
/// [`SshTransport`](crate::ssh::SshTransport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKeyPolicy {
    /// Verify server keys against known hosts
    #[default]
    Strict,
    /// Accept any server key
    Off,
}

/// One remote endpoint plus the options used when executing against it.
///
/// Built once by the configuration layer and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Target {
    /// Hostname or IP address
    pub host: String,
    /// SSH port
    pub port: u16,
    /// Login user; `None` falls back to the transport default
    pub username: Option<String>,
    /// Private key file for publickey auth
    pub identity: Option<PathBuf>,
    /// Password for password auth
    pub password: Option<String>,
    /// Shell command to run
    pub command: String,
    /// Deadline for establishing the connection
    pub connect_timeout: Duration,
    /// Deadline for the remote command; `None` means unbounded
    pub command_timeout: Option<Duration>,
    /// Request a pseudo-terminal for the command
    pub pty: bool,
    /// Total connection attempts, 1 meaning no retry
    pub retry_attempts: u32,
    /// Host key verification policy
    pub host_key_policy: HostKeyPolicy,
}

impl Target {
    /// Create a target with default options (port 22, 10s connect timeout,
    /// single attempt, no pty).
    pub fn new(host: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            identity: None,
            password: None,
            command: command.into(),
            connect_timeout: Duration::from_secs(10),
            command_timeout: None,
            pty: false,
            retry_attempts: 1,
            host_key_policy: HostKeyPolicy::Off,
        }
    }

    /// Set a custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the login user
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set a private key file
    #[must_use]
    pub fn with_identity(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity = Some(path.into());
        self
    }

    /// Set a password
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the connect deadline
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound the remote command's runtime
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Request a pseudo-terminal
    #[must_use]
    pub fn with_pty(mut self, pty: bool) -> Self {
        self.pty = pty;
        self
    }

    /// Set the connection attempt budget
    #[must_use]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Set the host key policy
    #[must_use]
    pub fn with_host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    /// Connection attempt budget, clamped to at least one attempt.
    #[must_use]
    pub fn attempt_budget(&self) -> u32 {
        self.retry_attempts.max(1)
    }
}
