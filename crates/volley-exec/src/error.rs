//! Error types for volley-exec

use std::time::Duration;

use thiserror::Error;

/// Errors raised while connecting to a host or driving a remote command.
///
/// A non-zero remote exit is not an error at this level: it is reported
/// through [`HostResult`](crate::result::HostResult) with the real exit
/// status and captured stderr.
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// TCP/SSH connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Connection attempt exceeded the configured deadline
    #[error("connection timed out after {timeout:?}")]
    ConnectTimeout {
        /// Deadline that was exceeded
        timeout: Duration,
    },

    /// Server rejected every offered authentication method
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Channel-level failure while a session was open
    #[error("channel error: {0}")]
    Channel(String),

    /// Remote command exceeded the configured deadline
    #[error("command timed out after {timeout:?}")]
    CommandTimeout {
        /// Deadline that was exceeded
        timeout: Duration,
    },

    /// Credential material could not be loaded
    #[error("SSH key error: {0}")]
    Key(String),
}

impl ExecError {
    /// Whether a fresh connection attempt may succeed where this one failed.
    ///
    /// Only connection-phase failures qualify; a command that timed out on
    /// an established session is terminal for its target.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecError::Connect(_)
                | ExecError::ConnectTimeout { .. }
                | ExecError::Auth(_)
                | ExecError::Channel(_)
        )
    }

    /// Short failure-kind label used in result error strings.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ExecError::Connect(_) => "ConnectError",
            ExecError::ConnectTimeout { .. } => "ConnectTimeout",
            ExecError::Auth(_) => "AuthError",
            ExecError::Channel(_) => "ChannelError",
            ExecError::CommandTimeout { .. } => "CommandTimeout",
            ExecError::Key(_) => "KeyError",
        }
    }

    /// "<kind>: <message>" form carried on failed results.
    #[must_use]
    pub fn detail(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}
