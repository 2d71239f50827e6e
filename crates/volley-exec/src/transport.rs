//! Transport seam between the engine and the SSH stack

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandOutput;
use crate::target::Target;

/// A live connection to one remote host.
#[async_trait]
pub trait Connection: Send {
    /// Run `command` on the remote side, capturing the exit status and both
    /// output streams. A non-zero exit is a normal return, not an error;
    /// errors are reserved for channel failures and the `timeout` deadline.
    async fn run(
        &mut self,
        command: &str,
        pty: bool,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, ExecError>;

    /// Best-effort teardown; failures are swallowed.
    async fn close(&mut self);
}

/// Connection factory for one protocol implementation.
///
/// The engine only sees this trait, so the russh stack, a mock, or a
/// simulated fixture are interchangeable.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish an authenticated connection to `target`, honoring its
    /// connect deadline.
    async fn connect(&self, target: &Target) -> Result<Box<dyn Connection>, ExecError>;
}
