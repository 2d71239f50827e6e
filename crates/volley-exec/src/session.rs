//! Per-target session lifecycle: admission, connect with retry, run, report

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::result::HostResult;
use crate::target::Target;
use crate::transport::Transport;

/// First retry delay; doubles per failed attempt up to [`BACKOFF_CAP`].
const BACKOFF_BASE: Duration = Duration::from_millis(500);
/// Upper bound on a single retry delay.
const BACKOFF_CAP: Duration = Duration::from_secs(5);

/// Delay before the next attempt, given how many attempts have failed.
/// Series: 0.5s, 1s, 2s, 4s, 5s, 5s, ...
fn backoff_delay(failed_attempts: u32) -> Duration {
    let doublings = failed_attempts.saturating_sub(1).min(4);
    BACKOFF_BASE.saturating_mul(1 << doublings).min(BACKOFF_CAP)
}

/// Run one target's full lifecycle under the shared admission gate.
///
/// Always produces a [`HostResult`]: transport errors, exhausted retries,
/// and command timeouts are folded into a failed result rather than
/// propagated. The semaphore permit is held from the first connect attempt
/// until the connection is closed and released on every exit path.
#[instrument(skip_all, fields(host = %target.host))]
pub async fn run_target(
    transport: Arc<dyn Transport>,
    target: Target,
    limiter: Arc<Semaphore>,
) -> HostResult {
    let started_at = Instant::now();

    let _permit = match limiter.acquire_owned().await {
        Ok(permit) => permit,
        // Only possible if the dispatcher closed the semaphore, which it
        // never does; still reported per-host rather than panicking.
        Err(e) => {
            return HostResult::failed(target.host.clone(), started_at, format!("Dispatch: {e}"));
        }
    };

    let budget = target.attempt_budget();
    let mut attempt: u32 = 1;

    loop {
        debug!(attempt, budget, "connecting");

        match transport.connect(&target).await {
            Ok(mut conn) => {
                let outcome = conn
                    .run(&target.command, target.pty, target.command_timeout)
                    .await;
                // Teardown never masks the command's outcome.
                conn.close().await;

                return match outcome {
                    Ok(output) => HostResult::completed(target.host.clone(), started_at, output),
                    // Command-phase failures are terminal for this target;
                    // only connection failures re-enter the loop.
                    Err(err) => {
                        warn!(error = %err, "command did not complete");
                        HostResult::failed(target.host.clone(), started_at, err.detail())
                    }
                };
            }
            Err(err) if err.is_retryable() && attempt < budget => {
                let delay = backoff_delay(attempt);
                warn!(
                    attempt,
                    budget,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "connection attempt failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(attempt, budget, error = %err, "giving up on host");
                return HostResult::failed(target.host.clone(), started_at, err.detail());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_to_cap() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(2));
        assert_eq!(backoff_delay(4), Duration::from_secs(4));
        assert_eq!(backoff_delay(5), Duration::from_secs(5));
        assert_eq!(backoff_delay(20), Duration::from_secs(5));
    }
}
