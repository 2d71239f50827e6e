//! Bounded fan-out across targets with order-preserving collection

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Semaphore, mpsc};
use tracing::{error, info, instrument};

use crate::result::HostResult;
use crate::session::run_target;
use crate::target::Target;
use crate::transport::Transport;

/// Launches one session task per target under a shared admission gate and
/// gathers the results back into input order.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    /// Create a dispatcher over the given transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Run every target with at most `max_concurrency` sessions in flight.
    ///
    /// `results[i]` always corresponds to `targets[i]` even though internal
    /// completion order is unconstrained. One target's failure never
    /// disturbs another: even a panicked session task is folded into a
    /// failed result for its host.
    pub async fn run(&self, targets: Vec<Target>, max_concurrency: usize) -> Vec<HostResult> {
        self.run_with_events(targets, max_concurrency, None).await
    }

    /// Same as [`Dispatcher::run`], additionally sending each result to
    /// `events` the moment its target finishes, for streaming consumers.
    /// The channel closes once every target has reported.
    #[instrument(skip_all, fields(targets = targets.len(), limit = max_concurrency))]
    pub async fn run_with_events(
        &self,
        targets: Vec<Target>,
        max_concurrency: usize,
        events: Option<mpsc::UnboundedSender<HostResult>>,
    ) -> Vec<HostResult> {
        let limiter = Arc::new(Semaphore::new(max_concurrency.max(1)));

        info!("dispatching");

        let handles: Vec<_> = targets
            .into_iter()
            .map(|target| {
                let transport = Arc::clone(&self.transport);
                let limiter = Arc::clone(&limiter);
                let events = events.clone();
                let host = target.host.clone();

                let handle = tokio::spawn(async move {
                    let result = run_target(transport, target, limiter).await;
                    if let Some(tx) = &events {
                        let _ = tx.send(result.clone());
                    }
                    result
                });

                (host, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (host, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_err) => {
                    // The session converts every error it sees, so only a
                    // panic lands here. Still one result per target.
                    error!(host = %host, error = %join_err, "session task aborted");
                    let result = HostResult::failed(
                        host,
                        Instant::now(),
                        format!("TaskAborted: {join_err}"),
                    );
                    if let Some(tx) = &events {
                        let _ = tx.send(result.clone());
                    }
                    results.push(result);
                }
            }
        }

        results
    }
}
