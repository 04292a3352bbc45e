//! Runner for long-lived service processes.
//!
//! Each registered process receives a shared [`CancellationToken`] and is
//! expected to return once the token fires. The runner cancels the token on
//! SIGINT/SIGTERM or when any process fails, waits for the remaining
//! processes to wind down, then executes the registered closers under a
//! single timeout. The first process error is returned to the caller so
//! exit-code policy stays with the binary.
//!
//! # Example
//!
//! ```no_run
//! use citysense_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Runner::new()
//!         .with_named_process("heartbeat", |token| async move {
//!             token.cancelled().await;
//!             tracing::info!("Heartbeat stopping");
//!             Ok(())
//!         })
//!         .with_closer(|| async { Ok(()) })
//!         .with_closer_timeout(Duration::from_secs(5))
//!         .run()
//!         .await
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type BoxedFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A named process: receives the shared cancellation token and runs until
/// it completes or the token fires.
type ProcessFn = Box<dyn FnOnce(CancellationToken) -> BoxedFuture + Send>;

/// A cleanup function executed after every process has stopped.
type CloserFn = Box<dyn FnOnce() -> BoxedFuture + Send>;

const DEFAULT_CLOSER_TIMEOUT: Duration = Duration::from_secs(10);

/// Orchestrates long-running processes and their cleanup.
///
/// Processes run concurrently until all complete, one fails, or a shutdown
/// signal arrives. Closers always execute afterwards, in registration
/// order, sharing one timeout budget.
pub struct Runner {
    processes: Vec<(String, ProcessFn)>,
    closers: Vec<CloserFn>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: DEFAULT_CLOSER_TIMEOUT,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Registers a process under an auto-generated name.
    pub fn with_process<F, Fut>(self, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = format!("process-{}", self.processes.len());
        self.with_named_process(name, process)
    }

    /// Registers a process under a name that shows up in shutdown logs.
    ///
    /// If the process returns an error, the shared token is cancelled and
    /// every other process is expected to wind down.
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.processes
            .push((name.into(), Box::new(move |token| Box::pin(process(token)))));
        self
    }

    /// Registers a closer. Closers run after all processes have stopped,
    /// regardless of how they stopped, in registration order.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.closers.push(Box::new(move || Box::pin(closer())));
        self
    }

    /// Sets the combined budget for all closers. Default is 10 seconds.
    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Uses an externally owned cancellation token instead of a fresh one.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Runs every registered process to completion, then the closers.
    /// Returns the first process failure, if any.
    pub async fn run(self) -> Result<()> {
        let token = self.cancellation_token;
        let mut tasks: JoinSet<(String, Result<()>)> = JoinSet::new();

        for (name, process) in self.processes {
            let process_token = token.clone();
            tasks.spawn(async move {
                let result = process(process_token).await;
                (name, result)
            });
        }

        spawn_signal_watchers(token.clone());

        let mut first_error: Option<anyhow::Error> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    debug!(process = %name, "Process finished");
                }
                Ok((name, Err(e))) => {
                    error!(process = %name, error = %e, "Process failed, shutting down");
                    if first_error.is_none() {
                        first_error = Some(e.context(format!("Process '{}' failed", name)));
                    }
                    token.cancel();
                }
                Err(e) => {
                    error!(error = %e, "Process panicked, shutting down");
                    if first_error.is_none() {
                        first_error = Some(anyhow!(e).context("Process panicked"));
                    }
                    token.cancel();
                }
            }
        }

        info!("All processes stopped, running closers");
        run_closers(self.closers, self.closer_timeout).await;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_signal_watchers(token: CancellationToken) {
    let interrupt_token = token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for interrupt signal");
            return;
        }
        info!("Received interrupt signal, shutting down");
        interrupt_token.cancel();
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Failed to listen for terminate signal");
                return;
            }
        };
        sigterm.recv().await;
        info!("Received terminate signal, shutting down");
        token.cancel();
    });
}

async fn run_closers(closers: Vec<CloserFn>, timeout: Duration) {
    if closers.is_empty() {
        return;
    }

    let close_all = async {
        for (index, closer) in closers.into_iter().enumerate() {
            if let Err(e) = closer().await {
                warn!(closer = index, error = %e, "Closer failed");
            }
        }
    };

    if tokio::time::timeout(timeout, close_all).await.is_err() {
        warn!(
            timeout_secs = timeout.as_secs(),
            "Closers did not finish before timeout"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    #[tokio::test]
    async fn test_runs_all_processes_to_completion() {
        // Arrange
        let first_ran = Arc::new(AtomicBool::new(false));
        let second_ran = Arc::new(AtomicBool::new(false));
        let first_flag = first_ran.clone();
        let second_flag = second_ran.clone();

        // Act
        let result = Runner::new()
            .with_process(move |_| async move {
                first_flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .with_named_process("second", move |_| async move {
                second_flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .run()
            .await;

        // Assert
        assert!(result.is_ok());
        assert!(first_ran.load(Ordering::SeqCst));
        assert!(second_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_process_failure_cancels_peers_and_surfaces_error() {
        // Arrange
        let peer_cancelled = Arc::new(AtomicBool::new(false));
        let peer_flag = peer_cancelled.clone();

        // Act
        let result = Runner::new()
            .with_named_process("failing", |_| async { Err(anyhow!("broker exploded")) })
            .with_named_process("peer", move |token| async move {
                token.cancelled().await;
                peer_flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .run()
            .await;

        // Assert
        let error = result.expect_err("Runner should surface the process error");
        assert!(error.to_string().contains("failing"));
        assert!(peer_cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_external_cancellation_stops_processes() {
        // Arrange
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        // Act
        let result = Runner::new()
            .with_cancellation_token(token)
            .with_named_process("waiter", |token| async move {
                token.cancelled().await;
                Ok(())
            })
            .run()
            .await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_closers_run_after_processes_in_order() {
        // Arrange
        let sequence = Arc::new(Mutex::new(Vec::new()));
        let process_log = sequence.clone();
        let first_closer_log = sequence.clone();
        let second_closer_log = sequence.clone();

        // Act
        let result = Runner::new()
            .with_named_process("worker", move |_| async move {
                process_log.lock().unwrap().push("process");
                Ok(())
            })
            .with_closer(move || async move {
                first_closer_log.lock().unwrap().push("closer-0");
                Ok(())
            })
            .with_closer(move || async move {
                second_closer_log.lock().unwrap().push("closer-1");
                Ok(())
            })
            .run()
            .await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(
            *sequence.lock().unwrap(),
            vec!["process", "closer-0", "closer-1"]
        );
    }

    #[tokio::test]
    async fn test_slow_closer_is_abandoned_at_timeout() {
        // Arrange
        let started = Instant::now();

        // Act
        let result = Runner::new()
            .with_named_process("worker", |_| async { Ok(()) })
            .with_closer(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .with_closer_timeout(Duration::from_millis(100))
            .run()
            .await;

        // Assert
        assert!(result.is_ok());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_closer_error_does_not_mask_success() {
        // Act
        let result = Runner::new()
            .with_named_process("worker", |_| async { Ok(()) })
            .with_closer(|| async { Err(anyhow!("flush failed")) })
            .run()
            .await;

        // Assert
        assert!(result.is_ok());
    }
}
