//! Process-wide cancellation and task lifecycle management.
//!
//! A `CancellationToken` shared by every spawned task plus a list of
//! `JoinHandle`s awaited on shutdown. Owns no business dependencies of its
//! own — it is purely the shutdown plumbing shared by the coordinator and
//! timeout enforcer loops.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the shared cancellation token and the handles of every spawned
/// long-running task, so shutdown can wait for all of them to exit.
pub struct Runtime {
    cancel: CancellationToken,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// Return a clone of the cancellation token for passing to tasks.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn a long-running task. Its `JoinHandle` is tracked for shutdown;
    /// the task itself is responsible for observing the cancellation token.
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        tracing::info!(task = %name, "spawning runtime task");
        let handle = tokio::spawn(future);
        self.handles.push((name, handle));
    }

    pub fn task_count(&self) -> usize {
        self.handles.len()
    }

    /// Cancel the token, then await every spawned task with a 30-second budget.
    pub async fn shutdown(&mut self) {
        tracing::info!("initiating runtime shutdown");
        self.cancel.cancel();

        let handles: Vec<_> = self.handles.drain(..).collect();
        let shutdown = async {
            for (name, handle) in handles {
                match handle.await {
                    Ok(()) => tracing::info!(task = %name, "task exited cleanly"),
                    Err(e) => tracing::warn!(task = %name, error = %e, "task panicked during shutdown"),
                }
            }
        };

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, shutdown).await.is_err() {
            tracing::warn!("shutdown timeout exceeded (30s), some tasks may still be running");
        } else {
            tracing::info!("runtime shutdown complete");
        }
    }

    /// Block until an OS shutdown signal arrives, then gracefully stop all tasks.
    pub async fn run_until_shutdown(mut self) {
        wait_for_shutdown_signal().await;
        self.shutdown().await;
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler, using Ctrl+C only");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for Ctrl+C");
                } else {
                    tracing::info!("received Ctrl+C");
                }
                return;
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Ctrl+C handler error");
                }
                tracing::info!("received Ctrl+C");
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        } else {
            tracing::info!("received Ctrl+C");
        }
    }
}
