use crate::reconciler::Reconciler;
use crate::runtime::config::ReconcilerConfig;
use crate::runtime::telemetry::{spawn_metrics_reporter, Telemetry};
use crate::source::poller::{EthRpcClient, FullBlockPoller};
use crate::source::socket::FlashSocket;
use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Coordinates the adapter tasks and reconciler lifecycle and handles OS
/// signals for graceful shutdowns.
///
/// A runner is single-shot: stopping it tears the reconciler down and
/// discards pending debounce windows; a fresh viewing session gets a fresh
/// runner with empty slots.
pub struct Runner {
    config: ReconcilerConfig,
    reconciler: Arc<Reconciler>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
}

impl Runner {
    /// Creates a runner and wires a root [`CancellationToken`] that
    /// propagates through the adapters, the metrics reporter, and the
    /// reconciler's debounce timers.
    pub fn new(config: ReconcilerConfig) -> Self {
        let shutdown = CancellationToken::new();
        let reconciler = Arc::new(Reconciler::from_config(
            &config,
            Arc::new(Telemetry::default()),
            shutdown.child_token(),
        ));
        Self {
            config,
            reconciler,
            shutdown,
            tasks: Vec::new(),
            started: false,
        }
    }

    /// The reconciler consumers read slots from and register observers on.
    pub fn reconciler(&self) -> Arc<Reconciler> {
        self.reconciler.clone()
    }

    /// Returns a clone of the root shutdown token so external callers can
    /// integrate with their own signal handlers or cancellation strategies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns the flash-stream reader, the full-block poller, and the
    /// metrics reporter.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        if self.shutdown.is_cancelled() {
            bail!("runner already stopped; create a new runner for a new session");
        }

        let client = Arc::new(EthRpcClient::from_config(&self.config)?);

        self.tasks.push(FlashSocket::spawn(
            self.config.ws_url().to_owned(),
            self.reconciler.clone(),
            self.shutdown.child_token(),
        ));
        self.tasks.push(FullBlockPoller::spawn(
            client,
            self.reconciler.clone(),
            self.config.poll_interval(),
            self.shutdown.child_token(),
        ));
        self.tasks.push(spawn_metrics_reporter(
            self.reconciler.clone(),
            self.shutdown.child_token(),
            self.config.metrics_interval(),
        ));

        self.started = true;
        tracing::info!(
            ws_url = self.config.ws_url(),
            rpc_url = self.config.rpc_url(),
            "runner started"
        );
        Ok(())
    }

    /// Stops everything gracefully: cancels the root token, tears down the
    /// reconciler (discarding pending debounce windows), and waits for the
    /// adapter tasks to finish.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }

        self.shutdown.cancel();
        self.reconciler.stop();

        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    tracing::warn!(error = %err, "adapter task ended abnormally");
                }
            }
        }

        self.started = false;
        Ok(())
    }

    /// Runs until a Ctrl-C (SIGINT) is received or the shutdown token is
    /// cancelled elsewhere.
    pub async fn run_until_ctrl_c(&mut self) -> Result<()> {
        self.start().await?;
        tracing::info!("runner started; waiting for Ctrl-C (SIGINT) to initiate shutdown");

        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Ctrl-C received; shutting down runner");
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("runner shutdown token cancelled");
            }
        }

        self.stop().await
    }
}
