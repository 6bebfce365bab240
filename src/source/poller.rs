//! Fixed-interval JSON-RPC poller for full block snapshots. The poll client
//! sits behind the [`LatestBlockClient`] trait so tests can drive the poller
//! without a node.

use crate::normalize::full::FullBlockPayload;
use crate::reconciler::Reconciler;
use crate::runtime::config::ReconcilerConfig;
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Client capable of fetching the latest full block. `None` means the source
/// had no block for this cycle, which is not an error.
pub trait LatestBlockClient: Send + Sync {
    fn latest_block(&self) -> BoxFuture<'_, Result<Option<FullBlockPayload>>>;
}

/// `eth_getBlockByNumber ["latest", true]` over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct EthRpcClient {
    client: HttpClient,
}

impl EthRpcClient {
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self> {
        let client = HttpClientBuilder::default()
            .request_timeout(request_timeout)
            .build(url)
            .map_err(|err| anyhow!("failed to build RPC client: {err}"))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ReconcilerConfig) -> Result<Self> {
        Self::new(config.rpc_url(), config.rpc_timeout())
    }
}

impl LatestBlockClient for EthRpcClient {
    fn latest_block(&self) -> BoxFuture<'_, Result<Option<FullBlockPayload>>> {
        Box::pin(async move {
            self.client
                .request("eth_getBlockByNumber", rpc_params!["latest", true])
                .await
                .map_err(|err| anyhow!("eth_getBlockByNumber call failed: {err}"))
        })
    }
}

/// Polls the full-block source on a fixed interval and hands every snapshot
/// to the reconciler.
pub struct FullBlockPoller;

impl FullBlockPoller {
    /// Spawns the poll loop. The first request fires immediately; transport
    /// failures are logged and counted, and the loop simply waits for the
    /// next tick, so consumers observe staleness only.
    pub fn spawn(
        client: Arc<dyn LatestBlockClient>,
        reconciler: Arc<Reconciler>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        reconciler.telemetry().record_full_poll();
                        match client.latest_block().await {
                            Ok(Some(payload)) => reconciler.ingest_full(&payload),
                            Ok(None) => {
                                tracing::trace!("poll returned no block; keeping last snapshot");
                            }
                            Err(err) => {
                                reconciler.telemetry().record_transport_error();
                                tracing::warn!(error = %err, "full block poll failed");
                            }
                        }
                    }
                }
            }

            tracing::info!("full block poller stopped");
        })
    }
}
