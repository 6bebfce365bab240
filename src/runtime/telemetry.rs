use crate::normalize::block::SourceKind;
use crate::reconciler::Reconciler;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters used to derive runtime metrics.
#[derive(Default, Debug)]
pub struct Telemetry {
    flash_messages: AtomicU64,
    full_polls: AtomicU64,
    accepted_blocks: AtomicU64,
    repeat_blocks: AtomicU64,
    flushes: AtomicU64,
    normalize_errors: AtomicU64,
    transport_errors: AtomicU64,
}

impl Telemetry {
    pub fn record_flash_message(&self) {
        self.flash_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_full_poll(&self) {
        self.full_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted_block(&self) {
        self.accepted_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_repeat_block(&self) {
        self.repeat_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_normalize_error(&self) {
        self.normalize_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            flash_messages: self.flash_messages.load(Ordering::Relaxed),
            full_polls: self.full_polls.load(Ordering::Relaxed),
            accepted_blocks: self.accepted_blocks.load(Ordering::Relaxed),
            repeat_blocks: self.repeat_blocks.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            normalize_errors: self.normalize_errors.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TelemetrySnapshot {
    pub flash_messages: u64,
    pub full_polls: u64,
    pub accepted_blocks: u64,
    pub repeat_blocks: u64,
    pub flushes: u64,
    pub normalize_errors: u64,
    pub transport_errors: u64,
}

/// Spawns a background task that periodically logs ingest counters and the
/// state of both latest-block slots.
pub fn spawn_metrics_reporter(
    reconciler: Arc<Reconciler>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "flashtip::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = reconciler.telemetry().snapshot();
                    let flash = reconciler.read(SourceKind::Flash);
                    let full = reconciler.read(SourceKind::Full);

                    tracing::info!(
                        target: "flashtip::metrics",
                        flash_messages = snapshot.flash_messages,
                        full_polls = snapshot.full_polls,
                        accepted = snapshot.accepted_blocks,
                        repeats = snapshot.repeat_blocks,
                        flushes = snapshot.flushes,
                        normalize_errors = snapshot.normalize_errors,
                        transport_errors = snapshot.transport_errors,
                        flash_height = flash.last_accepted_sequence,
                        full_height = full.last_accepted_sequence,
                        "runtime metrics snapshot"
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[test]
    fn telemetry_records_counters() {
        let telemetry = Telemetry::default();
        telemetry.record_flash_message();
        telemetry.record_flash_message();
        telemetry.record_full_poll();
        telemetry.record_accepted_block();
        telemetry.record_repeat_block();
        telemetry.record_flush();
        telemetry.record_normalize_error();
        telemetry.record_transport_error();

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.flash_messages, 2);
        assert_eq!(snapshot.full_polls, 1);
        assert_eq!(snapshot.accepted_blocks, 1);
        assert_eq!(snapshot.repeat_blocks, 1);
        assert_eq!(snapshot.flushes, 1);
        assert_eq!(snapshot.normalize_errors, 1);
        assert_eq!(snapshot.transport_errors, 1);
    }

    #[tokio::test]
    async fn metrics_reporter_logs_until_shutdown() {
        let shutdown = CancellationToken::new();
        let reconciler = Arc::new(Reconciler::new(
            Duration::from_millis(200),
            Duration::from_millis(400),
            Arc::new(Telemetry::default()),
            shutdown.child_token(),
        ));

        let handle = spawn_metrics_reporter(
            reconciler,
            shutdown.clone(),
            Duration::from_millis(10),
        );

        shutdown.cancel();
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("reporter should stop promptly")
            .expect("task should not panic");
    }
}
