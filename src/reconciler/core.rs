//! Reconciler core: owns both stream slots, classifies candidates, and
//! coalesces bursts with a per-stream trailing-edge debounce so consumer
//! state changes at a bounded rate.

use crate::normalize::block::{NormalizedBlock, SourceKind};
use crate::normalize::flash::normalize_flash;
use crate::normalize::full::{normalize_full, FullBlockPayload};
use crate::reconciler::identity::{Classification, IdentityTracker};
use crate::reconciler::slot::StreamSlot;
use crate::runtime::config::ReconcilerConfig;
use crate::runtime::telemetry::Telemetry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

type ChangeObserver = Box<dyn Fn(&StreamSlot) + Send + Sync>;

/// Latest candidate of the current debounce window. `fresh` is true when any
/// candidate absorbed by the window classified `New`, so a burst that starts
/// with a new block still triggers exactly one change signal even though only
/// its last candidate flushes.
struct PendingFlush {
    block: NormalizedBlock,
    fresh: bool,
}

struct StreamState {
    kind: SourceKind,
    window: Duration,
    tracker: IdentityTracker,
    pending: Mutex<Option<PendingFlush>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    slot: Mutex<StreamSlot>,
    observers: Mutex<Vec<ChangeObserver>>,
}

impl StreamState {
    fn new(kind: SourceKind, window: Duration) -> Self {
        Self {
            kind,
            window,
            tracker: IdentityTracker::new(),
            pending: Mutex::new(None),
            timer: Mutex::new(None),
            slot: Mutex::new(StreamSlot::default()),
            observers: Mutex::new(Vec::new()),
        }
    }
}

struct Shared {
    flash: StreamState,
    full: StreamState,
    telemetry: Arc<Telemetry>,
    // Timestamp of the most recent flash record that carried one, used to
    // back-fill diff records which omit it on the wire.
    flash_timestamp: Mutex<Option<u64>>,
}

impl Shared {
    fn stream(&self, kind: SourceKind) -> &StreamState {
        match kind {
            SourceKind::Flash => &self.flash,
            SourceKind::Full => &self.full,
        }
    }

    fn flush(&self, kind: SourceKind) {
        let stream = self.stream(kind);
        let Some(pending) = lock(&stream.pending).take() else {
            return;
        };

        let snapshot = {
            let mut slot = lock(&stream.slot);
            if pending.fresh {
                slot.change_counter += 1;
                slot.last_accepted_sequence = Some(pending.block.sequence);
            }
            slot.current = Some(pending.block);
            slot.clone()
        };

        self.telemetry.record_flush();
        tracing::debug!(
            stream = kind.as_str(),
            sequence = snapshot.last_accepted_sequence,
            variant = snapshot.current.as_ref().map(|b| b.variant.label()),
            fresh = pending.fresh,
            change_counter = snapshot.change_counter,
            "flushed debounced block"
        );

        if pending.fresh {
            for observer in lock(&stream.observers).iter() {
                observer(&snapshot);
            }
        }
    }
}

/// Long-lived reconciler holding the two latest-state slots.
///
/// All mutation goes through [`Reconciler::submit`]; consumers only read.
/// `submit` must run inside a Tokio runtime because each call (re)arms the
/// stream's debounce timer task.
pub struct Reconciler {
    shared: Arc<Shared>,
    shutdown: CancellationToken,
}

impl Reconciler {
    pub fn new(
        flash_window: Duration,
        full_window: Duration,
        telemetry: Arc<Telemetry>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                flash: StreamState::new(SourceKind::Flash, flash_window),
                full: StreamState::new(SourceKind::Full, full_window),
                telemetry,
                flash_timestamp: Mutex::new(None),
            }),
            shutdown,
        }
    }

    pub fn from_config(
        config: &ReconcilerConfig,
        telemetry: Arc<Telemetry>,
        shutdown: CancellationToken,
    ) -> Self {
        Self::new(
            config.flash_debounce(),
            config.full_debounce(),
            telemetry,
            shutdown,
        )
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.shared.telemetry
    }

    /// Returns a consistent snapshot of the stream's latest flushed state.
    pub fn read(&self, kind: SourceKind) -> StreamSlot {
        lock(&self.shared.stream(kind).slot).clone()
    }

    /// Registers an observer invoked synchronously after every change-counter
    /// increment of the given stream. Repeat flushes do not invoke observers.
    pub fn on_change<F>(&self, kind: SourceKind, observer: F)
    where
        F: Fn(&StreamSlot) + Send + Sync + 'static,
    {
        lock(&self.shared.stream(kind).observers).push(Box::new(observer));
    }

    /// Normalizes and submits one raw flash-stream message. Malformed
    /// payloads are counted and dropped without advancing any state.
    pub fn ingest_flash(&self, raw: &str) {
        self.shared.telemetry.record_flash_message();
        match normalize_flash(raw) {
            Ok(mut block) => {
                let mut cached = lock(&self.shared.flash_timestamp);
                match block.timestamp {
                    Some(timestamp) => *cached = Some(timestamp),
                    None => block.timestamp = *cached,
                }
                drop(cached);
                self.submit(SourceKind::Flash, block);
            }
            Err(err) => {
                self.shared.telemetry.record_normalize_error();
                tracing::warn!(error = %err, "dropping malformed flash payload");
            }
        }
    }

    /// Normalizes and submits one full block snapshot.
    pub fn ingest_full(&self, payload: &FullBlockPayload) {
        match normalize_full(payload) {
            Ok(block) => self.submit(SourceKind::Full, block),
            Err(err) => {
                self.shared.telemetry.record_normalize_error();
                tracing::warn!(error = %err, "dropping malformed full block payload");
            }
        }
    }

    /// Classifies the candidate and (re)arms the stream's debounce window
    /// with it. Only the latest candidate of a burst flushes, `window` after
    /// the last submit.
    pub fn submit(&self, kind: SourceKind, block: NormalizedBlock) {
        if self.shutdown.is_cancelled() {
            tracing::trace!(stream = kind.as_str(), "reconciler stopped; dropping candidate");
            return;
        }

        let stream = self.shared.stream(kind);
        let classification = stream.tracker.classify(block.sequence);
        match classification {
            Classification::New => self.shared.telemetry.record_accepted_block(),
            Classification::Repeat => self.shared.telemetry.record_repeat_block(),
        }

        {
            let mut pending = lock(&stream.pending);
            let fresh = classification == Classification::New
                || pending.as_ref().is_some_and(|p| p.fresh);
            *pending = Some(PendingFlush { block, fresh });
        }

        let mut timer = lock(&stream.timer);
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let shared = self.shared.clone();
        let shutdown = self.shutdown.clone();
        let window = stream.window;
        *timer = Some(tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = sleep(window) => shared.flush(kind),
            }
        }));
    }

    /// Stops the reconciler: cancels pending debounce timers for both
    /// streams, rejects further submits, and leaves the slots in their
    /// last-flushed state. Un-flushed candidates are discarded.
    pub fn stop(&self) {
        self.shutdown.cancel();
        for stream in [&self.shared.flash, &self.shared.full] {
            if let Some(timer) = lock(&stream.timer).take() {
                timer.abort();
            }
            lock(&stream.pending).take();
        }
        tracing::info!("reconciler stopped");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
