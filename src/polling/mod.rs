use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::data::aircraft::{decode_state_vector, DisplaySet};
use crate::data::filter::is_displayable;
use crate::errors::FetchError;
use crate::sources::StateSource;

/// Cadence between poll cycles, measured tick-to-tick.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Top-level shape of the upstream response. `states` is null when the
/// service has nothing to report.
#[derive(Deserialize)]
struct StateResponse {
    time: i64,
    states: Option<Vec<Value>>,
}

/// Counters for operator visibility; fetch failures are swallowed from the
/// rendering layer's perspective but never silently dropped here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles_succeeded: u64,
    pub cycles_failed: u64,
    pub records_skipped: u64,
}

struct Shared {
    current: Mutex<Arc<DisplaySet>>,
    subscribers: Mutex<Vec<Sender<Arc<DisplaySet>>>>,
    active: AtomicBool,
    cycles_succeeded: AtomicU64,
    cycles_failed: AtomicU64,
    records_skipped: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            current: Mutex::new(Arc::new(DisplaySet::empty())),
            subscribers: Mutex::new(Vec::new()),
            active: AtomicBool::new(true),
            cycles_succeeded: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            records_skipped: AtomicU64::new(0),
        }
    }
}

/// Drives the fetch -> decode -> filter -> publish loop.
///
/// A timer thread emits ticks free-running (first tick immediately, then one
/// per interval, independent of fetch latency); a worker thread runs one cycle
/// per tick, coalescing ticks that queued up behind a slow fetch so cycles
/// never overlap. Results arriving after deactivation are discarded.
pub struct PollingController {
    shared: Arc<Shared>,
    shutdown: Sender<()>,
    timer: Option<JoinHandle<()>>,
}

impl PollingController {
    pub fn start<S: StateSource>(source: S) -> Self {
        Self::with_interval(source, POLL_INTERVAL)
    }

    pub fn with_interval<S: StateSource>(source: S, interval: Duration) -> Self {
        let shared = Arc::new(Shared::new());
        let (tick_tx, tick_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let timer = thread::spawn(move || loop {
            if tick_tx.send(()).is_err() {
                break;
            }
            match shutdown_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => break,
            }
        });

        let worker_shared = Arc::clone(&shared);
        thread::spawn(move || {
            while tick_rx.recv().is_ok() {
                // Coalesce ticks that piled up behind a slow fetch
                while tick_rx.try_recv().is_ok() {}

                if !worker_shared.active.load(Ordering::SeqCst) {
                    break;
                }
                run_cycle(&source, &worker_shared);
            }
        });

        Self { shared, shutdown: shutdown_tx, timer: Some(timer) }
    }

    /// Latest published set; stale after a failed cycle, never cleared.
    pub fn current_display_set(&self) -> Arc<DisplaySet> {
        Arc::clone(&self.shared.current.lock().unwrap())
    }

    /// Snapshot stream for the rendering layer; one message per successful
    /// cycle. Dropped receivers are pruned on the next publish.
    pub fn subscribe(&self) -> Receiver<Arc<DisplaySet>> {
        let (tx, rx) = mpsc::channel();
        self.shared.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub fn stats(&self) -> PollStats {
        PollStats {
            cycles_succeeded: self.shared.cycles_succeeded.load(Ordering::SeqCst),
            cycles_failed: self.shared.cycles_failed.load(Ordering::SeqCst),
            records_skipped: self.shared.records_skipped.load(Ordering::SeqCst),
        }
    }

    /// Cancels the pending timer; no further cycles run. A fetch already in
    /// flight is left to finish, and its result is discarded.
    pub fn stop(&mut self) {
        self.shared.active.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(());
        if let Some(timer) = self.timer.take() {
            let _ = timer.join();
        }
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_cycle<S: StateSource>(source: &S, shared: &Shared) {
    let fetched = source
        .fetch_all_states()
        .and_then(|body| build_display_set(&body));

    match fetched {
        Ok((set, skipped)) => {
            if !shared.active.load(Ordering::SeqCst) {
                return; // deactivated while the fetch was in flight
            }
            shared.cycles_succeeded.fetch_add(1, Ordering::SeqCst);
            shared.records_skipped.fetch_add(skipped, Ordering::SeqCst);
            publish(shared, set);
        }
        Err(err) => {
            shared.cycles_failed.fetch_add(1, Ordering::SeqCst);
            warn!("poll cycle failed, keeping previous display set: {err}");
        }
    }
}

/// Decode and filter one response body. Malformed records are skipped and
/// counted; only a malformed top-level payload fails the cycle.
fn build_display_set(body: &str) -> Result<(DisplaySet, u64), FetchError> {
    let response: StateResponse = serde_json::from_str(body)?;
    let states = response.states.unwrap_or_default();
    let total = states.len();

    let mut skipped = 0u64;
    let displayable = states
        .iter()
        .filter_map(|record| match decode_state_vector(record) {
            Ok(state) => Some(state),
            Err(err) => {
                skipped += 1;
                debug!("skipping state vector: {err}");
                None
            }
        })
        .filter(is_displayable);

    let set = DisplaySet::new(response.time, displayable);
    debug!(total, skipped, displayable = set.len(), "poll cycle decoded");

    Ok((set, skipped))
}

fn publish(shared: &Shared, set: DisplaySet) {
    let set = Arc::new(set);
    *shared.current.lock().unwrap() = Arc::clone(&set);
    shared
        .subscribers
        .lock()
        .unwrap()
        .retain(|tx| tx.send(Arc::clone(&set)).is_ok());

    info!(aircraft = set.len(), time = set.time, "display set updated");
}
