use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use skywatch::{
    FetchError, GeolocationFailure, GeolocationProvider, LocationService, PollingController,
    StateSource, ViewerPosition, ViewportTracker, FALLBACK_CENTER,
};

/// Replays scripted response bodies in order; once exhausted, every further
/// fetch returns an unparseable body, which the controller treats as a failed
/// cycle.
struct ScriptedSource {
    responses: Mutex<VecDeque<String>>,
    fetches: Arc<AtomicU64>,
}

impl ScriptedSource {
    fn new(responses: Vec<String>) -> (Self, Arc<AtomicU64>) {
        let fetches = Arc::new(AtomicU64::new(0));
        let source = Self {
            responses: Mutex::new(responses.into()),
            fetches: Arc::clone(&fetches),
        };
        (source, fetches)
    }
}

impl StateSource for ScriptedSource {
    fn fetch_all_states(&self) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "upstream unavailable".to_string()))
    }
}

fn record(icao24: &str, latitude: Value, longitude: Value, on_ground: bool) -> Value {
    json!([
        icao24, "TST123  ", "United States", 1700000000, 1700000005,
        longitude, latitude, 10972.5, on_ground, 245.5, 270.0, -2.5,
        null, 11100.0, "7000", false, 0
    ])
}

fn body(time: i64, states: Vec<Value>) -> String {
    json!({ "time": time, "states": states }).to_string()
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn first_cycle_runs_immediately_and_publishes_only_displayable_records() {
    let (source, fetches) = ScriptedSource::new(vec![body(
        1700000010,
        vec![
            record("ground1", json!(40.7), json!(-111.9), true),
            record("nopos1", json!(0.0), json!(0.0), false),
            record("abc123", json!(40.76), json!(-111.9), false),
        ],
    )]);

    // Long interval: only the immediate first cycle can run during the test.
    let mut controller = PollingController::with_interval(source, Duration::from_secs(60));

    assert!(wait_until(Duration::from_secs(2), || {
        controller.current_display_set().len() == 1
    }));

    let set = controller.current_display_set();
    assert!(set.contains("abc123"));
    assert!(!set.contains("ground1"));
    assert!(!set.contains("nopos1"));
    assert_eq!(set.time, 1700000010);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    controller.stop();
}

#[test]
fn failed_cycle_retains_previous_display_set() {
    let (source, _fetches) = ScriptedSource::new(vec![body(
        1700000010,
        vec![record("abc123", json!(40.76), json!(-111.9), false)],
    )]);
    // Script exhausted after the first cycle: every later fetch fails.

    let mut controller = PollingController::with_interval(source, Duration::from_millis(50));

    assert!(wait_until(Duration::from_secs(2), || {
        controller.stats().cycles_failed >= 2
    }));

    let set = controller.current_display_set();
    assert_eq!(set.len(), 1);
    assert!(set.contains("abc123"));
    assert_eq!(controller.stats().cycles_succeeded, 1);

    controller.stop();
}

#[test]
fn successful_cycle_replaces_display_set_wholesale() {
    let (source, _fetches) = ScriptedSource::new(vec![
        body(1700000010, vec![record("aaa111", json!(40.76), json!(-111.9), false)]),
        body(1700000070, vec![record("bbb222", json!(51.5), json!(-0.12), false)]),
    ]);

    let mut controller = PollingController::with_interval(source, Duration::from_millis(50));

    assert!(wait_until(Duration::from_secs(2), || {
        controller.current_display_set().contains("bbb222")
    }));

    let set = controller.current_display_set();
    assert_eq!(set.len(), 1);
    assert!(!set.contains("aaa111"), "entities absent from the new cycle must not persist");
    assert_eq!(set.time, 1700000070);

    controller.stop();
}

#[test]
fn cycles_repeat_on_the_configured_cadence() {
    let (source, fetches) = ScriptedSource::new(vec![]);
    let mut controller = PollingController::with_interval(source, Duration::from_millis(50));

    assert!(wait_until(Duration::from_secs(2), || {
        fetches.load(Ordering::SeqCst) >= 3
    }));

    controller.stop();
}

#[test]
fn no_cycles_run_after_stop() {
    let (source, fetches) = ScriptedSource::new(vec![]);
    let mut controller = PollingController::with_interval(source, Duration::from_millis(20));

    assert!(wait_until(Duration::from_secs(2), || {
        fetches.load(Ordering::SeqCst) >= 2
    }));
    controller.stop();

    let after_stop = fetches.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(200));
    assert!(
        fetches.load(Ordering::SeqCst) <= after_stop + 1,
        "timer must be cancelled on stop"
    );

    let settled = fetches.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(fetches.load(Ordering::SeqCst), settled);
}

#[test]
fn subscription_delivers_each_published_set() {
    // Repeated identical bodies: subscribing can race the immediate first
    // cycle, so make sure publishes keep coming.
    let snapshot = body(
        1700000010,
        vec![record("abc123", json!(40.76), json!(-111.9), false)],
    );
    let (source, _fetches) = ScriptedSource::new(vec![snapshot; 20]);

    let mut controller = PollingController::with_interval(source, Duration::from_millis(50));
    let updates = controller.subscribe();

    let set = updates
        .recv_timeout(Duration::from_secs(2))
        .expect("first cycle should publish a snapshot");
    assert!(set.contains("abc123"));

    controller.stop();
}

/// Resolves only when the test decides, mimicking a slow platform callback.
struct DeferredLocation {
    ready: Mutex<mpsc::Receiver<ViewerPosition>>,
}

impl LocationService for DeferredLocation {
    fn current_position(&self) -> Result<ViewerPosition, GeolocationFailure> {
        self.ready
            .lock()
            .unwrap()
            .recv()
            .map_err(|_| GeolocationFailure::Unavailable("no position".to_string()))
    }
}

#[test]
fn late_geolocation_recenters_the_viewport_exactly_once() {
    let (resolve, ready) = mpsc::channel();
    let provider = GeolocationProvider::start(DeferredLocation { ready: Mutex::new(ready) });
    let mut viewport = ViewportTracker::new();

    // First poll cycles: position still unresolved, fallback applied once.
    assert_eq!(viewport.recenter(provider.position()), Some(FALLBACK_CENTER));
    assert_eq!(viewport.recenter(provider.position()), None);

    let here = ViewerPosition::new(51.5, -0.12).unwrap();
    resolve.send(here).unwrap();
    assert!(wait_until(Duration::from_secs(2), || provider.position().is_some()));

    // The cycle after resolution recenters; every later cycle leaves it alone.
    assert_eq!(viewport.recenter(provider.position()), Some(here));
    assert_eq!(viewport.recenter(provider.position()), None);
    assert_eq!(viewport.recenter(provider.position()), None);
}
