use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, info};

use crate::sources::LocationService;

/// A resolved viewer position, decimal degrees. Only ever built from finite
/// coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl ViewerPosition {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        (latitude.is_finite() && longitude.is_finite())
            .then_some(Self { latitude, longitude })
    }
}

/// Map center used until (and unless) the viewer's position resolves.
pub const FALLBACK_CENTER: ViewerPosition = ViewerPosition {
    latitude: 40.7608,
    longitude: -111.891,
};

/// Resolves the viewer's position exactly once per activation, off-thread.
/// Failure leaves the position absent for good; there is no retry.
pub struct GeolocationProvider {
    position: Arc<Mutex<Option<ViewerPosition>>>,
}

impl GeolocationProvider {
    pub fn start<S: LocationService>(service: S) -> Self {
        let position = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&position);

        thread::spawn(move || match service.current_position() {
            Ok(resolved) => {
                info!(
                    latitude = resolved.latitude,
                    longitude = resolved.longitude,
                    "viewer position resolved"
                );
                *slot.lock().unwrap() = Some(resolved);
            }
            Err(err) => debug!("viewer position unavailable, keeping fallback: {err}"),
        });

        Self { position }
    }

    pub fn position(&self) -> Option<ViewerPosition> {
        *self.position.lock().unwrap()
    }
}

/// Tracks the viewport center the rendering layer should apply. Recentering
/// fires only when the target changes (fallback on first read, then once more
/// if a viewer position resolves), never once per poll cycle.
#[derive(Debug, Default)]
pub struct ViewportTracker {
    applied: Option<ViewerPosition>,
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self, resolved: Option<ViewerPosition>) -> ViewerPosition {
        resolved.unwrap_or(FALLBACK_CENTER)
    }

    /// The new center to apply, or None if the current one still stands.
    pub fn recenter(&mut self, resolved: Option<ViewerPosition>) -> Option<ViewerPosition> {
        let target = self.target(resolved);
        if self.applied == Some(target) {
            return None;
        }

        self.applied = Some(target);
        Some(target)
    }
}
