//! Live aircraft map feed.
//!
//! Polls the OpenSky `/states/all` endpoint on a fixed cadence, decodes the
//! positional state vectors into [`AircraftState`] records, filters them down
//! to the displayable subset, and publishes the result as an immutable
//! [`DisplaySet`] snapshot for a rendering layer to consume. A one-shot
//! geolocation lookup picks the initial viewport center, falling back to a
//! fixed coordinate when the viewer's position cannot be resolved.

pub mod data;
pub mod errors;
pub mod geo;
pub mod logging;
pub mod polling;
pub mod sources;

pub use data::aircraft::{AircraftState, DisplaySet};
pub use data::filter::is_displayable;
pub use errors::{FetchError, GeolocationFailure, MalformedRecord};
pub use geo::{GeolocationProvider, ViewerPosition, ViewportTracker, FALLBACK_CENTER};
pub use polling::{PollStats, PollingController, POLL_INTERVAL};
pub use sources::{IpGeolocationService, LocationService, OpenSkySource, StateSource};
