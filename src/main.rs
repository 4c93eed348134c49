use tracing::info;

use skywatch::{
    sources, GeolocationProvider, IpGeolocationService, OpenSkySource, PollingController,
    ViewportTracker,
};

/// Console stand-in for the rendering layer: consumes published display-set
/// snapshots and the viewport target exactly the way a map front end would.
fn main() {
    skywatch::logging::init_logging();

    let cred = sources::load_credentials();
    let source = OpenSkySource::new(cred);
    info!(
        "connecting to {} sources",
        if source.is_authenticated() { "authenticated" } else { "unauthenticated" }
    );

    let controller = PollingController::start(source);
    let geolocation = GeolocationProvider::start(IpGeolocationService::new());
    let updates = controller.subscribe();
    let mut viewport = ViewportTracker::new();

    for set in updates {
        if let Some(center) = viewport.recenter(geolocation.position()) {
            println!("viewport center: {:.4}, {:.4}", center.latitude, center.longitude);
        }

        println!(
            "{} aircraft displayable (capture time {}, fetched {})",
            set.len(),
            set.time,
            set.fetched_at.format("%H:%M:%S")
        );
        for state in set.iter().take(10) {
            let callsign = state.callsign.as_deref().unwrap_or("").trim();
            let lat = state.latitude.unwrap_or_default();
            let lon = state.longitude.unwrap_or_default();

            let mut line = format!("  {:8} {:>9.4} {:>9.4}", callsign, lat, lon);
            if let Some(velocity) = state.display_velocity() {
                line.push_str(&format!("  {} m/s", velocity));
            }
            if let Some(altitude) = state.display_altitude() {
                line.push_str(&format!("  {} m", altitude));
            }
            println!("{}", line);
        }
    }
}
