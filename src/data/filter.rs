use super::aircraft::AircraftState;

/// True iff the record is worth a marker on the map: airborne, with a present,
/// non-zero position fix.
///
/// A legitimate fix at exactly 0.0 latitude or longitude is indistinguishable
/// from a placeholder here and is excluded. Known limitation, kept on purpose.
pub fn is_displayable(state: &AircraftState) -> bool {
    !state.on_ground
        && state.latitude.map_or(false, |lat| lat != 0.0)
        && state.longitude.map_or(false, |lon| lon != 0.0)
}
