use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use serde_tuple::Serialize_tuple;

use crate::errors::MalformedRecord;

/// Number of elements in an OpenSky state vector.
pub const STATE_VECTOR_LEN: usize = 17;

/// Field names in upstream positional order. Decoding binds position to field
/// through this one schema; nothing else in the crate assumes the order.
pub const STATE_VECTOR_FIELDS: [&str; STATE_VECTOR_LEN] = [
    "icao24",
    "callsign",
    "origin_country",
    "time_position",
    "last_contact",
    "longitude",
    "latitude",
    "baro_altitude",
    "on_ground",
    "velocity",
    "true_track",
    "vertical_rate",
    "sensors",
    "geo_altitude",
    "squawk",
    "spi",
    "position_source",
];

/// One decoded state vector. Serializes back to the same positional array.
#[derive(Clone, Debug, PartialEq, Serialize_tuple)]
pub struct AircraftState {
    pub icao24: String,
    pub callsign: Option<String>,           // Can be null or blank if not received
    pub origin_country: String,
    pub time_position: Option<i64>,         // Time of last position update, as unix timestamp.  Can be null
    pub last_contact: i64,                  // Time of last update received, as unix timestamp
    pub longitude: Option<f64>,             // Can be null if not received
    pub latitude: Option<f64>,              // Can be null if not received
    pub baro_altitude: Option<f32>,         // Barometric altitude, meters.  Can be null
    pub on_ground: bool,
    pub velocity: Option<f32>,              // Ground speed, m/s.  Can be null if not received
    pub true_track: Option<f32>,            // Decimal degrees clockwise from N.  Can be null
    pub vertical_rate: Option<f32>,         // m/s, positive means climbing
    pub sensors: Option<Vec<i32>>,          // Contributing sensor IDs.  Can be null
    pub geo_altitude: Option<f32>,          // Geometric altitude, meters.  Can be null
    pub squawk: Option<String>,             // Transponder code.  Can be null
    pub spi: bool,                          // Special purpose indicator
    pub position_source: i32,               // 0=ADS-B, 1=ASTERIX, 2=MLAT, 3=FLARM
}

impl AircraftState {
    /// Velocity for display: suppressed when absent or zero.
    pub fn display_velocity(&self) -> Option<f32> {
        self.velocity.filter(|v| *v != 0.0)
    }

    /// Barometric altitude for display, grouped thousands ("10,972.5"):
    /// suppressed when absent or zero.
    pub fn display_altitude(&self) -> Option<String> {
        self.baro_altitude
            .filter(|a| *a != 0.0)
            .map(group_thousands)
    }
}

/// Decode one positional state vector. Fails with the offending index on any
/// shape or type mismatch; callers skip the record rather than abort the batch.
pub fn decode_state_vector(record: &Value) -> Result<AircraftState, MalformedRecord> {
    let raw = record.as_array().ok_or(MalformedRecord::NotAnArray {
        found: json_kind(record),
    })?;

    if raw.len() != STATE_VECTOR_LEN {
        return Err(MalformedRecord::WrongArity {
            got: raw.len(),
            expected: STATE_VECTOR_LEN,
        });
    }

    Ok(AircraftState {
        icao24: req_str(raw, 0)?,
        callsign: opt_str(raw, 1)?,
        origin_country: req_str(raw, 2)?,
        time_position: opt_i64(raw, 3)?,
        last_contact: req_i64(raw, 4)?,
        longitude: opt_f64(raw, 5)?,
        latitude: opt_f64(raw, 6)?,
        baro_altitude: opt_f32(raw, 7)?,
        on_ground: req_bool(raw, 8)?,
        velocity: opt_f32(raw, 9)?,
        true_track: opt_f32(raw, 10)?,
        vertical_rate: opt_f32(raw, 11)?,
        sensors: opt_sensors(raw, 12)?,
        geo_altitude: opt_f32(raw, 13)?,
        squawk: opt_str(raw, 14)?,
        spi: req_bool(raw, 15)?,
        position_source: req_i32(raw, 16)?,
    })
}

/// The currently published, filtered collection of aircraft, keyed by icao24.
/// Replaced wholesale on every successful poll cycle.
#[derive(Clone, Debug)]
pub struct DisplaySet {
    pub time: i64,                          // Upstream capture time, unix seconds
    pub fetched_at: DateTime<Utc>,
    aircraft: HashMap<String, AircraftState>,
}

impl DisplaySet {
    pub fn empty() -> Self {
        Self::new(0, std::iter::empty())
    }

    pub fn new(time: i64, states: impl IntoIterator<Item = AircraftState>) -> Self {
        let aircraft = states
            .into_iter()
            .map(|a| (a.icao24.clone(), a))
            .collect();

        Self { time, fetched_at: Utc::now(), aircraft }
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    pub fn contains(&self, icao24: &str) -> bool {
        self.aircraft.contains_key(icao24)
    }

    pub fn get(&self, icao24: &str) -> Option<&AircraftState> {
        self.aircraft.get(icao24)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AircraftState> {
        self.aircraft.values()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(index: usize, expected: &'static str, value: &Value) -> MalformedRecord {
    MalformedRecord::FieldType {
        index,
        field: STATE_VECTOR_FIELDS[index],
        expected,
        found: json_kind(value),
    }
}

fn req_str(raw: &[Value], index: usize) -> Result<String, MalformedRecord> {
    raw[index]
        .as_str()
        .map(String::from)
        .ok_or_else(|| type_error(index, "string", &raw[index]))
}

fn opt_str(raw: &[Value], index: usize) -> Result<Option<String>, MalformedRecord> {
    match &raw[index] {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(type_error(index, "string or null", other)),
    }
}

fn req_bool(raw: &[Value], index: usize) -> Result<bool, MalformedRecord> {
    raw[index]
        .as_bool()
        .ok_or_else(|| type_error(index, "boolean", &raw[index]))
}

fn req_i64(raw: &[Value], index: usize) -> Result<i64, MalformedRecord> {
    raw[index]
        .as_i64()
        .ok_or_else(|| type_error(index, "integer", &raw[index]))
}

fn opt_i64(raw: &[Value], index: usize) -> Result<Option<i64>, MalformedRecord> {
    match &raw[index] {
        Value::Null => Ok(None),
        other => other
            .as_i64()
            .map(Some)
            .ok_or_else(|| type_error(index, "integer or null", other)),
    }
}

fn req_i32(raw: &[Value], index: usize) -> Result<i32, MalformedRecord> {
    let value = req_i64(raw, index)?;
    i32::try_from(value).map_err(|_| type_error(index, "32-bit integer", &raw[index]))
}

fn opt_f64(raw: &[Value], index: usize) -> Result<Option<f64>, MalformedRecord> {
    match &raw[index] {
        Value::Null => Ok(None),
        other => other
            .as_f64()
            .map(Some)
            .ok_or_else(|| type_error(index, "number or null", other)),
    }
}

fn opt_f32(raw: &[Value], index: usize) -> Result<Option<f32>, MalformedRecord> {
    Ok(opt_f64(raw, index)?.map(|v| v as f32))
}

fn opt_sensors(raw: &[Value], index: usize) -> Result<Option<Vec<i32>>, MalformedRecord> {
    match &raw[index] {
        Value::Null => Ok(None),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_i64().map(|id| id as i32))
            .collect::<Option<Vec<i32>>>()
            .map(Some)
            .ok_or_else(|| type_error(index, "array of integers", &raw[index])),
        other => Err(type_error(index, "array of integers or null", other)),
    }
}

/// Thousands-grouped rendering of a display number ("10,972.5").
fn group_thousands(value: f32) -> String {
    let text = format!("{}", value);
    let (number, fraction) = match text.split_once('.') {
        Some((n, f)) => (n, Some(f)),
        None => (text.as_str(), None),
    };
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}
