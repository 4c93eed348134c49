use thiserror::Error;

/// Upstream fetch or top-level payload failure. A cycle that hits one of
/// these keeps the previously published set; the next cycle retries naturally.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("state request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed state response: {0}")]
    Payload(#[from] serde_json::Error),
}

/// One state vector failed positional decode. The offending record is skipped
/// and counted; the rest of the batch is unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("state vector is not an array (got {found})")]
    NotAnArray { found: &'static str },

    #[error("state vector has {got} elements, expected {expected}")]
    WrongArity { got: usize, expected: usize },

    #[error("field `{field}` (index {index}): expected {expected}, got {found}")]
    FieldType {
        index: usize,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// The platform could not resolve the viewer's position. Not retried; the
/// viewport stays on the fallback center.
#[derive(Error, Debug)]
pub enum GeolocationFailure {
    #[error("position lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("position unavailable: {0}")]
    Unavailable(String),
}
