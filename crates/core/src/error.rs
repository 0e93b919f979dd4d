//! Error types for landscape and weather loading and simulation startup.

use thiserror::Error;

/// Fatal configuration or runtime failures.
///
/// Anything that makes a simulation unrunnable surfaces as one of these at
/// startup; scenario threads themselves never propagate errors back to the
/// controller (numeric problems during a run degrade to non-survival).
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("i/o error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bad header in {path}: expected {expected:?}, got {found:?}")]
    HeaderMismatch {
        path: String,
        expected: String,
        found: String,
    },
    #[error("malformed value {value:?} at line {line} of {path}")]
    Malformed {
        path: String,
        line: usize,
        value: String,
    },
    #[error("raster extents differ: {0}")]
    ExtentMismatch(String),
    #[error("weather stream {scenario} has a gap at {detail}")]
    WeatherGap { scenario: u32, detail: String },
    #[error("weather dates cross a year boundary")]
    YearBoundary,
    #[error("no weather available for time {0}")]
    NoWeather(f64),
    #[error("grid contains no combustible cells")]
    NoFuel,
    #[error("ignition point ({0}, {1}) is outside the grid")]
    IgnitionOutOfBounds(f64, f64),
    #[error("{0}")]
    InvalidSettings(String),
}

impl SimulationError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        SimulationError::Io {
            path: path.into(),
            source,
        }
    }
}
