//! Error types for the fetch, orchestration and storage layers.

use std::fmt;
use thiserror::Error;

/// Failure of a single provider call (geocode, weather or air quality).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The geocoding provider returned zero results.
    #[error("no location found for '{query}'")]
    NotFound { query: String },

    /// The request could not complete: timeout, DNS, connection reset.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected schema.
    #[error("failed to decode field '{field}': {value}")]
    Decode { field: String, value: String },

    /// The provider rejected how the request was built.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The provider answered with a non-success status.
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl FetchError {
    pub fn decode(field: impl Into<String>, value: impl fmt::Display) -> Self {
        FetchError::Decode {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Whether a caller-side retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Which stage of `resolve_and_fetch` failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Geocode,
    Weather,
    AirQuality,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Geocode => "geocode",
            Stage::Weather => "weather",
            Stage::AirQuality => "air quality",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("geocoding failed: {0}")]
    GeocodeFailed(#[source] FetchError),

    #[error("weather fetch failed: {0}")]
    WeatherFetchFailed(#[source] FetchError),

    #[error("air quality fetch failed: {0}")]
    AirQualityFetchFailed(#[source] FetchError),
}

impl OrchestrationError {
    pub fn stage(&self) -> Stage {
        match self {
            OrchestrationError::GeocodeFailed(_) => Stage::Geocode,
            OrchestrationError::WeatherFetchFailed(_) => Stage::Weather,
            OrchestrationError::AirQualityFetchFailed(_) => Stage::AirQuality,
        }
    }

    pub fn cause(&self) -> &FetchError {
        match self {
            OrchestrationError::GeocodeFailed(e)
            | OrchestrationError::WeatherFetchFailed(e)
            | OrchestrationError::AirQualityFetchFailed(e) => e,
        }
    }
}

/// Failure at the saved-places persistence boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize saved places: {0}")]
    Serialize(#[from] serde_json::Error),
}
