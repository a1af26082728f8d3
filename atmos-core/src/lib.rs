//! Core library for the `atmos` weather client.
//!
//! This crate defines:
//! - The location/weather orchestration layer (geocode, fetch, publish)
//! - Ports for geocoding, weather and air quality, with OpenWeather adapters
//! - The saved-places store and its persistence port
//! - Configuration & credentials handling
//!
//! It is used by `atmos-cli`, but any front end can drive it: read the
//! published state, call `resolve_and_fetch`, `add` and `remove`.

pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod store;

pub use config::{ApiConfig, Config, Endpoints};
pub use error::{FetchError, OrchestrationError, Stage, StorageError};
pub use model::{
    AirQualityReading, AirQualitySnapshot, Aqi, ConditionDetail, ConditionReading, Coordinate,
    DailyReading, FeelsLike, LocationReport, PlaceId, SavedPlace, WeatherCategory,
    WeatherSnapshot,
};
pub use orchestrator::{LocationOrchestrator, PublishedFailure, PublishedState};
pub use provider::{AirQualityFetcher, Geocoder, Providers, WeatherFetcher};
pub use store::{FileStorage, KeyValueStorage, MemoryStorage, SavedPlacesStore};
