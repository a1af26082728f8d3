use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    config::ApiConfig,
    error::FetchError,
    model::{AirQualitySnapshot, Coordinate, WeatherSnapshot},
};

pub mod air_pollution;
pub mod geocoding;
mod http;
pub mod onecall;

pub use air_pollution::OpenWeatherAirQuality;
pub use geocoding::OpenWeatherGeocoder;
pub use onecall::OneCallWeather;

/// Resolves a free-text place name to a coordinate.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Returns [`FetchError::NotFound`] when the provider has no match.
    async fn resolve(&self, place_name: &str) -> Result<Coordinate, FetchError>;
}

/// Current, hourly and daily forecast for a coordinate.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, FetchError>;
}

/// Pollutant and AQI readings for a coordinate.
#[async_trait]
pub trait AirQualityFetcher: Send + Sync + Debug {
    async fn fetch(&self, coordinate: Coordinate) -> Result<AirQualitySnapshot, FetchError>;
}

/// The three provider ports, ready to hand to the orchestrator.
#[derive(Debug, Clone)]
pub struct Providers {
    pub geocoder: Arc<dyn Geocoder>,
    pub weather: Arc<dyn WeatherFetcher>,
    pub air_quality: Arc<dyn AirQualityFetcher>,
}

impl Providers {
    /// Construct the OpenWeather-backed implementations of every port.
    ///
    /// All three share one HTTP client and its connection pool.
    pub fn openweather(config: &ApiConfig) -> Result<Self, FetchError> {
        let client = http::ProviderClient::new(config)?;

        Ok(Self {
            geocoder: Arc::new(OpenWeatherGeocoder::with_client(client.clone(), config)),
            weather: Arc::new(OneCallWeather::with_client(client.clone(), config)),
            air_quality: Arc::new(OpenWeatherAirQuality::with_client(client, config)),
        })
    }
}
