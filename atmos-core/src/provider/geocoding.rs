use async_trait::async_trait;
use serde::Deserialize;

use crate::{config::ApiConfig, error::FetchError, model::Coordinate};

use super::{Geocoder, http::ProviderClient};

const DIRECT_PATH: &str = "/geo/1.0/direct";

/// Forward geocoding through OpenWeather's direct geocoding API.
/// The first match wins.
#[derive(Debug, Clone)]
pub struct OpenWeatherGeocoder {
    client: ProviderClient,
    base_url: String,
}

impl OpenWeatherGeocoder {
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        Ok(Self::with_client(ProviderClient::new(config)?, config))
    }

    pub(crate) fn with_client(client: ProviderClient, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.endpoints.geocoding_base.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeoMatch {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: Option<String>,
}

#[async_trait]
impl Geocoder for OpenWeatherGeocoder {
    async fn resolve(&self, place_name: &str) -> Result<Coordinate, FetchError> {
        let query = place_name.trim();
        if query.is_empty() {
            return Err(FetchError::NotFound { query: place_name.to_string() });
        }

        let matches: Vec<GeoMatch> = self
            .client
            .get_json(
                &self.base_url,
                DIRECT_PATH,
                &[("q", query.to_string()), ("limit", "1".to_string())],
                "geocoding response",
            )
            .await?;

        let first = matches
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound { query: query.to_string() })?;

        tracing::debug!(
            "Geocoded '{}' to {} ({}) at {}, {}",
            query,
            first.name,
            first.country.as_deref().unwrap_or("?"),
            first.lat,
            first.lon
        );

        Coordinate::new(first.lat, first.lon).map_err(|e| FetchError::decode("[0].lat/lon", e))
    }
}
