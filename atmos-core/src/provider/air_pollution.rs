use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::{
    config::ApiConfig,
    error::FetchError,
    model::{AirQualityReading, AirQualitySnapshot, Aqi, Coordinate},
};

use super::{
    AirQualityFetcher,
    http::{ProviderClient, coordinate_query},
};

const AIR_POLLUTION_PATH: &str = "/data/2.5/air_pollution/forecast";

/// Hourly AQI and pollutant concentrations from the Air Pollution API.
#[derive(Debug, Clone)]
pub struct OpenWeatherAirQuality {
    client: ProviderClient,
    base_url: String,
}

impl OpenWeatherAirQuality {
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        Ok(Self::with_client(ProviderClient::new(config)?, config))
    }

    pub(crate) fn with_client(client: ProviderClient, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.endpoints.air_quality_base.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApMain {
    aqi: i64,
}

#[derive(Debug, Deserialize)]
struct ApEntry {
    dt: i64,
    main: ApMain,
    #[serde(default)]
    components: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ApResponse {
    list: Vec<ApEntry>,
}

#[async_trait]
impl AirQualityFetcher for OpenWeatherAirQuality {
    async fn fetch(&self, coordinate: Coordinate) -> Result<AirQualitySnapshot, FetchError> {
        let parsed: ApResponse = self
            .client
            .get_json(
                &self.base_url,
                AIR_POLLUTION_PATH,
                &coordinate_query(coordinate),
                "air pollution response",
            )
            .await?;

        into_snapshot(parsed)
    }
}

fn into_snapshot(res: ApResponse) -> Result<AirQualitySnapshot, FetchError> {
    let readings = res
        .list
        .into_iter()
        .enumerate()
        .map(|(i, entry)| -> Result<AirQualityReading, FetchError> {
            let aqi = Aqi::try_from(entry.main.aqi)
                .map_err(|_| FetchError::decode(format!("list[{i}].main.aqi"), entry.main.aqi))?;

            Ok(AirQualityReading {
                timestamp: entry.dt,
                aqi,
                pollutant_concentrations: entry.components,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AirQualitySnapshot { readings })
}
