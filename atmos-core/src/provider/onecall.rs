use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    config::ApiConfig,
    error::FetchError,
    model::{
        ConditionDetail, ConditionReading, Coordinate, DailyReading, FeelsLike, WeatherCategory,
        WeatherSnapshot,
    },
};

use super::{
    WeatherFetcher,
    http::{ProviderClient, coordinate_query},
};

const ONECALL_PATH: &str = "/data/3.0/onecall";

/// Current, hourly and daily forecast from the One Call API, metric units.
#[derive(Debug, Clone)]
pub struct OneCallWeather {
    client: ProviderClient,
    base_url: String,
}

impl OneCallWeather {
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        Ok(Self::with_client(ProviderClient::new(config)?, config))
    }

    pub(crate) fn with_client(client: ProviderClient, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.endpoints.weather_base.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OcWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OcPrecipitation {
    #[serde(rename = "1h")]
    last_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OcReading {
    dt: i64,
    temp: f64,
    feels_like: f64,
    pressure: u32,
    humidity: u8,
    clouds: u8,
    wind_speed: f64,
    wind_deg: u16,
    weather: Vec<OcWeather>,
    rain: Option<OcPrecipitation>,
    snow: Option<OcPrecipitation>,
}

#[derive(Debug, Deserialize)]
struct OcDailyTemp {
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct OcDailyFeelsLike {
    day: f64,
    night: f64,
    eve: f64,
    morn: f64,
}

#[derive(Debug, Deserialize)]
struct OcDaily {
    dt: i64,
    temp: OcDailyTemp,
    feels_like: OcDailyFeelsLike,
    pressure: u32,
    humidity: u8,
    wind_speed: f64,
    pop: f64,
    weather: Vec<OcWeather>,
}

#[derive(Debug, Deserialize)]
struct OcResponse {
    timezone_offset: i32,
    current: OcReading,
    #[serde(default)]
    hourly: Vec<OcReading>,
    #[serde(default)]
    daily: Vec<OcDaily>,
}

#[async_trait]
impl WeatherFetcher for OneCallWeather {
    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, FetchError> {
        let [lat, lon] = coordinate_query(coordinate);
        let query = [lat, lon, ("units", "metric".to_string())];

        let parsed: OcResponse = self
            .client
            .get_json(&self.base_url, ONECALL_PATH, &query, "onecall response")
            .await?;

        into_snapshot(coordinate, parsed)
    }
}

fn into_snapshot(coordinate: Coordinate, res: OcResponse) -> Result<WeatherSnapshot, FetchError> {
    let current = into_reading("current", res.current)?;

    let hourly = res
        .hourly
        .into_iter()
        .enumerate()
        .map(|(i, r)| into_reading(&format!("hourly[{i}]"), r))
        .collect::<Result<Vec<_>, _>>()?;

    let daily = res
        .daily
        .into_iter()
        .enumerate()
        .map(|(i, d)| into_daily(&format!("daily[{i}]"), d))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WeatherSnapshot {
        coordinate,
        timezone_offset_seconds: res.timezone_offset,
        current,
        hourly,
        daily,
    })
}

fn first_weather<'a>(path: &str, weather: &'a [OcWeather]) -> Result<&'a OcWeather, FetchError> {
    weather
        .first()
        .ok_or_else(|| FetchError::decode(format!("{path}.weather"), "empty array"))
}

fn category(path: &str, raw: &str) -> WeatherCategory {
    let c = WeatherCategory::from_provider(raw);
    if c.is_unknown() {
        tracing::warn!("Unrecognized weather category '{}' at {}", raw, path);
    }
    c
}

fn into_reading(path: &str, r: OcReading) -> Result<ConditionReading, FetchError> {
    let weather = first_weather(path, &r.weather)?;
    let description = ConditionDetail::from_provider(&weather.description);
    if description.is_unknown() {
        tracing::warn!("Unrecognized condition description '{}' at {}", weather.description, path);
    }

    let precipitation_last_hour = r
        .rain
        .and_then(|p| p.last_hour)
        .or_else(|| r.snow.and_then(|p| p.last_hour));

    Ok(ConditionReading {
        timestamp: r.dt,
        temperature: r.temp,
        feels_like: r.feels_like,
        humidity: r.humidity,
        pressure: r.pressure,
        wind_speed: r.wind_speed,
        wind_direction_deg: r.wind_deg,
        cloudiness: r.clouds,
        primary_condition: category(path, &weather.main),
        description,
        precipitation_last_hour,
    })
}

fn into_daily(path: &str, d: OcDaily) -> Result<DailyReading, FetchError> {
    let weather = first_weather(path, &d.weather)?;

    if !(0.0..=1.0).contains(&d.pop) {
        return Err(FetchError::decode(format!("{path}.pop"), d.pop));
    }

    Ok(DailyReading {
        timestamp: d.dt,
        temp_min: d.temp.min,
        temp_max: d.temp.max,
        feels_like: FeelsLike {
            day: d.feels_like.day,
            night: d.feels_like.night,
            eve: d.feels_like.eve,
            morning: d.feels_like.morn,
        },
        humidity: d.humidity,
        pressure: d.pressure,
        wind_speed: d.wind_speed,
        precipitation_probability: d.pop,
        primary_condition: category(path, &weather.main),
    })
}
