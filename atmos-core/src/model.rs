use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use uuid::Uuid;

/// A validated latitude/longitude pair.
///
/// Latitude is always within `[-90, 90]` and longitude within `[-180, 180]`;
/// the only way to build one is through [`Coordinate::new`], including when
/// deserializing persisted data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoordinateRepr", into = "CoordinateRepr")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CoordinateRepr {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("coordinate out of range: latitude {latitude}, longitude {longitude}")]
pub struct InvalidCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinate> {
        if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
            Ok(Self { latitude, longitude })
        } else {
            Err(InvalidCoordinate { latitude, longitude })
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

impl TryFrom<CoordinateRepr> for Coordinate {
    type Error = InvalidCoordinate;

    fn try_from(repr: CoordinateRepr) -> Result<Self, Self::Error> {
        Coordinate::new(repr.latitude, repr.longitude)
    }
}

impl From<Coordinate> for CoordinateRepr {
    fn from(c: Coordinate) -> Self {
        CoordinateRepr { latitude: c.latitude, longitude: c.longitude }
    }
}

/// Opaque identifier of a saved place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(Uuid);

impl PlaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PlaceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A user-persisted named location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlace {
    pub id: PlaceId,
    pub name: String,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub last_known_condition: Option<WeatherCategory>,
}

impl SavedPlace {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            id: PlaceId::new(),
            name: name.into(),
            coordinate,
            last_known_condition: None,
        }
    }

    /// Case-insensitive name comparison used for de-duplication.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

/// Coarse weather group as reported by the provider (`weather[0].main`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeatherCategory {
    Thunderstorm,
    Drizzle,
    Rain,
    Snow,
    Clear,
    Clouds,
    Mist,
    Smoke,
    Haze,
    Dust,
    Fog,
    Sand,
    Ash,
    Squall,
    Tornado,
    /// Anything the provider sends that this client does not know yet.
    Unknown(String),
}

impl WeatherCategory {
    pub fn from_provider(raw: &str) -> Self {
        let known = [
            Self::Thunderstorm,
            Self::Drizzle,
            Self::Rain,
            Self::Snow,
            Self::Clear,
            Self::Clouds,
            Self::Mist,
            Self::Smoke,
            Self::Haze,
            Self::Dust,
            Self::Fog,
            Self::Sand,
            Self::Ash,
            Self::Squall,
            Self::Tornado,
        ];

        known
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw.trim()))
            .unwrap_or_else(|| Self::Unknown(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Thunderstorm => "Thunderstorm",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
            Self::Clear => "Clear",
            Self::Clouds => "Clouds",
            Self::Mist => "Mist",
            Self::Smoke => "Smoke",
            Self::Haze => "Haze",
            Self::Dust => "Dust",
            Self::Fog => "Fog",
            Self::Sand => "Sand",
            Self::Ash => "Ash",
            Self::Squall => "Squall",
            Self::Tornado => "Tornado",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for WeatherCategory {
    fn from(raw: String) -> Self {
        Self::from_provider(&raw)
    }
}

impl From<WeatherCategory> for String {
    fn from(c: WeatherCategory) -> Self {
        c.as_str().to_string()
    }
}

/// Detailed condition phrase (`weather[0].description`).
///
/// Unrecognized phrases decode to [`ConditionDetail::Unknown`] so that
/// provider vocabulary drift never fails a whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionDetail {
    ThunderstormWithLightRain,
    ThunderstormWithRain,
    ThunderstormWithHeavyRain,
    LightThunderstorm,
    Thunderstorm,
    HeavyThunderstorm,
    LightDrizzle,
    Drizzle,
    HeavyDrizzle,
    LightRain,
    ModerateRain,
    HeavyRain,
    VeryHeavyRain,
    ExtremeRain,
    FreezingRain,
    ShowerRain,
    LightSnow,
    Snow,
    HeavySnow,
    Sleet,
    Mist,
    Smoke,
    Haze,
    Fog,
    Dust,
    ClearSky,
    FewClouds,
    ScatteredClouds,
    BrokenClouds,
    OvercastClouds,
    Unknown(String),
}

impl ConditionDetail {
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "thunderstorm with light rain" => Self::ThunderstormWithLightRain,
            "thunderstorm with rain" => Self::ThunderstormWithRain,
            "thunderstorm with heavy rain" => Self::ThunderstormWithHeavyRain,
            "light thunderstorm" => Self::LightThunderstorm,
            "thunderstorm" => Self::Thunderstorm,
            "heavy thunderstorm" => Self::HeavyThunderstorm,
            "light intensity drizzle" => Self::LightDrizzle,
            "drizzle" => Self::Drizzle,
            "heavy intensity drizzle" => Self::HeavyDrizzle,
            "light rain" => Self::LightRain,
            "moderate rain" => Self::ModerateRain,
            "heavy intensity rain" => Self::HeavyRain,
            "very heavy rain" => Self::VeryHeavyRain,
            "extreme rain" => Self::ExtremeRain,
            "freezing rain" => Self::FreezingRain,
            "shower rain" => Self::ShowerRain,
            "light snow" => Self::LightSnow,
            "snow" => Self::Snow,
            "heavy snow" => Self::HeavySnow,
            "sleet" => Self::Sleet,
            "mist" => Self::Mist,
            "smoke" => Self::Smoke,
            "haze" => Self::Haze,
            "fog" => Self::Fog,
            "dust" => Self::Dust,
            "clear sky" => Self::ClearSky,
            "few clouds" => Self::FewClouds,
            "scattered clouds" => Self::ScatteredClouds,
            "broken clouds" => Self::BrokenClouds,
            "overcast clouds" => Self::OvercastClouds,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ThunderstormWithLightRain => "thunderstorm with light rain",
            Self::ThunderstormWithRain => "thunderstorm with rain",
            Self::ThunderstormWithHeavyRain => "thunderstorm with heavy rain",
            Self::LightThunderstorm => "light thunderstorm",
            Self::Thunderstorm => "thunderstorm",
            Self::HeavyThunderstorm => "heavy thunderstorm",
            Self::LightDrizzle => "light intensity drizzle",
            Self::Drizzle => "drizzle",
            Self::HeavyDrizzle => "heavy intensity drizzle",
            Self::LightRain => "light rain",
            Self::ModerateRain => "moderate rain",
            Self::HeavyRain => "heavy intensity rain",
            Self::VeryHeavyRain => "very heavy rain",
            Self::ExtremeRain => "extreme rain",
            Self::FreezingRain => "freezing rain",
            Self::ShowerRain => "shower rain",
            Self::LightSnow => "light snow",
            Self::Snow => "snow",
            Self::HeavySnow => "heavy snow",
            Self::Sleet => "sleet",
            Self::Mist => "mist",
            Self::Smoke => "smoke",
            Self::Haze => "haze",
            Self::Fog => "fog",
            Self::Dust => "dust",
            Self::ClearSky => "clear sky",
            Self::FewClouds => "few clouds",
            Self::ScatteredClouds => "scattered clouds",
            Self::BrokenClouds => "broken clouds",
            Self::OvercastClouds => "overcast clouds",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for ConditionDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ConditionDetail {
    fn from(raw: String) -> Self {
        Self::from_provider(&raw)
    }
}

impl From<ConditionDetail> for String {
    fn from(d: ConditionDetail) -> Self {
        d.as_str().to_string()
    }
}

/// A single current or hourly observation. Units are metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionReading {
    /// Unix seconds, UTC.
    pub timestamp: i64,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    /// hPa
    pub pressure: u32,
    /// m/s
    pub wind_speed: f64,
    pub wind_direction_deg: u16,
    pub cloudiness: u8,
    pub primary_condition: WeatherCategory,
    pub description: ConditionDetail,
    /// mm
    pub precipitation_last_hour: Option<f64>,
}

impl ConditionReading {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeelsLike {
    pub day: f64,
    pub night: f64,
    pub eve: f64,
    pub morning: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReading {
    pub timestamp: i64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub feels_like: FeelsLike,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    /// Probability in `[0, 1]`.
    pub precipitation_probability: f64,
    pub primary_condition: WeatherCategory,
}

impl DailyReading {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.timestamp)
    }
}

/// Forecast bundle for one coordinate. `hourly` and `daily` keep the
/// provider's chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub coordinate: Coordinate,
    pub timezone_offset_seconds: i32,
    pub current: ConditionReading,
    pub hourly: Vec<ConditionReading>,
    pub daily: Vec<DailyReading>,
}

impl WeatherSnapshot {
    /// Fixed offset of the forecast location, for rendering local times.
    pub fn local_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.timezone_offset_seconds)
    }
}

/// Air Quality Index, 1 (good) to 5 (very poor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Aqi(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("AQI must be between 1 and 5, got {0}")]
pub struct InvalidAqi(pub i64);

impl Aqi {
    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            _ => "Very Poor",
        }
    }
}

impl TryFrom<i64> for Aqi {
    type Error = InvalidAqi;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1..=5 => Ok(Self(value as u8)),
            _ => Err(InvalidAqi(value)),
        }
    }
}

impl From<Aqi> for u8 {
    fn from(aqi: Aqi) -> Self {
        aqi.0
    }
}

impl fmt::Display for Aqi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub timestamp: i64,
    pub aqi: Aqi,
    /// Pollutant name (e.g. `pm2_5`) to concentration in μg/m³.
    pub pollutant_concentrations: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualitySnapshot {
    pub readings: Vec<AirQualityReading>,
}

impl AirQualitySnapshot {
    /// First reading in provider order, i.e. the one closest to now.
    pub fn latest(&self) -> Option<&AirQualityReading> {
        self.readings.first()
    }
}

/// Combined result of one successful orchestration call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReport {
    pub place_name: String,
    pub coordinate: Coordinate,
    pub weather: WeatherSnapshot,
    pub air_quality: AirQualitySnapshot,
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}
