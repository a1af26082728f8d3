//! Integration tests for the OpenWeather adapters and the orchestrator using wiremock.

use std::time::Duration;

use atmos_core::{
    AirQualityFetcher, ApiConfig, Coordinate, Endpoints, FetchError, Geocoder,
    LocationOrchestrator, OrchestrationError, Providers, Stage, WeatherFetcher,
    provider::{OneCallWeather, OpenWeatherAirQuality, OpenWeatherGeocoder},
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn config(server: &MockServer) -> ApiConfig {
    ApiConfig::new(KEY)
        .with_endpoints(Endpoints::all(server.uri()))
        .with_timeout(Duration::from_secs(2))
}

fn paris() -> Coordinate {
    Coordinate::new(48.8566, 2.3522).expect("valid coordinate")
}

fn reading(dt: i64, temp: f64) -> Value {
    json!({
        "dt": dt, "temp": temp, "feels_like": temp - 2.0, "pressure": 1018, "humidity": 81,
        "clouds": 75, "wind_speed": 4.1, "wind_deg": 250,
        "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}]
    })
}

fn onecall_body(temp: f64) -> Value {
    let daily: Vec<Value> = (0..8)
        .map(|i| {
            json!({
                "dt": 1_700_000_000 + i * 86_400,
                "temp": {"day": 16.0, "min": 10.0, "max": 18.0, "night": 11.0, "eve": 15.0, "morn": 10.5},
                "feels_like": {"day": 15.0, "night": 10.0, "eve": 14.0, "morn": 9.0},
                "pressure": 1016, "humidity": 70, "wind_speed": 3.0, "pop": 0.35,
                "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}]
            })
        })
        .collect();
    let hourly: Vec<Value> = (0..48).map(|i| reading(1_700_000_000 + i * 3600, temp)).collect();

    json!({
        "lat": 48.8566, "lon": 2.3522, "timezone": "Europe/Paris", "timezone_offset": 3600,
        "current": reading(1_700_000_000, temp),
        "hourly": hourly,
        "daily": daily
    })
}

fn air_body(aqi: i64) -> Value {
    json!({
        "coord": {"lon": 2.3522, "lat": 48.8566},
        "list": [{"dt": 1_700_000_000, "main": {"aqi": aqi},
                  "components": {"co": 201.9, "no2": 0.77, "o3": 68.66, "pm2_5": 0.5, "pm10": 0.54}}]
    })
}

async fn mount_geocode(server: &MockServer, name: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", name))
        .and(query_param("appid", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn geocode_returns_first_match() {
    let server = MockServer::start().await;
    mount_geocode(
        &server,
        "Paris",
        json!([
            {"name": "Paris", "lat": 48.8566, "lon": 2.3522, "country": "FR"},
            {"name": "Paris", "lat": 33.66, "lon": -95.55, "country": "US"}
        ]),
    )
    .await;

    let geocoder = OpenWeatherGeocoder::new(&config(&server)).expect("client builds");
    let coordinate = geocoder.resolve("Paris").await.expect("Paris resolves");

    assert_eq!(coordinate, paris());
}

#[tokio::test]
async fn geocode_zero_results_is_not_found() {
    let server = MockServer::start().await;
    mount_geocode(&server, "Atlantis", json!([])).await;

    let geocoder = OpenWeatherGeocoder::new(&config(&server)).expect("client builds");
    let err = geocoder.resolve("Atlantis").await.unwrap_err();

    assert!(matches!(err, FetchError::NotFound { ref query } if query == "Atlantis"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn geocode_out_of_range_coordinate_is_decode_error() {
    let server = MockServer::start().await;
    mount_geocode(&server, "Nowhere", json!([{"name": "Nowhere", "lat": 123.0, "lon": 0.0}])).await;

    let geocoder = OpenWeatherGeocoder::new(&config(&server)).expect("client builds");
    let err = geocoder.resolve("Nowhere").await.unwrap_err();

    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    let config = ApiConfig::new(KEY).with_endpoints(Endpoints::all("http://127.0.0.1:1"));
    let geocoder = OpenWeatherGeocoder::new(&config).expect("client builds");

    let err = geocoder.resolve("Paris").await.unwrap_err();

    assert!(matches!(err, FetchError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn slow_provider_times_out_as_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(onecall_body(15.0))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let fetcher =
        OneCallWeather::new(&config(&server).with_timeout(Duration::from_millis(200))).expect("client builds");
    let err = fetcher.fetch(paris()).await.unwrap_err();

    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn weather_requests_metric_units_for_coordinate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .and(query_param("lat", "48.856600"))
        .and(query_param("lon", "2.352200"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(onecall_body(15.0)))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = OneCallWeather::new(&config(&server)).expect("client builds");
    let snapshot = fetcher.fetch(paris()).await.expect("fetch succeeds");

    assert_eq!(snapshot.coordinate, paris());
    assert_eq!(snapshot.current.temperature, 15.0);
    assert_eq!(snapshot.hourly.len(), 48);
    assert_eq!(snapshot.daily.len(), 8);
    assert!(snapshot.hourly.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert_eq!(snapshot.daily[0].precipitation_probability, 0.35);
}

#[tokio::test]
async fn weather_bad_request_is_invalid_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"cod": "400", "message": "wrong latitude"})),
        )
        .mount(&server)
        .await;

    let fetcher = OneCallWeather::new(&config(&server)).expect("client builds");
    let err = fetcher.fetch(paris()).await.unwrap_err();

    match err {
        FetchError::InvalidEndpoint(msg) => assert!(msg.contains("wrong latitude")),
        other => panic!("expected invalid endpoint, got {other:?}"),
    }
}

#[tokio::test]
async fn weather_unauthorized_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&server)
        .await;

    let fetcher = OneCallWeather::new(&config(&server)).expect("client builds");
    let err = fetcher.fetch(paris()).await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 401, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn weather_schema_mismatch_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"timezone_offset": 0})))
        .mount(&server)
        .await;

    let fetcher = OneCallWeather::new(&config(&server)).expect("client builds");
    let err = fetcher.fetch(paris()).await.unwrap_err();

    match err {
        FetchError::Decode { field, value } => {
            assert_eq!(field, "onecall response");
            assert!(value.contains("current"));
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn weather_wrong_typed_field_names_its_path() {
    let server = MockServer::start().await;
    let mut body = onecall_body(15.0);
    body["current"]["humidity"] = json!("high");
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let fetcher = OneCallWeather::new(&config(&server)).expect("client builds");
    let err = fetcher.fetch(paris()).await.unwrap_err();

    match err {
        FetchError::Decode { field, value } => {
            assert_eq!(field, "current.humidity");
            assert!(value.contains("\"high\""), "{value}");
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn air_quality_wrong_typed_field_names_its_path() {
    let server = MockServer::start().await;
    let mut body = air_body(2);
    body["list"][0]["components"]["pm2_5"] = json!("lots");
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let fetcher = OpenWeatherAirQuality::new(&config(&server)).expect("client builds");
    let err = fetcher.fetch(paris()).await.unwrap_err();

    match err {
        FetchError::Decode { field, .. } => assert_eq!(field, "list[0].components.pm2_5"),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn air_quality_decodes_readings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution/forecast"))
        .and(query_param("lat", "48.856600"))
        .and(query_param("lon", "2.352200"))
        .and(query_param("appid", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(air_body(2)))
        .mount(&server)
        .await;

    let fetcher = OpenWeatherAirQuality::new(&config(&server)).expect("client builds");
    let snapshot = fetcher.fetch(paris()).await.expect("fetch succeeds");

    let latest = snapshot.latest().expect("at least one reading");
    assert_eq!(latest.aqi.value(), 2);
    assert_eq!(latest.pollutant_concentrations["o3"], 68.66);
}

#[tokio::test]
async fn air_quality_rejects_aqi_out_of_range() {
    for aqi in [0, 6, 99] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/air_pollution/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(air_body(aqi)))
            .mount(&server)
            .await;

        let fetcher = OpenWeatherAirQuality::new(&config(&server)).expect("client builds");
        let err = fetcher.fetch(paris()).await.unwrap_err();

        match err {
            FetchError::Decode { field, value } => {
                assert_eq!(field, "list[0].main.aqi");
                assert_eq!(value, aqi.to_string());
            }
            other => panic!("expected decode error for aqi {aqi}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn resolve_and_fetch_over_http_hits_each_endpoint_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Paris"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"name": "Paris", "lat": 48.8566, "lon": 2.3522}])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .and(query_param("lat", "48.856600"))
        .and(query_param("lon", "2.352200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(onecall_body(15.0)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution/forecast"))
        .and(query_param("lat", "48.856600"))
        .and(query_param("lon", "2.352200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(air_body(1)))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = LocationOrchestrator::new(Providers::openweather(&config(&server)).expect("providers build"));
    let report = orchestrator.resolve_and_fetch("Paris").await.expect("lookup succeeds");

    assert_eq!(report.coordinate, paris());
    assert_eq!(report.weather.current.temperature, 15.0);
    assert_eq!(report.air_quality.latest().expect("air quality reading").aqi.label(), "Good");
    assert_eq!(orchestrator.current().last_success.expect("published report").place_name, "Paris");
}

#[tokio::test]
async fn resolve_and_fetch_air_quality_outage_keeps_last_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"name": "Paris", "lat": 48.8566, "lon": 2.3522}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(onecall_body(15.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(air_body(3)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution/forecast"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let orchestrator = LocationOrchestrator::new(Providers::openweather(&config(&server)).expect("providers build"));
    let first = orchestrator.resolve_and_fetch("Paris").await.expect("lookup succeeds");

    let err = orchestrator.resolve_and_fetch("Paris").await.unwrap_err();
    assert!(matches!(err, OrchestrationError::AirQualityFetchFailed(_)));

    let state = orchestrator.current();
    assert_eq!(state.last_success.as_deref(), Some(&*first));
    let failure = state.last_failure.expect("published failure");
    assert_eq!(failure.stage, Stage::AirQuality);
    assert!(failure.retryable);
}
