//! Request plumbing shared by every OpenWeather endpoint.

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::{config::ApiConfig, error::FetchError};

const USER_AGENT: &str = concat!("atmos/", env!("CARGO_PKG_VERSION"));
const MAX_BODY_IN_ERROR: usize = 200;

#[derive(Clone)]
pub(crate) struct ProviderClient {
    http: Client,
    api_key: String,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient").finish_non_exhaustive()
    }
}

impl ProviderClient {
    pub(crate) fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
        })
    }

    /// Issue one GET against `base` + `path` and decode the JSON body.
    ///
    /// `what` names the response in decode errors and logs.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, FetchError> {
        let url = endpoint_url(base, path)?;
        tracing::debug!(endpoint = %url, "requesting {what}");

        let res = self
            .http
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if status == StatusCode::BAD_REQUEST {
            return Err(FetchError::InvalidEndpoint(truncate_body(&body)));
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        decode_body(&body, what)
    }
}

/// Decode a JSON body, naming the offending field path in the error.
///
/// Errors at the document root fall back to `what`.
fn decode_body<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, FetchError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|e| {
        let path = e.path().to_string();
        let field = if path == "." { what.to_string() } else { path };
        FetchError::decode(field, e.into_inner())
    })
}

fn endpoint_url(base: &str, path: &str) -> Result<Url, FetchError> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| FetchError::InvalidEndpoint(format!("{raw}: {e}")))
}

/// Coordinates go on the wire with fixed precision so the provider never
/// sees exponent notation.
pub(crate) fn coordinate_query(coordinate: crate::model::Coordinate) -> [(&'static str, String); 2] {
    [
        ("lat", format!("{:.6}", coordinate.latitude())),
        ("lon", format!("{:.6}", coordinate.longitude())),
    ]
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_BODY_IN_ERROR {
        format!("{}...", body.chars().take(MAX_BODY_IN_ERROR).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinate;

    #[test]
    fn endpoint_url_joins_base_and_path() {
        let url = endpoint_url("https://api.example.com/", "/data/3.0/onecall").expect("valid");
        assert_eq!(url.as_str(), "https://api.example.com/data/3.0/onecall");
    }

    #[test]
    fn endpoint_url_rejects_garbage_base() {
        let err = endpoint_url("not a url", "/geo").unwrap_err();
        assert!(matches!(err, FetchError::InvalidEndpoint(_)));
    }

    #[test]
    fn coordinate_query_uses_fixed_precision() {
        let c = Coordinate::new(0.00000001, -2.5).expect("valid");
        let q = coordinate_query(c);
        assert_eq!(q[0], ("lat", "0.000000".to_string()));
        assert_eq!(q[1], ("lon", "-2.500000".to_string()));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Outer {
        #[allow(dead_code)]
        current: Inner,
    }

    #[derive(Debug, serde::Deserialize)]
    struct Inner {
        #[allow(dead_code)]
        humidity: u8,
    }

    #[test]
    fn decode_body_names_nested_field() {
        let err = decode_body::<Outer>(r#"{"current":{"humidity":"high"}}"#, "test response")
            .unwrap_err();
        match err {
            FetchError::Decode { field, value } => {
                assert_eq!(field, "current.humidity");
                assert!(value.contains("invalid type"), "{value}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn decode_body_root_error_uses_label() {
        let err = decode_body::<Outer>("not json", "test response").unwrap_err();
        assert!(matches!(err, FetchError::Decode { ref field, .. } if field == "test response"));
    }

    #[test]
    fn truncate_body_is_char_safe() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), MAX_BODY_IN_ERROR + 3);
        assert_eq!(truncate_body("short"), "short");
    }
}
