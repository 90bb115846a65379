use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    config::HTTP_TIMEOUT,
    error::FetchError,
    model::{Condition, Coordinate, Place, Sun, Temperature, Units, WeatherRecord, Wind},
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    api_key: String,
    units: Units,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, api_key: String, units: Units) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), api_key, units, http })
    }

    fn current_weather_url(&self) -> String {
        format!("{}/2.5/weather", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
    #[serde(default)]
    gust: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    weather: Vec<OwWeather>,
    main: OwMain,
    wind: OwWind,
    sys: OwSys,
}

impl OwCurrentResponse {
    fn into_record(self, units: Units) -> WeatherRecord {
        WeatherRecord {
            conditions: self
                .weather
                .into_iter()
                .map(|w| Condition { main: w.main, description: w.description, icon: w.icon })
                .collect(),
            temperature: Temperature {
                current: self.main.temp,
                min: self.main.temp_min,
                max: self.main.temp_max,
                humidity: self.main.humidity,
            },
            wind: Wind { speed: self.wind.speed, direction: self.wind.deg, gust: self.wind.gust },
            sun: Sun { sunrise: self.sys.sunrise, sunset: self.sys.sunset },
            location: Place { name: self.name, country_code: self.sys.country },
            units,
        }
    }
}

/// Decode a current-weather body into a record.
pub fn parse_current(body: &str, units: Units) -> Result<WeatherRecord, FetchError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)?;
    Ok(parsed.into_record(units))
}

fn classify_status(status: StatusCode, body: &str) -> FetchError {
    let body = truncate_body(body);
    match status {
        StatusCode::BAD_REQUEST => FetchError::BadRequest(body),
        StatusCode::NOT_FOUND => FetchError::NotFound(body),
        status => FetchError::ServerError { status, body },
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch(&self, coord: Coordinate) -> Result<WeatherRecord, FetchError> {
        let res = self
            .http
            .get(self.current_weather_url())
            .query(&[
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("units", self.units.as_str().to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = res.status();
        let body = res.text().await.map_err(FetchError::Transport)?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let record = parse_current(&body, self.units)?;
        tracing::info!(
            location = %record.location.name,
            country = %record.location.country_code,
            "weather fetched"
        );
        Ok(record)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn london_body() -> serde_json::Value {
        serde_json::json!({
            "coord": {"lon": -0.1278, "lat": 51.5074},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
            "main": {"temp": 12.34, "feels_like": 11.8, "temp_min": 10.5, "temp_max": 14.49,
                     "pressure": 1012, "humidity": 81},
            "wind": {"speed": 4.12, "deg": 230, "gust": 7.2},
            "sys": {"country": "GB", "sunrise": 1700000000, "sunset": 1700030000},
            "name": "London",
            "cod": 200
        })
    }

    async fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(&format!("{}/data/", server.uri()), "KEY".into(), Units::Metric)
            .unwrap()
    }

    #[tokio::test]
    async fn fetch_sends_coordinates_units_and_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "51.5074"))
            .and(query_param("lon", "-0.1278"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let record = client.fetch(Coordinate::new(51.5074, -0.1278)).await.unwrap();

        assert_eq!(record.location.name, "London");
        assert_eq!(record.location.country_code, "GB");
        assert_eq!(record.conditions[0].icon, "10d");
        assert_eq!(record.temperature.humidity, 81);
        assert_eq!(record.wind.direction, 230.0);
        assert_eq!(record.sun.sunset, 1_700_030_000);
        assert_eq!(record.units, Units::Metric);
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        let cases: [(u16, &str); 4] =
            [(400, "bad_request"), (404, "not_found"), (500, "server_error"), (401, "server_error")];
        for (code, kind) in cases {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/data/2.5/weather"))
                .respond_with(ResponseTemplate::new(code).set_body_string("{\"cod\":\"x\"}"))
                .mount(&mock_server)
                .await;

            let client = client_for(&mock_server).await;
            let err = client.fetch(Coordinate::new(0.0, 0.0)).await.unwrap_err();
            assert_eq!(err.kind(), kind, "status {code}");
        }
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let err = client.fetch(Coordinate::new(0.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = OpenWeatherClient::new(&uri, "KEY".into(), Units::Metric).unwrap();
        let err = client.fetch(Coordinate::new(0.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[test]
    fn calm_weather_without_gust_or_deg_decodes() {
        let body = r#"{
            "weather": [],
            "main": {"temp": 1.0, "temp_min": 0.0, "temp_max": 2.0, "humidity": 90},
            "wind": {"speed": 0.0},
            "sys": {"sunrise": 1, "sunset": 2},
            "name": ""
        }"#;

        let record = parse_current(body, Units::Metric).unwrap();
        assert_eq!(record.wind.gust, 0.0);
        assert_eq!(record.wind.direction, 0.0);
        assert!(record.location.country_code.is_empty());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
    }
}
