use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{config::LOCATION_TIMEOUT, error::LocationError, model::Coordinate};

use super::LocationProvider;

/// Coarse fix from an ip-api.com compatible geolocation service.
#[derive(Debug, Clone)]
pub struct IpLocation {
    base_url: String,
    enabled: bool,
    http: Client,
}

impl IpLocation {
    pub fn new(base_url: &str, enabled: bool) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(LOCATION_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for IP location")?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), enabled, http })
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[async_trait]
impl LocationProvider for IpLocation {
    async fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn current_fix(&self) -> Result<Coordinate, LocationError> {
        if !self.enabled {
            return Err(LocationError::ProviderDisabled);
        }

        let url = format!("{}/json", self.base_url);
        let res = self.http.get(&url).send().await.map_err(|err| {
            if err.is_timeout() {
                LocationError::Timeout
            } else {
                LocationError::Unavailable(err.to_string())
            }
        })?;

        let parsed: IpApiResponse = res.json().await.map_err(|err| {
            if err.is_timeout() {
                LocationError::Timeout
            } else {
                LocationError::Unavailable(format!("unreadable location response: {err}"))
            }
        })?;

        match (parsed.status.as_str(), parsed.lat, parsed.lon) {
            ("success", Some(lat), Some(lon)) => {
                tracing::info!(latitude = lat, longitude = lon, "ip location fix obtained");
                Ok(Coordinate::new(lat, lon))
            }
            _ => Err(LocationError::Unavailable(
                parsed.message.unwrap_or_else(|| "location service returned no fix".to_string()),
            )),
        }
    }
}
