use crate::{
    Config,
    error::FetchError,
    model::{Coordinate, WeatherRecord},
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Source of current weather for a coordinate.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// One request, no retry. Persisting the result is the caller's job.
    async fn fetch(&self, coord: Coordinate) -> Result<WeatherRecord, FetchError>;
}

/// Construct the OpenWeather client from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key()?;
    let units = config.units()?;

    Ok(Box::new(OpenWeatherClient::new(config.base_url(), api_key, units)?))
}
