use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    location::{LocationSource, PermissionStatus},
    model::{Coordinate, Units},
};

pub const BASE_URL: &str = "https://api.openweathermap.org/data";
pub const METRIC_UNIT: &str = "metric";
pub const IP_LOCATION_URL: &str = "http://ip-api.com";

/// Name of the private key-value store holding the cached response.
pub const PREFERENCE_NAME: &str = "WeatherAppPreference";
/// Key under which the last successful record is stored.
pub const WEATHER_RESPONSE_DATA: &str = "weather_response_data";

/// Overrides `api_key` from the config file when set.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const LOCATION_TIMEOUT: Duration = Duration::from_secs(15);
pub const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(3);

/// Location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// "fixed" or "ip".
    pub source: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Master switch for location services.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Last answer to the permission prompt.
    pub permission: Option<PermissionStatus>,
    pub ip_service_url: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: None,
            latitude: None,
            longitude: None,
            enabled: true,
            permission: None,
            ip_service_url: None,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "metric"
/// region = "US"
///
/// [location]
/// source = "fixed"
/// latitude = 51.5
/// longitude = -0.12
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub units: Option<String>,
    /// Region code override, e.g. "US". Falls back to the locale when absent.
    pub region: Option<String>,
    #[serde(default)]
    pub location: LocationConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "localweather", "localweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Private directory holding the response cache.
    pub fn data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// API key, preferring the environment over the config file.
    pub fn api_key(&self) -> Result<String> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok())
    }

    fn resolve_api_key(&self, env_value: Option<String>) -> Result<String> {
        env_value
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
            .ok_or_else(|| {
                anyhow!(
                    "No OpenWeather API key configured.\n\
                     Hint: run `localweather configure` or set {API_KEY_ENV}."
                )
            })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(BASE_URL)
    }

    pub fn units(&self) -> Result<Units> {
        Units::try_from(self.units.as_deref().unwrap_or(METRIC_UNIT))
    }

    pub fn location_source(&self) -> Result<LocationSource> {
        match self.location.source.as_deref() {
            Some(s) => LocationSource::try_from(s),
            None if self.fixed_coordinate().is_some() => Ok(LocationSource::Fixed),
            None => Ok(LocationSource::Ip),
        }
    }

    pub fn ip_service_url(&self) -> &str {
        self.location.ip_service_url.as_deref().unwrap_or(IP_LOCATION_URL)
    }

    /// Coordinates configured for the fixed source, if both halves are present.
    pub fn fixed_coordinate(&self) -> Option<Coordinate> {
        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }

    pub fn set_fixed_coordinate(&mut self, coord: Coordinate) {
        self.location.latitude = Some(coord.latitude);
        self.location.longitude = Some(coord.longitude);
        self.location.source = Some(LocationSource::Fixed.as_str().to_string());
    }

    /// Remember the user's answer so a permanent denial is never re-prompted.
    pub fn record_permission(&mut self, status: PermissionStatus) {
        self.location.permission = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.resolve_api_key(None).unwrap_err();

        assert!(err.to_string().contains("No OpenWeather API key configured"));
        assert!(err.to_string().contains("localweather configure"));
    }

    #[test]
    fn env_api_key_overrides_file() {
        let cfg = Config { api_key: Some("FILE_KEY".into()), ..Config::default() };

        assert_eq!(cfg.resolve_api_key(Some("ENV_KEY".into())).unwrap(), "ENV_KEY");
        assert_eq!(cfg.resolve_api_key(Some("  ".into())).unwrap(), "FILE_KEY");
        assert_eq!(cfg.resolve_api_key(None).unwrap(), "FILE_KEY");
    }

    #[test]
    fn defaults_point_at_openweather_metric() {
        let cfg = Config::default();

        assert_eq!(cfg.base_url(), BASE_URL);
        assert_eq!(cfg.units().unwrap(), Units::Metric);
        assert!(cfg.location.enabled);
        assert_eq!(cfg.location_source().unwrap(), LocationSource::Ip);
    }

    #[test]
    fn fixed_coordinate_selects_fixed_source() {
        let mut cfg = Config::default();
        cfg.set_fixed_coordinate(Coordinate::new(51.5, -0.12));

        assert_eq!(cfg.fixed_coordinate(), Some(Coordinate::new(51.5, -0.12)));
        assert_eq!(cfg.location_source().unwrap(), LocationSource::Fixed);
    }

    #[test]
    fn parses_full_toml() {
        let cfg = Config::from_toml(
            r#"
            api_key = "KEY"
            units = "imperial"
            region = "US"

            [location]
            source = "fixed"
            latitude = 40.7
            longitude = -74.0
            enabled = false
            permission = "permanently_denied"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.units().unwrap(), Units::Imperial);
        assert_eq!(cfg.region.as_deref(), Some("US"));
        assert!(!cfg.location.enabled);
        assert_eq!(cfg.location.permission, Some(PermissionStatus::PermanentlyDenied));
        assert_eq!(cfg.fixed_coordinate(), Some(Coordinate::new(40.7, -74.0)));
    }

    #[test]
    fn toml_roundtrip_keeps_permission() {
        let mut cfg = Config::default();
        cfg.record_permission(PermissionStatus::Granted);

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = Config::from_toml(&text).unwrap();

        assert_eq!(back.location.permission, Some(PermissionStatus::Granted));
    }
}
