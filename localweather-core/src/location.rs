use crate::{
    Config,
    error::LocationError,
    location::{fixed::FixedLocation, ip::IpLocation},
    model::Coordinate,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug};

pub mod fixed;
pub mod ip;

/// Answer to a location permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    /// Denied this time; asking again is allowed.
    Denied,
    /// Denied for good; the user must change it outside the app.
    PermanentlyDenied,
}

/// Platform permission flow.
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    /// Current status without prompting.
    async fn check(&self) -> PermissionStatus;

    /// Prompt the user. Never called once the status is `PermanentlyDenied`.
    async fn request(&self) -> PermissionStatus;
}

/// Single-shot location capability.
#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    /// Whether the provider can produce a fix at all.
    async fn is_enabled(&self) -> bool;

    /// One best-effort fix. No tracking continues after this returns.
    async fn current_fix(&self) -> Result<Coordinate, LocationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationSource {
    Fixed,
    Ip,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::Fixed => "fixed",
            LocationSource::Ip => "ip",
        }
    }

    pub const fn all() -> &'static [LocationSource] {
        &[LocationSource::Fixed, LocationSource::Ip]
    }
}

impl std::fmt::Display for LocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for LocationSource {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "fixed" => Ok(LocationSource::Fixed),
            "ip" => Ok(LocationSource::Ip),
            _ => Err(anyhow::anyhow!(
                "Unknown location source '{value}'. Supported sources: fixed, ip."
            )),
        }
    }
}

/// Construct the location provider selected in config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn LocationProvider>> {
    let source = config.location_source()?;
    let enabled = config.location.enabled;

    let boxed: Box<dyn LocationProvider> = match source {
        LocationSource::Fixed => {
            let coord = config.fixed_coordinate().filter(|_| enabled);
            Box::new(FixedLocation::new(coord))
        }
        LocationSource::Ip => Box::new(IpLocation::new(config.ip_service_url(), enabled)?),
    };

    Ok(boxed)
}
