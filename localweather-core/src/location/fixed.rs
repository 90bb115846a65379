use async_trait::async_trait;

use crate::{error::LocationError, model::Coordinate};

use super::LocationProvider;

/// Location taken from configuration or command-line flags.
///
/// Disabled when no coordinate is known.
#[derive(Debug, Clone)]
pub struct FixedLocation {
    coord: Option<Coordinate>,
}

impl FixedLocation {
    pub fn new(coord: Option<Coordinate>) -> Self {
        Self { coord }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn is_enabled(&self) -> bool {
        self.coord.is_some()
    }

    async fn current_fix(&self) -> Result<Coordinate, LocationError> {
        self.coord.ok_or(LocationError::ProviderDisabled)
    }
}
