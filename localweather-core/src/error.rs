use reqwest::StatusCode;
use thiserror::Error;

/// Why a location fix could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied { permanent: bool },
    #[error("Location provider is turned off")]
    ProviderDisabled,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Why a weather fetch failed. Every variant is terminal for that call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No internet connection available")]
    NoConnection,
    #[error("Bad request (HTTP 400): {0}")]
    BadRequest(String),
    #[error("Not found (HTTP 404): {0}")]
    NotFound(String),
    #[error("Server error (HTTP {status}): {body}")]
    ServerError { status: StatusCode, body: String },
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Failed to parse weather response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    /// Short stable name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NoConnection => "no_connection",
            FetchError::BadRequest(_) => "bad_request",
            FetchError::NotFound(_) => "not_found",
            FetchError::ServerError { .. } => "server_error",
            FetchError::Transport(_) => "transport",
            FetchError::Parse(_) => "parse",
        }
    }
}

/// Failures that stop the controller before any weather is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("Your location provider is turned off. Please turn it on.")]
    ProviderDisabled,
    #[error(
        "You have denied location permission. Please enable it as it is mandatory for the app to work."
    )]
    PermissionDenied { permanent: bool },
    #[error("Could not determine your location: {0}")]
    Location(LocationError),
}

impl From<LocationError> for ControllerError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::ProviderDisabled => ControllerError::ProviderDisabled,
            LocationError::PermissionDenied { permanent } => {
                ControllerError::PermissionDenied { permanent }
            }
            other => ControllerError::Location(other),
        }
    }
}
