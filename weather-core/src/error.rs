use thiserror::Error;

/// Message shown when a failure carries no text of its own.
pub const GENERIC_FETCH_ERROR: &str = "Failed to fetch weather data";

/// Failures raised by a weather provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// The service does not know the requested location.
    #[error("{0}")]
    NotFound(String),

    /// The request never produced an HTTP response.
    #[error("{0}")]
    Network(String),

    /// Non-success status or a body that could not be understood.
    #[error("{0}")]
    Service(String),
}

impl WeatherError {
    pub(crate) fn network(err: reqwest::Error) -> Self {
        WeatherError::Network(format!("Network error: {err}"))
    }

    /// Text for the error banner, never empty.
    pub fn user_message(&self) -> String {
        let msg = self.to_string();
        if msg.trim().is_empty() { GENERIC_FETCH_ERROR.to_string() } else { msg }
    }
}

/// Failures raised by a host geolocation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Location unavailable")]
    PositionUnavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Unable to retrieve your location")]
    Other(u16),
}

impl GeolocationError {
    pub const PERMISSION_DENIED: u16 = 1;
    pub const POSITION_UNAVAILABLE: u16 = 2;
    pub const TIMEOUT: u16 = 3;

    /// Map a W3C-style geolocation error code.
    pub fn from_code(code: u16) -> Self {
        match code {
            Self::PERMISSION_DENIED => GeolocationError::PermissionDenied,
            Self::POSITION_UNAVAILABLE => GeolocationError::PositionUnavailable,
            Self::TIMEOUT => GeolocationError::Timeout,
            other => GeolocationError::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            GeolocationError::PermissionDenied => Self::PERMISSION_DENIED,
            GeolocationError::PositionUnavailable => Self::POSITION_UNAVAILABLE,
            GeolocationError::Timeout => Self::TIMEOUT,
            GeolocationError::Other(code) => *code,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}
