//! Host geolocation capability.
//!
//! The controller asks a [`GeolocationSource`] for the device position once
//! per location search and never cancels the request.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{error::GeolocationError, model::Coordinates};

pub const DEFAULT_IP_ENDPOINT: &str = "http://ip-api.com/json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait GeolocationSource: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError>;
}

/// Always reports the same position, e.g. one taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl GeolocationSource for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        Ok(self.0)
    }
}

/// Approximates the device position from its public IP address.
#[derive(Debug, Clone)]
pub struct IpGeolocation {
    endpoint: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpGeolocation {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, GeolocationError> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            warn!("Failed to create geolocation client: {e}");
            GeolocationError::PositionUnavailable
        })?;

        Ok(Self { endpoint: endpoint.to_string(), http })
    }
}

#[async_trait]
impl GeolocationSource for IpGeolocation {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        let res = self.http.get(&self.endpoint).send().await.map_err(|e| {
            debug!("IP geolocation request failed: {e}");
            if e.is_timeout() {
                GeolocationError::Timeout
            } else {
                GeolocationError::PositionUnavailable
            }
        })?;

        let status = res.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(GeolocationError::PermissionDenied);
        }
        if !status.is_success() {
            debug!(%status, "IP geolocation returned non-success status");
            return Err(GeolocationError::Other(status.as_u16()));
        }

        let body: IpApiResponse = res.json().await.map_err(|e| {
            debug!("IP geolocation parse error: {e}");
            if e.is_timeout() {
                GeolocationError::Timeout
            } else {
                GeolocationError::PositionUnavailable
            }
        })?;

        if body.status != "success" {
            debug!(message = ?body.message, "IP geolocation lookup failed");
            return Err(GeolocationError::PositionUnavailable);
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err(GeolocationError::PositionUnavailable),
        }
    }
}
