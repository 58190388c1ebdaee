//! Core library for the `weather` dashboard.
//!
//! This crate defines:
//! - Shared domain models (snapshots, forecasts, temperature units)
//! - Abstraction over weather providers and their HTTP backends
//! - The host geolocation capability
//! - Session state and the controller that drives it
//! - Configuration & credentials handling
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod config;
pub mod controller;
pub mod error;
pub mod geolocation;
pub mod model;
pub mod provider;

pub use config::{Config, DEFAULT_CITY, GeolocationConfig, ProviderConfig};
pub use controller::{SessionState, WeatherController, WeatherReport, WeatherStatus};
pub use error::{GeolocationError, WeatherError};
pub use geolocation::{FixedLocation, GeolocationSource, IpGeolocation};
pub use model::{Coordinates, ForecastEntry, ForecastSet, TemperatureUnit, WeatherSnapshot};
pub use provider::{ProviderId, WeatherProvider};
