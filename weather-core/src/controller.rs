//! Session state and the operations that drive it.
//!
//! [`WeatherController`] owns one [`SessionState`] aggregate. Every search
//! takes a ticket when it is issued; results are applied only while that
//! ticket is still the newest one, so the state always reflects the most
//! recent user request. Operations never return errors: failures end up as
//! [`WeatherStatus::Errored`].

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    config::Config,
    geolocation::GeolocationSource,
    model::{ForecastSet, TemperatureUnit, WeatherSnapshot},
    provider::{self, ProviderId, WeatherProvider},
};

pub const GEOLOCATION_UNSUPPORTED: &str = "Geolocation is not supported on this host";
pub const EMPTY_CITY: &str = "Please enter a city name";

/// Current weather plus the forecast for the same place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub current: WeatherSnapshot,
    /// `None` while a location search is still waiting for it.
    pub forecast: Option<ForecastSet>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WeatherStatus {
    #[default]
    Idle,
    Loading {
        shown: Option<WeatherReport>,
    },
    Loaded(WeatherReport),
    Errored {
        message: String,
        shown: Option<WeatherReport>,
    },
}

impl WeatherStatus {
    pub fn shown(&self) -> Option<&WeatherReport> {
        match self {
            WeatherStatus::Idle => None,
            WeatherStatus::Loading { shown } | WeatherStatus::Errored { shown, .. } => {
                shown.as_ref()
            }
            WeatherStatus::Loaded(report) => Some(report),
        }
    }

    fn into_shown(self) -> Option<WeatherReport> {
        match self {
            WeatherStatus::Idle => None,
            WeatherStatus::Loading { shown } | WeatherStatus::Errored { shown, .. } => shown,
            WeatherStatus::Loaded(report) => Some(report),
        }
    }
}

/// Everything the presentation layer reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionState {
    pub status: WeatherStatus,
    pub unit: TemperatureUnit,
    /// Last city whose search completed successfully.
    pub last_city: Option<String>,
}

impl SessionState {
    pub fn current_weather(&self) -> Option<&WeatherSnapshot> {
        self.status.shown().map(|r| &r.current)
    }

    pub fn forecast(&self) -> Option<&ForecastSet> {
        self.status.shown().and_then(|r| r.forecast.as_ref())
    }

    pub fn loading(&self) -> bool {
        matches!(self.status, WeatherStatus::Loading { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            WeatherStatus::Errored { message, .. } => Some(message),
            _ => None,
        }
    }

    fn replace_status(&mut self, f: impl FnOnce(Option<WeatherReport>) -> WeatherStatus) {
        let previous = std::mem::take(&mut self.status);
        self.status = f(previous.into_shown());
    }
}

#[derive(Debug)]
struct Inner {
    provider: Arc<dyn WeatherProvider>,
    geolocation: Option<Arc<dyn GeolocationSource>>,
    default_city: String,
    state: watch::Sender<SessionState>,
    issued: AtomicU64,
    initialized: AtomicBool,
}

/// Drives [`SessionState`] from user actions. Cheap to clone; clones share
/// the same state.
#[derive(Debug, Clone)]
pub struct WeatherController {
    inner: Arc<Inner>,
}

impl WeatherController {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        geolocation: Option<Arc<dyn GeolocationSource>>,
        default_city: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());

        Self {
            inner: Arc::new(Inner {
                provider,
                geolocation,
                default_city: default_city.into(),
                state,
                issued: AtomicU64::new(0),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    /// Wire a controller from configuration, optionally forcing a provider.
    pub fn from_config(config: &Config, provider_id: Option<ProviderId>) -> anyhow::Result<Self> {
        let provider = match provider_id {
            Some(id) => provider::provider_from_config(id, config)?,
            None => provider::default_provider_from_config(config)?,
        };

        let controller = Self::new(
            Arc::from(provider),
            config.geolocation_source(),
            config.default_city(),
        );
        controller.set_unit(config.unit);

        Ok(controller)
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every applied state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Load the default city. Only the first call does anything.
    pub async fn initialize(&self) {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            debug!("Controller already initialized");
            return;
        }

        let city = self.inner.default_city.clone();
        self.search_by_city(&city).await;
    }

    /// Fetch current weather and forecast for `city` together.
    ///
    /// Both requests run concurrently and the state changes only once both
    /// have settled: either both fields are replaced, or an error is shown
    /// and the previous report stays as it was.
    pub async fn search_by_city(&self, city: &str) {
        let city = city.trim();
        if city.is_empty() {
            let ticket = self.issue();
            self.fail(ticket, EMPTY_CITY.to_string());
            return;
        }

        let ticket = self.start_loading();
        info!(city, ticket, "Searching weather by city");

        let provider = &self.inner.provider;
        let (current, forecast) =
            tokio::join!(provider.fetch_current_by_city(city), provider.fetch_forecast(city));

        let (current, forecast) = match (current, forecast) {
            (Ok(current), Ok(forecast)) => (current, forecast),
            (Err(e), forecast) => {
                if forecast.is_ok() {
                    debug!(city, "Discarding forecast because current weather failed");
                }
                info!(city, error = %e, "City search failed");
                self.fail(ticket, e.user_message());
                return;
            }
            (Ok(_), Err(e)) => {
                info!(city, error = %e, "Discarding current weather because forecast failed");
                self.fail(ticket, e.user_message());
                return;
            }
        };

        let city = city.to_string();
        let applied = self.apply(ticket, |s| {
            s.status = WeatherStatus::Loaded(WeatherReport { current, forecast: Some(forecast) });
            s.last_city = Some(city);
        });

        if applied {
            info!(ticket, "City search completed");
        }
    }

    /// Fetch weather for the device position.
    ///
    /// Current weather is published as soon as it arrives; the forecast is
    /// then requested for the resolved location name.
    pub async fn search_by_location(&self) {
        let Some(geolocation) = self.inner.geolocation.clone() else {
            let ticket = self.issue();
            info!("Location search requested without a geolocation source");
            self.fail(ticket, GEOLOCATION_UNSUPPORTED.to_string());
            return;
        };

        let ticket = self.start_loading();
        info!(ticket, "Searching weather by device location");

        let position = match geolocation.current_position().await {
            Ok(position) => position,
            Err(e) => {
                info!(code = e.code(), "Geolocation failed: {e}");
                self.fail(ticket, e.message());
                return;
            }
        };
        debug!(lat = position.latitude, lon = position.longitude, "Resolved device position");

        let provider = &self.inner.provider;
        let current = match provider
            .fetch_current_by_coords(position.latitude, position.longitude)
            .await
        {
            Ok(current) => current,
            Err(e) => {
                info!(error = %e, "Current weather by coordinates failed");
                self.fail(ticket, e.user_message());
                return;
            }
        };

        let name = current.location_name.clone();
        let published = current.clone();
        let applied = self.apply(ticket, |s| {
            s.status = WeatherStatus::Loading {
                shown: Some(WeatherReport { current: published, forecast: None }),
            };
        });
        if !applied {
            return;
        }

        let forecast = provider.fetch_forecast(&name).await;
        match forecast {
            Ok(forecast) => {
                self.apply(ticket, |s| {
                    s.status =
                        WeatherStatus::Loaded(WeatherReport { current, forecast: Some(forecast) });
                    s.last_city = Some(name);
                });
            }
            Err(e) => {
                info!(location = %name, error = %e, "Forecast for resolved location failed");
                self.fail(ticket, e.user_message());
            }
        }
    }

    /// Repeat the last city search, falling back to the shown location and
    /// then to the default city.
    pub async fn retry(&self) {
        let city = {
            let state = self.inner.state.borrow();
            state
                .last_city
                .clone()
                .or_else(|| state.current_weather().map(|c| c.location_name.clone()))
                .unwrap_or_else(|| self.inner.default_city.clone())
        };

        debug!(%city, "Retrying search");
        self.search_by_city(&city).await;
    }

    /// Flip between Celsius and Fahrenheit; returns the new unit.
    pub fn toggle_unit(&self) -> TemperatureUnit {
        let mut unit = TemperatureUnit::default();
        self.inner.state.send_modify(|s| {
            s.unit = s.unit.toggled();
            unit = s.unit;
        });
        unit
    }

    pub fn set_unit(&self, unit: TemperatureUnit) {
        self.inner.state.send_if_modified(|s| {
            let changed = s.unit != unit;
            s.unit = unit;
            changed
        });
    }

    fn issue(&self) -> u64 {
        self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn start_loading(&self) -> u64 {
        let ticket = self.issue();
        self.apply(ticket, |s| s.replace_status(|shown| WeatherStatus::Loading { shown }));
        ticket
    }

    fn fail(&self, ticket: u64, message: String) {
        self.apply(ticket, |s| {
            s.replace_status(|shown| WeatherStatus::Errored { message, shown })
        });
    }

    /// Apply `update` only if `ticket` is still the newest one issued.
    fn apply(&self, ticket: u64, update: impl FnOnce(&mut SessionState)) -> bool {
        let inner = &self.inner;
        let applied = inner.state.send_if_modified(|s| {
            if inner.issued.load(Ordering::SeqCst) != ticket {
                return false;
            }
            update(s);
            true
        });

        if !applied {
            debug!(ticket, "Discarding stale result");
        }
        applied
    }
}
