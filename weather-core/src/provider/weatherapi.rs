use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::WeatherError,
    model::{ForecastEntry, ForecastSet, WeatherSnapshot},
    provider::{parse_json, truncate_body, unix_to_utc},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// Number of days requested from `forecast.json`.
pub const FORECAST_DAYS: u8 = 5;

/// WeatherAPI.com error code for "No matching location found".
const NO_LOCATION_FOUND: i64 = 1006;

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn get(&self, endpoint: &str, query: &str) -> RequestBuilder {
        self.http
            .get(format!("{}/{endpoint}", self.base_url))
            .query(&[("key", self.api_key.as_str()), ("q", query)])
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        what: &str,
        location: &str,
    ) -> Result<String, WeatherError> {
        let res = request.send().await.map_err(WeatherError::network)?;

        let status = res.status();
        let body = res.text().await.map_err(WeatherError::network)?;
        debug!(%status, what, "WeatherAPI responded");

        if !status.is_success() {
            let code = serde_json::from_str::<WaErrorResponse>(&body)
                .ok()
                .map(|e| e.error.code);

            if code == Some(NO_LOCATION_FOUND) {
                return Err(WeatherError::NotFound(format!("Location '{location}' not found")));
            }

            return Err(WeatherError::Service(format!(
                "WeatherAPI {what} request failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        Ok(body)
    }

    async fn current(&self, query: &str) -> Result<WeatherSnapshot, WeatherError> {
        let request = self.get("current.json", query);
        let body = self.execute(request, "current", query).await?;

        let parsed: WaResponse = parse_json(&body, "WeatherAPI current")?;

        let ts = parsed.current.last_updated_epoch.or(parsed.location.localtime_epoch);
        let observation_time = ts.and_then(unix_to_utc).unwrap_or_else(Utc::now);

        Ok(WeatherSnapshot {
            location_name: parsed.location.name,
            country: Some(parsed.location.country),
            temperature_c: parsed.current.temp_c,
            feels_like_c: parsed.current.feelslike_c,
            condition: parsed.current.condition.text,
            icon: parsed.current.condition.icon,
            humidity_pct: parsed.current.humidity,
            wind_speed_mps: kph_to_mps(parsed.current.wind_kph),
            observation_time,
        })
    }
}

fn kph_to_mps(kph: f64) -> f64 {
    kph / 3.6
}

#[derive(Debug, Deserialize)]
struct WaErrorBody {
    code: i64,
}

#[derive(Debug, Deserialize)]
struct WaErrorResponse {
    error: WaErrorBody,
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
    localtime_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    wind_kph: f64,
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    avgtemp_c: f64,
    avghumidity: f64,
    maxwind_kph: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date_epoch: i64,
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    forecast: WaForecast,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    #[instrument(skip(self))]
    async fn fetch_current_by_city(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        self.current(city).await
    }

    #[instrument(skip(self))]
    async fn fetch_current_by_coords(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, WeatherError> {
        self.current(&format!("{latitude},{longitude}")).await
    }

    #[instrument(skip(self))]
    async fn fetch_forecast(&self, city: &str) -> Result<ForecastSet, WeatherError> {
        let request = self
            .get("forecast.json", city)
            .query(&[("days", FORECAST_DAYS.to_string())]);
        let body = self.execute(request, "forecast", city).await?;

        let parsed: WaForecastResponse = parse_json(&body, "WeatherAPI forecast")?;

        let entries = parsed
            .forecast
            .forecastday
            .into_iter()
            .map(|d| ForecastEntry {
                time: unix_to_utc(d.date_epoch).unwrap_or_else(Utc::now),
                temperature_c: d.day.avgtemp_c,
                feels_like_c: d.day.avgtemp_c,
                condition: d.day.condition.text,
                icon: d.day.condition.icon,
                humidity_pct: d.day.avghumidity.round().clamp(0.0, 100.0) as u8,
                wind_speed_mps: kph_to_mps(d.day.maxwind_kph),
            })
            .collect();

        Ok(ForecastSet { location_name: parsed.location.name, entries })
    }
}
