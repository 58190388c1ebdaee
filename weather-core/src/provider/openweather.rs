use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::WeatherError,
    model::{ForecastEntry, ForecastSet, WeatherSnapshot},
    provider::{parse_json, truncate_body, unix_to_utc},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
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

    fn get(&self, endpoint: &str) -> RequestBuilder {
        self.http
            .get(format!("{}/{endpoint}", self.base_url))
            .query(&[("appid", self.api_key.as_str()), ("units", "metric")])
    }

    /// Send the request and return the body of a successful response.
    async fn execute(
        &self,
        request: RequestBuilder,
        what: &str,
        location: &str,
    ) -> Result<String, WeatherError> {
        let res = request.send().await.map_err(WeatherError::network)?;

        let status = res.status();
        let body = res.text().await.map_err(WeatherError::network)?;
        debug!(%status, what, "OpenWeather responded");

        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::NotFound(format!("Location '{location}' not found")));
        }

        if !status.is_success() {
            return Err(WeatherError::Service(format!(
                "OpenWeather {what} request failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        Ok(body)
    }

    fn snapshot_from(parsed: OwCurrentResponse) -> WeatherSnapshot {
        let observation_time = unix_to_utc(parsed.dt).unwrap_or_else(Utc::now);
        let (condition, icon) = first_condition(&parsed.weather);

        WeatherSnapshot {
            location_name: parsed.name,
            country: parsed.sys.and_then(|s| s.country),
            temperature_c: parsed.main.temp,
            feels_like_c: parsed.main.feels_like,
            condition,
            icon,
            humidity_pct: parsed.main.humidity,
            wind_speed_mps: parsed.wind.speed,
            observation_time,
        }
    }
}

fn first_condition(weather: &[OwWeather]) -> (String, String) {
    weather
        .first()
        .map(|w| (w.description.clone(), w.icon.clone()))
        .unwrap_or_else(|| ("Unknown".to_string(), String::new()))
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    sys: Option<OwSys>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self))]
    async fn fetch_current_by_city(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let request = self.get("weather").query(&[("q", city)]);
        let body = self.execute(request, "current weather", city).await?;

        let parsed: OwCurrentResponse = parse_json(&body, "OpenWeather current")?;
        Ok(Self::snapshot_from(parsed))
    }

    #[instrument(skip(self))]
    async fn fetch_current_by_coords(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let request = self
            .get("weather")
            .query(&[("lat", latitude.to_string()), ("lon", longitude.to_string())]);
        let location = format!("{latitude:.4}, {longitude:.4}");
        let body = self.execute(request, "current weather", &location).await?;

        let parsed: OwCurrentResponse = parse_json(&body, "OpenWeather current")?;
        Ok(Self::snapshot_from(parsed))
    }

    #[instrument(skip(self))]
    async fn fetch_forecast(&self, city: &str) -> Result<ForecastSet, WeatherError> {
        let request = self.get("forecast").query(&[("q", city)]);
        let body = self.execute(request, "forecast", city).await?;

        let parsed: OwForecastResponse = parse_json(&body, "OpenWeather forecast")?;

        let entries = parsed
            .list
            .into_iter()
            .map(|e| {
                let (condition, icon) = first_condition(&e.weather);
                ForecastEntry {
                    time: unix_to_utc(e.dt).unwrap_or_else(Utc::now),
                    temperature_c: e.main.temp,
                    feels_like_c: e.main.feels_like,
                    condition,
                    icon,
                    humidity_pct: e.main.humidity,
                    wind_speed_mps: e.wind.speed,
                }
            })
            .collect();

        Ok(ForecastSet { location_name: parsed.city.name, entries })
    }
}
