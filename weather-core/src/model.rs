use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Geographic position reported by a geolocation source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Point-in-time weather reading for one location.
///
/// Temperatures are always stored in Celsius; conversion happens at display
/// time through [`TemperatureUnit::convert`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub country: Option<String>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub icon: String,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub observation_time: DateTime<Utc>,
}

/// One period of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub icon: String,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
}

/// Ordered multi-period outlook for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSet {
    pub location_name: String,
    pub entries: Vec<ForecastEntry>,
}

impl ForecastSet {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Condense the entries to one per calendar day, keeping the entry
    /// closest to midday. Days keep the order in which they first appear.
    pub fn daily(&self) -> Vec<&ForecastEntry> {
        let mut days: Vec<(NaiveDate, &ForecastEntry)> = Vec::new();

        for entry in &self.entries {
            let date = entry.time.date_naive();
            match days.iter_mut().find(|(d, _)| *d == date) {
                Some((_, best)) => {
                    if distance_from_noon(entry) < distance_from_noon(best) {
                        *best = entry;
                    }
                }
                None => days.push((date, entry)),
            }
        }

        days.into_iter().map(|(_, entry)| entry).collect()
    }
}

fn distance_from_noon(entry: &ForecastEntry) -> i64 {
    let seconds = i64::from(entry.time.num_seconds_from_midnight());
    (seconds - 12 * 3600).abs()
}

/// Display-only temperature unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn toggled(self) -> Self {
        match self {
            TemperatureUnit::Celsius => TemperatureUnit::Fahrenheit,
            TemperatureUnit::Fahrenheit => TemperatureUnit::Celsius,
        }
    }

    /// Convert a Celsius reading into this unit.
    pub fn convert(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Format a Celsius reading rounded to whole degrees in this unit.
    pub fn format(self, celsius: f64) -> String {
        format!("{:.0}{}", self.convert(celsius), self.symbol())
    }
}

impl TryFrom<&str> for TemperatureUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(anyhow::anyhow!(
                "Unknown temperature unit '{value}'. Use 'c' or 'f'."
            )),
        }
    }
}
