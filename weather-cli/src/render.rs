//! Plain-text rendering of the session state.

use std::fmt::Write;

use weather_core::{ForecastSet, SessionState, TemperatureUnit, WeatherSnapshot};

pub const LOADING_MESSAGE: &str = "Fetching latest weather data...";

/// Render what the dashboard shows for `state`: a loading line, an error,
/// or the current weather followed by the daily forecast.
pub fn render(state: &SessionState) -> String {
    if state.loading() {
        return format!("{LOADING_MESSAGE}\n");
    }

    let mut out = String::new();

    if let Some(message) = state.error() {
        let _ = writeln!(out, "Error: {message}");
    }

    match state.current_weather() {
        Some(current) => {
            render_current(&mut out, current, state.unit);
            if let Some(forecast) = state.forecast() {
                render_forecast(&mut out, forecast, state.unit);
            }
        }
        None if state.error().is_none() => out.push_str("No weather data yet.\n"),
        None => {}
    }

    out
}

fn render_current(out: &mut String, current: &WeatherSnapshot, unit: TemperatureUnit) {
    let place = match &current.country {
        Some(country) if !country.is_empty() => format!("{}, {country}", current.location_name),
        _ => current.location_name.clone(),
    };

    let _ = writeln!(out, "{place}");
    let _ = writeln!(
        out,
        "  {}  {} (feels like {})",
        unit.format(current.temperature_c),
        current.condition,
        unit.format(current.feels_like_c),
    );
    let _ = writeln!(
        out,
        "  Humidity {}%  Wind {:.1} m/s",
        current.humidity_pct, current.wind_speed_mps
    );
    let _ = writeln!(
        out,
        "  Updated {}",
        current.observation_time.format("%Y-%m-%d %H:%M UTC")
    );
}

fn render_forecast(out: &mut String, forecast: &ForecastSet, unit: TemperatureUnit) {
    let days = forecast.daily();
    if days.is_empty() {
        return;
    }

    let _ = writeln!(out, "\nForecast");
    for entry in days {
        let _ = writeln!(
            out,
            "  {}  {:>5}  {}",
            entry.time.format("%a %d %b"),
            unit.format(entry.temperature_c),
            entry.condition,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use weather_core::{ForecastEntry, WeatherReport, WeatherStatus};

    fn report() -> WeatherReport {
        WeatherReport {
            current: WeatherSnapshot {
                location_name: "Ha Noi".into(),
                country: Some("VN".into()),
                temperature_c: 30.0,
                feels_like_c: 35.0,
                condition: "scattered clouds".into(),
                icon: "03d".into(),
                humidity_pct: 70,
                wind_speed_mps: 4.25,
                observation_time: Utc.with_ymd_and_hms(2025, 6, 2, 8, 30, 0).unwrap(),
            },
            forecast: Some(ForecastSet {
                location_name: "Ha Noi".into(),
                entries: vec![ForecastEntry {
                    time: Utc.with_ymd_and_hms(2025, 6, 3, 12, 0, 0).unwrap(),
                    temperature_c: 0.0,
                    feels_like_c: 0.0,
                    condition: "light rain".into(),
                    icon: "10d".into(),
                    humidity_pct: 90,
                    wind_speed_mps: 1.0,
                }],
            }),
        }
    }

    #[test]
    fn renders_loaded_report_in_selected_unit() {
        let state = SessionState {
            status: WeatherStatus::Loaded(report()),
            unit: TemperatureUnit::Fahrenheit,
            last_city: Some("Ha Noi".into()),
        };

        let text = render(&state);
        assert!(text.starts_with("Ha Noi, VN\n"));
        assert!(text.contains("86°F  scattered clouds (feels like 95°F)"));
        assert!(text.contains("Humidity 70%"));
        assert!(text.contains("Updated 2025-06-02 08:30 UTC"));
        assert!(text.contains("Tue 03 Jun"));
        assert!(text.contains("32°F"));
    }

    #[test]
    fn loading_hides_content() {
        let state = SessionState {
            status: WeatherStatus::Loading { shown: Some(report()) },
            ..Default::default()
        };
        assert_eq!(render(&state), format!("{LOADING_MESSAGE}\n"));
    }

    #[test]
    fn error_is_shown_above_previous_report() {
        let state = SessionState {
            status: WeatherStatus::Errored {
                message: "Location 'Nowhere' not found".into(),
                shown: Some(report()),
            },
            ..Default::default()
        };

        let text = render(&state);
        assert!(text.starts_with("Error: Location 'Nowhere' not found\n"));
        assert!(text.contains("Ha Noi, VN"));
    }

    #[test]
    fn idle_state_has_placeholder() {
        assert_eq!(render(&SessionState::default()), "No weather data yet.\n");
    }
}
