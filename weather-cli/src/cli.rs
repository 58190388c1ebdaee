use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode};
use weather_core::{Config, ProviderId, SessionState, TemperatureUnit, WeatherController};

use crate::{dashboard, render::render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather dashboard")]
pub struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },

    /// Show current weather and forecast once.
    Show {
        /// City name; the configured default city when absent.
        city: Option<String>,

        /// Use the device location instead of a city.
        #[arg(long, conflicts_with = "city")]
        here: bool,

        /// Temperature unit: "c" or "f".
        #[arg(long)]
        unit: Option<String>,

        /// Provider to use instead of the configured default.
        #[arg(long)]
        provider: Option<String>,

        /// Print the session state as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Interactive dashboard: search cities, use your location, toggle units.
    Dashboard {
        /// Temperature unit: "c" or "f".
        #[arg(long)]
        unit: Option<String>,

        /// Provider to use instead of the configured default.
        #[arg(long)]
        provider: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show { city, here, unit, provider, json } => {
                let controller = build_controller(provider.as_deref(), unit.as_deref())?;

                match city {
                    Some(city) => controller.search_by_city(&city).await,
                    None if here => controller.search_by_location().await,
                    None => controller.initialize().await,
                }

                let state = controller.state();
                print!("{}", show_output(&state, json)?);
                ensure_succeeded(&state)
            }
            Command::Dashboard { unit, provider } => {
                let controller = build_controller(provider.as_deref(), unit.as_deref())?;
                dashboard::run(controller).await
            }
        }
    }
}

/// Stdout text for `show`. A failed search prints nothing unless JSON was
/// requested.
fn show_output(state: &SessionState, json: bool) -> anyhow::Result<String> {
    if json {
        let encoded = serde_json::to_string_pretty(state).context("Failed to encode state")?;
        return Ok(format!("{encoded}\n"));
    }

    if state.error().is_some() {
        return Ok(String::new());
    }
    Ok(render(state))
}

fn ensure_succeeded(state: &SessionState) -> anyhow::Result<()> {
    match state.error() {
        Some(message) => bail!("{message}"),
        None => Ok(()),
    }
}

fn build_controller(
    provider: Option<&str>,
    unit: Option<&str>,
) -> anyhow::Result<WeatherController> {
    let config = Config::load()?;
    let provider_id = provider.map(|p| ProviderId::try_from(p)).transpose()?;

    let controller = WeatherController::from_config(&config, provider_id)?;
    if let Some(unit) = unit {
        controller.set_unit(TemperatureUnit::try_from(unit)?);
    }

    Ok(controller)
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key.to_string());

    let is_default = config.default_provider_id().ok() == Some(id);
    if !is_default {
        let make_default = Confirm::new(&format!("Make {id} the default provider?"))
            .with_default(false)
            .prompt()
            .context("Failed to read answer")?;

        if make_default {
            config.set_default_provider(id);
        }
    }

    let path = config.save()?;
    println!("Saved {id} configuration to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::WeatherStatus;

    #[test]
    fn parses_show_with_city_and_unit() {
        let cli = Cli::try_parse_from(["weather", "show", "Ha Noi", "--unit", "f"]).unwrap();
        match cli.command {
            Command::Show { city, here, unit, .. } => {
                assert_eq!(city.as_deref(), Some("Ha Noi"));
                assert!(!here);
                assert_eq!(unit.as_deref(), Some("f"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn here_conflicts_with_city() {
        assert!(Cli::try_parse_from(["weather", "show", "Paris", "--here"]).is_err());
        assert!(Cli::try_parse_from(["weather", "show", "--here"]).is_ok());
    }

    fn errored(message: &str) -> SessionState {
        SessionState {
            status: WeatherStatus::Errored { message: message.into(), shown: None },
            ..Default::default()
        }
    }

    #[test]
    fn failed_json_show_prints_state_and_fails() {
        let state = errored("Network error: connection refused");

        let output = show_output(&state, true).unwrap();
        assert!(output.contains("\"errored\""));
        assert!(output.contains("Network error: connection refused"));

        let err = ensure_succeeded(&state).unwrap_err();
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn failed_text_show_prints_nothing_and_fails() {
        let state = errored("Location 'Nowhere' not found");

        assert_eq!(show_output(&state, false).unwrap(), "");
        assert!(ensure_succeeded(&state).is_err());
    }

    #[test]
    fn idle_show_succeeds() {
        let state = SessionState::default();

        assert!(show_output(&state, true).unwrap().contains("\"idle\""));
        assert!(ensure_succeeded(&state).is_ok());
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["weather", "dashboard", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
