//! Interactive dashboard loop.

use anyhow::Context;
use inquire::{InquireError, Text};
use tracing::debug;
use weather_core::WeatherController;

use crate::render::{LOADING_MESSAGE, render};

const HELP: &str = "Type a city name, or :here, :unit, :retry, :quit";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Search(String),
    Here,
    ToggleUnit,
    Retry,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let input = match line.to_lowercase().as_str() {
        ":here" | ":h" => Input::Here,
        ":unit" | ":u" => Input::ToggleUnit,
        ":retry" | ":r" => Input::Retry,
        ":help" | ":?" => Input::Help,
        ":quit" | ":q" | ":exit" => Input::Quit,
        _ if line.starts_with(':') => Input::Help,
        _ => Input::Search(line.to_string()),
    };

    Some(input)
}

/// Read one line from the terminal without blocking the runtime.
async fn prompt() -> anyhow::Result<Option<String>> {
    let answer = tokio::task::spawn_blocking(|| Text::new(">").with_help_message(HELP).prompt())
        .await
        .context("Prompt task failed")?;

    match answer {
        Ok(line) => Ok(Some(line)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e).context("Failed to read input"),
    }
}

pub async fn run(controller: WeatherController) -> anyhow::Result<()> {
    let mut updates = controller.subscribe();
    let loading_notice = tokio::spawn(async move {
        let mut was_loading = false;
        while updates.changed().await.is_ok() {
            let loading = updates.borrow_and_update().loading();
            if loading && !was_loading {
                eprintln!("{LOADING_MESSAGE}");
            }
            was_loading = loading;
        }
    });

    controller.initialize().await;
    print_state(&controller);

    while let Some(line) = prompt().await? {
        let Some(input) = parse_input(&line) else {
            continue;
        };
        debug!(?input, "Dashboard input");

        match input {
            Input::Search(city) => controller.search_by_city(&city).await,
            Input::Here => controller.search_by_location().await,
            Input::ToggleUnit => {
                controller.toggle_unit();
            }
            Input::Retry => controller.retry().await,
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            Input::Quit => break,
        }

        print_state(&controller);
    }

    loading_notice.abort();
    Ok(())
}

fn print_state(controller: &WeatherController) {
    let state = controller.state();
    println!();
    print!("{}", render(&state));
    if state.error().is_some() {
        println!("Type :retry to try again.");
    }
    println!();
}
