//! Ask command implementation.

use crate::agent::Driver;
use crate::assistant::build_driver;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    show_messages: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check_api_key() {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut driver = build_driver(&settings, model.as_deref(), &settings.cli_charts_dir())?;

    let spinner = Output::spinner("Looking up the data...");
    let result = driver.ask(question).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            println!("\n{}\n", answer);
            print_charts(&driver)?;
        }
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            if show_messages {
                print_messages(&driver);
            }
            return Err(e.into());
        }
    }

    if show_messages {
        print_messages(&driver);
    }

    Ok(())
}

/// List chart files produced while answering.
pub(crate) fn print_charts(driver: &Driver) -> Result<()> {
    let charts = driver.charts()?;
    if !charts.is_empty() {
        Output::header("Charts");
        for chart in charts {
            Output::list_item(&chart.display().to_string());
        }
    }
    Ok(())
}

pub(crate) fn print_messages(driver: &Driver) {
    Output::header("Messages");
    for message in driver.messages() {
        Output::message(message);
    }
}
