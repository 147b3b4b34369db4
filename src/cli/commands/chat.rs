//! Interactive chat command.
//!
//! Every line is a separate question. The driver keeps the last fetched
//! dataset between questions, so follow-ups can analyze it.

use super::ask::{print_charts, print_messages};
use crate::assistant::build_driver;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check_api_key() {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut driver = build_driver(&settings, model.as_deref(), &settings.cli_charts_dir())?;

    println!("\n{}", style("f1ai chat").bold().cyan());
    let hint =
        "Ask about Formula 1 results, 'messages' to show the last exchange, or 'exit' to quit.";
    println!("{}\n", style(hint).dim());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("messages") {
            print_messages(&driver);
            continue;
        }

        let spinner = Output::spinner("Looking up the data...");
        let result = driver.ask(input).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => {
                println!("\n{} {}\n", style("f1ai:").cyan().bold(), answer);
                if let Err(e) = print_charts(&driver) {
                    Output::warning(&format!("Could not list charts: {}", e));
                }
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
