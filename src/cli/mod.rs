//! CLI module for f1ai.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// f1ai - Formula 1 statistics assistant
///
/// Ask questions about Formula 1 results in plain language. A chat model
/// fetches the data it needs from the Ergast API and answers.
#[derive(Parser, Debug)]
#[command(name = "f1ai")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one question
    Ask {
        /// The question to ask
        question: String,

        /// Chat model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Print the full message history after the answer
        #[arg(long)]
        show_messages: bool,
    },

    /// Start an interactive chat session
    Chat {
        /// Chat model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start the web interface and JSON API
    Serve {
        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the tool descriptors sent to the model
    Tools,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
