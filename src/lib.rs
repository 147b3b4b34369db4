//! f1ai - Formula 1 statistics assistant
//!
//! Answers Formula 1 questions by letting a chat model call data tools backed
//! by the Ergast results API, then summarizing what it found.
//!
//! # Architecture
//!
//! - `agent` - Tool declarations, the tool registry and the conversation driver
//! - `ergast` - Ergast API client and the data tools built on it
//! - `analysis` - The `analyze_data` tool over the most recently fetched table
//! - `charts` - Per-question chart artifact directories
//! - `assistant` - Wiring settings, model and tools into a driver
//! - `config` - Configuration management
//! - `cli` - Command line and web shells
//!
//! # Example
//!
//! ```rust,no_run
//! use f1ai::assistant::build_driver;
//! use f1ai::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut driver = build_driver(&settings, None, &settings.cli_charts_dir())?;
//!
//!     let answer = driver.ask("Who finished second in round 3 of season 2022?").await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod analysis;
pub mod assistant;
pub mod charts;
pub mod cli;
pub mod config;
pub mod ergast;
pub mod error;
pub mod openai;

pub use error::{F1Error, Result};
