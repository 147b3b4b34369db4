//! Tools command: print the descriptors the model is given.

use crate::assistant::tool_descriptors;
use crate::config::Settings;
use anyhow::Result;
use serde_json::Value;

/// Print every tool descriptor as pretty JSON.
pub fn run_tools(settings: &Settings) -> Result<()> {
    let descriptors: Vec<Value> = tool_descriptors(settings)?
        .iter()
        .map(|d| d.to_json())
        .collect();
    println!("{}", serde_json::to_string_pretty(&descriptors)?);
    Ok(())
}
