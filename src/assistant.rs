//! Wires settings, the OpenAI provider and the F1 tools into a [`Driver`].

use crate::agent::{Driver, Handler, OpenAIProvider, ToolDescriptor, ToolRegistry};
use crate::analysis::AnalyzeData;
use crate::charts::ChartStore;
use crate::config::{Prompts, Settings};
use crate::ergast::{ergast_tools, ErgastClient};
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Every tool the assistant offers: the Ergast queries, then `analyze_data`.
pub fn tool_handlers(settings: &Settings) -> Result<Vec<Handler>> {
    let client = Arc::new(ErgastClient::new(&settings.ergast)?);
    let mut handlers = ergast_tools(client);
    handlers.push(Handler::Analysis(Arc::new(AnalyzeData::new())));
    Ok(handlers)
}

/// Descriptors of every tool, as sent to the model.
pub fn tool_descriptors(settings: &Settings) -> Result<Vec<ToolDescriptor>> {
    Ok(ToolRegistry::new(tool_handlers(settings)?)?.descriptors())
}

/// System prompt for a conversation starting today.
pub fn system_prompt(settings: &Settings) -> Result<String> {
    let prompts = Prompts::load(&settings.prompts)?;
    Ok(prompts.system_prompt(chrono::Local::now().date_naive()))
}

/// Build a driver for one conversation.
///
/// `model` overrides the configured model. Charts are written under
/// `chart_root`, which is cleared first.
pub fn build_driver(settings: &Settings, model: Option<&str>, chart_root: &Path) -> Result<Driver> {
    let model = model.unwrap_or(&settings.model.model);
    let config = settings.driver_config();
    debug!("Building driver for model {}", model);

    let client = crate::openai::create_client_with_timeout(config.completion_timeout)?;
    let provider = Arc::new(OpenAIProvider::new(client, model));

    let driver = Driver::new(provider, tool_handlers(settings)?, &system_prompt(settings)?)?
        .with_config(config)
        .with_charts(ChartStore::new(chart_root))?;
    Ok(driver)
}
