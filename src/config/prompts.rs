//! Prompt templates for f1ai.
//!
//! The system prompt can be replaced inline in the config file or by placing
//! an `assistant.toml` file in the custom prompts directory.

use super::settings::PromptSettings;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the statistics assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    pub system: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant that answers Formula 1 questions.

You have access to functions that fetch F1 data. Nearly all functions have a `season` parameter and a `round` parameter. The season is the 4 digit year of the season in question. The round is the 1 or 2 digit number of the race within that season.

If you need the round number but only know the circuit or race name, call `get_season_info` first to find the round number of that race.

If a result is too large to be shown to you, use `analyze_data` to filter, sort or chart the data that was just fetched instead of fetching it again.

Today is {{today}}."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the defaults, a custom directory and the inline override.
    pub fn load(settings: &PromptSettings) -> crate::error::Result<Self> {
        let mut prompts = Prompts {
            variables: settings.variables.clone(),
            ..Prompts::default()
        };

        if let Some(dir) = &settings.custom_dir {
            let assistant_path =
                PathBuf::from(shellexpand::tilde(dir).to_string()).join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }
        }

        if let Some(system) = settings.system.as_ref().filter(|s| !s.trim().is_empty()) {
            prompts.assistant.system = system.clone();
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The system prompt for a conversation held on `today`.
    pub fn system_prompt(&self, today: NaiveDate) -> String {
        let mut vars = HashMap::new();
        vars.insert("today".to_string(), today.format("%Y-%m-%d").to_string());
        self.render_with_custom(&self.assistant.system, &vars)
    }
}
