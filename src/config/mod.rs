//! Configuration module for f1ai.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts};
pub use settings::{
    ErgastSettings, GeneralSettings, ModelSettings, PromptSettings, ServerSettings, Settings,
};
