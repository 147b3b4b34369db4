//! Error types for f1ai.

use thiserror::Error;

/// Library-level error type for f1ai operations.
#[derive(Error, Debug)]
pub enum F1Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported type for parameter '{param}' of tool '{tool}': {hint}")]
    UnsupportedType {
        tool: String,
        param: String,
        hint: String,
    },

    #[error("Tool registered twice: {0}")]
    DuplicateTool(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: Box<F1Error>,
    },

    #[error("Tool '{tool}' needs a dataset but no data has been fetched yet")]
    NoDataAvailable { tool: String },

    #[error("Result of '{tool}' is too large ({tokens} tokens, budget {budget}) and not tabular")]
    OversizeResult {
        tool: String,
        tokens: usize,
        budget: usize,
    },

    #[error("Conversation exceeded maximum tool-call rounds ({0})")]
    LoopBudgetExceeded(usize),

    #[error("Timed out after {secs}s: {what}")]
    Timeout { what: String, secs: u64 },

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl F1Error {
    /// Whether this error was raised while building the tool registry.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            F1Error::Config(_) | F1Error::UnsupportedType { .. } | F1Error::DuplicateTool(_)
        )
    }
}

/// Result type alias for f1ai operations.
pub type Result<T> = std::result::Result<T, F1Error>;
