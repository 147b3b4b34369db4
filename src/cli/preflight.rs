//! Pre-flight checks before operations that call the model.

use crate::error::{F1Error, Result};

/// Check that an OpenAI API key is configured.
pub fn check_api_key() -> Result<()> {
    api_key_status(std::env::var("OPENAI_API_KEY").ok().as_deref())
}

fn api_key_status(key: Option<&str>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(F1Error::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(F1Error::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_status() {
        assert!(api_key_status(Some("sk-test")).is_ok());
        assert!(matches!(
            api_key_status(Some(" ")),
            Err(F1Error::Config(msg)) if msg.contains("empty")
        ));
        assert!(matches!(
            api_key_status(None),
            Err(F1Error::Config(msg)) if msg.contains("not set")
        ));
    }
}
