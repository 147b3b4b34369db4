//! Token budget for tool results.
//!
//! Tokens are estimated with a character-count proxy: one token per four
//! characters, rounded up. The default ceiling is calibrated to that proxy.

/// Characters counted as one token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Default ceiling for a tool result, in estimated tokens.
pub const DEFAULT_TOKEN_BUDGET: usize = 1000;

/// Estimate how many model tokens `text` occupies.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Decides whether a tool result fits in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    ceiling: usize,
}

impl TokenBudget {
    pub fn new(ceiling: usize) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// True when the estimate is strictly above the ceiling.
    pub fn exceeds(&self, text: &str) -> bool {
        estimate_tokens(text) > self.ceiling
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BUDGET)
    }
}
