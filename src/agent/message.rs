//! Conversation messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who a message is from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    ToolResult,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::ToolResult => write!(f, "tool-result"),
        }
    }
}

/// A tool invocation requested by the model. Arguments are JSON text as
/// returned by the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(name: &str, arguments: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }
}

impl fmt::Display for ToolCallRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// One turn in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: &str) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: &str, tool_call: Option<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_call,
            tool_name: None,
        }
    }

    pub fn tool_result(tool_name: &str, content: &str) -> Self {
        Self {
            role: Role::ToolResult,
            content: content.to_string(),
            tool_call: None,
            tool_name: Some(tool_name.to_string()),
        }
    }

    fn plain(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_call: None,
            tool_name: None,
        }
    }
}
