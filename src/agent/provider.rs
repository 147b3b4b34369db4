//! Completion providers.

use super::message::{Message, Role, ToolCallRequest};
use super::schema::ToolDescriptor;
use crate::error::{F1Error, Result};
use async_openai::types::{
    ChatCompletionFunctions, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestFunctionMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, FunctionCall,
};
use async_trait::async_trait;
use tracing::debug;

/// One reply from the model: plain text, a tool call, or both.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_call: Option<ToolCallRequest>,
}

impl Completion {
    /// A plain-text answer.
    pub fn text(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            tool_call: None,
        }
    }

    /// A tool-call request with no accompanying text.
    pub fn call(name: &str, arguments: &str) -> Self {
        Self {
            content: None,
            tool_call: Some(ToolCallRequest::new(name, arguments)),
        }
    }
}

/// Something that can continue a conversation.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request the next reply for the full history, offering `tools`.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
        max_output_tokens: u32,
    ) -> Result<Completion>;
}

/// OpenAI chat completions using the function-calling message shape.
///
/// Results go back as `function` messages keyed by tool name, which lets a
/// user message follow an assistant function call directly.
pub struct OpenAIProvider {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAIProvider {
    pub fn new(
        client: async_openai::Client<async_openai::config::OpenAIConfig>,
        model: &str,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    #[allow(deprecated)]
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
        max_output_tokens: u32,
    ) -> Result<Completion> {
        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(&self.model)
            .messages(request_messages)
            .max_tokens(max_output_tokens);
        if !tools.is_empty() {
            request.functions(to_functions(tools)?);
        }
        let request = request.build().map_err(|e| F1Error::Completion(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| F1Error::OpenAI(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| F1Error::Completion("No response from model".to_string()))?;

        debug!(finish_reason = ?choice.finish_reason, "completion received");

        let message = choice.message;
        let tool_call = message
            .function_call
            .map(|call| ToolCallRequest {
                name: call.name,
                arguments: call.arguments,
            })
            .or_else(|| {
                message.tool_calls.and_then(|calls| {
                    calls.into_iter().next().map(|call| ToolCallRequest {
                        name: call.function.name,
                        arguments: call.function.arguments,
                    })
                })
            });

        Ok(Completion {
            content: message.content,
            tool_call,
        })
    }
}

#[allow(deprecated)]
fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let map_err = |e: async_openai::error::OpenAIError| F1Error::Completion(e.to_string());

    let converted = match message.role {
        Role::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(map_err)?,
        ),
        Role::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(map_err)?,
        ),
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !message.content.is_empty() {
                args.content(message.content.clone());
            }
            if let Some(call) = &message.tool_call {
                args.function_call(FunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                });
            }
            ChatCompletionRequestMessage::Assistant(args.build().map_err(map_err)?)
        }
        Role::ToolResult => {
            let name = message.tool_name.clone().ok_or_else(|| {
                F1Error::Completion("tool result message without a tool name".to_string())
            })?;
            ChatCompletionRequestMessage::Function(
                ChatCompletionRequestFunctionMessageArgs::default()
                    .name(name)
                    .content(message.content.clone())
                    .build()
                    .map_err(map_err)?,
            )
        }
    };

    Ok(converted)
}

fn to_functions(tools: &[ToolDescriptor]) -> Result<Vec<ChatCompletionFunctions>> {
    tools
        .iter()
        .map(|tool| serde_json::from_value(tool.to_json()).map_err(F1Error::from))
        .collect()
}
