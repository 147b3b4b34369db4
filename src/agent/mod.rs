//! Function-calling conversation driver.
//!
//! Tools are declared with [`ToolSpec`], registered as [`Handler`]s and
//! described to the model as [`ToolDescriptor`]s. The [`Driver`] runs the
//! loop: request a completion, dispatch any tool call the model makes, feed
//! the serialized result back (or an overflow notice when it is too large),
//! and repeat until the model answers in plain text.

pub mod budget;
mod driver;
mod message;
mod provider;
mod registry;
pub mod schema;
pub mod serialize;
mod table;

pub use budget::{estimate_tokens, TokenBudget};
pub use driver::{Driver, DriverConfig};
pub use message::{Message, Role, ToolCallRequest};
pub use provider::{Completion, CompletionProvider, OpenAIProvider};
pub use registry::{
    decode_arguments, typed_arguments, AnalysisContext, AnalysisTool, DataTool, Handler,
    PendingToolCall, ToolRegistry,
};
pub use schema::{describe, Annotated, ParamType, ScalarType, ToolDescriptor, ToolSpec, TypeHint};
pub use serialize::{serialize_output, SerializedResult, EMPTY_TABLE_MARKER};
pub use table::{display_cell, Table, ToolOutput};
