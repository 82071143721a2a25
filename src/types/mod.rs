//! # Types Module
//!
//! Strongly-typed representations of everything that crosses the model
//! invocation boundary: the prompt sent to a model, the parts a streaming
//! call emits, and the result of a unary call.
//!
//! All types serialize with the camelCase / kebab-case wire names used by the
//! canvas agent so that persisted cache files stay human-readable and stable.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Prompt`] | Ordered conversation turns |
//! | [`PromptMessage`] | One turn, discriminated by `role` |
//! | [`StreamPart`] | One element of a streaming response |
//! | [`GenerateResult`] | Result of a unary call |
//! | [`ToolCallPart`] | Tool invocation requested by the model |
//! | [`ToolResultPart`] | Result of a tool invocation fed back to the model |
//!
//! ## Example
//!
//! ```rust
//! use canvas_lm_cache::types::{PromptMessage, ToolCallPart};
//!
//! let prompt = vec![
//!     PromptMessage::system("You are a creative assistant"),
//!     PromptMessage::user("Find a picture of a lighthouse"),
//!     PromptMessage::assistant_tool_call(ToolCallPart::new(
//!         "call_1",
//!         "webSearch",
//!         serde_json::json!({"query": "lighthouse"}),
//!     )),
//! ];
//! assert_eq!(prompt.len(), 3);
//! ```

pub mod events;
pub mod message;
pub mod response;
pub mod tool;

pub use events::StreamPart;
pub use message::{parse_prompt, AssistantPart, FilePart, Prompt, PromptMessage, UserPart};
pub use response::{
    CallWarning, ContentPart, FinishReason, GenerateResult, RequestMetadata, ResponseMetadata,
    Usage,
};
pub use tool::{ToolCallPart, ToolDefinition, ToolResultPart};
