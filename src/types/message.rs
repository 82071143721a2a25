//! Prompt format: ordered conversation turns discriminated by `role`.

use serde::{Deserialize, Serialize};

use super::tool::{ToolCallPart, ToolResultPart};
use crate::error::{Error, ErrorContext};

/// Ordered conversation turns sent to a model.
pub type Prompt = Vec<PromptMessage>;

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum PromptMessage {
    System { content: String },
    User { content: Vec<UserPart> },
    Assistant { content: Vec<AssistantPart> },
    Tool { content: Vec<ToolResultPart> },
}

impl PromptMessage {
    pub fn system(text: impl Into<String>) -> Self {
        PromptMessage::System {
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        PromptMessage::User {
            content: vec![UserPart::Text { text: text.into() }],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        PromptMessage::Assistant {
            content: vec![AssistantPart::Text { text: text.into() }],
        }
    }

    pub fn assistant_tool_call(call: ToolCallPart) -> Self {
        PromptMessage::Assistant {
            content: vec![AssistantPart::ToolCall(call)],
        }
    }

    pub fn tool_result(result: ToolResultPart) -> Self {
        PromptMessage::Tool {
            content: vec![result],
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            PromptMessage::System { .. } => "system",
            PromptMessage::User { .. } => "user",
            PromptMessage::Assistant { .. } => "assistant",
            PromptMessage::Tool { .. } => "tool",
        }
    }
}

/// Content of a user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UserPart {
    Text { text: String },
    File(FilePart),
}

/// Content of an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AssistantPart {
    Text { text: String },
    File(FilePart),
    Reasoning { text: String },
    ToolCall(ToolCallPart),
    ToolResult(ToolResultPart),
}

/// File attachment, either inline base64 data or a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePart {
    pub data: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Parse a prompt from untyped JSON.
///
/// Every turn must carry a string `role`; a missing or unknown discriminator
/// is rejected instead of being silently mapped to some other shape.
pub fn parse_prompt(value: serde_json::Value) -> crate::Result<Prompt> {
    let turns = match value {
        serde_json::Value::Array(turns) => turns,
        other => {
            return Err(Error::validation_with_context(
                "prompt must be an array of turns",
                ErrorContext::new()
                    .with_details(format!("got {}", json_kind(&other)))
                    .with_source("prompt_parser"),
            ))
        }
    };

    let mut prompt = Vec::with_capacity(turns.len());
    for (i, turn) in turns.into_iter().enumerate() {
        if !turn.get("role").map(|r| r.is_string()).unwrap_or(false) {
            return Err(Error::validation_with_context(
                "turn is missing its role discriminator",
                ErrorContext::new()
                    .with_field_path(format!("prompt[{}].role", i))
                    .with_source("prompt_parser"),
            ));
        }
        let message: PromptMessage = serde_json::from_value(turn).map_err(|e| {
            Error::validation_with_context(
                "malformed prompt turn",
                ErrorContext::new()
                    .with_field_path(format!("prompt[{}]", i))
                    .with_details(e.to_string())
                    .with_source("prompt_parser"),
            )
        })?;
        prompt.push(message);
    }
    Ok(prompt)
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_format_uses_role_and_type_tags() {
        let msg = PromptMessage::assistant_tool_call(ToolCallPart::new(
            "call_42",
            "createCanvasNode",
            json!({"title": "Moodboard"}),
        ));
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            v,
            json!({
                "role": "assistant",
                "content": [{
                    "type": "tool-call",
                    "toolCallId": "call_42",
                    "toolName": "createCanvasNode",
                    "input": {"title": "Moodboard"}
                }]
            })
        );
    }

    #[test]
    fn parse_prompt_accepts_every_role() {
        let prompt = parse_prompt(json!([
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": [{"type": "text", "text": "hi"}]},
            {"role": "assistant", "content": [{"type": "reasoning", "text": "hmm"}]},
            {"role": "tool", "content": [{
                "toolCallId": "c1", "toolName": "webSearch", "output": {"hits": 3}
            }]}
        ]))
        .unwrap();
        let roles: Vec<_> = prompt.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
    }

    #[test]
    fn parse_prompt_rejects_missing_role() {
        let err = parse_prompt(json!([
            {"role": "system", "content": "x"},
            {"content": "no role here"}
        ]))
        .unwrap_err();
        match err {
            Error::Validation { context, .. } => {
                assert_eq!(context.field_path.as_deref(), Some("prompt[1].role"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_prompt_rejects_unknown_role() {
        let err = parse_prompt(json!([{"role": "narrator", "content": "x"}])).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn parse_prompt_rejects_non_array() {
        let err = parse_prompt(json!({"role": "user"})).unwrap_err();
        assert!(err.to_string().contains("got object"));
    }
}
