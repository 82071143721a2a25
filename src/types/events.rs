//! Stream parts emitted by a streaming model call.

use serde::{Deserialize, Serialize};

use super::response::{CallWarning, FinishReason, ResponseMetadata, Usage};
use super::tool::ToolCallPart;

/// One element of a streaming response, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamPart {
    StreamStart {
        #[serde(default)]
        warnings: Vec<CallWarning>,
    },

    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },

    ReasoningStart {
        id: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    ReasoningEnd {
        id: String,
    },

    #[serde(rename_all = "camelCase")]
    ToolInputStart {
        id: String,
        tool_name: String,
    },
    ToolInputDelta {
        id: String,
        delta: String,
    },
    ToolInputEnd {
        id: String,
    },
    ToolCall(ToolCallPart),

    /// Carries a timestamp that is reconstituted on replay.
    ResponseMetadata(ResponseMetadata),

    #[serde(rename_all = "camelCase")]
    Finish {
        finish_reason: FinishReason,
        #[serde(default)]
        usage: Usage,
    },

    Error {
        error: serde_json::Value,
    },

    #[serde(rename_all = "camelCase")]
    Raw {
        raw_value: serde_json::Value,
    },
}

impl StreamPart {
    pub fn text_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        StreamPart::TextDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StreamPart::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn response_metadata_part_round_trips_timestamp() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let part = StreamPart::ResponseMetadata(ResponseMetadata {
            id: Some("r1".into()),
            timestamp: Some(ts),
            model_id: None,
            headers: None,
        });
        let v = serde_json::to_value(&part).unwrap();
        assert_eq!(
            v,
            json!({"type": "response-metadata", "id": "r1", "timestamp": "2025-01-02T03:04:05Z"})
        );
        let back: StreamPart = serde_json::from_value(v).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn finish_part_wire_names() {
        let part = StreamPart::Finish {
            finish_reason: FinishReason::ToolCalls,
            usage: Usage {
                input_tokens: Some(10),
                output_tokens: Some(4),
                total_tokens: Some(14),
            },
        };
        let v = serde_json::to_value(&part).unwrap();
        assert_eq!(v["type"], "finish");
        assert_eq!(v["finishReason"], "tool-calls");
        assert_eq!(v["usage"]["totalTokens"], 14);
    }
}
