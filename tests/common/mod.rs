//! Scripted model used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use canvas_lm_cache::model::{CallOptions, LanguageModel, StreamResponse, StreamResult};
use canvas_lm_cache::types::{
    FinishReason, GenerateResult, RequestMetadata, ResponseMetadata, StreamPart, ToolCallPart,
    ToolResultPart, Usage,
};
use canvas_lm_cache::{Error, PromptMessage, Result};
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const MODEL_ID: &str = "gemini-3-flash-preview";

/// How the scripted stream should end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnding {
    Clean,
    /// Yield an `Err` item after this many parts.
    ErrAfter(usize),
    /// Emit an `error` stream part at the end.
    ErrorPart,
}

pub struct ScriptedModel {
    pub generate_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    fail: AtomicBool,
    latency: Option<Duration>,
    ending: StreamEnding,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            generate_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            latency: None,
            ending: StreamEnding::Clean,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_ending(mut self, ending: StreamEnding) -> Self {
        self.ending = ending;
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn stream_count(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    async fn maybe_wait(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

pub fn fixed_timestamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap()
}

/// The parts every clean scripted stream emits.
pub fn scripted_parts() -> Vec<StreamPart> {
    vec![
        StreamPart::StreamStart { warnings: vec![] },
        StreamPart::ResponseMetadata(ResponseMetadata {
            id: Some("resp_stream".into()),
            timestamp: Some(fixed_timestamp()),
            model_id: Some(MODEL_ID.into()),
            headers: None,
        }),
        StreamPart::TextStart { id: "t0".into() },
        StreamPart::text_delta("t0", "Tides "),
        StreamPart::text_delta("t0", "follow "),
        StreamPart::text_delta("t0", "the moon."),
        StreamPart::TextEnd { id: "t0".into() },
        StreamPart::Finish {
            finish_reason: FinishReason::Stop,
            usage: Usage {
                input_tokens: Some(12),
                output_tokens: Some(5),
                total_tokens: Some(17),
            },
        },
    ]
}

pub fn scripted_reply() -> GenerateResult {
    let mut reply = GenerateResult::text("Tides follow the moon.");
    reply.usage = Usage {
        input_tokens: Some(12),
        output_tokens: Some(5),
        total_tokens: Some(17),
    };
    reply.response = Some(ResponseMetadata {
        id: Some("resp_unary".into()),
        timestamp: Some(fixed_timestamp()),
        model_id: Some(MODEL_ID.into()),
        headers: None,
    });
    reply
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn provider(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        MODEL_ID
    }

    async fn do_generate(&self, _options: CallOptions) -> Result<GenerateResult> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_wait().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::upstream("provider returned HTTP 503"));
        }
        Ok(scripted_reply())
    }

    async fn do_stream(&self, _options: CallOptions) -> Result<StreamResult> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_wait().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::upstream("provider returned HTTP 503"));
        }

        let mut items: Vec<Result<StreamPart>> = scripted_parts().into_iter().map(Ok).collect();
        match self.ending {
            StreamEnding::Clean => {}
            StreamEnding::ErrAfter(n) => {
                items.truncate(n);
                items.push(Err(Error::upstream("connection reset")));
            }
            StreamEnding::ErrorPart => {
                items.push(Ok(StreamPart::Error {
                    error: serde_json::json!({"message": "quota exceeded"}),
                }));
            }
        }

        let mut headers = BTreeMap::new();
        headers.insert("x-request-id".to_string(), "req-1".to_string());
        Ok(StreamResult {
            stream: Box::pin(futures::stream::iter(items)),
            request: Some(RequestMetadata {
                body: Some(serde_json::json!({"stream": true})),
            }),
            response: Some(StreamResponse {
                headers: Some(headers),
            }),
        })
    }
}

/// A canvas-agent conversation with one tool round trip; `call_id` and
/// `output` are the parts that change from run to run.
pub fn agent_conversation(call_id: &str, output: serde_json::Value) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system("You help the user build a canvas."),
        PromptMessage::user("Create a research node about tides"),
        PromptMessage::assistant_tool_call(ToolCallPart::new(
            call_id,
            "createResearchNode",
            serde_json::json!({"topic": "tides"}),
        )),
        PromptMessage::tool_result(ToolResultPart::new(call_id, "createResearchNode", output)),
    ]
}
