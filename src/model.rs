//! The model-call interface that middleware wraps.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Prompt, RequestMetadata, StreamPart, ToolDefinition};
use crate::{BoxStream, Result};

/// Parameters of a single model invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOptions {
    pub prompt: Prompt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl CallOptions {
    pub fn new(prompt: Prompt) -> Self {
        Self {
            prompt,
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn with_max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = Some(n);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Auxiliary response fields returned alongside a stream handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

/// Result of a streaming call: the live part stream plus non-chunk metadata.
pub struct StreamResult {
    pub stream: BoxStream<'static, StreamPart>,
    pub request: Option<RequestMetadata>,
    pub response: Option<StreamResponse>,
}

impl StreamResult {
    pub fn new(stream: BoxStream<'static, StreamPart>) -> Self {
        Self {
            stream,
            request: None,
            response: None,
        }
    }
}

impl std::fmt::Debug for StreamResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResult")
            .field("request", &self.request)
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}

/// A language model with a unary and a streaming call shape.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider name, e.g. "google".
    fn provider(&self) -> &str;

    /// Model identifier, e.g. "gemini-3-flash-preview".
    fn model_id(&self) -> &str;

    async fn do_generate(&self, options: CallOptions) -> Result<crate::types::GenerateResult>;

    async fn do_stream(&self, options: CallOptions) -> Result<StreamResult>;
}
