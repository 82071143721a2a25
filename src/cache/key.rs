//! Cache key derivation.
//!
//! A key addresses the semantic content of a call: the conversation, the
//! model and the call kind. Tool-call ids are minted fresh by every agent run
//! and tool outputs are not guaranteed to be deterministic, so both are
//! scrubbed before hashing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::types::{AssistantPart, Prompt, PromptMessage, ToolResultPart};

/// Replaces every tool-call id in a normalized prompt.
pub const SCRUBBED_CALL_ID: &str = "cached";

/// Which call shape a key addresses. Unary and streaming entries have
/// different payloads and never share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Generate,
    Stream,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Generate => "generate",
            CallKind::Stream => "stream",
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(CallKind::Generate),
            "stream" => Ok(CallKind::Stream),
            other => Err(crate::Error::validation(format!(
                "unknown call kind '{}'",
                other
            ))),
        }
    }
}

/// Rendered as `<kind>:<model>:<sha256 hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    kind: CallKind,
    model: String,
    hash: String,
}

impl CacheKey {
    /// Derive the key of a call from its raw prompt.
    pub fn for_call(prompt: &[PromptMessage], model: &str, kind: CallKind) -> Self {
        serialize(&normalize(prompt), model, kind)
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Parse a rendered key. Returns `None` for strings this crate did not
    /// produce.
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, rest) = s.split_once(':')?;
        let kind: CallKind = kind.parse().ok()?;
        let (model, hash) = rest.rsplit_once(':')?;
        if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            key: s.to_string(),
            kind,
            model: model.to_string(),
            hash: hash.to_string(),
        })
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// Return an id-scrubbed copy of `prompt`; the input is left untouched.
///
/// - assistant turns: tool-call parts get [`SCRUBBED_CALL_ID`]
/// - tool turns: every result gets [`SCRUBBED_CALL_ID`] and an empty object
///   as output
/// - all other turns are copied as-is
pub fn normalize(prompt: &[PromptMessage]) -> Prompt {
    prompt
        .iter()
        .map(|message| match message {
            PromptMessage::Assistant { content } => PromptMessage::Assistant {
                content: content
                    .iter()
                    .map(|part| match part {
                        AssistantPart::ToolCall(call) => {
                            let mut call = call.clone();
                            call.tool_call_id = SCRUBBED_CALL_ID.to_string();
                            AssistantPart::ToolCall(call)
                        }
                        other => other.clone(),
                    })
                    .collect(),
            },
            PromptMessage::Tool { content } => PromptMessage::Tool {
                content: content
                    .iter()
                    .map(|result| ToolResultPart {
                        tool_call_id: SCRUBBED_CALL_ID.to_string(),
                        tool_name: result.tool_name.clone(),
                        output: Value::Object(Map::new()),
                    })
                    .collect(),
            },
            other => other.clone(),
        })
        .collect()
}

#[derive(Serialize)]
struct NormalizedRequest<'a> {
    prompt: &'a [PromptMessage],
    #[serde(rename = "_function")]
    function: CallKind,
    model: &'a str,
}

/// Hash a normalized prompt together with the model and call kind.
pub fn serialize(normalized: &[PromptMessage], model: &str, kind: CallKind) -> CacheKey {
    let hash = content_hash(&canonical_json(normalized, model, kind));
    CacheKey {
        key: format!("{}:{}:{}", kind, model, hash),
        kind,
        model: model.to_string(),
        hash,
    }
}

/// Canonical encoding of a request: object keys sorted at every level, so
/// the result does not depend on field or insertion order.
pub fn canonical_json(normalized: &[PromptMessage], model: &str, kind: CallKind) -> String {
    let request = NormalizedRequest {
        prompt: normalized,
        function: kind,
        model,
    };
    // Serializing plain data structs into a Value cannot fail.
    let value = serde_json::to_value(&request).unwrap_or(Value::Null);
    sorted(value).to_string()
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

fn content_hash(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
