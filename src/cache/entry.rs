//! Persisted cache payloads.

use serde::{Deserialize, Serialize};

use super::key::CallKind;
use crate::model::StreamResponse;
use crate::types::{GenerateResult, RequestMetadata, StreamPart};

/// A cached response, tagged with the call kind that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CacheEntry {
    Generate(GenerateResult),
    Stream(StreamEntry),
}

impl CacheEntry {
    pub fn kind(&self) -> CallKind {
        match self {
            CacheEntry::Generate(_) => CallKind::Generate,
            CacheEntry::Stream(_) => CallKind::Stream,
        }
    }

    /// Decode a stored value, requiring it to have the expected shape.
    pub fn decode(value: serde_json::Value, expected: CallKind) -> crate::Result<Self> {
        let entry: CacheEntry = serde_json::from_value(value)?;
        if entry.kind() != expected {
            return Err(crate::Error::validation(format!(
                "cached entry is a {} payload, expected {}",
                entry.kind(),
                expected
            )));
        }
        Ok(entry)
    }

    pub fn encode(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Captured streaming response: every part in arrival order plus the
/// auxiliary fields returned with the stream handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamEntry {
    pub chunks: Vec<StreamPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<StreamResponse>,
}
