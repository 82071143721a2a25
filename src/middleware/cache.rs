//! Record/replay caching of model calls.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use super::replay::simulate_stream;
use super::{wrap_language_model, DoGenerate, DoStream, LanguageModelMiddleware, WrappedModel};
use crate::cache::{CacheEntry, CacheKey, CacheManager, CallKind, StreamEntry};
use crate::model::{CallOptions, LanguageModel, StreamResponse, StreamResult};
use crate::types::{GenerateResult, RequestMetadata, StreamPart};
use crate::{BoxStream, Result};

/// Serves repeated calls from a [`CacheManager`] instead of the model.
///
/// Unary hits return the recorded result. Streaming hits replay the recorded
/// parts with synthetic pacing. Misses call through, hand the live result to
/// the caller unchanged and record it on the side. Failed calls are never
/// recorded.
pub struct CacheMiddleware {
    manager: Arc<CacheManager>,
}

impl CacheMiddleware {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<CacheManager> {
        &self.manager
    }
}

/// Wrap `model` so its calls go through the response cache.
pub fn cached(model: Arc<dyn LanguageModel>, manager: Arc<CacheManager>) -> WrappedModel {
    wrap_language_model(model, Arc::new(CacheMiddleware::new(manager)))
}

#[async_trait]
impl LanguageModelMiddleware for CacheMiddleware {
    async fn wrap_generate(
        &self,
        do_generate: DoGenerate<'_>,
        params: &CallOptions,
        model: &dyn LanguageModel,
    ) -> Result<GenerateResult> {
        if !self.manager.is_enabled() {
            return do_generate().await;
        }

        let key = CacheKey::for_call(&params.prompt, model.model_id(), CallKind::Generate);
        let _flight = self.manager.claim(&key).await;

        if let Some(CacheEntry::Generate(result)) = self.manager.lookup(&key).await {
            debug!(key = %key, "serving generate call from cache");
            return Ok(result);
        }

        let result = do_generate().await?;
        self.manager.persist(&key, CacheEntry::Generate(result.clone()));
        Ok(result)
    }

    async fn wrap_stream(
        &self,
        do_stream: DoStream<'_>,
        params: &CallOptions,
        model: &dyn LanguageModel,
    ) -> Result<StreamResult> {
        if !self.manager.is_enabled() {
            return do_stream().await;
        }

        let key = CacheKey::for_call(&params.prompt, model.model_id(), CallKind::Stream);

        if let Some(CacheEntry::Stream(entry)) = self.manager.lookup(&key).await {
            debug!(key = %key, parts = entry.chunks.len(), "replaying stream from cache");
            let config = self.manager.config();
            return Ok(StreamResult {
                stream: simulate_stream(
                    entry.chunks,
                    config.replay_initial_delay,
                    config.replay_chunk_delay,
                ),
                request: entry.request,
                response: entry.response,
            });
        }

        let StreamResult {
            stream,
            request,
            response,
        } = do_stream().await?;
        let recorder = Recorder {
            manager: self.manager.clone(),
            key,
            request: request.clone(),
            response: response.clone(),
        };
        Ok(StreamResult {
            stream: recorder.tap(stream),
            request,
            response,
        })
    }

    fn name(&self) -> &str {
        "cache"
    }
}

/// Captures a live stream and records it once upstream completes.
struct Recorder {
    manager: Arc<CacheManager>,
    key: CacheKey,
    request: Option<RequestMetadata>,
    response: Option<StreamResponse>,
}

struct TapState {
    input: BoxStream<'static, StreamPart>,
    captured: Vec<StreamPart>,
    failed: bool,
    recorder: Option<Recorder>,
}

impl Recorder {
    /// Forward every item of `input` unchanged while keeping a copy. A
    /// capture is recorded only when the stream runs to its end without an
    /// error; a consumer that stops early discards it.
    fn tap(self, input: BoxStream<'static, StreamPart>) -> BoxStream<'static, StreamPart> {
        let state = TapState {
            input,
            captured: Vec::new(),
            failed: false,
            recorder: Some(self),
        };
        let tapped = stream::unfold(state, |mut st| async move {
            match st.input.next().await {
                Some(Ok(part)) => {
                    st.failed |= part.is_error();
                    st.captured.push(part.clone());
                    Some((Ok(part), st))
                }
                Some(Err(e)) => {
                    st.failed = true;
                    Some((Err(e), st))
                }
                None => {
                    if let Some(recorder) = st.recorder.take() {
                        recorder
                            .finish(std::mem::take(&mut st.captured), st.failed)
                            .await;
                    }
                    None
                }
            }
        });
        Box::pin(tapped.fuse())
    }

    async fn finish(self, chunks: Vec<StreamPart>, failed: bool) {
        if failed {
            warn!(key = %self.key, "stream reported an error; not caching it");
            return;
        }
        let entry = CacheEntry::Stream(StreamEntry {
            chunks,
            request: self.request,
            response: self.response,
        });
        self.manager.persist_now(&self.key, entry).await;
    }
}
