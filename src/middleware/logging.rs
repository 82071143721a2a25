//! Development-time call logging.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::{DoGenerate, DoStream, LanguageModelMiddleware};
use crate::model::{CallOptions, LanguageModel, StreamResult};
use crate::types::GenerateResult;
use crate::Result;

/// Logs every call at `debug` level: model, prompt size, latency and, for
/// streams, how many parts were delivered.
#[derive(Debug, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageModelMiddleware for LoggingMiddleware {
    async fn wrap_generate(
        &self,
        do_generate: DoGenerate<'_>,
        params: &CallOptions,
        model: &dyn LanguageModel,
    ) -> Result<GenerateResult> {
        let started = Instant::now();
        match do_generate().await {
            Ok(result) => {
                debug!(
                    provider = model.provider(),
                    model = model.model_id(),
                    turns = params.prompt.len(),
                    finish_reason = ?result.finish_reason,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "generate call finished"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(model = model.model_id(), error = %e, "generate call failed");
                Err(e)
            }
        }
    }

    async fn wrap_stream(
        &self,
        do_stream: DoStream<'_>,
        params: &CallOptions,
        model: &dyn LanguageModel,
    ) -> Result<StreamResult> {
        let started = Instant::now();
        let mut result = match do_stream().await {
            Ok(result) => result,
            Err(e) => {
                warn!(model = model.model_id(), error = %e, "stream call failed");
                return Err(e);
            }
        };
        debug!(
            model = model.model_id(),
            turns = params.prompt.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stream opened"
        );

        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let model_id = model.model_id().to_string();
        let counted = result.stream.inspect(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let logged = counted.chain(futures::stream::poll_fn(move |_| {
            debug!(
                model = %model_id,
                parts = count.load(Ordering::Relaxed),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "stream finished"
            );
            std::task::Poll::Ready(None)
        }));
        result.stream = Box::pin(logged.fuse());
        Ok(result)
    }

    fn name(&self) -> &str {
        "logging"
    }
}
