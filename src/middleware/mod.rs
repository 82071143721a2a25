//! Model middleware.
//!
//! A middleware sits between a caller and a [`LanguageModel`] and sees both
//! call shapes. It receives a one-shot continuation that performs the real
//! call and decides whether (and how) to run it.

mod cache;
mod logging;
mod replay;

pub use cache::{cached, CacheMiddleware};
pub use logging::LoggingMiddleware;
pub use replay::simulate_stream;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

use crate::model::{CallOptions, LanguageModel, StreamResult};
use crate::types::GenerateResult;
use crate::Result;

/// Continuation that performs the wrapped unary call.
pub type DoGenerate<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Result<GenerateResult>> + Send + 'a>;

/// Continuation that performs the wrapped streaming call.
pub type DoStream<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Result<StreamResult>> + Send + 'a>;

#[async_trait]
pub trait LanguageModelMiddleware: Send + Sync {
    async fn wrap_generate(
        &self,
        do_generate: DoGenerate<'_>,
        _params: &CallOptions,
        _model: &dyn LanguageModel,
    ) -> Result<GenerateResult> {
        do_generate().await
    }

    async fn wrap_stream(
        &self,
        do_stream: DoStream<'_>,
        _params: &CallOptions,
        _model: &dyn LanguageModel,
    ) -> Result<StreamResult> {
        do_stream().await
    }

    fn name(&self) -> &str {
        "unnamed"
    }
}

/// A model whose calls are routed through a middleware. Reports the
/// provider and model id of the model it wraps.
pub struct WrappedModel {
    model: Arc<dyn LanguageModel>,
    middleware: Arc<dyn LanguageModelMiddleware>,
}

impl WrappedModel {
    pub fn inner(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    pub fn middleware_name(&self) -> &str {
        self.middleware.name()
    }
}

/// Wrap `model` with `middleware`. Nest calls to stack middleware; the
/// outermost wrapper sees a call first.
pub fn wrap_language_model(
    model: Arc<dyn LanguageModel>,
    middleware: Arc<dyn LanguageModelMiddleware>,
) -> WrappedModel {
    WrappedModel { model, middleware }
}

#[async_trait]
impl LanguageModel for WrappedModel {
    fn provider(&self) -> &str {
        self.model.provider()
    }

    fn model_id(&self) -> &str {
        self.model.model_id()
    }

    async fn do_generate(&self, options: CallOptions) -> Result<GenerateResult> {
        let model = self.model.clone();
        let forwarded = options.clone();
        let next: DoGenerate<'_> =
            Box::new(move || async move { model.do_generate(forwarded).await }.boxed());
        self.middleware
            .wrap_generate(next, &options, self.model.as_ref())
            .await
    }

    async fn do_stream(&self, options: CallOptions) -> Result<StreamResult> {
        let model = self.model.clone();
        let forwarded = options.clone();
        let next: DoStream<'_> =
            Box::new(move || async move { model.do_stream(forwarded).await }.boxed());
        self.middleware
            .wrap_stream(next, &options, self.model.as_ref())
            .await
    }
}
