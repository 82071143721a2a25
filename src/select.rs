//! Pick the model the application should call, based on [`CacheSettings`].

use std::sync::Arc;
use tracing::info;

use crate::cache::{CacheManager, JsonFileStore};
use crate::config::CacheSettings;
use crate::middleware::{cached, wrap_language_model, LoggingMiddleware};
use crate::model::LanguageModel;

/// The model to hand to callers, plus the cache behind it (if any) so that
/// pending writes can be drained at shutdown.
pub struct ModelSelection {
    pub model: Arc<dyn LanguageModel>,
    pub cache: Option<Arc<CacheManager>>,
}

impl ModelSelection {
    /// Wait for outstanding cache writes.
    pub async fn shutdown(&self) {
        if let Some(cache) = &self.cache {
            cache.flush().await;
        }
    }
}

/// - production: `base` unchanged, nothing else applied
/// - caching enabled: `base` behind the shared file cache at
///   `settings.path`
/// - caching disabled: `base`
///
/// Outside production, `trace_calls` adds call logging on top.
pub fn select_model(base: Arc<dyn LanguageModel>, settings: &CacheSettings) -> ModelSelection {
    if settings.is_production() {
        return ModelSelection {
            model: base,
            cache: None,
        };
    }

    let mut model = base;
    let mut cache = None;
    if settings.enabled {
        let manager = Arc::new(CacheManager::new(
            settings.cache_config(),
            JsonFileStore::shared(&settings.path),
        ));
        info!(path = %settings.path.display(), model = model.model_id(), "response cache enabled");
        model = Arc::new(cached(model, manager.clone()));
        cache = Some(manager);
    }
    if settings.trace_calls {
        model = Arc::new(wrap_language_model(
            model,
            Arc::new(LoggingMiddleware::new()),
        ));
    }

    ModelSelection { model, cache }
}
