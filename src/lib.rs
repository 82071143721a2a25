//! # canvas-lm-cache
//!
//! Language-model invocation layer for the creative canvas agent, with a
//! deterministic record/replay response cache.
//!
//! ## Overview
//!
//! Agent runs re-send the same conversations over and over during
//! development. This crate wraps any [`LanguageModel`] so that a call whose
//! normalized request has been seen before is answered from a JSON file
//! instead of the provider, for both call shapes:
//!
//! - **unary** (`do_generate`): the recorded result is returned as-is
//! - **streaming** (`do_stream`): the recorded parts are replayed in order
//!   with a small delay between them, so downstream consumers cannot tell a
//!   replay from a live stream
//!
//! Tool-call ids are regenerated on every agent run and tool outputs are not
//! deterministic, so both are scrubbed before a request is hashed.
//!
//! ## Request Flow
//!
//! ```text
//! caller ─► CacheMiddleware ─► CacheKey::for_call ─► CacheManager::lookup
//!                                                      │
//!                    hit ◄────────────────────────────┤
//!     replay / return recorded result                  │ miss
//!                                                      ▼
//!                               real model ─► tap/record ─► CacheStore::set
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use canvas_lm_cache::{select_model, CacheSettings, CallOptions, LanguageModel, PromptMessage};
//! use std::sync::Arc;
//!
//! # async fn run(provider_model: Arc<dyn LanguageModel>) -> canvas_lm_cache::Result<()> {
//! let settings = CacheSettings::from_env()?;
//! let selection = select_model(provider_model, &settings);
//!
//! let options = CallOptions::new(vec![PromptMessage::user("Suggest three moodboard themes")]);
//! let result = selection.model.do_generate(options).await?;
//! println!("{}", result.text_content());
//!
//! selection.shutdown().await; // drain background cache writes
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Prompt, stream part and result types |
//! | [`model`] | The [`LanguageModel`] trait and call options |
//! | [`middleware`] | Middleware trait, cache and logging middleware |
//! | [`cache`] | Key derivation, entries, stores and the cache manager |
//! | [`config`] | Environment-driven [`CacheSettings`] |

pub mod cache;
pub mod config;
pub mod middleware;
pub mod model;
pub mod select;
pub mod types;

pub use cache::{CacheKey, CacheManager, CacheStore, CallKind, JsonFileStore};
pub use config::CacheSettings;
pub use middleware::{cached, wrap_language_model, LanguageModelMiddleware, WrappedModel};
pub use model::{CallOptions, LanguageModel, StreamResult};
pub use select::{select_model, ModelSelection};
pub use types::{GenerateResult, PromptMessage, StreamPart};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
