//! Environment-driven cache settings.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `LM_CACHE` | caching on/off (boolean-like) | on |
//! | `APP_ENV` / `NODE_ENV` | `production` disables caching | unset |
//! | `LM_CACHE_PATH` | cache file | `.cache/ai-cache.json` |
//! | `LM_CACHE_CHUNK_DELAY_MS` | replay inter-part delay | 10 |
//! | `LM_CACHE_SINGLE_FLIGHT` | serialize identical unary misses | off |
//! | `LM_TRACE_CALLS` | log every model call | off |

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{CacheConfig, DEFAULT_CACHE_FILE, DEFAULT_CHUNK_DELAY};
use crate::error::{Error, ErrorContext};
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub environment: Option<String>,
    pub path: PathBuf,
    pub chunk_delay: Duration,
    pub single_flight: bool,
    pub trace_calls: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            environment: None,
            path: PathBuf::from(DEFAULT_CACHE_FILE),
            chunk_delay: DEFAULT_CHUNK_DELAY,
            single_flight: false,
            trace_calls: false,
        }
    }
}

impl CacheSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(v) = lookup("LM_CACHE") {
            settings.enabled = parse_flag("LM_CACHE", &v)?;
        }
        let non_empty = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        settings.environment = non_empty("APP_ENV").or_else(|| non_empty("NODE_ENV"));
        if let Some(v) = lookup("LM_CACHE_PATH").filter(|s| !s.trim().is_empty()) {
            settings.path = PathBuf::from(v.trim());
        }
        if let Some(v) = lookup("LM_CACHE_CHUNK_DELAY_MS") {
            let ms = v.trim().parse::<u64>().map_err(|e| {
                Error::configuration_with_context(
                    "expected a whole number of milliseconds",
                    ErrorContext::new()
                        .with_field_path("LM_CACHE_CHUNK_DELAY_MS")
                        .with_details(format!("'{}': {}", v, e))
                        .with_source("cache_settings"),
                )
            })?;
            settings.chunk_delay = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("LM_CACHE_SINGLE_FLIGHT") {
            settings.single_flight = parse_flag("LM_CACHE_SINGLE_FLIGHT", &v)?;
        }
        if let Some(v) = lookup("LM_TRACE_CALLS") {
            settings.trace_calls = parse_flag("LM_TRACE_CALLS", &v)?;
        }
        Ok(settings)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
    pub fn with_environment(mut self, env: impl Into<String>) -> Self {
        self.environment = Some(env.into());
        self
    }
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }
    pub fn with_single_flight(mut self, on: bool) -> Self {
        self.single_flight = on;
        self
    }
    pub fn with_trace_calls(mut self, on: bool) -> Self {
        self.trace_calls = on;
        self
    }

    pub fn is_production(&self) -> bool {
        self.environment
            .as_deref()
            .map(|e| e.eq_ignore_ascii_case("production"))
            .unwrap_or(false)
    }

    /// Caching runs only outside production and when enabled.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.is_production()
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_enabled(self.is_active())
            .with_single_flight(self.single_flight)
            .with_replay_delays(Duration::ZERO, self.chunk_delay)
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::configuration_with_context(
            "expected a boolean-like value",
            ErrorContext::new()
                .with_field_path(name)
                .with_details(format!("'{}'", raw))
                .with_source("cache_settings"),
        )),
    }
}
