//! Logging setup for the benchmark suite
//!
//! All crates log through `tracing`. This module turns a [`LoggingConfig`]
//! into a `tracing_subscriber` filter with one directive per category, and
//! provides the rate limiter used to throttle per-round progress output.

use crate::config::LoggingConfig;
use crate::error::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Log levels supported by the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert LogLevel to string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(BenchError::configuration(format!(
                "unknown log level '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Log categories, one per crate of the suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogCategory {
    Core,
    Surface,
    Harness,
    Report,
    Cli,
}

impl LogCategory {
    pub const ALL: [LogCategory; 5] = [
        LogCategory::Core,
        LogCategory::Surface,
        LogCategory::Harness,
        LogCategory::Report,
        LogCategory::Cli,
    ];

    /// Convert LogCategory to string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Core => "core",
            LogCategory::Surface => "surface",
            LogCategory::Harness => "harness",
            LogCategory::Report => "report",
            LogCategory::Cli => "cli",
        }
    }

    /// `tracing` target prefix for this category.
    pub fn target(&self) -> &'static str {
        match self {
            LogCategory::Core => "strato_bench_core",
            LogCategory::Surface => "strato_bench_surface",
            LogCategory::Harness => "strato_bench_harness",
            LogCategory::Report => "strato_bench_harness::report",
            LogCategory::Cli => "strato_bench",
        }
    }

    pub fn from_name(name: &str) -> Option<LogCategory> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl std::fmt::Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build the filter directive string for a logging configuration.
///
/// Unknown category names are skipped with a warning once logging is up.
/// Invalid level strings are a configuration error.
pub fn filter_directives(config: &LoggingConfig) -> BenchResult<String> {
    let default_level = LogLevel::from_str(&config.default_level)?;
    let mut directives = vec![default_level.as_str().to_string()];
    for (name, level) in &config.category_levels {
        let level = LogLevel::from_str(level)?;
        if let Some(category) = LogCategory::from_name(name) {
            directives.push(format!("{}={}", category.target(), level));
        }
    }
    Ok(directives.join(","))
}

/// Initialize the global `tracing` subscriber.
///
/// `RUST_LOG`, when set, takes precedence over the configuration. Calling this
/// more than once keeps the first subscriber.
pub fn init(config: &LoggingConfig) -> BenchResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directives(config)?)
            .map_err(|e| BenchError::configuration(format!("invalid log filter: {}", e)))?,
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();

    for name in config.category_levels.keys() {
        if LogCategory::from_name(name).is_none() {
            tracing::warn!("Ignoring unknown log category '{}'", name);
        }
    }
    if !installed {
        tracing::debug!("Logging already initialized, keeping existing subscriber");
    }
    Ok(())
}

/// Allows at most `max_count` events per `window`.
#[derive(Debug)]
pub struct RateLimiter {
    last_reset: Instant,
    count: u32,
    max_count: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_count: u32, window: Duration) -> Self {
        Self {
            last_reset: Instant::now(),
            count: 0,
            max_count,
            window,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new(
            config.max_rate_limit_count,
            Duration::from_secs(config.rate_limit_seconds),
        )
    }

    pub fn should_allow(&mut self) -> bool {
        let now = Instant::now();

        // Reset counter if the window has passed
        if now.duration_since(self.last_reset) >= self.window {
            self.last_reset = now;
            self.count = 0;
        }

        if self.count < self.max_count {
            self.count += 1;
            true
        } else {
            false
        }
    }
}
