//! Configuration system for benchmark runs
//!
//! Configuration is a plain value: it is loaded (or built from a preset) once,
//! validated, and moved into the harness. Nothing here is global.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{BenchError, BenchResult, ErrorContext};
use crate::stats::Statistic;
use crate::types::{Area, Sizing};

/// Amount the generated container is shrunk relative to the root, per dimension.
pub const CONTAINER_INSET: f32 = 10.0;

/// Top-level configuration for a benchmark invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Layout surface settings
    pub surface: SurfaceConfig,
    /// The benchmark itself
    pub benchmark: BenchConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used for any category without an explicit entry
    pub default_level: String,
    /// Category-specific log levels (category name -> level string)
    pub category_levels: BTreeMap<String, String>,
    /// Rate limiting window in seconds for per-round progress lines
    pub rate_limit_seconds: u64,
    /// Maximum number of progress lines per window
    pub max_rate_limit_count: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut category_levels = BTreeMap::new();
        category_levels.insert("core".to_string(), "info".to_string());
        category_levels.insert("surface".to_string(), "warn".to_string()); // Per-pass traces are noisy
        category_levels.insert("harness".to_string(), "info".to_string());
        category_levels.insert("report".to_string(), "info".to_string());
        category_levels.insert("cli".to_string(), "info".to_string());

        Self {
            default_level: "info".to_string(),
            category_levels,
            rate_limit_seconds: 5,
            max_rate_limit_count: 10,
        }
    }
}

/// Layout surface configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Interval between frame ticks; a dirty surface lays out on the next tick
    pub frame_interval_ms: u64,
}

impl SurfaceConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.frame_interval_ms == 0 {
            return Err(BenchError::configuration_with_context(
                "frame interval must be positive",
                ErrorContext::new("validate", "surface_config").with_metadata("frame_interval_ms", 0),
            ));
        }
        Ok(())
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
        }
    }
}

/// Shape of the generated node tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeShape {
    /// `count` same-sized leaves directly under one container
    Flat { count: usize, leaf_size: f32 },
    /// Balanced tree with `branching` children per node over `levels` levels
    Tree { levels: u32, branching: u32 },
}

impl TreeShape {
    /// Number of sampling candidates this shape produces, or `None` on overflow.
    ///
    /// Trees count every node below the container: `B + B^2 + ... + B^L`.
    pub fn candidate_count(&self) -> Option<usize> {
        match *self {
            TreeShape::Flat { count, .. } => Some(count),
            TreeShape::Tree { levels, branching } => {
                let branching = usize::try_from(branching).ok()?;
                let mut level_size = 1usize;
                let mut total = 0usize;
                for _ in 0..levels {
                    level_size = level_size.checked_mul(branching)?;
                    total = total.checked_add(level_size)?;
                }
                Some(total)
            }
        }
    }
}

/// Delay policy between rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayPolicy {
    /// Wait `delay_ms` before every round
    Fixed { delay_ms: u64 },
    /// Run warm-up rounds, then wait the mean warm-up round trip: the round
    /// statistic times `estimate_multiplier`, plus the root setup time
    Calibrated {
        warmup_rounds: u32,
        warmup_delay_ms: u64,
    },
}

impl DelayPolicy {
    pub fn warmup_rounds(&self) -> u32 {
        match *self {
            DelayPolicy::Fixed { .. } => 0,
            DelayPolicy::Calibrated { warmup_rounds, .. } => warmup_rounds,
        }
    }

    /// Delay before the first round of the run.
    pub fn initial_delay(&self) -> Duration {
        match *self {
            DelayPolicy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            DelayPolicy::Calibrated {
                warmup_delay_ms, ..
            } => Duration::from_millis(warmup_delay_ms),
        }
    }
}

/// What happens when a round does not receive all of its samples in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Fail the run with `BenchError::SampleTimeout`
    #[default]
    Abort,
    /// Record the round as timed out and continue with the next one
    Skip,
}

/// Immutable description of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Display name used in reports
    pub name: String,
    pub shape: TreeShape,
    /// Sizing of the container and interior nodes (leaves are always fixed)
    pub sizing: Sizing,
    pub area: Area,
    /// Number of measured rounds
    pub rounds: u32,
    /// Nodes shifted per round (M)
    pub nodes_to_change: usize,
    /// Nodes timed per round (P <= M)
    pub samples_to_take: usize,
    /// Minimum distance a node is shifted
    pub offset_min: f32,
    /// Variability above the minimum shift
    pub offset_spread: f32,
    /// Magnitude of the root resize toggle
    pub root_offset: f32,
    pub delay: DelayPolicy,
    /// Upper bound on waiting for a round's notifications
    pub sample_timeout_ms: u64,
    pub timeout_policy: TimeoutPolicy,
    /// Statistic over a round's samples
    pub round_statistic: Statistic,
    /// Statistic over all measured rounds
    pub aggregate_statistic: Statistic,
    /// Factor applied to the final aggregate (2.0 gives a round-trip estimate)
    pub estimate_multiplier: f64,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            name: "Wide and Shallow".to_string(),
            shape: TreeShape::Flat {
                count: 1000,
                leaf_size: 20.0,
            },
            sizing: Sizing::Fixed,
            area: Area::default(),
            rounds: 1000,
            nodes_to_change: 100,
            samples_to_take: 1,
            offset_min: 10.0,
            offset_spread: 20.0,
            root_offset: 5.0,
            delay: DelayPolicy::Fixed { delay_ms: 250 },
            sample_timeout_ms: 5_000,
            timeout_policy: TimeoutPolicy::Abort,
            round_statistic: Statistic::Median,
            aggregate_statistic: Statistic::Median,
            estimate_multiplier: 1.0,
            seed: None,
        }
    }
}

fn reject(message: &str, field: &str, value: impl ToString) -> BenchError {
    BenchError::configuration_with_context(
        message,
        ErrorContext::new("validate", "bench_config").with_metadata(field, value),
    )
}

impl BenchConfig {
    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> BenchResult<()> {
        match self.shape {
            TreeShape::Flat { count, leaf_size } => {
                if count == 0 {
                    return Err(reject("element count must be positive", "count", count));
                }
                if !leaf_size.is_finite() || leaf_size <= 0.0 {
                    return Err(reject("leaf size must be positive", "leaf_size", leaf_size));
                }
            }
            TreeShape::Tree { levels, branching } => {
                if levels == 0 {
                    return Err(reject("tree levels must be positive", "levels", levels));
                }
                if branching == 0 {
                    return Err(reject(
                        "branching factor must be positive",
                        "branching",
                        branching,
                    ));
                }
            }
        }

        let candidates = self.shape.candidate_count().ok_or_else(|| {
            reject(
                "tree is too large to generate",
                "shape",
                format!("{:?}", self.shape),
            )
        })?;

        if !self.area.is_valid() {
            return Err(reject(
                "area must be finite and positive",
                "area",
                format!("{}x{}", self.area.width, self.area.height),
            ));
        }
        let inner = self.area.inset(CONTAINER_INSET);
        if !inner.is_valid() {
            return Err(reject(
                "area leaves no room for the container",
                "area",
                format!("{}x{}", self.area.width, self.area.height),
            ));
        }
        if let TreeShape::Flat { leaf_size, .. } = self.shape {
            // Leaves are placed at floor(random * (container - leaf))
            if leaf_size > inner.width || leaf_size > inner.height {
                return Err(BenchError::configuration_with_context(
                    "leaf size exceeds the container",
                    ErrorContext::new("validate", "bench_config")
                        .with_metadata("leaf_size", leaf_size)
                        .with_metadata("container", format!("{}x{}", inner.width, inner.height)),
                ));
            }
        }
        if self.rounds == 0 {
            return Err(reject("round count must be positive", "rounds", self.rounds));
        }
        if self.nodes_to_change == 0 {
            return Err(reject(
                "nodes to change must be positive",
                "nodes_to_change",
                self.nodes_to_change,
            ));
        }
        if self.nodes_to_change > candidates {
            return Err(BenchError::configuration_with_context(
                "nodes to change exceeds the candidate pool",
                ErrorContext::new("validate", "bench_config")
                    .with_metadata("nodes_to_change", self.nodes_to_change)
                    .with_metadata("candidates", candidates),
            ));
        }
        if self.samples_to_take == 0 {
            return Err(reject(
                "samples to take must be positive",
                "samples_to_take",
                self.samples_to_take,
            ));
        }
        if self.samples_to_take > self.nodes_to_change {
            return Err(BenchError::configuration_with_context(
                "samples to take exceeds nodes to change",
                ErrorContext::new("validate", "bench_config")
                    .with_metadata("samples_to_take", self.samples_to_take)
                    .with_metadata("nodes_to_change", self.nodes_to_change),
            ));
        }
        // Positions are floored after each shift, so smaller shifts may not move a node
        if !self.offset_min.is_finite() || self.offset_min < 1.0 {
            return Err(reject(
                "offset minimum must be at least one unit",
                "offset_min",
                self.offset_min,
            ));
        }
        if !self.offset_spread.is_finite() || self.offset_spread <= 0.0 {
            return Err(reject(
                "offset spread must be positive",
                "offset_spread",
                self.offset_spread,
            ));
        }
        if !self.root_offset.is_finite() || self.root_offset < 0.0 {
            return Err(reject(
                "root offset must be non-negative",
                "root_offset",
                self.root_offset,
            ));
        }
        if let DelayPolicy::Calibrated { warmup_rounds, .. } = self.delay {
            if warmup_rounds == 0 {
                return Err(reject(
                    "calibrated delay needs at least one warm-up round",
                    "warmup_rounds",
                    warmup_rounds,
                ));
            }
        }
        if self.sample_timeout_ms == 0 {
            return Err(reject(
                "sample timeout must be positive",
                "sample_timeout_ms",
                self.sample_timeout_ms,
            ));
        }
        if !self.estimate_multiplier.is_finite() || self.estimate_multiplier <= 0.0 {
            return Err(reject(
                "estimate multiplier must be positive",
                "estimate_multiplier",
                self.estimate_multiplier,
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Validate every section.
    pub fn validate(&self) -> BenchResult<()> {
        self.surface.validate()?;
        self.benchmark.validate()
    }

    /// Parse a RON document.
    pub fn from_ron_str(source: &str) -> BenchResult<Self> {
        ron::from_str(source).map_err(BenchError::serialization)
    }

    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> BenchResult<Self> {
        serde_json::from_str(source).map_err(BenchError::serialization)
    }

    /// Load a configuration file, picking the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> BenchResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Self::from_ron_str(&source),
            Some("json") => Self::from_json_str(&source),
            other => Err(BenchError::configuration_with_context(
                "unsupported configuration format (expected .ron or .json)",
                ErrorContext::new("load", "app_config")
                    .with_metadata("path", path.display())
                    .with_metadata("extension", other.unwrap_or("")),
            )),
        }
    }

    /// Render as pretty RON, e.g. to seed a config file from a preset.
    pub fn to_ron_string(&self) -> BenchResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(BenchError::serialization)
    }
}
