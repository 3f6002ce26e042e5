//! Core functionality for the Strato layout benchmark suite
//!
//! This crate provides the pieces shared by layout surfaces and the
//! benchmark harness: geometry and node description types, the error
//! taxonomy, run configuration, logging setup and sample statistics.

pub mod config;
pub mod error;
pub mod logging;
pub mod stats;
pub mod types;

pub use config::{
    AppConfig, BenchConfig, DelayPolicy, LoggingConfig, SurfaceConfig, TimeoutPolicy, TreeShape,
};
pub use error::{BenchError, BenchResult, ErrorContext, SurfaceError, SurfaceResult};
pub use logging::{LogCategory, LogLevel, RateLimiter};
pub use stats::{lower_median, mean, RunStatistics, Statistic};
pub use types::{Area, Color, Geometry, NodeHandle, NodeProps, Sizing};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        config::{AppConfig, BenchConfig, DelayPolicy, TimeoutPolicy, TreeShape},
        error::{BenchError, BenchResult, SurfaceError, SurfaceResult},
        stats::Statistic,
        types::{Area, Geometry, NodeHandle, NodeProps, Sizing},
    };
}

/// Suite version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
