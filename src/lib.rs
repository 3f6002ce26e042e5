//! Strato Bench - layout latency benchmarks for StratoSDK layout surfaces
//!
//! The suite measures how long a layout surface takes to report layout
//! completion after a batch of random node mutations. It is split into
//! three crates, re-exported here:
//!
//! - [`strato_bench_core`]: geometry types, configuration, errors, logging
//!   and statistics
//! - [`strato_bench_surface`]: the layout surface trait and the Taffy-backed
//!   surface
//! - [`strato_bench_harness`]: tree generation, round sampling and reporting

pub use strato_bench_core;
pub use strato_bench_harness;
pub use strato_bench_surface;

pub mod cli;

/// Unified prelude module that exports all commonly used types
pub mod prelude {
    pub use strato_bench_core::prelude::*;
    pub use strato_bench_harness::{Harness, RunReport, Scenario};
    pub use strato_bench_surface::{FrameDriver, LayoutSurface, TaffySurface};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
