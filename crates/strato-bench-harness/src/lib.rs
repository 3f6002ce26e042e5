//! Sampling and statistics harness for the Strato layout benchmark suite
//!
//! The harness builds a test tree on a [`LayoutSurface`], then repeats
//! rounds of select, mutate and sample: each round shifts a random subset of
//! nodes and times how long the surface takes to report layout completion
//! for a smaller random subset of those.
//!
//! ```no_run
//! use strato_bench_core::AppConfig;
//! use strato_bench_harness::{Harness, Scenario};
//! use strato_bench_surface::TaffySurface;
//!
//! # async fn demo() -> strato_bench_core::BenchResult<()> {
//! let config = AppConfig {
//!     benchmark: Scenario::WideShallow.config(),
//!     ..Default::default()
//! };
//! let mut harness = Harness::new(config, TaffySurface::new())?;
//! let report = harness.run().await?;
//! println!("{}", report.render_text());
//! # Ok(())
//! # }
//! ```
//!
//! [`LayoutSurface`]: strato_bench_surface::LayoutSurface

pub mod aggregator;
pub mod mutator;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod selector;
pub mod tree;

pub use aggregator::{
    Aggregator, RoundPhase, RoundRecord, RunSummary, SampleProgress, TimedOutRound,
};
pub use mutator::{offset_delta, Mutator};
pub use report::RunReport;
pub use runner::Harness;
pub use scenario::Scenario;
pub use selector::{select, Selection};
pub use tree::GeneratedTree;
