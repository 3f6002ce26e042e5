//! Preset benchmark scenarios

use std::fmt;
use std::str::FromStr;
use strato_bench_core::{BenchConfig, BenchError, DelayPolicy, Sizing, Statistic, TreeShape};

/// The four classic layout workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Many siblings under one container
    WideShallow,
    /// Deep balanced tree
    NarrowDeep,
    /// Deep tree where interior nodes size to their content
    SizeStress,
    /// Deep tree where interior nodes fill their parent
    FillStress,
}

impl Scenario {
    pub fn all() -> &'static [Scenario] {
        &[
            Scenario::WideShallow,
            Scenario::NarrowDeep,
            Scenario::SizeStress,
            Scenario::FillStress,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::WideShallow => "wide-shallow",
            Scenario::NarrowDeep => "narrow-deep",
            Scenario::SizeStress => "size-stress",
            Scenario::FillStress => "fill-stress",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Scenario::WideShallow => "Wide and Shallow",
            Scenario::NarrowDeep => "Narrow and Deep",
            Scenario::SizeStress => "Size to Content",
            Scenario::FillStress => "Fill Parent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::WideShallow => "1000 fixed-size leaves in one container, 100 moved per round",
            Scenario::NarrowDeep => "5-level tree with 4 children per node, calibrated delay",
            Scenario::SizeStress => "narrow-deep with interior nodes sized to their content",
            Scenario::FillStress => "narrow-deep with interior nodes filling their parent",
        }
    }

    pub fn config(&self) -> BenchConfig {
        let wide = BenchConfig {
            name: self.title().to_string(),
            estimate_multiplier: 2.0,
            ..Default::default()
        };
        let deep = BenchConfig {
            shape: TreeShape::Tree {
                levels: 5,
                branching: 4,
            },
            offset_min: 2.0,
            offset_spread: 5.0,
            delay: DelayPolicy::Calibrated {
                warmup_rounds: 10,
                warmup_delay_ms: 1_000,
            },
            round_statistic: Statistic::Mean,
            aggregate_statistic: Statistic::Mean,
            ..wide.clone()
        };

        match self {
            Scenario::WideShallow => wide,
            Scenario::NarrowDeep => deep,
            Scenario::SizeStress => BenchConfig {
                sizing: Sizing::Content,
                ..deep
            },
            Scenario::FillStress => BenchConfig {
                sizing: Sizing::Fill,
                ..deep
            },
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Scenario::all()
            .iter()
            .copied()
            .find(|scenario| scenario.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Scenario::all().iter().map(Scenario::name).collect();
                BenchError::configuration(format!(
                    "unknown scenario '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}
