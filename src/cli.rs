//! Command-line interface

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use strato_bench_core::{logging, AppConfig, DelayPolicy, LogLevel, TreeShape};
use strato_bench_harness::{Harness, Scenario};
use strato_bench_surface::TaffySurface;

#[derive(Debug, Parser)]
#[command(
    name = "strato-bench",
    about = "Layout latency benchmarks for StratoSDK layout surfaces",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a benchmark from a preset or a configuration file.
    Run(RunArgs),

    /// List the preset scenarios.
    Scenarios,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Preset to run (see `strato-bench scenarios`).
    #[arg(long, default_value = "wide-shallow", conflicts_with = "config")]
    pub scenario: Scenario,

    /// Configuration file (.ron or .json).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the number of measured rounds.
    #[arg(long)]
    pub rounds: Option<u32>,

    /// Seed the random number generator for a reproducible run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Tree depth. Switches a flat preset to a tree.
    #[arg(long)]
    pub levels: Option<u32>,

    /// Children per tree node. Switches a flat preset to a tree.
    #[arg(long)]
    pub branching: Option<u32>,

    /// Nodes shifted per round (M).
    #[arg(long)]
    pub changes: Option<usize>,

    /// Nodes timed per round (P).
    #[arg(long)]
    pub samples: Option<usize>,

    /// Warm-up rounds. Switches a fixed delay to a calibrated one.
    #[arg(long)]
    pub warmup_rounds: Option<u32>,

    /// Delay before each warm-up round. Switches a fixed delay to a calibrated one.
    #[arg(long)]
    pub warmup_delay_ms: Option<u64>,

    /// Also write the full JSON report to this file.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Log level for every category, overriding the configuration.
    #[arg(long)]
    pub log_level: Option<LogLevel>,
}

impl RunArgs {
    /// Resolve the configuration: file or preset, then overrides.
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => AppConfig {
                benchmark: self.scenario.config(),
                ..Default::default()
            },
        };

        if let Some(rounds) = self.rounds {
            config.benchmark.rounds = rounds;
        }
        if let Some(seed) = self.seed {
            config.benchmark.seed = Some(seed);
        }

        let bench = &mut config.benchmark;
        if self.levels.is_some() || self.branching.is_some() {
            let (levels, branching) = match bench.shape {
                TreeShape::Tree { levels, branching } => (levels, branching),
                TreeShape::Flat { .. } => (5, 4),
            };
            bench.shape = TreeShape::Tree {
                levels: self.levels.unwrap_or(levels),
                branching: self.branching.unwrap_or(branching),
            };
        }
        if let Some(changes) = self.changes {
            bench.nodes_to_change = changes;
        }
        if let Some(samples) = self.samples {
            bench.samples_to_take = samples;
        }
        if self.warmup_rounds.is_some() || self.warmup_delay_ms.is_some() {
            let (warmup_rounds, warmup_delay_ms) = match bench.delay {
                DelayPolicy::Calibrated {
                    warmup_rounds,
                    warmup_delay_ms,
                } => (warmup_rounds, warmup_delay_ms),
                DelayPolicy::Fixed { delay_ms } => (10, delay_ms),
            };
            bench.delay = DelayPolicy::Calibrated {
                warmup_rounds: self.warmup_rounds.unwrap_or(warmup_rounds),
                warmup_delay_ms: self.warmup_delay_ms.unwrap_or(warmup_delay_ms),
            };
        }

        if let Some(level) = self.log_level {
            config.logging.default_level = level.as_str().to_string();
            config.logging.category_levels.clear();
        }
        Ok(config)
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run_benchmark(args).await,
        Commands::Scenarios => {
            for scenario in Scenario::all() {
                println!("{:<14} {}", scenario.name(), scenario.description());
            }
            Ok(())
        }
    }
}

async fn run_benchmark(args: RunArgs) -> Result<()> {
    let config = args.app_config()?;
    logging::init(&config.logging)?;
    tracing::debug!("Resolved configuration: {:?}", config);

    let mut harness = Harness::new(config, TaffySurface::new())?;
    let report = harness
        .run()
        .await
        .map_err(|e| anyhow::anyhow!(e.format_for_log()))
        .context("benchmark run failed")?;

    println!("{}", report.render_text());
    if let Some(path) = &args.json {
        report
            .write_json(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "strato-bench",
            "run",
            "--scenario",
            "Narrow-Deep",
            "--rounds",
            "12",
            "--seed",
            "5",
            "--log-level",
            "debug",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected the run command");
        };
        let config = args.app_config().unwrap();
        assert_eq!(config.benchmark.name, "Narrow and Deep");
        assert_eq!(config.benchmark.rounds, 12);
        assert_eq!(config.benchmark.seed, Some(5));
        assert_eq!(config.logging.default_level, "debug");
        assert!(config.logging.category_levels.is_empty());
    }

    #[test]
    fn test_shape_and_delay_overrides() {
        let cli = Cli::try_parse_from([
            "strato-bench",
            "run",
            "--levels",
            "3",
            "--changes",
            "20",
            "--samples",
            "4",
            "--warmup-rounds",
            "2",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected the run command");
        };
        let bench = args.app_config().unwrap().benchmark;
        assert_eq!(
            bench.shape,
            TreeShape::Tree {
                levels: 3,
                branching: 4
            }
        );
        assert_eq!(bench.nodes_to_change, 20);
        assert_eq!(bench.samples_to_take, 4);
        // Wide-shallow waits 250 ms between rounds
        assert_eq!(
            bench.delay,
            DelayPolicy::Calibrated {
                warmup_rounds: 2,
                warmup_delay_ms: 250
            }
        );
        assert!(bench.validate().is_ok());
    }

    #[test]
    fn test_overrides_keep_preset_values() {
        let cli = Cli::try_parse_from([
            "strato-bench",
            "run",
            "--scenario",
            "fill-stress",
            "--branching",
            "2",
            "--warmup-delay-ms",
            "5",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected the run command");
        };
        let bench = args.app_config().unwrap().benchmark;
        assert_eq!(
            bench.shape,
            TreeShape::Tree {
                levels: 5,
                branching: 2
            }
        );
        assert_eq!(
            bench.delay,
            DelayPolicy::Calibrated {
                warmup_rounds: 10,
                warmup_delay_ms: 5
            }
        );
    }

    #[test]
    fn test_scenario_and_config_conflict() {
        let result = Cli::try_parse_from([
            "strato-bench",
            "run",
            "--scenario",
            "wide-shallow",
            "--config",
            "bench.ron",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_scenario_is_rejected() {
        assert!(Cli::try_parse_from(["strato-bench", "run", "--scenario", "tall"]).is_err());
    }
}
