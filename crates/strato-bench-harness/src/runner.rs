//! Benchmark runner
//!
//! [`Harness::run`] drives one full run on a single task: the round loop and
//! the surface's [`FrameDriver`] are polled together, sharing the surface
//! through a `RefCell`. Each round subscribes to its sampled nodes, issues
//! the mutations, then waits for the notifications (or the sample timeout)
//! before sleeping out the inter-round delay.

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::time::Duration;
use strato_bench_core::{
    AppConfig, BenchConfig, BenchError, BenchResult, DelayPolicy, ErrorContext, LoggingConfig,
    RateLimiter, SurfaceConfig, TimeoutPolicy,
};
use strato_bench_core::stats::as_millis_f64;
use strato_bench_surface::{FrameDriver, LayoutSubscription, LayoutSurface};

use crate::aggregator::{Aggregator, RoundPhase, SampleProgress};
use crate::mutator::Mutator;
use crate::report::RunReport;
use crate::selector;
use crate::tree::{self, GeneratedTree};

/// Owns a surface and the configuration for one run.
pub struct Harness<S> {
    config: BenchConfig,
    surface_config: SurfaceConfig,
    logging: LoggingConfig,
    surface: RefCell<S>,
    rng: SmallRng,
}

impl<S: LayoutSurface> Harness<S> {
    /// Validate `config` and take ownership of `surface`.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Configuration` before any node is created if the
    /// configuration cannot produce a meaningful run.
    pub fn new(config: AppConfig, surface: S) -> BenchResult<Self> {
        config.validate()?;
        let rng = match config.benchmark.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Ok(Self {
            config: config.benchmark,
            surface_config: config.surface,
            logging: config.logging,
            surface: RefCell::new(surface),
            rng,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn surface(&self) -> &RefCell<S> {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface.into_inner()
    }

    /// Generate the tree and run every round.
    pub async fn run(&mut self) -> BenchResult<RunReport> {
        let Self {
            config,
            surface_config,
            logging,
            surface,
            rng,
        } = self;
        let (config, surface) = (&*config, &*surface);

        let started_at = Utc::now();
        let tree = tree::generate(&mut *surface.borrow_mut(), config, &mut *rng)?;
        tracing::info!(
            "Starting '{}': {} nodes, {} rounds, M={}, P={}",
            config.name,
            tree.node_count(),
            config.rounds,
            config.nodes_to_change,
            config.samples_to_take
        );

        let driver = FrameDriver::from_config(surface_config);
        let mut session = Session {
            config,
            surface,
            rng,
            tree: &tree,
            aggregator: Aggregator::new(config),
            mutator: Mutator::from_config(config),
            progress: RateLimiter::from_config(logging),
        };

        let calibrated_delay = tokio::select! {
            result = driver.run(surface) => {
                result?;
                return Err(BenchError::state("frame driver stopped before the run finished"));
            }
            result = session.run() => result?,
        };

        let summary = session.aggregator.finish()?;
        let report = RunReport::from_summary(
            config.name.clone(),
            started_at,
            tree.node_count(),
            config.rounds,
            calibrated_delay,
            summary,
        );
        tracing::info!(
            "Finished '{}': {} rounds, {} {:?} ms (estimate {:?} ms)",
            report.name,
            report.per_round_elapsed.len(),
            report.aggregate_statistic,
            report.aggregate.map(as_millis_f64),
            report.estimate.map(as_millis_f64)
        );
        Ok(report)
    }
}

/// Borrowed state of a run in progress
struct Session<'a, S> {
    config: &'a BenchConfig,
    surface: &'a RefCell<S>,
    rng: &'a mut SmallRng,
    tree: &'a GeneratedTree,
    aggregator: Aggregator,
    mutator: Mutator,
    progress: RateLimiter,
}

impl<S: LayoutSurface> Session<'_, S> {
    /// Run the settle, warm-up and measured phases. Returns the calibrated delay.
    async fn run(&mut self) -> BenchResult<Option<Duration>> {
        self.settle().await?;

        let warmup_rounds = self.config.delay.warmup_rounds();
        for _ in 0..warmup_rounds {
            tokio::time::sleep(self.config.delay.initial_delay()).await;
            self.round(RoundPhase::Warmup).await?;
        }

        let (delay, calibrated) = match self.config.delay {
            DelayPolicy::Fixed { delay_ms } => (Duration::from_millis(delay_ms), None),
            DelayPolicy::Calibrated {
                warmup_delay_ms, ..
            } => {
                let delay = self
                    .aggregator
                    .calibrated_delay()
                    .unwrap_or(Duration::from_millis(warmup_delay_ms));
                tracing::info!(
                    "Calibrated inter-round delay from {} warm-up rounds: {:.3} ms",
                    warmup_rounds,
                    as_millis_f64(delay)
                );
                (delay, Some(delay))
            }
        };

        while !self.aggregator.is_finished() {
            tokio::time::sleep(delay).await;
            self.round(RoundPhase::Measured).await?;
        }
        Ok(calibrated)
    }

    /// Wait for the first layout of the freshly generated tree.
    async fn settle(&mut self) -> BenchResult<()> {
        let subscription = self.surface.borrow_mut().on_layout_complete(self.tree.root)?;
        let timeout = self.config.sample_timeout();
        match tokio::time::timeout(timeout, subscription).await {
            Ok(fired) => {
                fired?;
                tracing::debug!("Initial layout settled");
                Ok(())
            }
            Err(_) => Err(BenchError::SampleTimeout {
                round: 0,
                received: 0,
                expected: 1,
                timeout,
            }),
        }
    }

    async fn round(&mut self, phase: RoundPhase) -> BenchResult<()> {
        let selection = selector::select(
            &self.tree.candidates,
            self.config.nodes_to_change,
            self.config.samples_to_take,
            &mut *self.rng,
        );

        let (start, mut pending, mut root_subscription) = {
            let mut surface = self.surface.borrow_mut();
            let root_subscription = surface.on_layout_complete(self.tree.root)?;
            let pending = selection
                .to_sample
                .iter()
                .map(|node| surface.on_layout_complete(*node))
                .collect::<Result<FuturesUnordered<LayoutSubscription>, _>>()?;
            let start = self
                .mutator
                .apply(&mut *surface, self.tree.root, &selection, &mut *self.rng)?;
            (start, pending, root_subscription)
        };

        let index = self.aggregator.begin_round(
            phase,
            start,
            selection.to_change.len(),
            selection.to_sample.len(),
        )?;

        let timeout = self.config.sample_timeout();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some(fired)) => {
                    if let SampleProgress::Complete = self.aggregator.record_sample(fired?)? {
                        break;
                    }
                }
                Ok(None) => {
                    return Err(BenchError::state_with_context(
                        "subscriptions exhausted before the round completed",
                        ErrorContext::new("round", "runner").with_metadata("round", index),
                    ));
                }
                Err(_) => return self.time_out(phase, index, selection.to_sample.len(), timeout),
            }
        }

        let setup_time = root_subscription
            .try_take()
            .map(|completed_at| completed_at.saturating_duration_since(start));
        let record = self.aggregator.complete_round(setup_time)?;

        if self.progress.should_allow() {
            tracing::info!(
                "Round {} ({}): {:.3} ms, running median {:?} ms",
                record.index,
                phase.as_str(),
                as_millis_f64(record.round_elapsed),
                record.running_median.map(as_millis_f64)
            );
        }
        Ok(())
    }

    fn time_out(
        &mut self,
        phase: RoundPhase,
        index: u32,
        expected: usize,
        timeout: Duration,
    ) -> BenchResult<()> {
        let received = self.aggregator.received();
        match self.config.timeout_policy {
            TimeoutPolicy::Abort => {
                tracing::error!(
                    "Round {} ({}) timed out with {}/{} samples",
                    index,
                    phase.as_str(),
                    received,
                    expected
                );
                Err(BenchError::SampleTimeout {
                    round: index,
                    received,
                    expected,
                    timeout,
                })
            }
            TimeoutPolicy::Skip => {
                self.aggregator.abort_round(received)?;
                tracing::warn!(
                    "Skipping round {} ({}): {}/{} samples within {:?}",
                    index,
                    phase.as_str(),
                    received,
                    expected,
                    timeout
                );
                Ok(())
            }
        }
    }
}
