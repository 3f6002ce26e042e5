//! Round bookkeeping and run statistics
//!
//! The aggregator is a small state machine driven by the runner:
//!
//! ```text
//! Idle --begin_round--> AwaitingSamples --record_sample (last)--> RoundComplete
//!  ^                          |                                        |
//!  |                     abort_round                             complete_round
//!  +--------------------------+----------------------------------------+
//!                                   (Finished after the last measured round)
//! ```
//!
//! Warm-up rounds are recorded separately and never reach [`RunStatistics`].

use serde::Serialize;
use std::time::{Duration, Instant};
use strato_bench_core::stats::{self, RunStatistics, Statistic};
use strato_bench_core::{BenchConfig, BenchError, BenchResult, ErrorContext};

use crate::report::millis;

/// Which part of the run a round belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Warmup,
    Measured,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::Warmup => "warm-up",
            RoundPhase::Measured => "measured",
        }
    }
}

/// One completed round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    /// 1-based within its phase
    pub index: u32,
    pub phase: RoundPhase,
    /// Nodes shifted (M')
    pub changed: usize,
    /// Nodes timed (P')
    pub sampled: usize,
    /// Elapsed time per notification, in arrival order
    #[serde(rename = "sample_times_ms", with = "millis::vec")]
    pub sample_times: Vec<Duration>,
    /// Mutation issue to root layout completion, when the root fired
    #[serde(rename = "setup_time_ms", with = "millis::option")]
    pub setup_time: Option<Duration>,
    #[serde(rename = "round_elapsed_ms", with = "millis")]
    pub round_elapsed: Duration,
    #[serde(rename = "running_median_ms", with = "millis::option")]
    pub running_median: Option<Duration>,
    #[serde(rename = "running_mean_ms", with = "millis::option")]
    pub running_mean: Option<Duration>,
}

/// A round that did not receive all of its notifications in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimedOutRound {
    pub index: u32,
    pub phase: RoundPhase,
    pub received: usize,
    pub expected: usize,
}

/// Result of recording one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleProgress {
    Pending { remaining: usize },
    Complete,
}

/// Everything the aggregator learned over a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub warmup: Vec<RoundRecord>,
    pub measured: Vec<RoundRecord>,
    pub timed_out: Vec<TimedOutRound>,
    pub per_round_elapsed: Vec<Duration>,
    pub aggregate_statistic: Statistic,
    /// Aggregate over `per_round_elapsed`, unscaled
    pub aggregate: Option<Duration>,
    pub estimate_multiplier: f64,
    /// `aggregate * estimate_multiplier`
    pub estimate: Option<Duration>,
}

#[derive(Debug)]
struct ActiveRound {
    phase: RoundPhase,
    index: u32,
    start: Instant,
    changed: usize,
    expected: usize,
    samples: Vec<Duration>,
}

#[derive(Debug)]
enum State {
    Idle,
    AwaitingSamples(ActiveRound),
    RoundComplete(ActiveRound),
    Finished,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::AwaitingSamples(_) => "awaiting_samples",
            State::RoundComplete(_) => "round_complete",
            State::Finished => "finished",
        }
    }
}

#[derive(Debug)]
pub struct Aggregator {
    state: State,
    rounds: u32,
    round_statistic: Statistic,
    aggregate_statistic: Statistic,
    estimate_multiplier: f64,
    statistics: RunStatistics,
    warmup: Vec<RoundRecord>,
    measured: Vec<RoundRecord>,
    timed_out: Vec<TimedOutRound>,
    /// Measured rounds finished so far, completed or aborted
    measured_done: u32,
    warmup_done: u32,
}

impl Aggregator {
    pub fn new(config: &BenchConfig) -> Self {
        Self {
            state: State::Idle,
            rounds: config.rounds,
            round_statistic: config.round_statistic,
            aggregate_statistic: config.aggregate_statistic,
            estimate_multiplier: config.estimate_multiplier,
            statistics: RunStatistics::new(config.rounds as usize),
            warmup: Vec::new(),
            measured: Vec::new(),
            timed_out: Vec::new(),
            measured_done: 0,
            warmup_done: 0,
        }
    }

    fn misuse(&self, operation: &str) -> BenchError {
        BenchError::state_with_context(
            format!("cannot {} while {}", operation.replace('_', " "), self.state.name()),
            ErrorContext::new(operation, "aggregator").with_metadata("state", self.state.name()),
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished)
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    /// Index the next round of `phase` would get.
    pub fn next_index(&self, phase: RoundPhase) -> u32 {
        match phase {
            RoundPhase::Warmup => self.warmup_done + 1,
            RoundPhase::Measured => self.measured_done + 1,
        }
    }

    /// Samples received by the active round, if any.
    pub fn received(&self) -> usize {
        match &self.state {
            State::AwaitingSamples(round) | State::RoundComplete(round) => round.samples.len(),
            State::Idle | State::Finished => 0,
        }
    }

    /// Mean round statistic over completed warm-up rounds.
    pub fn warmup_mean(&self) -> Option<Duration> {
        let values: Vec<_> = self.warmup.iter().map(|r| r.round_elapsed).collect();
        stats::mean(&values)
    }

    /// Inter-round delay derived from completed warm-up rounds.
    ///
    /// Each round contributes its statistic scaled by the estimate multiplier
    /// plus its setup time, so the delay covers a full round trip.
    pub fn calibrated_delay(&self) -> Option<Duration> {
        let values: Vec<_> = self
            .warmup
            .iter()
            .map(|r| {
                stats::scale(r.round_elapsed, self.estimate_multiplier)
                    + r.setup_time.unwrap_or_default()
            })
            .collect();
        stats::mean(&values)
    }

    /// Start a round anchored at `start`, expecting `expected` samples.
    pub fn begin_round(
        &mut self,
        phase: RoundPhase,
        start: Instant,
        changed: usize,
        expected: usize,
    ) -> BenchResult<u32> {
        if !matches!(self.state, State::Idle) {
            return Err(self.misuse("begin_round"));
        }
        if phase == RoundPhase::Warmup && self.measured_done > 0 {
            return Err(BenchError::state_with_context(
                "warm-up rounds must precede measured rounds",
                ErrorContext::new("begin_round", "aggregator")
                    .with_metadata("measured_done", self.measured_done),
            ));
        }
        if expected == 0 {
            return Err(BenchError::state_with_context(
                "a round must expect at least one sample",
                ErrorContext::new("begin_round", "aggregator"),
            ));
        }

        let index = self.next_index(phase);
        self.state = State::AwaitingSamples(ActiveRound {
            phase,
            index,
            start,
            changed,
            expected,
            samples: Vec::with_capacity(expected),
        });
        Ok(index)
    }

    /// Record one layout completion for the active round.
    pub fn record_sample(&mut self, completed_at: Instant) -> BenchResult<SampleProgress> {
        let State::AwaitingSamples(round) = &mut self.state else {
            return Err(self.misuse("record_sample"));
        };

        round
            .samples
            .push(completed_at.saturating_duration_since(round.start));
        let remaining = round.expected - round.samples.len();
        if remaining > 0 {
            return Ok(SampleProgress::Pending { remaining });
        }

        if let State::AwaitingSamples(round) = std::mem::replace(&mut self.state, State::Idle) {
            self.state = State::RoundComplete(round);
        }
        Ok(SampleProgress::Complete)
    }

    /// Close the active round once all samples arrived.
    pub fn complete_round(&mut self, setup_time: Option<Duration>) -> BenchResult<RoundRecord> {
        if !matches!(self.state, State::RoundComplete(_)) {
            return Err(self.misuse("complete_round"));
        }
        let State::RoundComplete(round) = std::mem::replace(&mut self.state, State::Idle) else {
            return Err(self.misuse("complete_round"));
        };

        let round_elapsed = self
            .round_statistic
            .apply(&round.samples)
            .ok_or_else(|| BenchError::state("completed round has no samples"))?;

        let mut record = RoundRecord {
            index: round.index,
            phase: round.phase,
            changed: round.changed,
            sampled: round.expected,
            sample_times: round.samples,
            setup_time,
            round_elapsed,
            running_median: None,
            running_mean: None,
        };

        match round.phase {
            RoundPhase::Warmup => {
                self.warmup_done += 1;
                self.warmup.push(record.clone());
            }
            RoundPhase::Measured => {
                self.statistics.push(round_elapsed)?;
                record.running_median = self.statistics.running_median();
                record.running_mean = self.statistics.running_mean();
                self.measured.push(record.clone());
                self.advance_measured();
            }
        }
        Ok(record)
    }

    /// Give up on the active round after `received` samples.
    pub fn abort_round(&mut self, received: usize) -> BenchResult<TimedOutRound> {
        let round = match std::mem::replace(&mut self.state, State::Idle) {
            State::AwaitingSamples(round) => round,
            other => {
                self.state = other;
                return Err(self.misuse("abort_round"));
            }
        };

        let timed_out = TimedOutRound {
            index: round.index,
            phase: round.phase,
            received,
            expected: round.expected,
        };
        self.timed_out.push(timed_out);
        match round.phase {
            RoundPhase::Warmup => self.warmup_done += 1,
            RoundPhase::Measured => self.advance_measured(),
        }
        Ok(timed_out)
    }

    fn advance_measured(&mut self) {
        self.measured_done += 1;
        if self.measured_done >= self.rounds {
            self.state = State::Finished;
        }
    }

    /// Final statistics. Only valid after the last measured round.
    pub fn finish(self) -> BenchResult<RunSummary> {
        if !self.is_finished() {
            return Err(self.misuse("finish"));
        }

        let aggregate = self.statistics.aggregate(self.aggregate_statistic);
        Ok(RunSummary {
            warmup: self.warmup,
            measured: self.measured,
            timed_out: self.timed_out,
            per_round_elapsed: self.statistics.per_round_elapsed().to_vec(),
            aggregate_statistic: self.aggregate_statistic,
            aggregate,
            estimate_multiplier: self.estimate_multiplier,
            estimate: aggregate.map(|value| stats::scale(value, self.estimate_multiplier)),
        })
    }
}
