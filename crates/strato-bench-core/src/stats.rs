//! Sample statistics for layout latency runs
//!
//! Medians use the lower-middle convention throughout: the sorted sequence is
//! indexed at `(n - 1) / 2` and even-length inputs are never averaged. Results
//! stay comparable with historical runs of the suite that way.
//!
//! ```text
//! [50, 30, 70]      -> 50
//! [50, 30, 70, 10]  -> 30   (sorted [10, 30, 50, 70], index 1)
//! running median over [100, 120, 80] -> [100, 100, 100]
//! ```
//!
//! Indexing at `n / 2` instead would give 50 and `[100, 120, 100]`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{BenchError, BenchResult, ErrorContext};

/// Lower-middle median of a set of durations.
///
/// Returns `None` for an empty slice.
pub fn lower_median(samples: &[Duration]) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    Some(sorted[(sorted.len() - 1) / 2])
}

/// Arithmetic mean of a set of durations.
pub fn mean(samples: &[Duration]) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    let total: u128 = samples.iter().map(Duration::as_nanos).sum();
    let avg = total / samples.len() as u128;
    Some(Duration::from_nanos(u64::try_from(avg).unwrap_or(u64::MAX)))
}

/// Which statistic reduces a set of samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    #[default]
    Median,
    Mean,
}

impl Statistic {
    pub fn apply(self, samples: &[Duration]) -> Option<Duration> {
        match self {
            Statistic::Median => lower_median(samples),
            Statistic::Mean => mean(samples),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Median => "median",
            Statistic::Mean => "mean",
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scale a duration by a non-negative factor.
pub fn scale(duration: Duration, factor: f64) -> Duration {
    let nanos = (duration.as_nanos() as f64 * factor.max(0.0)).round();
    Duration::from_nanos(nanos.min(u64::MAX as f64) as u64)
}

/// Fractional milliseconds, as used in reports.
pub fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// Run-wide accumulator of per-round elapsed times.
///
/// Holds at most `capacity` entries. Running statistics are recomputed from
/// the stored values on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    per_round_elapsed: Vec<Duration>,
    capacity: usize,
}

impl RunStatistics {
    pub fn new(capacity: usize) -> Self {
        Self {
            per_round_elapsed: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one completed round.
    pub fn push(&mut self, elapsed: Duration) -> BenchResult<()> {
        if self.per_round_elapsed.len() >= self.capacity {
            return Err(BenchError::state_with_context(
                "run statistics already hold the configured number of rounds",
                ErrorContext::new("push", "stats").with_metadata("capacity", self.capacity),
            ));
        }
        self.per_round_elapsed.push(elapsed);
        Ok(())
    }

    pub fn per_round_elapsed(&self) -> &[Duration] {
        &self.per_round_elapsed
    }

    pub fn len(&self) -> usize {
        self.per_round_elapsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_round_elapsed.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.per_round_elapsed.len() >= self.capacity
    }

    pub fn running_median(&self) -> Option<Duration> {
        lower_median(&self.per_round_elapsed)
    }

    pub fn running_mean(&self) -> Option<Duration> {
        mean(&self.per_round_elapsed)
    }

    pub fn aggregate(&self, statistic: Statistic) -> Option<Duration> {
        statistic.apply(&self.per_round_elapsed)
    }
}
