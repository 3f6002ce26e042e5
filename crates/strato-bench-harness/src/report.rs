//! Run reports
//!
//! A [`RunReport`] renders as a short text summary for the terminal and as a
//! JSON dump of every round. Durations are written as fractional
//! milliseconds.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use strato_bench_core::stats::{as_millis_f64, Statistic};
use strato_bench_core::{BenchError, BenchResult};

use crate::aggregator::{RoundRecord, RunSummary, TimedOutRound};

/// Serde helpers writing durations as fractional milliseconds.
pub(crate) mod millis {
    use serde::Serializer;
    use std::time::Duration;
    use strato_bench_core::stats::as_millis_f64;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(as_millis_f64(*value))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(duration) => serializer.serialize_some(&as_millis_f64(*duration)),
                None => serializer.serialize_none(),
            }
        }
    }

    pub mod vec {
        use super::*;
        use serde::ser::SerializeSeq;

        pub fn serialize<S: Serializer>(
            values: &[Duration],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for value in values {
                seq.serialize_element(&as_millis_f64(*value))?;
            }
            seq.end()
        }
    }
}

/// Outcome of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub name: String,
    pub started_at: DateTime<Utc>,
    /// Nodes in the generated tree, root and container included
    pub node_count: usize,
    pub rounds_configured: u32,
    #[serde(rename = "warmup_rounds")]
    pub warmup: Vec<RoundRecord>,
    #[serde(rename = "measured_rounds")]
    pub measured: Vec<RoundRecord>,
    pub timed_out: Vec<TimedOutRound>,
    #[serde(rename = "per_round_elapsed_ms", with = "millis::vec")]
    pub per_round_elapsed: Vec<Duration>,
    /// Inter-round delay derived from the warm-up rounds
    #[serde(rename = "calibrated_delay_ms", with = "millis::option")]
    pub calibrated_delay: Option<Duration>,
    pub aggregate_statistic: Statistic,
    #[serde(rename = "aggregate_ms", with = "millis::option")]
    pub aggregate: Option<Duration>,
    pub estimate_multiplier: f64,
    #[serde(rename = "estimate_ms", with = "millis::option")]
    pub estimate: Option<Duration>,
}

fn fmt_ms(value: Option<Duration>) -> String {
    match value {
        Some(duration) => format!("{:.3} ms", as_millis_f64(duration)),
        None => "n/a".to_string(),
    }
}

impl RunReport {
    pub fn from_summary(
        name: impl Into<String>,
        started_at: DateTime<Utc>,
        node_count: usize,
        rounds_configured: u32,
        calibrated_delay: Option<Duration>,
        summary: RunSummary,
    ) -> Self {
        Self {
            name: name.into(),
            started_at,
            node_count,
            rounds_configured,
            warmup: summary.warmup,
            measured: summary.measured,
            timed_out: summary.timed_out,
            per_round_elapsed: summary.per_round_elapsed,
            calibrated_delay,
            aggregate_statistic: summary.aggregate_statistic,
            aggregate: summary.aggregate,
            estimate_multiplier: summary.estimate_multiplier,
            estimate: summary.estimate,
        }
    }

    /// Per-round lines followed by the aggregate.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} ({} nodes, started {})",
            self.name,
            self.node_count,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        if !self.warmup.is_empty() {
            let _ = writeln!(out, "Warm-up rounds: {}", self.warmup.len());
        }
        if let Some(delay) = self.calibrated_delay {
            let _ = writeln!(out, "Calibrated delay: {}", fmt_ms(Some(delay)));
        }

        for record in &self.measured {
            let _ = writeln!(
                out,
                "Round {:>4}: {} (running median {}, mean {}, setup {})",
                record.index,
                fmt_ms(Some(record.round_elapsed)),
                fmt_ms(record.running_median),
                fmt_ms(record.running_mean),
                fmt_ms(record.setup_time),
            );
        }
        for round in &self.timed_out {
            let _ = writeln!(
                out,
                "Round {:>4} ({}): timed out with {}/{} samples",
                round.index,
                round.phase.as_str(),
                round.received,
                round.expected
            );
        }

        let _ = writeln!(
            out,
            "Completed {}/{} rounds",
            self.per_round_elapsed.len(),
            self.rounds_configured
        );
        let _ = writeln!(
            out,
            "Aggregate {}: {}",
            self.aggregate_statistic,
            fmt_ms(self.aggregate)
        );
        let _ = write!(
            out,
            "Estimate (x{}): {}",
            self.estimate_multiplier,
            fmt_ms(self.estimate)
        );
        out
    }

    pub fn to_json(&self) -> BenchResult<String> {
        serde_json::to_string_pretty(self).map_err(BenchError::serialization)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> BenchResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        tracing::info!("Wrote run report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::RoundPhase;
    use chrono::TimeZone;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn sample_report() -> RunReport {
        let record = RoundRecord {
            index: 1,
            phase: RoundPhase::Measured,
            changed: 100,
            sampled: 1,
            sample_times: vec![Duration::from_micros(12_500)],
            setup_time: Some(ms(4)),
            round_elapsed: Duration::from_micros(12_500),
            running_median: Some(Duration::from_micros(12_500)),
            running_mean: Some(Duration::from_micros(12_500)),
        };
        RunReport {
            name: "Wide and Shallow".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            node_count: 1002,
            rounds_configured: 2,
            warmup: Vec::new(),
            measured: vec![record],
            timed_out: vec![TimedOutRound {
                index: 2,
                phase: RoundPhase::Measured,
                received: 0,
                expected: 1,
            }],
            per_round_elapsed: vec![Duration::from_micros(12_500)],
            calibrated_delay: None,
            aggregate_statistic: Statistic::Median,
            aggregate: Some(Duration::from_micros(12_500)),
            estimate_multiplier: 2.0,
            estimate: Some(ms(25)),
        }
    }

    #[test]
    fn test_render_text() {
        let text = sample_report().render_text();
        assert!(text.starts_with("Wide and Shallow (1002 nodes, started 2024-05-01 12:00:00 UTC)"));
        assert!(text.contains("Round    1: 12.500 ms"));
        assert!(text.contains("setup 4.000 ms"));
        assert!(text.contains("Round    2 (measured): timed out with 0/1 samples"));
        assert!(text.contains("Completed 1/2 rounds"));
        assert!(text.contains("Aggregate median: 12.500 ms"));
        assert!(text.ends_with("Estimate (x2): 25.000 ms"));
    }

    #[test]
    fn test_json_dump_uses_milliseconds() {
        let json: serde_json::Value =
            serde_json::from_str(&sample_report().to_json().unwrap()).unwrap();

        let round = &json["measured_rounds"][0];
        assert_eq!(round["sample_times_ms"][0], 12.5);
        assert_eq!(round["setup_time_ms"], 4.0);
        assert_eq!(round["phase"], "measured");
        assert_eq!(json["per_round_elapsed_ms"][0], 12.5);
        assert_eq!(json["calibrated_delay_ms"], serde_json::Value::Null);
        assert_eq!(json["aggregate_statistic"], "median");
        assert_eq!(json["estimate_ms"], 25.0);
        assert_eq!(json["started_at"], "2024-05-01T12:00:00Z");
    }
}
