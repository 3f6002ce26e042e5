//! Loading the configuration files shipped with the suite

use std::path::PathBuf;
use strato_bench_core::logging::filter_directives;
use strato_bench_core::{AppConfig, DelayPolicy, Sizing, Statistic, TimeoutPolicy, TreeShape};

fn shipped(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../configs")
        .join(name)
}

#[test]
fn test_load_ron_config() {
    let config = AppConfig::load(shipped("size-stress.ron")).unwrap();
    config.validate().unwrap();

    let bench = &config.benchmark;
    assert_eq!(bench.name, "Size to Content");
    assert_eq!(
        bench.shape,
        TreeShape::Tree {
            levels: 5,
            branching: 4
        }
    );
    assert_eq!(bench.shape.candidate_count(), Some(1364));
    assert_eq!(bench.sizing, Sizing::Content);
    assert_eq!(bench.round_statistic, Statistic::Mean);
    assert_eq!(bench.timeout_policy, TimeoutPolicy::Abort);
    assert_eq!(bench.seed, None);
    assert_eq!(
        filter_directives(&config.logging).unwrap(),
        "info,strato_bench_harness=info,strato_bench_surface=warn"
    );
}

#[test]
fn test_load_json_config() {
    let config = AppConfig::load(shipped("quick.json")).unwrap();
    config.validate().unwrap();

    assert_eq!(config.surface.frame_interval_ms, 8);
    assert_eq!(config.benchmark.samples_to_take, 5);
    assert_eq!(config.benchmark.delay, DelayPolicy::Fixed { delay_ms: 50 });
    assert_eq!(config.benchmark.timeout_policy, TimeoutPolicy::Skip);
    assert_eq!(config.benchmark.seed, Some(42));
    // Unlisted sections keep their defaults
    assert_eq!(config.logging, Default::default());
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = AppConfig::load(shipped("does-not-exist.ron")).unwrap_err();
    assert!(matches!(err, strato_bench_core::BenchError::Io(_)));
}
