use std::sync::atomic::{AtomicUsize, Ordering};

use subsim_core::{PerformanceFunction, SubsimError};
use subsim_engine::{run, Phase, RunConfig, SubsetSimulation};

/// Returns positive values for exactly `failures` calls.
struct FixedFailures {
    failures: usize,
    calls: AtomicUsize,
}

impl PerformanceFunction for FixedFailures {
    fn evaluate(&self, _x: &[f64]) -> Result<f64, SubsimError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Ok(1.0 + call as f64)
        } else {
            Ok(-1.0 - call as f64)
        }
    }
}

fn small_config() -> RunConfig {
    let mut config = RunConfig::default();
    config.samples_per_level = 100;
    config.p0 = 0.1;
    config
}

#[test]
fn failure_fraction_equal_to_p0_terminates() {
    let evaluator = FixedFailures {
        failures: 10,
        calls: AtomicUsize::new(0),
    };
    let mut simulation = SubsetSimulation::new(small_config()).unwrap();
    assert_eq!(simulation.phase(), Phase::DirectMc);

    let level = simulation.advance(&evaluator).unwrap().unwrap().clone();
    assert!(level.is_finished);
    assert_eq!(level.num_failed, 10);
    assert_eq!(level.threshold, 0.0);
    assert!(level.seeds.is_empty());
    assert_eq!(level.level_pf, 0.1);
    assert_eq!(simulation.phase(), Phase::Done);
    assert!(simulation.advance(&evaluator).unwrap().is_none());

    let summary = simulation.into_summary();
    assert_eq!(summary.levels.len(), 1);
    assert!(summary.is_finished);
    assert_eq!(summary.failure_probability, 0.1);
    assert_eq!(summary.evaluations, 100);
}

#[test]
fn one_failure_short_opens_a_new_level() {
    let evaluator = FixedFailures {
        failures: 9,
        calls: AtomicUsize::new(0),
    };
    let mut simulation = SubsetSimulation::new(small_config()).unwrap();
    let level = simulation.advance(&evaluator).unwrap().unwrap();
    assert!(!level.is_finished);
    assert!(level.threshold < 0.0);
    assert_eq!(level.seeds.len(), 10);
    assert_eq!(level.level_pf, 0.1);
    assert_eq!(simulation.phase(), Phase::LevelActive);
}

#[test]
fn constant_performance_is_a_numerical_error() {
    let evaluator = |_: &[f64]| -> Result<f64, SubsimError> { Ok(-1.0) };
    let err = run(&small_config(), &evaluator).unwrap_err();
    assert!(matches!(err, SubsimError::Numerical(_)));
    assert_eq!(err.info().code, "level-probability-vanished");
}

/// Returns `first` for the opening `count` calls and `rest` afterwards.
struct Plateau {
    count: usize,
    first: f64,
    rest: f64,
    calls: AtomicUsize,
}

impl Plateau {
    fn new(count: usize, first: f64, rest: f64) -> Self {
        Self {
            count,
            first,
            rest,
            calls: AtomicUsize::new(0),
        }
    }
}

impl PerformanceFunction for Plateau {
    fn evaluate(&self, _x: &[f64]) -> Result<f64, SubsimError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.count {
            Ok(self.first)
        } else {
            Ok(self.rest)
        }
    }
}

fn thousand_sample_config() -> RunConfig {
    let mut config = RunConfig::default();
    config.samples_per_level = 1000;
    config.p0 = 0.1;
    config
}

#[test]
fn tied_block_across_seed_rank_keeps_level_probability() {
    // 150 samples share the top value, so rank k = 100 falls inside the tie.
    let evaluator = Plateau::new(150, -0.5, -10.0);
    let mut simulation = SubsetSimulation::new(thousand_sample_config()).unwrap();
    let level = simulation.advance(&evaluator).unwrap().unwrap().clone();

    assert!(!level.is_finished);
    assert_eq!(level.threshold, -5.25);
    assert_eq!(level.seeds.len(), 100);
    assert!(level.seed_evaluations.iter().all(|&g| g > level.threshold));
    assert_eq!(level.level_pf, 0.1);
    assert_eq!(level.pf, 0.1);
    assert_eq!(simulation.phase(), Phase::LevelActive);
}

/// Level 0 keeps 100 seeds at -0.5; the 900 chain candidates of level 1
/// include 120 failures and are all accepted.
struct TwoLevelFailures {
    calls: AtomicUsize,
}

impl PerformanceFunction for TwoLevelFailures {
    fn evaluate(&self, _x: &[f64]) -> Result<f64, SubsimError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match call {
            0..=99 => -0.5,
            100..=999 => -10.0,
            1000..=1119 => 1.0,
            _ => -1.0,
        })
    }
}

#[test]
fn chain_level_estimate_scales_failed_fraction() {
    let evaluator = TwoLevelFailures {
        calls: AtomicUsize::new(0),
    };
    let summary = run(&thousand_sample_config(), &evaluator).unwrap();

    assert_eq!(summary.levels.len(), 2);
    assert!(summary.is_finished);
    let first = &summary.levels[0];
    assert!(!first.is_finished);
    assert_eq!(first.level_pf, 0.1);

    let last = &summary.levels[1];
    assert!(last.is_finished);
    assert_eq!(last.num_failed, 120);
    assert_eq!(last.level_pf, 0.12);
    assert_eq!(last.acceptance_rate, Some(1.0));
    let expected = 0.1 * 120.0 / 1000.0;
    assert!((last.pf - expected).abs() < 1e-15, "pf {}", last.pf);
    assert_eq!(summary.failure_probability, last.pf);
    assert_eq!(summary.evaluations, 1000 + 900);
}
