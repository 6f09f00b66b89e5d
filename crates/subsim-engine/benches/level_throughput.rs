use criterion::{criterion_group, criterion_main, Criterion};

use subsim_engine::{run, LinearLimitState, ProposalConfig, RunConfig};

fn bench_run(c: &mut Criterion) {
    let evaluator = LinearLimitState::normal_sum(10, 1e-5).unwrap();
    let mut config = RunConfig::default();
    config.dimension = 10;
    config.samples_per_level = 1000;
    config.proposal = ProposalConfig::AdaptiveConditionalSampling {
        std: 1.0,
        initial_lambda: 0.6,
        chains_per_adaptation: Some(20),
    };

    c.bench_function("normal_sum_1e-5", |b| {
        b.iter(|| {
            let summary = run(&config, &evaluator).unwrap();
            criterion::black_box(summary.failure_probability)
        })
    });
}

criterion_group!(benches, bench_run);
criterion_main!(benches);
