use subsim_engine::{run, LinearLimitState, ProposalConfig, RunConfig};

fn config(proposal: ProposalConfig, concurrency: usize) -> RunConfig {
    let mut config = RunConfig::default();
    config.dimension = 2;
    config.samples_per_level = 500;
    config.proposal = proposal;
    config.concurrency = concurrency;
    config.seed_policy.master_seed = 0xC0FFEE;
    config
}

#[test]
fn identical_seeds_yield_identical_summaries() {
    let evaluator = LinearLimitState::normal_sum(2, 1e-3).unwrap();
    let proposals = [
        ProposalConfig::default(),
        ProposalConfig::AdaptiveConditionalSampling {
            std: 1.0,
            initial_lambda: 0.6,
            chains_per_adaptation: Some(10),
        },
        ProposalConfig::ModifiedMetropolis { spread: 1.0 },
    ];
    for proposal in proposals {
        let first = run(&config(proposal.clone(), 1), &evaluator).unwrap();
        let second = run(&config(proposal, 1), &evaluator).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn worker_count_does_not_change_results() {
    let evaluator = LinearLimitState::normal_sum(2, 1e-3).unwrap();
    let serial = run(&config(ProposalConfig::default(), 1), &evaluator).unwrap();
    let parallel = run(&config(ProposalConfig::default(), 4), &evaluator).unwrap();
    assert_eq!(serial.levels, parallel.levels);
    assert_eq!(serial.failure_probability, parallel.failure_probability);
}

#[test]
fn different_seeds_diverge() {
    let evaluator = LinearLimitState::normal_sum(2, 1e-3).unwrap();
    let first = run(&config(ProposalConfig::default(), 1), &evaluator).unwrap();
    let mut other = config(ProposalConfig::default(), 1);
    other.seed_policy.master_seed += 1;
    let second = run(&other, &evaluator).unwrap();
    assert_ne!(first.levels[0].threshold, second.levels[0].threshold);
}
