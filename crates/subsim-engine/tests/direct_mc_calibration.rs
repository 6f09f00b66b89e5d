use subsim_core::{RngHandle, StandardNormal};
use subsim_engine::aggregate::{exceedance_probability, iid_cov};
use subsim_engine::determinism::direct_mc_seed;
use subsim_engine::direct::DirectMonteCarloSampler;

#[test]
fn empirical_probability_matches_plane_exceedance() {
    let c = 2.0;
    let sampler = DirectMonteCarloSampler::new(2);
    let mut rng = RngHandle::from_seed(direct_mc_seed(2024));
    let samples = sampler.sample(2000, &mut rng);
    assert_eq!(samples.len(), 2000);
    assert!(samples.iter().all(|x| x.len() == 2));

    let evaluations: Vec<f64> = samples.iter().map(|x| x[0] + x[1] - c).collect();
    let empirical = exceedance_probability(&evaluations, 0.0);
    let exact = StandardNormal::new().unwrap().survival(c / 2f64.sqrt());
    let tolerance = 3.0 * iid_cov(exact, 2000) * exact;
    assert!(
        (empirical - exact).abs() < tolerance,
        "empirical {empirical} vs exact {exact}"
    );
}

#[test]
fn same_seed_draws_same_population() {
    let sampler = DirectMonteCarloSampler::new(3);
    let mut a = RngHandle::from_seed(7);
    let mut b = RngHandle::from_seed(7);
    assert_eq!(sampler.sample(50, &mut a), sampler.sample(50, &mut b));
}
