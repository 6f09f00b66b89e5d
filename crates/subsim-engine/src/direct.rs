use subsim_core::RngHandle;

/// Draws the level-0 population in standard-normal space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectMonteCarloSampler {
    dimension: usize,
}

impl DirectMonteCarloSampler {
    /// Creates a sampler for `dimension`-dimensional inputs.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Dimension of the generated samples.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Draws `count` iid samples from the standard multivariate normal.
    pub fn sample(&self, count: usize, rng: &mut RngHandle) -> Vec<Vec<f64>> {
        (0..count)
            .map(|_| rng.standard_normal_vector(self.dimension))
            .collect()
    }
}
