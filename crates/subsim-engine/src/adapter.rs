use serde::{Deserialize, Serialize};

/// Acceptance rate targeted by the adaptive conditional sampler.
pub const TARGET_ACCEPTANCE: f64 = 0.44;

/// Outcome of one adaptation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationRecord {
    /// Zero-based batch index within the level.
    pub batch_index: usize,
    /// Mean acceptance over the batch.
    pub accept_rate: f64,
    /// Scale parameter used while growing the batch.
    pub lambda_before: f64,
    /// Scale parameter after the update.
    pub lambda_after: f64,
}

/// Tunes the proposal scale `lambda` from batch acceptance rates.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalAdapter {
    lambda: f64,
    target: f64,
    batch_index: usize,
}

impl ProposalAdapter {
    /// Creates an adapter starting from `lambda` with the default target.
    pub fn new(lambda: f64) -> Self {
        Self {
            lambda,
            target: TARGET_ACCEPTANCE,
            batch_index: 0,
        }
    }

    /// Current scale parameter.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Index of the next batch within the current level.
    pub fn batch_index(&self) -> usize {
        self.batch_index
    }

    /// Restarts the batch counter at the beginning of a level. `lambda` is kept.
    pub fn start_level(&mut self) {
        self.batch_index = 0;
    }

    /// Applies `lambda <- lambda * exp((mean(flags) - a*) / sqrt(i + 1))`.
    ///
    /// An empty batch carries no information and leaves `lambda` untouched.
    pub fn update(&mut self, flags: &[bool]) -> Option<AdaptationRecord> {
        if flags.is_empty() {
            return None;
        }
        let accepted = flags.iter().filter(|&&flag| flag).count();
        let accept_rate = accepted as f64 / flags.len() as f64;
        let step = 1.0 / ((self.batch_index + 1) as f64).sqrt();
        let lambda_before = self.lambda;
        self.lambda *= (step * (accept_rate - self.target)).exp();
        let record = AdaptationRecord {
            batch_index: self.batch_index,
            accept_rate,
            lambda_before,
            lambda_after: self.lambda,
        };
        self.batch_index += 1;
        Some(record)
    }
}
