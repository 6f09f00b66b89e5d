#![deny(missing_docs)]
#![doc = "Core traits and data types for the subset simulation engine."]

pub mod errors;
pub mod normal;
pub mod provenance;
pub mod rng;
mod types;

pub use errors::{ErrorInfo, SubsimError};
pub use normal::StandardNormal;
pub use provenance::RunProvenance;
pub use rng::{derive_substream_seed, RngHandle};
pub use types::Population;

/// Scalar performance (limit-state) function evaluated in standard-normal space.
///
/// Positive values denote the failure domain. Implementations may be expensive
/// or remote; the engine calls `evaluate` exactly once per candidate state and
/// never retries a failed call. Errors are returned to the caller unchanged.
pub trait PerformanceFunction: Send + Sync {
    /// Evaluates the performance value for the sample `x`.
    fn evaluate(&self, x: &[f64]) -> Result<f64, SubsimError>;
}

impl<F> PerformanceFunction for F
where
    F: Fn(&[f64]) -> Result<f64, SubsimError> + Send + Sync,
{
    fn evaluate(&self, x: &[f64]) -> Result<f64, SubsimError> {
        self(x)
    }
}
