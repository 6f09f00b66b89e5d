use subsim_core::errors::{ErrorInfo, SubsimError};
use subsim_core::PerformanceFunction;

struct Plane {
    offset: f64,
}

impl PerformanceFunction for Plane {
    fn evaluate(&self, x: &[f64]) -> Result<f64, SubsimError> {
        Ok(x.iter().sum::<f64>() - self.offset)
    }
}

fn evaluate_dyn(function: &dyn PerformanceFunction, x: &[f64]) -> Result<f64, SubsimError> {
    function.evaluate(x)
}

#[test]
fn structs_and_closures_implement_performance_function() {
    let plane = Plane { offset: 1.0 };
    assert_eq!(evaluate_dyn(&plane, &[0.5, 1.5]).unwrap(), 1.0);

    let closure = |x: &[f64]| -> Result<f64, SubsimError> { Ok(x[0] * 2.0) };
    assert_eq!(evaluate_dyn(&closure, &[3.0]).unwrap(), 6.0);
}

#[test]
fn evaluator_errors_pass_through() {
    let failing = |_: &[f64]| -> Result<f64, SubsimError> {
        Err(SubsimError::Evaluation(ErrorInfo::new("E42", "remote solver offline")))
    };
    let err = evaluate_dyn(&failing, &[0.0]).unwrap_err();
    assert_eq!(err.info().code, "E42");
}
