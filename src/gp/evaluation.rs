//! The evaluator seam between the search and an external Push interpreter.

use std::fmt;

use log::warn;

use crate::push::Program;

/// Error value assigned to every case of a program whose evaluation faulted.
pub const DEFAULT_PENALTY: f64 = 1e6;

/// A program evaluation that did not complete normally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationFault {
    #[error("step limit of {0} exceeded")]
    StepLimit(usize),
    #[error("runtime limit of {0}s exceeded")]
    RuntimeLimit(f64),
    #[error("growth cap of {0} exceeded")]
    GrowthCap(usize),
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Scores a program against a fixed set of cases.
///
/// Implementations are shared between worker threads and must be read-only
/// while a search runs. Lower errors are better; zero is a perfect case.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, program: &Program) -> Result<Vec<f64>, EvaluationFault>;

    /// Number of cases, i.e. the length of every error vector.
    fn case_count(&self) -> usize;

    fn penalty(&self) -> f64 {
        DEFAULT_PENALTY
    }
}

/// An [`Evaluator`] backed by a closure.
pub struct FnEvaluator<F> {
    cases: usize,
    penalty: f64,
    f: F,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&Program) -> Result<Vec<f64>, EvaluationFault> + Send + Sync,
{
    pub fn new(cases: usize, f: F) -> Self {
        Self {
            cases,
            penalty: DEFAULT_PENALTY,
            f,
        }
    }

    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }
}

impl<F> Evaluator for FnEvaluator<F>
where
    F: Fn(&Program) -> Result<Vec<f64>, EvaluationFault> + Send + Sync,
{
    fn evaluate(&self, program: &Program) -> Result<Vec<f64>, EvaluationFault> {
        (self.f)(program)
    }

    fn case_count(&self) -> usize {
        self.cases
    }

    fn penalty(&self) -> f64 {
        self.penalty
    }
}

impl<F> fmt::Debug for FnEvaluator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEvaluator")
            .field("cases", &self.cases)
            .field("penalty", &self.penalty)
            .finish_non_exhaustive()
    }
}

/// Evaluate `program`, absorbing faults.
///
/// A fault yields a vector of `penalty()` for every case. Non-finite or
/// negative case errors are replaced by the penalty as well.
pub fn error_vector(evaluator: &dyn Evaluator, program: &Program) -> Vec<f64> {
    let penalty = evaluator.penalty();
    match evaluator.evaluate(program) {
        Ok(mut errors) => {
            for e in errors.iter_mut() {
                if !e.is_finite() || *e < 0.0 {
                    *e = penalty;
                }
            }
            errors
        }
        Err(fault) => {
            warn!("Evaluation fault on {program}: {fault}");
            vec![penalty; evaluator.case_count()]
        }
    }
}
