//! Individuals: a genome, its lazily compiled program, and its errors.

use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};

use crate::error::{Result, SearchError};
use crate::push::{Genome, Program, ProgramSignature};

use super::evaluation::{Evaluator, error_vector};

/// A candidate solution.
///
/// The program is compiled on first access and cached. The error vector is
/// set at most once; an unevaluated individual has no total error and is
/// incomparable.
#[derive(Debug, Clone)]
pub struct Individual {
    genome: Genome,
    signature: Arc<ProgramSignature>,
    program: OnceLock<Program>,
    error_vector: Option<Vec<f64>>,
    total_error: Option<f64>,
}

impl Individual {
    pub fn new(genome: Genome, signature: Arc<ProgramSignature>) -> Self {
        Self {
            genome,
            signature,
            program: OnceLock::new(),
            error_vector: None,
            total_error: None,
        }
    }

    /// An individual whose errors are already known.
    pub fn with_errors(genome: Genome, signature: Arc<ProgramSignature>, errors: Vec<f64>) -> Self {
        let mut individual = Self::new(genome, signature);
        individual.total_error = Some(errors.iter().sum());
        individual.error_vector = Some(errors);
        individual
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn signature(&self) -> &Arc<ProgramSignature> {
        &self.signature
    }

    pub fn program(&self) -> &Program {
        self.program
            .get_or_init(|| Program::compile(&self.genome, Arc::clone(&self.signature)))
    }

    pub fn error_vector(&self) -> Option<&[f64]> {
        self.error_vector.as_deref()
    }

    pub fn total_error(&self) -> Option<f64> {
        self.total_error
    }

    pub fn is_evaluated(&self) -> bool {
        self.error_vector.is_some()
    }

    /// Record the error vector. Fails if one was already recorded.
    pub fn set_error_vector(&mut self, errors: Vec<f64>) -> Result<()> {
        if self.error_vector.is_some() {
            return Err(SearchError::AlreadyEvaluated);
        }
        self.total_error = Some(errors.iter().sum());
        self.error_vector = Some(errors);
        Ok(())
    }

    /// Evaluate with `evaluator`, absorbing faults into penalty errors.
    pub fn evaluate(&mut self, evaluator: &dyn Evaluator) -> Result<()> {
        if self.is_evaluated() {
            return Err(SearchError::AlreadyEvaluated);
        }
        let errors = error_vector(evaluator, self.program());
        self.set_error_vector(errors)
    }

    /// Order by total error. `None` if either side is unevaluated.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.total_error?.total_cmp(&other.total_error?))
    }
}
