//! Genome simplification by random gene removal.

use std::sync::Arc;

use log::debug;
use rand::seq::index;
use rand::{Rng, RngCore};

use super::evaluation::{Evaluator, error_vector};
use crate::push::{Genome, Program, ProgramSignature};

/// Shrinks a genome without making it worse.
pub trait Simplifier: Send + Sync {
    /// Returns a genome whose total error is no greater than that of
    /// `errors`, together with its error vector.
    fn simplify(
        &self,
        genome: &Genome,
        errors: &[f64],
        max_steps: usize,
        rng: &mut dyn RngCore,
    ) -> (Genome, Vec<f64>);
}

/// Each step removes 1 to 3 random genes and keeps the result if its total
/// error does not increase.
pub struct GenomeSimplifier {
    evaluator: Arc<dyn Evaluator>,
    signature: Arc<ProgramSignature>,
}

impl GenomeSimplifier {
    pub fn new(evaluator: Arc<dyn Evaluator>, signature: Arc<ProgramSignature>) -> Self {
        Self {
            evaluator,
            signature,
        }
    }

    fn errors_of(&self, genome: &Genome) -> Vec<f64> {
        let program = Program::compile(genome, Arc::clone(&self.signature));
        error_vector(self.evaluator.as_ref(), &program)
    }
}

impl Simplifier for GenomeSimplifier {
    fn simplify(
        &self,
        genome: &Genome,
        errors: &[f64],
        max_steps: usize,
        rng: &mut dyn RngCore,
    ) -> (Genome, Vec<f64>) {
        let mut best = genome.clone();
        let mut best_errors = errors.to_vec();
        let mut best_total: f64 = errors.iter().sum();

        for _ in 0..max_steps {
            if best.is_empty() {
                break;
            }
            let n_remove = rng.gen_range(1..=3).min(best.len());
            let removed = index::sample(rng, best.len(), n_remove);
            let mut keep = vec![true; best.len()];
            for i in removed.iter() {
                keep[i] = false;
            }
            let candidate: Genome = best
                .iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(g, _)| g.clone())
                .collect();

            let candidate_errors = self.errors_of(&candidate);
            let total: f64 = candidate_errors.iter().sum();
            if total <= best_total {
                best = candidate;
                best_errors = candidate_errors;
                best_total = total;
            }
        }

        debug!(
            "Simplified genome from {} to {} genes (total error {best_total})",
            genome.len(),
            best.len()
        );
        (best, best_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::FnEvaluator;
    use crate::push::{Code, Gene, Literal};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn signature() -> Arc<ProgramSignature> {
        Arc::new(ProgramSignature::new(0, &["int"]))
    }

    /// Error 0 if the program contains the literal 7, else 10.
    fn needs_seven() -> Arc<dyn Evaluator> {
        Arc::new(FnEvaluator::new(1, |p: &Program| {
            let found = p
                .code
                .atoms()
                .iter()
                .any(|c| matches!(c, Code::Literal(Literal::Int(7))));
            Ok(vec![if found { 0.0 } else { 10.0 }])
        }))
    }

    #[test]
    fn test_removes_useless_genes() {
        let genome: Genome = (0..10)
            .map(|i| Gene::literal(Literal::Int(if i == 4 { 7 } else { i })))
            .collect();
        let simplifier = GenomeSimplifier::new(needs_seven(), signature());
        let mut rng = StdRng::seed_from_u64(0);
        let (simplified, errors) = simplifier.simplify(&genome, &[0.0], 500, &mut rng);
        assert_eq!(errors, vec![0.0]);
        assert_eq!(simplified.len(), 1);
        assert_eq!(simplified[0], Gene::literal(Literal::Int(7)));
    }

    #[test]
    fn test_never_worse() {
        let genome: Genome = (0..6).map(|i| Gene::literal(Literal::Int(i))).collect();
        let simplifier = GenomeSimplifier::new(needs_seven(), signature());
        let mut rng = StdRng::seed_from_u64(1);
        let (_, errors) = simplifier.simplify(&genome, &[10.0], 50, &mut rng);
        assert!(errors.iter().sum::<f64>() <= 10.0);
    }

    #[test]
    fn test_zero_steps_is_identity() {
        let genome: Genome = vec![Gene::Close].into();
        let simplifier = GenomeSimplifier::new(needs_seven(), signature());
        let mut rng = StdRng::seed_from_u64(2);
        let (simplified, errors) = simplifier.simplify(&genome, &[3.0], 0, &mut rng);
        assert_eq!(simplified, genome);
        assert_eq!(errors, vec![3.0]);
    }
}
