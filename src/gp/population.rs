//! Populations of individuals kept sorted by total error.

use std::collections::HashSet;

use log::warn;

use super::evaluation::{Evaluator, error_vector};
use super::individual::Individual;
use super::parallel::ParallelContext;
use crate::error::{Result, SearchError};

/// Evaluated individuals are always sorted ascending by total error, ties in
/// insertion order. Unevaluated individuals wait in insertion order until
/// the next evaluation.
#[derive(Debug, Clone, Default)]
pub struct Population {
    unevaluated: Vec<Individual>,
    evaluated: Vec<Individual>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_individuals(individuals: impl IntoIterator<Item = Individual>) -> Self {
        let mut population = Self::new();
        for individual in individuals {
            population.add(individual);
        }
        population
    }

    pub fn add(&mut self, individual: Individual) -> &mut Self {
        if individual.is_evaluated() {
            self.insert_sorted(individual);
        } else {
            self.unevaluated.push(individual);
        }
        self
    }

    fn insert_sorted(&mut self, individual: Individual) {
        let total = individual.total_error().unwrap_or(f64::INFINITY);
        let at = self
            .evaluated
            .partition_point(|i| i.total_error().is_some_and(|t| t <= total));
        self.evaluated.insert(at, individual);
    }

    /// Evaluate every unevaluated individual on the calling thread.
    pub fn evaluate(&mut self, evaluator: &dyn Evaluator) -> Result<()> {
        for mut individual in std::mem::take(&mut self.unevaluated) {
            individual.evaluate(evaluator)?;
            self.insert_sorted(individual);
        }
        Ok(())
    }

    /// Evaluate every unevaluated individual on the worker pool.
    ///
    /// Results are merged as they complete. If a task fails, the successful
    /// results are still merged and the first failure is returned.
    pub fn parallel_evaluate(&mut self, context: &ParallelContext) -> Result<()> {
        let items = std::mem::take(&mut self.unevaluated)
            .into_iter()
            .map(|individual| (individual.genome().to_string(), individual))
            .collect();

        let results = context.dispatch_unordered(items, |shared, mut individual: Individual| {
            let errors = error_vector(shared.evaluator.as_ref(), individual.program());
            individual.set_error_vector(errors).map(|()| individual)
        });

        let mut first_failure = None;
        for result in results {
            match result.and_then(|r| r) {
                Ok(individual) => self.insert_sorted(individual),
                Err(e) => {
                    warn!("Parallel evaluation failed: {e}");
                    first_failure.get_or_insert(e);
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    pub fn best(&self) -> Result<&Individual> {
        self.evaluated.first().ok_or(SearchError::EmptyPopulation)
    }

    pub fn best_n(&self, n: usize) -> &[Individual] {
        &self.evaluated[..n.min(self.evaluated.len())]
    }

    /// Evaluated individuals, best first.
    pub fn evaluated(&self) -> &[Individual] {
        &self.evaluated
    }

    pub fn unevaluated(&self) -> &[Individual] {
        &self.unevaluated
    }

    /// Evaluated individuals first, then unevaluated ones.
    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.evaluated.iter().chain(self.unevaluated.iter())
    }

    pub fn len(&self) -> usize {
        self.evaluated.len() + self.unevaluated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all_error_vectors(&self) -> Vec<&[f64]> {
        self.evaluated.iter().filter_map(Individual::error_vector).collect()
    }

    pub fn all_total_errors(&self) -> Vec<f64> {
        self.evaluated.iter().filter_map(Individual::total_error).collect()
    }

    /// Median total error of the evaluated individuals.
    pub fn median_error(&self) -> Option<f64> {
        // already sorted
        let totals = self.all_total_errors();
        let n = totals.len();
        match n {
            0 => None,
            _ if n % 2 == 1 => Some(totals[n / 2]),
            _ => Some((totals[n / 2 - 1] + totals[n / 2]) / 2.0),
        }
    }

    /// Distinct error vectors as a fraction of the population size.
    pub fn error_diversity(&self) -> f64 {
        let distinct: HashSet<Vec<u64>> = self
            .all_error_vectors()
            .into_iter()
            .map(|v| v.iter().map(|e| e.to_bits()).collect())
            .collect();
        self.fraction(distinct.len())
    }

    /// Distinct genomes as a fraction of the population size.
    pub fn genome_diversity(&self) -> f64 {
        let distinct: HashSet<_> = self.iter().map(Individual::genome).collect();
        self.fraction(distinct.len())
    }

    /// Distinct compiled programs as a fraction of the population size.
    pub fn program_diversity(&self) -> f64 {
        let distinct: HashSet<_> = self.iter().map(|i| &i.program().code).collect();
        self.fraction(distinct.len())
    }

    pub fn mean_genome_length(&self) -> f64 {
        let total: usize = self.iter().map(|i| i.genome().len()).sum();
        self.fraction(total)
    }

    fn fraction(&self, count: usize) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            count as f64 / self.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::{EvaluationFault, FnEvaluator, GeneSpawner};
    use crate::push::{Gene, Genome, InstructionSet, Literal, Program, ProgramSignature};
    use crate::schema::SpawnerConfig;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn signature() -> Arc<ProgramSignature> {
        Arc::new(ProgramSignature::new(0, &["int"]))
    }

    fn genome_of_len(n: usize) -> Genome {
        (0..n).map(|i| Gene::literal(Literal::Int(i as i64))).collect()
    }

    /// Scores a program by its top-level code length.
    struct LengthEvaluator;

    impl Evaluator for LengthEvaluator {
        fn evaluate(&self, program: &Program) -> std::result::Result<Vec<f64>, EvaluationFault> {
            Ok(vec![program.code.len() as f64])
        }

        fn case_count(&self) -> usize {
            1
        }
    }

    fn length_evaluator() -> LengthEvaluator {
        LengthEvaluator
    }

    fn population_of_lengths(lengths: &[usize]) -> Population {
        Population::from_individuals(
            lengths
                .iter()
                .map(|&n| Individual::new(genome_of_len(n), signature())),
        )
    }

    #[test]
    fn test_evaluate_sorts_by_total_error() {
        let mut pop = population_of_lengths(&[3, 5, 2, 4]);
        assert_eq!(pop.unevaluated().len(), 4);
        pop.evaluate(&length_evaluator()).unwrap();
        assert!(pop.unevaluated().is_empty());
        assert_eq!(pop.all_total_errors(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(pop.best().unwrap().total_error(), Some(2.0));
        assert_eq!(pop.best_n(2).len(), 2);
        assert_eq!(pop.best_n(10).len(), 4);
        assert_eq!(pop.median_error(), Some(3.5));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let mut pop = population_of_lengths(&[1, 2]);
        let evaluator = length_evaluator();
        pop.evaluate(&evaluator).unwrap();
        let before = pop.all_total_errors();
        pop.evaluate(&evaluator).unwrap();
        assert_eq!(pop.all_total_errors(), before);
        assert_eq!(pop.len(), 2);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut pop = Population::new();
        for tag in 0..3 {
            let genome: Genome = vec![Gene::literal(Literal::Int(tag))].into();
            pop.add(Individual::with_errors(genome, signature(), vec![1.0]));
        }
        let order: Vec<_> = pop.iter().map(|i| i.genome()[0].clone()).collect();
        assert_eq!(
            order,
            (0..3).map(|t| Gene::literal(Literal::Int(t))).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_best_of_empty_population() {
        let pop = population_of_lengths(&[1]);
        assert!(matches!(pop.best(), Err(SearchError::EmptyPopulation)));
        assert_eq!(pop.median_error(), None);
    }

    #[test]
    fn test_diversity_bounds() {
        let mut distinct = population_of_lengths(&[1, 2, 3, 4]);
        distinct.evaluate(&length_evaluator()).unwrap();
        assert_eq!(distinct.error_diversity(), 1.0);
        assert_eq!(distinct.genome_diversity(), 1.0);
        assert_eq!(distinct.program_diversity(), 1.0);
        assert_eq!(distinct.mean_genome_length(), 2.5);

        let mut clones = population_of_lengths(&[2, 2, 2, 2]);
        clones.evaluate(&length_evaluator()).unwrap();
        assert_eq!(clones.error_diversity(), 0.25);
        assert_eq!(clones.genome_diversity(), 0.25);
        assert_eq!(clones.program_diversity(), 0.25);

        let empty = Population::new();
        assert_eq!(empty.genome_diversity(), 0.0);
        assert_eq!(empty.mean_genome_length(), 0.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let lengths = [7, 3, 9, 1, 4, 8, 2, 6, 5, 0];
        let mut sequential = population_of_lengths(&lengths);
        sequential.evaluate(&length_evaluator()).unwrap();

        let spawner = GeneSpawner::new(&SpawnerConfig::default(), &InstructionSet::core()).unwrap();
        let context =
            ParallelContext::new(Some(4), Arc::new(spawner), Arc::new(length_evaluator())).unwrap();
        let mut parallel = population_of_lengths(&lengths);
        parallel.parallel_evaluate(&context).unwrap();

        assert_eq!(parallel.all_total_errors(), sequential.all_total_errors());
        let genomes = |p: &Population| p.iter().map(|i| i.genome().clone()).collect::<Vec<_>>();
        assert_eq!(genomes(&parallel), genomes(&sequential));
    }

    #[test]
    fn test_parallel_failure_keeps_successes() {
        let spawner = GeneSpawner::new(&SpawnerConfig::default(), &InstructionSet::core()).unwrap();
        let evaluator = FnEvaluator::new(1, |p: &Program| {
            if p.code.len() == 3 {
                panic!("interpreter crashed");
            }
            Ok(vec![p.code.len() as f64])
        });
        let context = ParallelContext::new(Some(2), Arc::new(spawner), Arc::new(evaluator)).unwrap();
        let mut pop = population_of_lengths(&[1, 3, 2]);
        let err = pop.parallel_evaluate(&context).unwrap_err();
        assert!(matches!(err, SearchError::PoolFailure { ref genome, .. } if genome == "[0 1 2]"));
        assert_eq!(pop.all_total_errors(), vec![1.0, 2.0]);
    }

    proptest! {
        #[test]
        fn prop_evaluated_always_sorted(totals in prop::collection::vec(0.0f64..1000.0, 0..40)) {
            let mut pop = Population::new();
            for (i, t) in totals.iter().enumerate() {
                pop.add(Individual::with_errors(genome_of_len(i % 5), signature(), vec![*t]));
            }
            let sorted = pop.all_total_errors();
            prop_assert_eq!(sorted.len(), totals.len());
            prop_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
