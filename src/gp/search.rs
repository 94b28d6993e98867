//! The generational search driver.
//!
//! One loop serves both strategies: evaluate, track the best individual seen,
//! check termination, then select parents and vary them into a fresh
//! population. What "vary" means is decided once, at construction, by the
//! [`VariationStrategy`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::archive::KnowledgeArchive;
use super::evaluation::Evaluator;
use super::individual::Individual;
use super::parallel::ParallelContext;
use super::population::Population;
use super::selection::{ResolvedSelector, Selector, SelectorInput};
use super::simplify::{GenomeSimplifier, Simplifier};
use super::spawner::{GeneSpawner, GenomeSize};
use super::variation::{VariationContext, VariationStrategy};
use crate::error::{Result, SearchError};
use crate::push::{Genome, InstructionSet, ProgramSignature};
use crate::schema::{AlgorithmConfig, ConfigError, Parallelism, RunConfig, SearchConfig};

/// Look a search strategy up by name (`"UMAD"` or `"UMADR"`).
pub fn search_algorithm(name: &str) -> std::result::Result<AlgorithmConfig, ConfigError> {
    AlgorithmConfig::from_name(name)
}

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The best total error reached the error threshold.
    Solved,
    /// The generation budget ran out.
    Exhausted,
    /// Stopped through the cancel handle.
    Cancelled,
}

/// Where the search loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Spawning the initial population.
    Initializing,
    /// Evaluating the current population.
    Evaluating,
    /// Selecting parents and producing children.
    Varying,
    /// Stopped; `run` will not advance any further.
    Terminated(Termination),
}

/// Per-generation statistics, logged and passed to progress callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// Generation number, starting at 1.
    pub generation: usize,
    /// Lowest total error in this generation.
    pub best_total_error: f64,
    /// Lowest total error over all generations so far.
    pub best_seen_total_error: f64,
    /// Median total error of this generation.
    pub median_error: f64,
    /// Fraction of distinct error vectors.
    pub error_diversity: f64,
    /// Fraction of distinct genomes.
    pub genome_diversity: f64,
    /// Mean genome length in genes.
    pub mean_genome_length: f64,
}

/// Generational UMAD/UMADR search over a population of genomes.
///
/// Owns the worker pool (if any) and releases it when the search ends,
/// successfully or not, or when dropped.
pub struct SearchAlgorithm {
    config: SearchConfig,
    signature: Arc<ProgramSignature>,
    spawner: Arc<GeneSpawner>,
    evaluator: Arc<dyn Evaluator>,
    strategy: VariationStrategy,
    selector: ResolvedSelector,
    archive: Option<KnowledgeArchive>,
    simplifier: Box<dyn Simplifier>,
    parallel: Option<ParallelContext>,
    rng: StdRng,
    population: Population,
    generation: usize,
    steps_taken: usize,
    best_seen: Option<Individual>,
    state: SearchState,
    cancelled: Arc<AtomicBool>,
}

impl SearchAlgorithm {
    /// Validate `config`, start the worker pool if one is configured, and
    /// spawn the initial population.
    ///
    /// `instructions` resolves token archives and archive-specific spawners.
    pub fn new(
        config: SearchConfig,
        signature: ProgramSignature,
        spawner: GeneSpawner,
        instructions: &InstructionSet,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Self> {
        config.validate()?;
        signature.execution.validate()?;

        let mut rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let strategy = VariationStrategy::from_config(&config.algorithm)?;
        let selector = SelectorInput::from(config.selection.clone()).resolve(&mut rng)?;
        let archive = if strategy.needs_archive() {
            Some(KnowledgeArchive::from_config(
                &config.archive,
                instructions,
                &spawner,
                &mut rng,
            )?)
        } else {
            None
        };

        let signature = Arc::new(signature);
        let spawner = Arc::new(spawner);
        let parallel = match config.parallelism {
            Parallelism::Sequential => None,
            Parallelism::Pool { workers } => Some(ParallelContext::new(
                workers,
                Arc::clone(&spawner),
                Arc::clone(&evaluator),
            )?),
        };
        let simplifier = Box::new(GenomeSimplifier::new(
            Arc::clone(&evaluator),
            Arc::clone(&signature),
        ));

        let mut search = Self {
            config,
            signature,
            spawner,
            evaluator,
            strategy,
            selector,
            archive,
            simplifier,
            parallel,
            rng,
            population: Population::new(),
            generation: 0,
            steps_taken: 0,
            best_seen: None,
            state: SearchState::Initializing,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        search.init_population()?;
        search.state = SearchState::Evaluating;
        Ok(search)
    }

    /// Build everything from a [`RunConfig`].
    pub fn from_run_config(
        run: RunConfig,
        instructions: &InstructionSet,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Self> {
        run.validate()?;
        let spawner = GeneSpawner::new(&run.spawner, instructions)?;
        Self::new(run.search, run.signature, spawner, instructions, evaluator)
    }

    /// Replace the configured parent selection.
    pub fn with_selector(mut self, selector: impl Into<SelectorInput>) -> Result<Self> {
        self.selector = selector.into().resolve(&mut self.rng)?;
        Ok(self)
    }

    /// Replace the knowledge archive built from the config.
    pub fn with_archive(mut self, archive: KnowledgeArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Replace the simplifier applied to the final best individual.
    pub fn with_simplifier(mut self, simplifier: Box<dyn Simplifier>) -> Self {
        self.simplifier = simplifier;
        self
    }

    /// Replace the initial population with these genomes.
    ///
    /// The population spawned by [`new`](Self::new) is discarded, so this is
    /// meant for small seeded populations where that spawn is cheap.
    /// Configure a matching `population_size` to keep the spawn small.
    pub fn with_initial_population(mut self, genomes: impl IntoIterator<Item = Genome>) -> Self {
        self.population = Population::from_individuals(
            genomes
                .into_iter()
                .map(|g| Individual::new(g, Arc::clone(&self.signature))),
        );
        self
    }

    /// Handle that stops the search after the current generation.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn init_population(&mut self) -> Result<()> {
        let size = GenomeSize::from(self.config.initial_genome_size);
        // one seed per individual keeps sequential and pooled spawning identical
        let seeds: Vec<u64> = (0..self.config.population_size)
            .map(|_| self.rng.r#gen())
            .collect();

        self.population = match &self.parallel {
            Some(ctx) => {
                let signature = &self.signature;
                let items = seeds
                    .into_iter()
                    .enumerate()
                    .map(|(i, seed)| (format!("initial individual {i}"), seed))
                    .collect();
                let spawned = ctx.dispatch_unordered(items, |shared, seed: u64| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let genome = shared.spawner.spawn_genome(size, &mut rng);
                    Individual::new(genome, Arc::clone(signature))
                });
                Population::from_individuals(spawned.into_iter().collect::<Result<Vec<_>>>()?)
            }
            None => Population::from_individuals(seeds.into_iter().map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let genome = self.spawner.spawn_genome(size, &mut rng);
                Individual::new(genome, Arc::clone(&self.signature))
            })),
        };
        debug!(
            "Initialized population of {} ({})",
            self.population.len(),
            self.strategy.name()
        );
        Ok(())
    }

    /// Select parents and vary them into a fresh population of
    /// `population_size` children. Assumes the current population is
    /// evaluated.
    pub fn step(&mut self) -> Result<()> {
        self.state = SearchState::Varying;
        let ctx = VariationContext {
            archive: self.archive.as_ref(),
        };
        if self.strategy.needs_archive() && ctx.archive.is_none() {
            return Err(SearchError::MissingArchive);
        }

        let n_parents = self.strategy.num_parents();
        let mut next = Population::new();
        for _ in 0..self.config.population_size {
            let parents: Vec<Genome> = self
                .selector
                .select(&self.population, n_parents, &mut self.rng)?
                .into_iter()
                .map(|i| i.genome().clone())
                .collect();
            let child = self.strategy.produce_child(
                &parents,
                &self.spawner,
                &mut self.rng,
                &ctx,
                self.config.max_genome_size,
                self.config.genome_size_policy,
            )?;
            next.add(Individual::new(child, Arc::clone(&self.signature)));
        }

        self.population = next;
        self.steps_taken += 1;
        self.state = SearchState::Evaluating;
        Ok(())
    }

    fn evaluate(&mut self) -> Result<()> {
        match &self.parallel {
            Some(ctx) => self.population.parallel_evaluate(ctx),
            None => self.population.evaluate(self.evaluator.as_ref()),
        }
    }

    /// One generation: evaluate, update the best seen, report, check
    /// termination and, if the search goes on, build the next population.
    fn full_step(
        &mut self,
        callback: &mut dyn FnMut(&GenerationReport),
    ) -> Result<Option<Termination>> {
        self.generation += 1;
        self.state = SearchState::Evaluating;
        self.evaluate()?;

        let best = self.population.best()?;
        if self
            .best_seen
            .as_ref()
            .is_none_or(|seen| best.total_error() < seen.total_error())
        {
            self.best_seen = Some(best.clone());
        }

        if let Some(report) = self.report() {
            info!(
                "Generation {}: best {:.4}, best seen {:.4}, median {:.4}, error diversity {:.3}, genome diversity {:.3}, mean length {:.1}",
                report.generation,
                report.best_total_error,
                report.best_seen_total_error,
                report.median_error,
                report.error_diversity,
                report.genome_diversity,
                report.mean_genome_length
            );
            callback(&report);
        }

        if self.is_solved() {
            return Ok(Some(Termination::Solved));
        }
        if self.generation >= self.config.max_generations {
            return Ok(Some(Termination::Exhausted));
        }
        if self.cancelled.load(Ordering::Relaxed) {
            return Ok(Some(Termination::Cancelled));
        }

        self.step()?;
        Ok(None)
    }

    fn report(&self) -> Option<GenerationReport> {
        let best = self.population.best().ok()?;
        Some(GenerationReport {
            generation: self.generation,
            best_total_error: best.total_error()?,
            best_seen_total_error: self.best_seen.as_ref()?.total_error()?,
            median_error: self.population.median_error()?,
            error_diversity: self.population.error_diversity(),
            genome_diversity: self.population.genome_diversity(),
            mean_genome_length: self.population.mean_genome_length(),
        })
    }

    /// Run until termination, then simplify the best individual seen.
    pub fn run(&mut self) -> Result<Individual> {
        self.run_with_callback(|_| {})
    }

    /// Like [`run`](Self::run), calling `callback` after each generation is
    /// evaluated.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<Individual>
    where
        F: FnMut(&GenerationReport),
    {
        let outcome = self.run_loop(&mut callback);
        self.tear_down();
        let termination = outcome?;
        self.state = SearchState::Terminated(termination);
        info!(
            "Search terminated ({termination:?}) after {} generations",
            self.generation
        );
        self.finalize()
    }

    fn run_loop(&mut self, callback: &mut dyn FnMut(&GenerationReport)) -> Result<Termination> {
        if let SearchState::Terminated(termination) = self.state {
            return Ok(termination);
        }
        loop {
            if let Some(termination) = self.full_step(callback)? {
                return Ok(termination);
            }
        }
    }

    fn finalize(&mut self) -> Result<Individual> {
        let best = self.best_seen.as_ref().ok_or(SearchError::EmptyPopulation)?;
        let errors = best.error_vector().unwrap_or_default();
        let (genome, errors) = self.simplifier.simplify(
            best.genome(),
            errors,
            self.config.simplification_steps,
            &mut self.rng,
        );
        let simplified = Individual::with_errors(genome, Arc::clone(&self.signature), errors);
        self.best_seen = Some(simplified.clone());
        Ok(simplified)
    }

    /// Release the worker pool. Safe to call more than once.
    pub fn tear_down(&mut self) {
        if let Some(ctx) = self.parallel.take() {
            ctx.close();
        }
    }

    /// Number of generations evaluated so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Number of completed selection-and-variation steps.
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Best individual over all generations, simplified once the run ends.
    pub fn best_seen(&self) -> Option<&Individual> {
        self.best_seen.as_ref()
    }

    /// The current population.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Current state of the search loop.
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Why the search stopped, once it has.
    pub fn termination(&self) -> Option<Termination> {
        match self.state {
            SearchState::Terminated(t) => Some(t),
            _ => None,
        }
    }

    /// The variation strategy chosen at construction.
    pub fn strategy(&self) -> &VariationStrategy {
        &self.strategy
    }

    /// Knowledge archive, present for UMADR.
    pub fn archive(&self) -> Option<&KnowledgeArchive> {
        self.archive.as_ref()
    }

    /// True once the best seen total error is within the error threshold.
    pub fn is_solved(&self) -> bool {
        self.best_seen
            .as_ref()
            .and_then(Individual::total_error)
            .is_some_and(|e| e <= self.config.error_threshold)
    }
}

impl Drop for SearchAlgorithm {
    fn drop(&mut self) {
        self.tear_down();
    }
}
