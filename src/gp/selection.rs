//! Parent selection.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::distribution::DiscreteDistribution;
use super::individual::Individual;
use super::population::Population;
use crate::error::{Result, SearchError};
use crate::schema::{ConfigError, Epsilon, SelectionConfig, SelectionMethod};

/// Picks parents from the evaluated part of a population. Never mutates it.
pub trait Selector: Send + Sync + fmt::Debug {
    fn select_one<'p>(
        &self,
        population: &'p Population,
        rng: &mut dyn RngCore,
    ) -> Result<&'p Individual>;

    fn select<'p>(
        &self,
        population: &'p Population,
        n: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<&'p Individual>> {
        (0..n).map(|_| self.select_one(population, rng)).collect()
    }
}

fn evaluated(population: &Population) -> Result<&[Individual]> {
    let evaluated = population.evaluated();
    if evaluated.is_empty() {
        Err(SearchError::EmptyPopulation)
    } else {
        Ok(evaluated)
    }
}

fn total(individual: &Individual) -> f64 {
    individual.total_error().unwrap_or(f64::INFINITY)
}

/// Fitness-proportionate ("roulette wheel") selection. Each individual is
/// weighted by `1 - total / sum(totals)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitnessProportionate;

impl Selector for FitnessProportionate {
    fn select_one<'p>(
        &self,
        population: &'p Population,
        rng: &mut dyn RngCore,
    ) -> Result<&'p Individual> {
        Ok(self.select(population, 1, rng)?.remove(0))
    }

    fn select<'p>(
        &self,
        population: &'p Population,
        n: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<&'p Individual>> {
        let candidates = evaluated(population)?;
        let sum: f64 = candidates.iter().map(total).sum();
        let weights = candidates.iter().map(|i| 1.0 - total(i) / sum);

        // A zero or non-finite sum, or a single individual, leaves no usable
        // weights; fall back to a uniform draw.
        match WeightedIndex::new(weights) {
            Ok(index) if sum.is_finite() && sum > 0.0 => {
                Ok((0..n).map(|_| &candidates[index.sample(rng)]).collect())
            }
            _ => Ok((0..n)
                .map(|_| &candidates[rng.gen_range(0..candidates.len())])
                .collect()),
        }
    }
}

/// Tournament selection: the best of `size` individuals drawn without
/// replacement.
#[derive(Debug, Clone, Copy)]
pub struct Tournament {
    pub size: usize,
}

impl Default for Tournament {
    fn default() -> Self {
        Self { size: 7 }
    }
}

impl Selector for Tournament {
    fn select_one<'p>(
        &self,
        population: &'p Population,
        rng: &mut dyn RngCore,
    ) -> Result<&'p Individual> {
        let candidates = evaluated(population)?;
        candidates
            .choose_multiple(rng, self.size.max(1))
            .min_by(|a, b| total(a).total_cmp(&total(b)))
            .ok_or(SearchError::EmptyPopulation)
    }
}

/// Lexicase selection.
///
/// Cases are considered in a random order; on each, candidates not within
/// epsilon of the best error on that case are dropped. A random survivor is
/// returned once one remains or the cases run out. Candidates are first
/// reduced to one individual per distinct error vector, which does not change
/// the selection distribution over behaviours.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexicase {
    pub epsilon: Epsilon,
}

impl Lexicase {
    pub fn new(epsilon: Epsilon) -> Self {
        Self { epsilon }
    }

    fn epsilons(&self, population: &Population, n_cases: usize) -> Vec<f64> {
        match self.epsilon {
            Epsilon::None => vec![0.0; n_cases],
            Epsilon::Fixed(e) => vec![e; n_cases],
            Epsilon::Mad => {
                let vectors = population.all_error_vectors();
                (0..n_cases)
                    .map(|case| {
                        let column: Vec<f64> = vectors
                            .iter()
                            .filter_map(|v| v.get(case).copied())
                            .collect();
                        median_absolute_deviation(&column)
                    })
                    .collect()
            }
        }
    }

    fn select_with_epsilons<'p>(
        &self,
        population: &'p Population,
        epsilons: &[f64],
        rng: &mut dyn RngCore,
    ) -> Result<&'p Individual> {
        let mut candidates = one_individual_per_error_vector(evaluated(population)?, rng);
        let mut cases: Vec<usize> = (0..epsilons.len()).collect();
        cases.shuffle(rng);

        for case in cases {
            if candidates.len() <= 1 {
                break;
            }
            let error_on = |i: &Individual| {
                i.error_vector()
                    .and_then(|v| v.get(case).copied())
                    .unwrap_or(f64::INFINITY)
            };
            let best = candidates
                .iter()
                .map(|i| error_on(*i))
                .fold(f64::INFINITY, f64::min);
            let max_error = best + epsilons[case];
            candidates.retain(|i| error_on(*i) <= max_error);
        }

        candidates
            .choose(rng)
            .copied()
            .ok_or(SearchError::EmptyPopulation)
    }
}

impl Selector for Lexicase {
    fn select_one<'p>(
        &self,
        population: &'p Population,
        rng: &mut dyn RngCore,
    ) -> Result<&'p Individual> {
        let n_cases = population.best()?.error_vector().map_or(0, <[f64]>::len);
        let epsilons = self.epsilons(population, n_cases);
        self.select_with_epsilons(population, &epsilons, rng)
    }

    fn select<'p>(
        &self,
        population: &'p Population,
        n: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<&'p Individual>> {
        // epsilons depend only on the population, so compute them once
        let n_cases = population.best()?.error_vector().map_or(0, <[f64]>::len);
        let epsilons = self.epsilons(population, n_cases);
        (0..n)
            .map(|_| self.select_with_epsilons(population, &epsilons, rng))
            .collect()
    }
}

/// The best individuals by total error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Elite;

impl Selector for Elite {
    fn select_one<'p>(
        &self,
        population: &'p Population,
        _rng: &mut dyn RngCore,
    ) -> Result<&'p Individual> {
        population.best()
    }

    fn select<'p>(
        &self,
        population: &'p Population,
        n: usize,
        _rng: &mut dyn RngCore,
    ) -> Result<Vec<&'p Individual>> {
        evaluated(population)?;
        Ok(population.best_n(n).iter().collect())
    }
}

/// Median of |x - median(x)|.
pub fn median_absolute_deviation(values: &[f64]) -> f64 {
    let Some(center) = median(values.to_vec()) else {
        return 0.0;
    };
    let deviations = values.iter().map(|x| (x - center).abs()).collect();
    median(deviations).unwrap_or(0.0)
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    Some(if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    })
}

/// Keep one randomly chosen individual per distinct error vector.
pub fn one_individual_per_error_vector<'p>(
    individuals: &'p [Individual],
    rng: &mut dyn RngCore,
) -> Vec<&'p Individual> {
    let mut shuffled: Vec<&Individual> = individuals.iter().collect();
    shuffled.shuffle(rng);
    let mut seen = HashSet::new();
    shuffled
        .into_iter()
        .filter(|i| {
            let key: Vec<u64> = i
                .error_vector()
                .unwrap_or_default()
                .iter()
                .map(|e| e.to_bits())
                .collect();
            seen.insert(key)
        })
        .collect()
}

/// Build a selector from a named method.
pub fn selector_for(method: &SelectionMethod) -> Arc<dyn Selector> {
    match *method {
        SelectionMethod::Lexicase { epsilon } => Arc::new(Lexicase::new(epsilon)),
        SelectionMethod::Tournament { size } => Arc::new(Tournament { size }),
        SelectionMethod::Roulette => Arc::new(FitnessProportionate),
        SelectionMethod::Elite => Arc::new(Elite),
    }
}

/// Look a selector up by name, e.g. `"epsilon-lexicase"`.
pub fn get_selector(name: &str) -> std::result::Result<Arc<dyn Selector>, ConfigError> {
    SelectionMethod::from_name(name).map(|m| selector_for(&m))
}

/// Everything a search accepts as its parent selection.
#[derive(Clone)]
pub enum SelectorInput {
    Named(SelectionMethod),
    Instance(Arc<dyn Selector>),
    /// A weighted mixture. Sampled once at resolution, or on every selection
    /// call when `dynamic`.
    Mixture {
        options: Vec<(SelectorInput, f64)>,
        dynamic: bool,
    },
}

impl fmt::Debug for SelectorInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(method) => f.debug_tuple("Named").field(method).finish(),
            Self::Instance(selector) => f.debug_tuple("Instance").field(selector).finish(),
            Self::Mixture { options, dynamic } => f
                .debug_struct("Mixture")
                .field("options", options)
                .field("dynamic", dynamic)
                .finish(),
        }
    }
}

impl From<SelectionConfig> for SelectorInput {
    fn from(config: SelectionConfig) -> Self {
        match config {
            SelectionConfig::Named(method) => Self::Named(method),
            SelectionConfig::Mixture { options, dynamic } => Self::Mixture {
                options: options
                    .into_iter()
                    .map(|o| (Self::Named(o.method), o.weight))
                    .collect(),
                dynamic,
            },
        }
    }
}

impl From<SelectionMethod> for SelectorInput {
    fn from(method: SelectionMethod) -> Self {
        Self::Named(method)
    }
}

impl<S: Selector + 'static> From<Arc<S>> for SelectorInput {
    fn from(selector: Arc<S>) -> Self {
        Self::Instance(selector)
    }
}

impl SelectorInput {
    /// Resolve into a selector. Static mixtures are sampled here, once.
    pub fn resolve(
        self,
        rng: &mut dyn RngCore,
    ) -> std::result::Result<ResolvedSelector, ConfigError> {
        match self {
            Self::Named(method) => Ok(ResolvedSelector::Fixed(selector_for(&method))),
            Self::Instance(selector) => Ok(ResolvedSelector::Fixed(selector)),
            Self::Mixture { options, dynamic } => {
                let resolved = options
                    .into_iter()
                    .map(|(input, weight)| Ok((input.resolve(rng)?, weight)))
                    .collect::<std::result::Result<Vec<_>, ConfigError>>()?;
                let distribution = DiscreteDistribution::new(resolved).ok_or_else(|| {
                    ConfigError::InvalidSelection("mixture has no positive weight".to_string())
                })?;
                if dynamic {
                    Ok(ResolvedSelector::Dynamic(distribution))
                } else {
                    Ok(distribution.sample(rng).clone())
                }
            }
        }
    }
}

/// A selector ready for use by the search.
#[derive(Debug, Clone)]
pub enum ResolvedSelector {
    Fixed(Arc<dyn Selector>),
    /// Re-sampled on every selection call.
    Dynamic(DiscreteDistribution<ResolvedSelector>),
}

impl Selector for ResolvedSelector {
    fn select_one<'p>(
        &self,
        population: &'p Population,
        rng: &mut dyn RngCore,
    ) -> Result<&'p Individual> {
        match self {
            Self::Fixed(selector) => selector.select_one(population, rng),
            Self::Dynamic(options) => options.sample(rng).select_one(population, rng),
        }
    }

    fn select<'p>(
        &self,
        population: &'p Population,
        n: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<&'p Individual>> {
        match self {
            Self::Fixed(selector) => selector.select(population, n, rng),
            Self::Dynamic(options) => options.sample(rng).select(population, n, rng),
        }
    }
}
