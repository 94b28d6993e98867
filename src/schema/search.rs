//! Search configuration types.
//!
//! These mirror the knobs of a generational UMAD/UMADR run: population and
//! termination settings, the variation strategy, parent selection, the
//! knowledge archive used by replacement mutation, and parallelism.

use serde::{Deserialize, Serialize};

use super::{ConfigError, SpawnerConfig};
use crate::push::{Genome, ProgramSignature, Token};

/// Top-level configuration for a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of individuals per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Generation budget.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// The run is solved once the best total error is at or below this.
    #[serde(default)]
    pub error_threshold: f64,
    /// Inclusive genome length range for the initial population.
    #[serde(default = "default_initial_genome_size")]
    pub initial_genome_size: (usize, usize),
    /// Cap on child genome length.
    #[serde(default)]
    pub max_genome_size: Option<usize>,
    /// How an over-long child is brought under `max_genome_size`.
    #[serde(default)]
    pub genome_size_policy: GenomeSizePolicy,
    /// Simplifier budget applied to the final best genome.
    #[serde(default = "default_simplification_steps")]
    pub simplification_steps: usize,
    /// Variation strategy and its rates.
    #[serde(default)]
    pub algorithm: AlgorithmConfig,
    /// Parent selection.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Knowledge archive for replacement mutation (UMADR only).
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub parallelism: Parallelism,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            max_generations: default_max_generations(),
            error_threshold: 0.0,
            initial_genome_size: default_initial_genome_size(),
            max_genome_size: None,
            genome_size_policy: GenomeSizePolicy::default(),
            simplification_steps: default_simplification_steps(),
            algorithm: AlgorithmConfig::default(),
            selection: SelectionConfig::default(),
            archive: ArchiveConfig::default(),
            parallelism: Parallelism::default(),
            random_seed: None,
        }
    }
}

fn default_population_size() -> usize {
    500
}
fn default_max_generations() -> usize {
    100
}
fn default_initial_genome_size() -> (usize, usize) {
    (10, 50)
}
fn default_simplification_steps() -> usize {
    2000
}

/// Variation strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlgorithmConfig {
    /// Uniform Mutation by Addition and Deletion.
    #[serde(rename = "UMAD")]
    Umad {
        #[serde(default = "default_addition_rate")]
        addition_rate: f64,
        #[serde(default = "default_deletion_rate")]
        deletion_rate: f64,
    },
    /// UMAD followed by replacement mutation from the knowledge archive.
    #[serde(rename = "UMADR")]
    Umadr {
        #[serde(default = "default_addition_rate")]
        addition_rate: f64,
        #[serde(default = "default_deletion_rate")]
        deletion_rate: f64,
        #[serde(default = "default_replacement_rate")]
        replacement_rate: f64,
        #[serde(default)]
        replacement_scope: ReplacementScope,
    },
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self::Umad {
            addition_rate: default_addition_rate(),
            deletion_rate: default_deletion_rate(),
        }
    }
}

fn default_addition_rate() -> f64 {
    0.09
}
fn default_deletion_rate() -> f64 {
    0.0826
}
fn default_replacement_rate() -> f64 {
    0.1
}

/// Names accepted by [`AlgorithmConfig::from_name`].
pub const SEARCH_ALGORITHMS: &[&str] = &["UMAD", "UMADR"];

impl AlgorithmConfig {
    /// Look a strategy up by name, with default rates.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "UMAD" => Ok(Self::default()),
            "UMADR" => Ok(Self::Umadr {
                addition_rate: default_addition_rate(),
                deletion_rate: default_deletion_rate(),
                replacement_rate: default_replacement_rate(),
                replacement_scope: ReplacementScope::default(),
            }),
            other => Err(ConfigError::UnknownSearchAlgorithm {
                name: other.to_string(),
                supported: SEARCH_ALGORITHMS,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Umad { .. } => "UMAD",
            Self::Umadr { .. } => "UMADR",
        }
    }
}

/// What a single replacement event swaps in from an archive genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum ReplacementScope {
    /// One gene drawn uniformly from the archive genome.
    #[default]
    Gene,
    /// A contiguous run of 1..=max_len genes from the archive genome.
    Fragment { max_len: usize },
}

/// Policy for children longer than `max_genome_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum GenomeSizePolicy {
    /// Keep the leading `max_genome_size` genes.
    #[default]
    Truncate,
    /// Re-run variation up to `attempts` times, truncating the last attempt.
    Resample { attempts: usize },
}

/// Epsilon used by lexicase selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum Epsilon {
    /// Plain lexicase: only the elite on each case survive.
    #[default]
    None,
    /// Per-case median absolute deviation of the population's errors.
    Mad,
    /// A fixed tolerance on every case.
    Fixed(f64),
}

/// Named parent selection methods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    Lexicase {
        #[serde(default)]
        epsilon: Epsilon,
    },
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Fitness-proportionate ("roulette wheel") selection.
    Roulette,
    /// The best individuals by total error.
    Elite,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Lexicase {
            epsilon: Epsilon::None,
        }
    }
}

fn default_tournament_size() -> usize {
    7
}

/// Names accepted by [`SelectionMethod::from_name`].
pub const SELECTORS: &[&str] = &["roulette", "tournament", "lexicase", "epsilon-lexicase", "elite"];

impl SelectionMethod {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "roulette" => Ok(Self::Roulette),
            "tournament" => Ok(Self::Tournament {
                size: default_tournament_size(),
            }),
            "lexicase" => Ok(Self::Lexicase {
                epsilon: Epsilon::None,
            }),
            "epsilon-lexicase" => Ok(Self::Lexicase {
                epsilon: Epsilon::Mad,
            }),
            "elite" => Ok(Self::Elite),
            other => Err(ConfigError::UnknownSelector {
                name: other.to_string(),
                supported: SELECTORS,
            }),
        }
    }
}

/// Serializable parent selection input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SelectionConfig {
    /// A single named method.
    Named(SelectionMethod),
    /// A weighted mixture, sampled once at construction unless `dynamic`.
    Mixture {
        options: Vec<WeightedSelection>,
        #[serde(default)]
        dynamic: bool,
    },
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::Named(SelectionMethod::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSelection {
    pub method: SelectionMethod,
    pub weight: f64,
}

/// Provenance of the knowledge archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ArchiveConfig {
    /// A single empty genome.
    #[default]
    Empty,
    /// Genomes previously written with `KnowledgeArchive::save`.
    File { path: String },
    /// Genomes given inline.
    Incode { genome_set: Vec<Genome> },
    /// Token sequences resolved against the instruction set.
    Yaml { genome_set: Vec<Vec<Token>> },
    /// Randomly spawned genomes.
    Random {
        genome_set_size: usize,
        genome_length: (usize, usize),
        /// Overrides the search spawner, e.g. to draw from other stacks.
        #[serde(default)]
        spawner: Option<SpawnerConfig>,
    },
}

/// Execution mode for spawning and evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Parallelism {
    /// Everything on the calling thread.
    Sequential,
    /// A bounded worker pool; `None` sizes it to the available parallelism.
    Pool {
        #[serde(default)]
        workers: Option<usize>,
    },
}

impl Default for Parallelism {
    fn default() -> Self {
        Self::Pool { workers: None }
    }
}

impl SearchConfig {
    /// Validate search settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulationSize);
        }

        let (min, max) = self.initial_genome_size;
        if min > max {
            return Err(ConfigError::InvalidGenomeSize(format!(
                "initial genome size min ({min}) > max ({max})"
            )));
        }
        if let GenomeSizePolicy::Resample { attempts: 0 } = self.genome_size_policy {
            return Err(ConfigError::InvalidGenomeSize(
                "resample policy needs at least one attempt".to_string(),
            ));
        }

        let check_rate = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidRate { name, value })
            }
        };
        match self.algorithm {
            AlgorithmConfig::Umad {
                addition_rate,
                deletion_rate,
            } => {
                check_rate(addition_rate, "addition")?;
                check_rate(deletion_rate, "deletion")?;
            }
            AlgorithmConfig::Umadr {
                addition_rate,
                deletion_rate,
                replacement_rate,
                replacement_scope,
            } => {
                check_rate(addition_rate, "addition")?;
                check_rate(deletion_rate, "deletion")?;
                check_rate(replacement_rate, "replacement")?;
                if let ReplacementScope::Fragment { max_len: 0 } = replacement_scope {
                    return Err(ConfigError::InvalidArchive(
                        "fragment replacement needs max_len >= 1".to_string(),
                    ));
                }
            }
        }

        if let SelectionConfig::Mixture { options, .. } = &self.selection {
            if options.is_empty() {
                return Err(ConfigError::InvalidSelection(
                    "mixture has no options".to_string(),
                ));
            }
            if options.iter().any(|o| !(o.weight >= 0.0) || !o.weight.is_finite()) {
                return Err(ConfigError::InvalidSelection(
                    "mixture weights must be finite and non-negative".to_string(),
                ));
            }
        }

        if let ArchiveConfig::Random { genome_length, .. } = &self.archive
            && genome_length.0 > genome_length.1
        {
            return Err(ConfigError::InvalidArchive(format!(
                "random archive genome length min ({}) > max ({})",
                genome_length.0, genome_length.1
            )));
        }

        if let Parallelism::Pool { workers: Some(0) } = self.parallelism {
            return Err(ConfigError::InvalidExecutionConfig {
                field: "workers",
                reason: "must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// Full description of a run: the program signature (with its execution
/// limits), the gene spawner and the search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub signature: ProgramSignature,
    #[serde(default)]
    pub spawner: SpawnerConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signature.execution.validate()?;
        for erc in &self.spawner.erc_generators {
            erc.validate()?;
        }
        self.search.validate()
    }
}
