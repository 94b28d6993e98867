//! Configuration types for program execution and gene spawning.

use serde::{Deserialize, Serialize};

use crate::push::Literal;

/// Resource limits forwarded to the interpreter that executes a program.
///
/// The search core never enforces these itself; an [`Evaluator`] is expected
/// to honour them and report violations as evaluation faults.
///
/// [`Evaluator`]: crate::gp::Evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Max number of atoms processed before execution stops.
    #[serde(default = "default_step_limit")]
    pub step_limit: usize,
    /// Max wall-clock seconds a single program may run.
    #[serde(default = "default_runtime_limit")]
    pub runtime_limit: f64,
    /// Max number of items that may be added to the state in one step.
    #[serde(default = "default_growth_cap")]
    pub growth_cap: usize,
    /// Max size of any collection (code blocks, vectors, strings).
    #[serde(default = "default_collection_size_cap")]
    pub collection_size_cap: usize,
    /// Max magnitude of any number.
    #[serde(default = "default_numeric_magnitude_limit")]
    pub numeric_magnitude_limit: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            step_limit: default_step_limit(),
            runtime_limit: default_runtime_limit(),
            growth_cap: default_growth_cap(),
            collection_size_cap: default_collection_size_cap(),
            numeric_magnitude_limit: default_numeric_magnitude_limit(),
        }
    }
}

fn default_step_limit() -> usize {
    500
}
fn default_runtime_limit() -> f64 {
    10.0
}
fn default_growth_cap() -> usize {
    500
}
fn default_collection_size_cap() -> usize {
    1000
}
fn default_numeric_magnitude_limit() -> f64 {
    1e12
}

impl ExecutionConfig {
    /// Validate that every limit is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive_int = |value: usize, field: &'static str| {
            if value == 0 {
                Err(ConfigError::InvalidExecutionConfig {
                    field,
                    reason: "must be positive".to_string(),
                })
            } else {
                Ok(())
            }
        };
        let positive_float = |value: f64, field: &'static str| {
            if value.is_nan() || value <= 0.0 {
                Err(ConfigError::InvalidExecutionConfig {
                    field,
                    reason: format!("must be positive, got {value}"),
                })
            } else {
                Ok(())
            }
        };

        positive_int(self.step_limit, "step_limit")?;
        positive_float(self.runtime_limit, "runtime_limit")?;
        positive_int(self.growth_cap, "growth_cap")?;
        positive_int(self.collection_size_cap, "collection_size_cap")?;
        positive_float(self.numeric_magnitude_limit, "numeric_magnitude_limit")?;
        Ok(())
    }

    /// Truncate a collection to `collection_size_cap`.
    pub fn constrain_collection<T>(&self, mut items: Vec<T>) -> Vec<T> {
        items.truncate(self.collection_size_cap);
        items
    }

    /// Clamp a number to +/- `numeric_magnitude_limit`.
    pub fn constrain_number(&self, n: f64) -> f64 {
        n.clamp(-self.numeric_magnitude_limit, self.numeric_magnitude_limit)
    }
}

/// How the spawner weighs gene categories against each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum SpawnDistribution {
    /// Every instruction, literal, ERC generator, input and the close marker
    /// is one equally likely entry.
    #[default]
    Uniform,
    /// Categories weighted by how many members they have; the close marker
    /// counts once per code block opened by the instruction set.
    Proportional,
    /// Explicit category weights.
    Weighted {
        #[serde(default)]
        instruction: f64,
        #[serde(default)]
        close: f64,
        #[serde(default)]
        input: f64,
        #[serde(default)]
        literal: f64,
        #[serde(default)]
        erc: f64,
    },
}

/// Ephemeral random constant generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ErcGenerator {
    /// Integer drawn uniformly from `min..=max`.
    IntRange { min: i64, max: i64 },
    /// Float drawn uniformly from `min..max`.
    FloatRange { min: f64, max: f64 },
    /// Float drawn from a normal distribution.
    NormalFloat { mean: f64, std_dev: f64 },
    /// One character drawn from `choices`.
    Char { choices: String },
    /// A fair coin.
    Bool,
}

impl ErcGenerator {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::InvalidErc(reason));
        match self {
            Self::IntRange { min, max } if min > max => invalid(format!("int range {min} > {max}")),
            Self::FloatRange { min, max } if !min.is_finite() || !max.is_finite() => {
                invalid(format!("float range [{min}, {max}) must have finite bounds"))
            }
            Self::FloatRange { min, max } if !(min < max) => {
                invalid(format!("float range [{min}, {max}) is empty"))
            }
            Self::FloatRange { min, max } if !(max - min).is_finite() => {
                invalid(format!("float range [{min}, {max}) spans more than f64 can hold"))
            }
            Self::NormalFloat { mean, .. } if !mean.is_finite() => {
                invalid(format!("mean {mean} must be finite"))
            }
            Self::NormalFloat { std_dev, .. } if !(*std_dev >= 0.0) || !std_dev.is_finite() => {
                invalid(format!("std_dev {std_dev} must be finite and non-negative"))
            }
            Self::Char { choices } if choices.is_empty() => {
                invalid("char generator needs at least one choice".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Everything a [`GeneSpawner`](crate::gp::GeneSpawner) needs besides the
/// instruction registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnerConfig {
    /// Number of program inputs; each becomes an input-reference gene.
    #[serde(default)]
    pub n_inputs: usize,
    /// Stacks the instruction set is filtered to.
    #[serde(default = "default_stacks")]
    pub stacks: Vec<String>,
    /// Fixed literal genes.
    #[serde(default)]
    pub literals: Vec<Literal>,
    /// Ephemeral random constant generators.
    #[serde(default)]
    pub erc_generators: Vec<ErcGenerator>,
    #[serde(default)]
    pub distribution: SpawnDistribution,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            n_inputs: 0,
            stacks: default_stacks(),
            literals: Vec::new(),
            erc_generators: Vec::new(),
            distribution: SpawnDistribution::default(),
        }
    }
}

fn default_stacks() -> Vec<String> {
    ["exec", "int", "bool", "float", "char", "str", "stdout"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Configuration errors. These are raised at construction and never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("No search algorithm '{name}'. Supported names: {supported:?}")]
    UnknownSearchAlgorithm {
        name: String,
        supported: &'static [&'static str],
    },
    #[error("No selector '{name}'. Supported names: {supported:?}")]
    UnknownSelector {
        name: String,
        supported: &'static [&'static str],
    },
    #[error("Unknown instruction '{0}'")]
    UnknownInstruction(String),
    #[error("Cannot infer a literal type for token {0}")]
    UnknownLiteralType(String),
    #[error("Unrecognized genome token: {0}")]
    UnknownTag(String),
    #[error("Invalid execution config: {field} {reason}")]
    InvalidExecutionConfig { field: &'static str, reason: String },
    #[error("Invalid ERC generator: {0}")]
    InvalidErc(String),
    #[error("{name} rate must lie in [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("Invalid genome size: {0}")]
    InvalidGenomeSize(String),
    #[error("Population size must be positive")]
    EmptyPopulationSize,
    #[error("Spawner has nothing to spawn: no instructions, inputs, literals or ERC generators")]
    EmptySpawner,
    #[error("Invalid selection config: {0}")]
    InvalidSelection(String),
    #[error("Invalid archive config: {0}")]
    InvalidArchive(String),
}
