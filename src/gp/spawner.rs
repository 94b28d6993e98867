//! Random gene and genome generation.

use std::ops::RangeInclusive;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};

use super::distribution::DiscreteDistribution;
use crate::push::{Gene, Genome, InstructionSet, Literal};
use crate::schema::{ConfigError, ErcGenerator, SpawnDistribution, SpawnerConfig};

/// Requested genome length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenomeSize {
    Fixed(usize),
    /// Inclusive bounds, drawn uniformly.
    Range(usize, usize),
}

impl GenomeSize {
    pub fn sample(self, rng: &mut dyn RngCore) -> usize {
        match self {
            Self::Fixed(n) => n,
            Self::Range(a, b) => rng.gen_range(a.min(b)..=a.max(b)),
        }
    }
}

impl From<usize> for GenomeSize {
    fn from(n: usize) -> Self {
        Self::Fixed(n)
    }
}

impl From<(usize, usize)> for GenomeSize {
    fn from((min, max): (usize, usize)) -> Self {
        Self::Range(min, max)
    }
}

impl From<RangeInclusive<usize>> for GenomeSize {
    fn from(range: RangeInclusive<usize>) -> Self {
        Self::Range(*range.start(), *range.end())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Instruction,
    Close,
    Input,
    Literal,
    Erc,
}

/// ERC generator resolved into its sampling form.
#[derive(Debug, Clone)]
enum Erc {
    Int(i64, i64),
    Float(f64, f64),
    Normal(Normal<f64>),
    Char(Vec<char>),
    Bool,
}

impl Erc {
    fn build(config: &ErcGenerator) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(match config {
            ErcGenerator::IntRange { min, max } => Self::Int(*min, *max),
            ErcGenerator::FloatRange { min, max } => Self::Float(*min, *max),
            ErcGenerator::NormalFloat { mean, std_dev } => Self::Normal(
                Normal::new(*mean, *std_dev).map_err(|e| ConfigError::InvalidErc(e.to_string()))?,
            ),
            ErcGenerator::Char { choices } => Self::Char(choices.chars().collect()),
            ErcGenerator::Bool => Self::Bool,
        })
    }

    fn generate(&self, rng: &mut dyn RngCore) -> Literal {
        match self {
            Self::Int(min, max) => Literal::Int(rng.gen_range(*min..=*max)),
            Self::Float(min, max) => Literal::Float(rng.gen_range(*min..*max)),
            Self::Normal(normal) => Literal::Float(normal.sample(rng)),
            Self::Char(choices) => Literal::Char(choices.choose(rng).copied().unwrap_or(' ')),
            Self::Bool => Literal::Bool(rng.r#gen::<bool>()),
        }
    }
}

/// Spawns genes from instructions, inputs, literals and ERC generators.
///
/// Read-only after construction; workers share one spawner behind an `Arc`.
#[derive(Debug, Clone)]
pub struct GeneSpawner {
    n_inputs: usize,
    instructions: Vec<Gene>,
    literals: Vec<Literal>,
    ercs: Vec<Erc>,
    categories: DiscreteDistribution<Category>,
}

impl GeneSpawner {
    pub fn new(config: &SpawnerConfig, instruction_set: &InstructionSet) -> Result<Self, ConfigError> {
        let instructions: Vec<Gene> = instruction_set
            .supported_by(&config.stacks)
            .map(|meta| meta.to_gene())
            .collect();
        let ercs = config
            .erc_generators
            .iter()
            .map(Erc::build)
            .collect::<Result<Vec<_>, _>>()?;

        let total_blocks: usize = instructions.iter().map(Gene::opens).sum();
        let counts = [
            (Category::Instruction, instructions.len()),
            (Category::Close, total_blocks),
            (Category::Input, config.n_inputs),
            (Category::Literal, config.literals.len()),
            (Category::Erc, ercs.len()),
        ];

        let weights: Vec<(Category, f64)> = match &config.distribution {
            SpawnDistribution::Uniform => counts
                .iter()
                .map(|&(cat, n)| {
                    // the close marker is a single entry of the union
                    let n = if cat == Category::Close { n.min(1) } else { n };
                    (cat, n as f64)
                })
                .collect(),
            SpawnDistribution::Proportional => {
                counts.iter().map(|&(cat, n)| (cat, n as f64)).collect()
            }
            SpawnDistribution::Weighted {
                instruction,
                close,
                input,
                literal,
                erc,
            } => {
                let explicit = [*instruction, *close, *input, *literal, *erc];
                counts
                    .iter()
                    .zip(explicit)
                    .map(|(&(cat, n), w)| (cat, if n == 0 { 0.0 } else { w }))
                    .collect()
            }
        };

        let categories = DiscreteDistribution::new(weights).ok_or(ConfigError::EmptySpawner)?;

        Ok(Self {
            n_inputs: config.n_inputs,
            instructions,
            literals: config.literals.clone(),
            ercs,
            categories,
        })
    }

    /// Number of instructions available to the spawner.
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    pub fn random_instruction(&self, rng: &mut dyn RngCore) -> Option<Gene> {
        self.instructions.choose(rng).cloned()
    }

    pub fn random_input(&self, rng: &mut dyn RngCore) -> Option<Gene> {
        (self.n_inputs > 0).then(|| Gene::input(rng.gen_range(0..self.n_inputs)))
    }

    pub fn random_literal(&self, rng: &mut dyn RngCore) -> Option<Gene> {
        self.literals.choose(rng).cloned().map(Gene::literal)
    }

    pub fn random_erc(&self, rng: &mut dyn RngCore) -> Option<Gene> {
        self.ercs
            .choose(rng)
            .map(|erc| Gene::literal(erc.generate(rng)))
    }

    /// Draw one gene.
    pub fn random_gene(&self, rng: &mut dyn RngCore) -> Gene {
        // Categories with no members carry zero weight, so the draw below
        // always finds something.
        let gene = match self.categories.sample(rng) {
            Category::Instruction => self.random_instruction(rng),
            Category::Close => Some(Gene::Close),
            Category::Input => self.random_input(rng),
            Category::Literal => self.random_literal(rng),
            Category::Erc => self.random_erc(rng),
        };
        gene.unwrap_or(Gene::Close)
    }

    /// Spawn a genome of the requested size.
    pub fn spawn_genome(&self, size: impl Into<GenomeSize>, rng: &mut dyn RngCore) -> Genome {
        let len = size.into().sample(rng);
        (0..len).map(|_| self.random_gene(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::InstructionMeta;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn instruction_set() -> InstructionSet {
        [
            InstructionMeta::new("int_add", 0, &["int"]),
            InstructionMeta::new("exec_if", 2, &["exec", "bool"]),
            InstructionMeta::new("float_add", 0, &["float"]),
        ]
        .into_iter()
        .collect()
    }

    fn config() -> SpawnerConfig {
        SpawnerConfig {
            n_inputs: 1,
            stacks: vec!["int".into(), "exec".into(), "bool".into()],
            literals: vec![Literal::Int(0)],
            erc_generators: vec![ErcGenerator::IntRange { min: -5, max: 5 }],
            distribution: SpawnDistribution::Uniform,
        }
    }

    #[test]
    fn test_filters_instructions_by_stack() {
        let spawner = GeneSpawner::new(&config(), &instruction_set()).unwrap();
        assert_eq!(spawner.instruction_count(), 2);
    }

    #[test]
    fn test_spawn_genome_sizes() {
        let spawner = GeneSpawner::new(&config(), &instruction_set()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(spawner.spawn_genome(7, &mut rng).len(), 7);
        assert!(spawner.spawn_genome(0, &mut rng).is_empty());
        for _ in 0..50 {
            let len = spawner.spawn_genome(3..=5, &mut rng).len();
            assert!((3..=5).contains(&len));
        }
    }

    #[test]
    fn test_uniform_union_covers_every_category() {
        let spawner = GeneSpawner::new(&config(), &instruction_set()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let genome = spawner.spawn_genome(600, &mut rng);

        let count = |pred: fn(&Gene) -> bool| genome.iter().filter(|g| pred(g)).count();
        // union: 2 instructions, close, 1 input, 1 literal, 1 erc -> 6 entries
        let close = count(|g| matches!(g, Gene::Close));
        let inputs = count(|g| matches!(g, Gene::Input { .. }));
        let instructions = count(|g| matches!(g, Gene::Instruction(_)));
        assert!((60..=140).contains(&close), "close {close}");
        assert!((60..=140).contains(&inputs), "inputs {inputs}");
        assert!((150..=250).contains(&instructions), "instructions {instructions}");
        assert!(genome.iter().all(|g| match g {
            Gene::Literal { value: Literal::Int(v) } => (-5..=5).contains(v),
            Gene::Literal { .. } => false,
            _ => true,
        }));
    }

    #[test]
    fn test_same_seed_same_genome() {
        let spawner = GeneSpawner::new(&config(), &instruction_set()).unwrap();
        let a = spawner.spawn_genome(20, &mut StdRng::seed_from_u64(9));
        let b = spawner.spawn_genome(20, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_weighted_drops_empty_categories() {
        let config = SpawnerConfig {
            n_inputs: 0,
            distribution: SpawnDistribution::Weighted {
                instruction: 0.0,
                close: 0.0,
                input: 10.0,
                literal: 1.0,
                erc: 0.0,
            },
            ..config()
        };
        let spawner = GeneSpawner::new(&config, &instruction_set()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let genome = spawner.spawn_genome(30, &mut rng);
        assert!(genome.iter().all(|g| *g == Gene::literal(Literal::Int(0))));
    }

    #[test]
    fn test_empty_spawner_rejected() {
        let config = SpawnerConfig {
            n_inputs: 0,
            stacks: vec![],
            ..SpawnerConfig::default()
        };
        assert_eq!(
            GeneSpawner::new(&config, &InstructionSet::new()).unwrap_err(),
            ConfigError::EmptySpawner
        );
    }

    #[test]
    fn test_unbounded_float_erc_rejected_at_construction() {
        let config = SpawnerConfig {
            erc_generators: vec![ErcGenerator::FloatRange {
                min: f64::MIN,
                max: f64::MAX,
            }],
            ..config()
        };
        assert!(matches!(
            GeneSpawner::new(&config, &instruction_set()),
            Err(ConfigError::InvalidErc(_))
        ));
    }

    #[test]
    fn test_normal_erc() {
        let config = SpawnerConfig {
            n_inputs: 0,
            erc_generators: vec![ErcGenerator::NormalFloat {
                mean: 0.0,
                std_dev: 1.0,
            }],
            ..SpawnerConfig::default()
        };
        let spawner = GeneSpawner::new(&config, &InstructionSet::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        assert!(matches!(
            spawner.random_gene(&mut rng),
            Gene::Literal { value: Literal::Float(_) }
        ));
    }
}
