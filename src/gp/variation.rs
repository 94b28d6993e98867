//! Variation operators and the UMAD / UMADR strategies built from them.

use std::fmt;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::archive::KnowledgeArchive;
use super::spawner::GeneSpawner;
use crate::error::{Result, SearchError};
use crate::push::{Gene, Genome};
use crate::schema::{AlgorithmConfig, ConfigError, GenomeSizePolicy, ReplacementScope};

/// Extra inputs some operators need.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariationContext<'a> {
    pub archive: Option<&'a KnowledgeArchive>,
}

/// Produces one child genome from parent genomes.
pub trait VariationOperator: Send + Sync + fmt::Debug {
    fn num_parents(&self) -> usize;

    fn produce(
        &self,
        parents: &[Genome],
        spawner: &GeneSpawner,
        rng: &mut dyn RngCore,
        ctx: &VariationContext<'_>,
    ) -> Result<Genome>;
}

fn check_rate(name: &'static str, value: f64) -> std::result::Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

fn first_parent(parents: &[Genome]) -> Result<&Genome> {
    parents.first().ok_or(SearchError::EmptyPopulation)
}

/// Before each gene, and once after the last, insert a spawned gene with
/// probability `rate`.
#[derive(Debug, Clone, Copy)]
pub struct AdditionMutation {
    rate: f64,
}

impl AdditionMutation {
    pub fn new(rate: f64) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            rate: check_rate("addition", rate)?,
        })
    }
}

impl VariationOperator for AdditionMutation {
    fn num_parents(&self) -> usize {
        1
    }

    fn produce(
        &self,
        parents: &[Genome],
        spawner: &GeneSpawner,
        rng: &mut dyn RngCore,
        _ctx: &VariationContext<'_>,
    ) -> Result<Genome> {
        let parent = first_parent(parents)?;
        let mut genes = Vec::with_capacity(parent.len() + parent.len() / 8 + 1);
        for gene in parent.iter() {
            if rng.r#gen::<f64>() < self.rate {
                genes.push(spawner.random_gene(rng));
            }
            genes.push(gene.clone());
        }
        if rng.r#gen::<f64>() < self.rate {
            genes.push(spawner.random_gene(rng));
        }
        Ok(genes.into())
    }
}

/// Drop each gene with probability `rate`.
#[derive(Debug, Clone, Copy)]
pub struct DeletionMutation {
    rate: f64,
}

impl DeletionMutation {
    pub fn new(rate: f64) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            rate: check_rate("deletion", rate)?,
        })
    }
}

impl VariationOperator for DeletionMutation {
    fn num_parents(&self) -> usize {
        1
    }

    fn produce(
        &self,
        parents: &[Genome],
        _spawner: &GeneSpawner,
        rng: &mut dyn RngCore,
        _ctx: &VariationContext<'_>,
    ) -> Result<Genome> {
        let parent = first_parent(parents)?;
        Ok(parent
            .iter()
            .filter(|_| rng.r#gen::<f64>() >= self.rate)
            .cloned()
            .collect())
    }
}

/// Replace each gene with probability `rate` by material from one archive
/// genome, drawn once per child.
#[derive(Debug, Clone, Copy)]
pub struct ReplacementMutation {
    rate: f64,
    scope: ReplacementScope,
}

impl ReplacementMutation {
    pub fn new(rate: f64, scope: ReplacementScope) -> std::result::Result<Self, ConfigError> {
        if let ReplacementScope::Fragment { max_len: 0 } = scope {
            return Err(ConfigError::InvalidArchive(
                "fragment replacement needs max_len >= 1".to_string(),
            ));
        }
        Ok(Self {
            rate: check_rate("replacement", rate)?,
            scope,
        })
    }

    fn replace_into(&self, donor: &[Gene], out: &mut Vec<Gene>, rng: &mut dyn RngCore) {
        match self.scope {
            ReplacementScope::Gene => {
                if let Some(gene) = donor.choose(rng) {
                    out.push(gene.clone());
                }
            }
            ReplacementScope::Fragment { max_len } => {
                let len = rng.gen_range(1..=max_len.min(donor.len()));
                let start = rng.gen_range(0..=donor.len() - len);
                out.extend_from_slice(&donor[start..start + len]);
            }
        }
    }
}

impl VariationOperator for ReplacementMutation {
    fn num_parents(&self) -> usize {
        1
    }

    fn produce(
        &self,
        parents: &[Genome],
        _spawner: &GeneSpawner,
        rng: &mut dyn RngCore,
        ctx: &VariationContext<'_>,
    ) -> Result<Genome> {
        let parent = first_parent(parents)?;
        let donor = ctx
            .archive
            .ok_or(SearchError::MissingArchive)?
            .spawn_genome(rng)?;
        if donor.is_empty() {
            return Ok(parent.clone());
        }

        let mut genes = Vec::with_capacity(parent.len());
        for gene in parent.iter() {
            if rng.r#gen::<f64>() < self.rate {
                self.replace_into(donor, &mut genes, rng);
            } else {
                genes.push(gene.clone());
            }
        }
        Ok(genes.into())
    }
}

/// Operators applied in sequence, each to the previous one's child.
#[derive(Debug, Default)]
pub struct VariationPipeline {
    operators: Vec<Box<dyn VariationOperator>>,
}

impl VariationPipeline {
    pub fn new(operators: Vec<Box<dyn VariationOperator>>) -> Self {
        Self { operators }
    }

    /// Addition followed by deletion.
    pub fn umad(addition_rate: f64, deletion_rate: f64) -> std::result::Result<Self, ConfigError> {
        let operators: Vec<Box<dyn VariationOperator>> = vec![
            Box::new(AdditionMutation::new(addition_rate)?),
            Box::new(DeletionMutation::new(deletion_rate)?),
        ];
        Ok(Self::new(operators))
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl VariationOperator for VariationPipeline {
    fn num_parents(&self) -> usize {
        self.operators.first().map_or(1, |op| op.num_parents())
    }

    fn produce(
        &self,
        parents: &[Genome],
        spawner: &GeneSpawner,
        rng: &mut dyn RngCore,
        ctx: &VariationContext<'_>,
    ) -> Result<Genome> {
        let Some((head, rest)) = self.operators.split_first() else {
            return first_parent(parents).cloned();
        };
        let mut child = head.produce(parents, spawner, rng, ctx)?;
        for op in rest {
            child = op.produce(std::slice::from_ref(&child), spawner, rng, ctx)?;
        }
        Ok(child)
    }
}

/// How children are made, chosen once per search.
#[derive(Debug)]
pub enum VariationStrategy {
    Umad(VariationPipeline),
    Umadr {
        umad: VariationPipeline,
        replacement: ReplacementMutation,
    },
}

impl VariationStrategy {
    pub fn from_config(config: &AlgorithmConfig) -> std::result::Result<Self, ConfigError> {
        match *config {
            AlgorithmConfig::Umad {
                addition_rate,
                deletion_rate,
            } => Ok(Self::Umad(VariationPipeline::umad(
                addition_rate,
                deletion_rate,
            )?)),
            AlgorithmConfig::Umadr {
                addition_rate,
                deletion_rate,
                replacement_rate,
                replacement_scope,
            } => Ok(Self::Umadr {
                umad: VariationPipeline::umad(addition_rate, deletion_rate)?,
                replacement: ReplacementMutation::new(replacement_rate, replacement_scope)?,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Umad(_) => "UMAD",
            Self::Umadr { .. } => "UMADR",
        }
    }

    pub fn needs_archive(&self) -> bool {
        matches!(self, Self::Umadr { .. })
    }

    pub fn num_parents(&self) -> usize {
        match self {
            Self::Umad(pipeline) => pipeline.num_parents(),
            Self::Umadr { umad, .. } => umad.num_parents(),
        }
    }

    fn vary(
        &self,
        parents: &[Genome],
        spawner: &GeneSpawner,
        rng: &mut dyn RngCore,
        ctx: &VariationContext<'_>,
    ) -> Result<Genome> {
        match self {
            Self::Umad(pipeline) => pipeline.produce(parents, spawner, rng, ctx),
            Self::Umadr { umad, replacement } => {
                let child = umad.produce(parents, spawner, rng, ctx)?;
                replacement.produce(std::slice::from_ref(&child), spawner, rng, ctx)
            }
        }
    }

    /// Produce a child no longer than `max_size`, if one is set.
    pub fn produce_child(
        &self,
        parents: &[Genome],
        spawner: &GeneSpawner,
        rng: &mut dyn RngCore,
        ctx: &VariationContext<'_>,
        max_size: Option<usize>,
        policy: GenomeSizePolicy,
    ) -> Result<Genome> {
        let Some(max) = max_size else {
            return self.vary(parents, spawner, rng, ctx);
        };
        let attempts = match policy {
            GenomeSizePolicy::Truncate => 1,
            GenomeSizePolicy::Resample { attempts } => attempts.max(1),
        };
        let mut child = self.vary(parents, spawner, rng, ctx)?;
        for _ in 1..attempts {
            if child.len() <= max {
                break;
            }
            child = self.vary(parents, spawner, rng, ctx)?;
        }
        Ok(child.truncated(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::{InstructionSet, Literal};
    use crate::schema::SpawnerConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn spawner() -> GeneSpawner {
        // a single literal so spawned genes are easy to spot
        GeneSpawner::new(
            &SpawnerConfig {
                n_inputs: 0,
                literals: vec![Literal::Int(-1)],
                ..Default::default()
            },
            &InstructionSet::new(),
        )
        .unwrap()
    }

    fn parent(n: usize) -> Genome {
        (0..n).map(|i| Gene::literal(Literal::Int(i as i64))).collect()
    }

    fn ctx() -> VariationContext<'static> {
        VariationContext::default()
    }

    #[test]
    fn test_rates_validated() {
        assert!(AdditionMutation::new(1.1).is_err());
        assert!(DeletionMutation::new(-0.1).is_err());
        assert!(ReplacementMutation::new(f64::NAN, ReplacementScope::Gene).is_err());
        assert!(ReplacementMutation::new(0.5, ReplacementScope::Fragment { max_len: 0 }).is_err());
        assert!(AdditionMutation::new(0.0).is_ok());
        assert!(DeletionMutation::new(1.0).is_ok());
    }

    #[test]
    fn test_zero_rates_are_identity() {
        let mut rng = StdRng::seed_from_u64(0);
        let pipeline = VariationPipeline::umad(0.0, 0.0).unwrap();
        let child = pipeline
            .produce(&[parent(10)], &spawner(), &mut rng, &ctx())
            .unwrap();
        assert_eq!(child, parent(10));
    }

    #[test]
    fn test_full_rates() {
        let mut rng = StdRng::seed_from_u64(1);
        let added = AdditionMutation::new(1.0)
            .unwrap()
            .produce(&[parent(3)], &spawner(), &mut rng, &ctx())
            .unwrap();
        // one insertion in each of the 4 gaps
        assert_eq!(added.len(), 7);
        assert_eq!(added[0], Gene::literal(Literal::Int(-1)));
        assert_eq!(added[1], Gene::literal(Literal::Int(0)));

        let deleted = DeletionMutation::new(1.0)
            .unwrap()
            .produce(&[parent(3)], &spawner(), &mut rng, &ctx())
            .unwrap();
        assert!(deleted.is_empty());
    }

    #[test]
    fn test_addition_expected_growth() {
        let mut rng = StdRng::seed_from_u64(2);
        let op = AdditionMutation::new(0.09).unwrap();
        let trials = 2000;
        let added: usize = (0..trials)
            .map(|_| op.produce(&[parent(20)], &spawner(), &mut rng, &ctx()).unwrap().len() - 20)
            .sum();
        // expected 21 * 0.09 = 1.89 insertions per child
        let mean = added as f64 / trials as f64;
        assert!((mean - 1.89).abs() < 0.15, "mean insertions {mean}");
    }

    #[test]
    fn test_deletion_expected_shrink() {
        let mut rng = StdRng::seed_from_u64(3);
        let op = DeletionMutation::new(0.0826).unwrap();
        let trials = 2000;
        let removed: usize = (0..trials)
            .map(|_| 50 - op.produce(&[parent(50)], &spawner(), &mut rng, &ctx()).unwrap().len())
            .sum();
        let mean = removed as f64 / trials as f64;
        assert!((mean - 4.13).abs() < 0.25, "mean deletions {mean}");
    }

    #[test]
    fn test_replacement_requires_archive() {
        let mut rng = StdRng::seed_from_u64(4);
        let op = ReplacementMutation::new(0.5, ReplacementScope::Gene).unwrap();
        assert!(matches!(
            op.produce(&[parent(3)], &spawner(), &mut rng, &ctx()),
            Err(SearchError::MissingArchive)
        ));
    }

    #[test]
    fn test_replacement_from_empty_archive_is_identity() {
        let mut rng = StdRng::seed_from_u64(5);
        let archive = KnowledgeArchive::empty();
        let ctx = VariationContext {
            archive: Some(&archive),
        };
        let op = ReplacementMutation::new(1.0, ReplacementScope::Gene).unwrap();
        let child = op.produce(&[parent(5)], &spawner(), &mut rng, &ctx).unwrap();
        assert_eq!(child, parent(5));
    }

    #[test]
    fn test_full_replacement_uses_donor_genes() {
        let mut rng = StdRng::seed_from_u64(6);
        let donor: Genome = vec![Gene::Close, Gene::input(0)].into();
        let archive = KnowledgeArchive::from_genomes(vec![donor.clone()]);
        let ctx = VariationContext {
            archive: Some(&archive),
        };
        let op = ReplacementMutation::new(1.0, ReplacementScope::Gene).unwrap();
        let child = op.produce(&[parent(8)], &spawner(), &mut rng, &ctx).unwrap();
        assert_eq!(child.len(), 8);
        assert!(child.iter().all(|g| donor.contains(g)));
    }

    #[test]
    fn test_fragment_replacement_inserts_runs() {
        let mut rng = StdRng::seed_from_u64(7);
        let donor: Genome = (100..110).map(|i| Gene::literal(Literal::Int(i))).collect();
        let archive = KnowledgeArchive::from_genomes(vec![donor.clone()]);
        let ctx = VariationContext {
            archive: Some(&archive),
        };
        let op = ReplacementMutation::new(1.0, ReplacementScope::Fragment { max_len: 3 }).unwrap();
        let child = op.produce(&[parent(4)], &spawner(), &mut rng, &ctx).unwrap();
        assert!((4..=12).contains(&child.len()));
        assert!(child.iter().all(|g| donor.contains(g)));
    }

    #[test]
    fn test_pipeline_num_parents() {
        assert_eq!(VariationPipeline::umad(0.1, 0.1).unwrap().num_parents(), 1);
        assert_eq!(VariationPipeline::default().num_parents(), 1);
    }

    #[test]
    fn test_truncate_policy() {
        let mut rng = StdRng::seed_from_u64(8);
        let strategy = VariationStrategy::from_config(&AlgorithmConfig::Umad {
            addition_rate: 1.0,
            deletion_rate: 0.0,
        })
        .unwrap();
        let child = strategy
            .produce_child(
                &[parent(10)],
                &spawner(),
                &mut rng,
                &ctx(),
                Some(12),
                GenomeSizePolicy::Truncate,
            )
            .unwrap();
        assert_eq!(child.len(), 12);
        assert_eq!(child[1], Gene::literal(Literal::Int(0)));
    }

    #[test]
    fn test_resample_policy_finds_short_child() {
        let mut rng = StdRng::seed_from_u64(9);
        let strategy = VariationStrategy::from_config(&AlgorithmConfig::Umad {
            addition_rate: 0.5,
            deletion_rate: 0.0,
        })
        .unwrap();
        // the final attempt is truncated, so the cap holds either way
        let child = strategy
            .produce_child(
                &[parent(10)],
                &spawner(),
                &mut rng,
                &ctx(),
                Some(13),
                GenomeSizePolicy::Resample { attempts: 50 },
            )
            .unwrap();
        assert!(child.len() <= 13);
    }

    #[test]
    fn test_umadr_strategy() {
        let mut rng = StdRng::seed_from_u64(10);
        let strategy = VariationStrategy::from_config(&AlgorithmConfig::from_name("UMADR").unwrap())
            .unwrap();
        assert_eq!(strategy.name(), "UMADR");
        assert!(strategy.needs_archive());
        let archive = KnowledgeArchive::empty();
        let ctx = VariationContext {
            archive: Some(&archive),
        };
        assert!(strategy
            .produce_child(&[parent(5)], &spawner(), &mut rng, &ctx, None, GenomeSizePolicy::Truncate)
            .is_ok());
    }
}
