//! Knowledge archive: a fixed set of genomes that replacement mutation draws
//! material from.

use std::fmt;
use std::fs;
use std::path::Path;

use log::debug;
use rand::seq::SliceRandom;
use rand::RngCore;

use super::spawner::{GeneSpawner, GenomeSize};
use crate::error::{Result, SearchError};
use crate::push::{Genome, InstructionSet, Token, genome_from_tokens};
use crate::schema::ArchiveConfig;

/// Where an archive's genomes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMode {
    Empty,
    File,
    Incode,
    Yaml,
    Random,
}

/// Read-only after construction.
#[derive(Debug, Clone)]
pub struct KnowledgeArchive {
    mode: ArchiveMode,
    genomes: Vec<Genome>,
}

impl KnowledgeArchive {
    /// An archive holding one empty genome. Replacement from it is a no-op.
    pub fn empty() -> Self {
        Self {
            mode: ArchiveMode::Empty,
            genomes: vec![Genome::empty()],
        }
    }

    pub fn from_genomes(genomes: Vec<Genome>) -> Self {
        Self {
            mode: ArchiveMode::Incode,
            genomes,
        }
    }

    /// Resolve token sequences against `instructions`.
    pub fn from_tokens(token_sets: &[Vec<Token>], instructions: &InstructionSet) -> Result<Self> {
        let genomes = token_sets
            .iter()
            .map(|tokens| genome_from_tokens(tokens, instructions))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            mode: ArchiveMode::Yaml,
            genomes,
        })
    }

    /// `count` random genomes with lengths drawn from `length` (inclusive).
    pub fn random(
        spawner: &GeneSpawner,
        count: usize,
        length: (usize, usize),
        rng: &mut dyn RngCore,
    ) -> Self {
        let size = GenomeSize::from(length);
        Self {
            mode: ArchiveMode::Random,
            genomes: (0..count).map(|_| spawner.spawn_genome(size, rng)).collect(),
        }
    }

    /// Load genomes written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let genomes: Vec<Genome> = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} archive genomes from {}",
            genomes.len(),
            path.as_ref().display()
        );
        Ok(Self {
            mode: ArchiveMode::File,
            genomes,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.genomes)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Build an archive as described by `config`.
    ///
    /// `spawner` is used for random archives unless the config carries its own
    /// spawner settings.
    pub fn from_config(
        config: &ArchiveConfig,
        instructions: &InstructionSet,
        spawner: &GeneSpawner,
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        match config {
            ArchiveConfig::Empty => Ok(Self::empty()),
            ArchiveConfig::File { path } => Self::load(path),
            ArchiveConfig::Incode { genome_set } => Ok(Self::from_genomes(genome_set.clone())),
            ArchiveConfig::Yaml { genome_set } => Self::from_tokens(genome_set, instructions),
            ArchiveConfig::Random {
                genome_set_size,
                genome_length,
                spawner: Some(own),
            } => {
                let own = GeneSpawner::new(own, instructions)?;
                Ok(Self::random(&own, *genome_set_size, *genome_length, rng))
            }
            ArchiveConfig::Random {
                genome_set_size,
                genome_length,
                spawner: None,
            } => Ok(Self::random(spawner, *genome_set_size, *genome_length, rng)),
        }
    }

    /// A uniformly random member, drawn with replacement.
    pub fn spawn_genome(&self, rng: &mut dyn RngCore) -> Result<&Genome> {
        self.genomes.choose(rng).ok_or(SearchError::EmptyArchive)
    }

    pub fn mode(&self) -> ArchiveMode {
        self.mode
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }
}

impl Default for KnowledgeArchive {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for KnowledgeArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, genome) in self.genomes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{genome}")?;
        }
        Ok(())
    }
}
