//! Immutable, shareable linear genomes.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Gene;

/// A flat sequence of genes.
///
/// Cloning is cheap: the genes live behind an `Arc` and are never mutated once
/// published. Every edit produces a new genome.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Gene>", into = "Vec<Gene>")]
pub struct Genome {
    genes: Arc<[Gene]>,
}

impl Genome {
    pub fn empty() -> Self {
        Self {
            genes: Arc::from(Vec::new()),
        }
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    /// A new genome with `gene` appended. `self` is left untouched.
    pub fn append(&self, gene: Gene) -> Self {
        let mut genes = Vec::with_capacity(self.genes.len() + 1);
        genes.extend_from_slice(&self.genes);
        genes.push(gene);
        Self::from(genes)
    }

    /// A new genome holding at most the first `len` genes.
    pub fn truncated(&self, len: usize) -> Self {
        if len >= self.genes.len() {
            return self.clone();
        }
        Self::from(self.genes[..len].to_vec())
    }

    /// Whether two genomes share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.genes, &other.genes)
    }
}

impl Default for Genome {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for Genome {
    type Target = [Gene];

    fn deref(&self) -> &[Gene] {
        &self.genes
    }
}

impl From<Vec<Gene>> for Genome {
    fn from(genes: Vec<Gene>) -> Self {
        Self {
            genes: Arc::from(genes),
        }
    }
}

impl From<Genome> for Vec<Gene> {
    fn from(genome: Genome) -> Self {
        genome.genes.to_vec()
    }
}

impl FromIterator<Gene> for Genome {
    fn from_iter<I: IntoIterator<Item = Gene>>(iter: I) -> Self {
        Self {
            genes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Genome {
    type Item = &'a Gene;
    type IntoIter = std::slice::Iter<'a, Gene>;

    fn into_iter(self) -> Self::IntoIter {
        self.genes.iter()
    }
}

impl fmt::Debug for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.genes.iter()).finish()
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, gene) in self.genes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{gene}")?;
        }
        write!(f, "]")
    }
}
