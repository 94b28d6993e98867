//! Genetic programming over Push genomes.
//!
//! # Overview
//!
//! - **Spawning** (`spawner`): random genes and genomes from an instruction set
//! - **Evaluation** (`evaluation`, `individual`): error vectors through the
//!   [`Evaluator`] trait, computed lazily and cached per individual
//! - **Populations** (`population`): sorted by total error, evaluated
//!   sequentially or on a worker pool (`parallel`)
//! - **Selection** (`selection`): lexicase, tournament, roulette and elite,
//!   alone or as a weighted mixture
//! - **Variation** (`variation`, `archive`): UMAD and UMADR, the latter drawing
//!   replacement genes from a [`KnowledgeArchive`]
//! - **Search** (`search`): the generational loop and final simplification
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use push_synth::gp::{FnEvaluator, GeneSpawner, SearchAlgorithm};
//! use push_synth::push::{InstructionSet, Program, ProgramSignature};
//! use push_synth::schema::{SearchConfig, SpawnerConfig};
//!
//! let instructions = InstructionSet::core();
//! let spawner = GeneSpawner::new(&SpawnerConfig::default(), &instructions)?;
//! let evaluator = Arc::new(FnEvaluator::new(1, |program: &Program| {
//!     Ok(vec![program.size() as f64])
//! }));
//!
//! let mut search = SearchAlgorithm::new(
//!     SearchConfig::default(),
//!     ProgramSignature::new(1, &["int"]),
//!     spawner,
//!     &instructions,
//!     evaluator,
//! )?;
//! let best = search.run_with_callback(|report| {
//!     println!("Generation {}: best = {:.3}", report.generation, report.best_total_error);
//! })?;
//! println!("{}", best.genome());
//! # Ok::<(), push_synth::error::SearchError>(())
//! ```

mod archive;
mod distribution;
mod evaluation;
mod individual;
mod parallel;
mod population;
mod search;
mod selection;
mod simplify;
mod spawner;
mod variation;

pub use archive::*;
pub use distribution::*;
pub use evaluation::*;
pub use individual::*;
pub use parallel::*;
pub use population::*;
pub use search::*;
pub use selection::*;
pub use simplify::*;
pub use spawner::*;
pub use variation::*;
