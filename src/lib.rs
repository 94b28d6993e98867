//! Push program synthesis.
//!
//! This crate evolves linear Push genomes with generational search: parents
//! are picked by lexicase (or tournament, roulette, elite) selection and
//! varied by uniform mutation by addition and deletion (UMAD), optionally
//! followed by replacement from a knowledge archive (UMADR).
//!
//! # Architecture
//!
//! - `push`: genes, genomes, plushy compilation to nested programs, token
//!   parsing
//! - `gp`: spawning, evaluation, populations, selection, variation, archives,
//!   the worker pool and the search loop
//! - `schema`: serde configuration types and their validation
//! - `error`: the crate error type
//!
//! Executing programs is left to the caller through [`gp::Evaluator`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use push_synth::{
//!     gp::{FnEvaluator, SearchAlgorithm},
//!     push::{InstructionSet, Program},
//!     schema::RunConfig,
//! };
//!
//! let run: RunConfig = serde_json::from_str(r#"{
//!     "signature": { "arity": 1, "output_stacks": ["int"] },
//!     "spawner": { "n_inputs": 1, "stacks": ["exec", "int", "bool"] },
//!     "search": { "population_size": 300, "max_generations": 50, "random_seed": 42 }
//! }"#)?;
//!
//! // Replace with a real interpreter-backed evaluator.
//! let evaluator = Arc::new(FnEvaluator::new(1, |program: &Program| {
//!     Ok(vec![program.size() as f64])
//! }));
//!
//! let mut search = SearchAlgorithm::from_run_config(run, &InstructionSet::core(), evaluator)?;
//! let best = search.run()?;
//! println!("Best total error: {:?}", best.total_error());
//! # Ok::<(), push_synth::SearchError>(())
//! ```

pub mod error;
pub mod gp;
pub mod push;
pub mod schema;

// Re-export commonly used types
pub use error::{Result, SearchError};
pub use gp::{Evaluator, GenerationReport, Individual, SearchAlgorithm, Termination};
pub use push::{Gene, Genome, InstructionSet, Program, ProgramSignature};
pub use schema::{ConfigError, RunConfig, SearchConfig, SpawnerConfig};
