//! Schema module - Configuration types for program execution, gene spawning and search.

mod config;
mod search;

pub use config::*;
pub use search::*;
