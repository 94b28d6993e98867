use thiserror::Error;

use crate::schema::ConfigError;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Population has no evaluated individuals")]
    EmptyPopulation,

    #[error("Knowledge archive has no genomes")]
    EmptyArchive,

    #[error("Replacement mutation needs a knowledge archive")]
    MissingArchive,

    #[error("Worker task failed on genome {genome}: {message}")]
    PoolFailure { genome: String, message: String },

    #[error("Failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("Individual has already been evaluated")]
    AlreadyEvaluated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
