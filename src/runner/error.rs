use thiserror::Error;

use crate::config::ConfigError;
use crate::function_object::FunctionObjectError;
use crate::parallel::ParallelError;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    FunctionObject(#[from] FunctionObjectError),
    #[error("cannot watch run file: {0}")]
    Watch(#[from] notify::Error),
    #[error("parallel error: {0}")]
    Parallel(#[from] ParallelError),
    #[error("rank {0} panicked")]
    RankPanicked(usize),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
