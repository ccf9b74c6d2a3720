use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParallelError {
    #[error("a process group needs at least one rank")]
    EmptyGroup,
}
