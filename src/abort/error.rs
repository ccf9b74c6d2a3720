use thiserror::Error;

use crate::expand::ExpandError;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid action '{0}', expected one of: noWriteNow, writeNow, nextWrite")]
    InvalidAction(String),
    #[error("entry '{key}' must be a string")]
    NotAString { key: String },
    #[error("cannot expand sentinel path: {0}")]
    Expand(#[from] ExpandError),
}
