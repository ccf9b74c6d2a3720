use thiserror::Error;

use crate::abort::ConfigurationError;

#[derive(Debug, Error)]
pub enum FunctionObjectError {
    #[error("function object '{name}': unknown type '{type_name}'")]
    UnknownType { name: String, type_name: String },
    #[error("function object '{0}': missing 'type' entry")]
    MissingType(String),
    #[error("function object '{0}': expected a mapping of options")]
    NotAMapping(String),
    #[error("function object names must be strings")]
    InvalidName,
    #[error("function object '{name}': {source}")]
    Configuration {
        name: String,
        #[source]
        source: ConfigurationError,
    },
}
