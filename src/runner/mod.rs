mod error;
mod reload;
mod runner;

pub use error::RunnerError;
pub use reload::ConfigWatcher;
pub use runner::{RunSummary, Runner};
