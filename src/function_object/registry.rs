use std::collections::HashMap;

use super::{FunctionObject, FunctionObjectError, Options, RunHandle};
use crate::abort::{self, AbortMonitor};

/// Builds a function object from its name, the run it belongs to and its
/// options.
pub type Constructor = for<'t> fn(
    &str,
    RunHandle<'t>,
    &Options,
) -> Result<Box<dyn FunctionObject + 't>, FunctionObjectError>;

/// Maps type names to constructors. Built by the caller and passed to
/// [`super::FunctionObjectList::new`].
#[derive(Default)]
pub struct Registry {
    constructors: HashMap<&'static str, Constructor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every type shipped with this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(abort::TYPE_NAME, new_abort);
        registry
    }

    /// Adds or replaces the constructor for `type_name`.
    pub fn register(&mut self, type_name: &'static str, constructor: Constructor) {
        self.constructors.insert(type_name, constructor);
    }

    pub fn get(&self, type_name: &str) -> Option<Constructor> {
        self.constructors.get(type_name).copied()
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.constructors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn new_abort<'t>(
    name: &str,
    run: RunHandle<'t>,
    options: &Options,
) -> Result<Box<dyn FunctionObject + 't>, FunctionObjectError> {
    let monitor = AbortMonitor::new(name, run, options).map_err(|source| {
        FunctionObjectError::Configuration {
            name: name.to_string(),
            source,
        }
    })?;
    Ok(Box::new(monitor))
}
