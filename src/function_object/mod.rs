//! Contract between a run and the objects it drives once per iteration.
//!
//! A run owns its time controller and communicator; function objects only
//! borrow them through a [`RunHandle`], so they cannot outlive the run.
//! Object types are looked up by name in an explicit [`Registry`] that the
//! caller builds and passes in.

mod error;
mod list;
mod registry;

pub use error::FunctionObjectError;
pub use list::FunctionObjectList;
pub use registry::{Constructor, Registry};

use crate::parallel::Communicator;
use crate::time::TimeControl;

/// Options block of a single function object.
pub type Options = serde_yaml::Mapping;

/// Borrowed view of the run a function object belongs to.
#[derive(Clone, Copy)]
pub struct RunHandle<'t> {
    pub time: &'t dyn TimeControl,
    pub comm: &'t dyn Communicator,
}

impl<'t> RunHandle<'t> {
    pub fn new(time: &'t dyn TimeControl, comm: &'t dyn Communicator) -> Self {
        Self { time, comm }
    }
}

pub trait FunctionObject {
    fn name(&self) -> &str;

    fn type_name(&self) -> &'static str;

    /// Applies (or re-applies) the object's options. Invalid options are an
    /// error; success is reported as `Ok(true)`.
    fn read(&mut self, options: &Options) -> Result<bool, FunctionObjectError>;

    /// Called once per iteration.
    fn execute(&mut self) -> bool;

    /// Called when the run writes output.
    fn write(&mut self) -> bool;

    /// Called once when the run terminates.
    fn end(&mut self) -> bool;
}
