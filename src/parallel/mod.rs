mod error;
mod serial;
mod thread_group;

pub use error::ParallelError;
pub use serial::Serial;
pub use thread_group::{AbortGuard, ThreadComm, ThreadGroup};

/// Collective operations shared by the cooperating processes of a run.
pub trait Communicator {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Logical OR of `value` across every rank. Blocks until all ranks
    /// have contributed; every rank observes the same result.
    fn reduce_or(&self, value: bool) -> bool;

    /// Hands the master's `value` to every rank. The argument passed on
    /// other ranks is ignored. Blocks like [`Communicator::reduce_or`].
    fn broadcast(&self, value: Option<String>) -> Option<String>;

    fn is_master(&self) -> bool {
        self.rank() == 0
    }
}
