mod run_time;
mod types;

pub use run_time::RunTime;
pub use types::StopAt;

use std::path::Path;

/// The part of a run's time controller that function objects may use.
///
/// Methods take `&self` so that objects holding a shared borrow of the
/// controller can still request a stop while the run loop drives it.
pub trait TimeControl {
    /// Requests a new stop control. Returns `true` if the request changed
    /// the controller's state, `false` if it was already in effect.
    fn stop_at(&self, stop: StopAt) -> bool;

    fn time_index(&self) -> u64;

    fn case_root(&self) -> &Path;
}
