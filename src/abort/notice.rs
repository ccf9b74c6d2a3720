use std::fmt;

use super::StopMode;

/// Emitted when the time controller accepts a stop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortNotice {
    pub time_index: u64,
    pub mode: StopMode,
}

impl fmt::Display for AbortNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "USER REQUESTED ABORT (timeIndex={}): {}",
            self.time_index,
            self.mode.description()
        )
    }
}
