use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use super::{StopAt, TimeControl};

/// Minimal iteration controller: counts steps up to an end index, schedules
/// writes every `write_interval` steps and honors stop requests.
#[derive(Debug)]
pub struct RunTime {
    case_root: PathBuf,
    end_index: u64,
    write_interval: u64,
    index: Cell<u64>,
    stop: Cell<StopAt>,
    stopped_at: Cell<Option<u64>>,
    write_time: Cell<bool>,
    written: RefCell<Vec<u64>>,
}

impl RunTime {
    /// `write_interval` of zero disables scheduled writes.
    pub fn new(case_root: impl Into<PathBuf>, end_index: u64, write_interval: u64) -> Self {
        Self {
            case_root: case_root.into(),
            end_index,
            write_interval,
            index: Cell::new(0),
            stop: Cell::new(StopAt::EndTime),
            stopped_at: Cell::new(None),
            write_time: Cell::new(false),
            written: RefCell::new(Vec::new()),
        }
    }

    pub fn run(&self) -> bool {
        let end = self.stopped_at.get().unwrap_or(self.end_index);
        self.index.get() < end
    }

    /// Moves to the next step and decides whether it is a scheduled write.
    pub fn advance(&self) {
        let index = self.index.get() + 1;
        self.index.set(index);
        let scheduled =
            index == self.end_index || (self.write_interval > 0 && index % self.write_interval == 0);
        self.write_time.set(scheduled);
    }

    /// Applies the current stop control to the step just executed.
    pub fn apply_stop_control(&self) {
        let index = self.index.get();
        match self.stop.get() {
            StopAt::EndTime => {}
            StopAt::NoWriteNow => {
                self.stopped_at.set(Some(index));
                self.write_time.set(false);
            }
            StopAt::WriteNow => {
                self.stopped_at.set(Some(index));
                self.write_time.set(true);
            }
            StopAt::NextWrite => {
                if self.write_time.get() {
                    self.stopped_at.set(Some(index));
                }
            }
        }
    }

    pub fn write_time(&self) -> bool {
        self.write_time.get()
    }

    pub fn record_write(&self) {
        self.written.borrow_mut().push(self.index.get());
    }

    /// Indices of the steps written so far.
    pub fn written(&self) -> Vec<u64> {
        self.written.borrow().clone()
    }

    pub fn stop_control(&self) -> StopAt {
        self.stop.get()
    }

    /// True once a stop request ended the run before its end index.
    pub fn stopped_early(&self) -> bool {
        self.stopped_at.get().is_some_and(|at| at < self.end_index)
    }
}

impl TimeControl for RunTime {
    fn stop_at(&self, stop: StopAt) -> bool {
        let changed = self.stop.get() != stop;
        self.stop.set(stop);
        if stop == StopAt::EndTime {
            self.stopped_at.set(None);
        }
        changed
    }

    fn time_index(&self) -> u64 {
        self.index.get()
    }

    fn case_root(&self) -> &Path {
        &self.case_root
    }
}
