use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use super::{Communicator, ParallelError};

#[derive(Debug)]
struct State {
    slots: Vec<bool>,
    shared_text: Option<String>,
    arrived: usize,
    generation: u64,
    failed_rank: Option<usize>,
}

#[derive(Debug)]
struct Shared {
    size: usize,
    state: Mutex<State>,
    cvar: Condvar,
}

/// In-process stand-in for a group of cooperating processes: one thread
/// per rank, synchronized at every collective.
///
/// Once any rank calls [`ThreadComm::abort`] every rank blocked in, or later
/// entering, a collective panics instead of waiting for a peer that will
/// never arrive.
pub struct ThreadGroup;

impl ThreadGroup {
    /// Returns one communicator per rank, to be moved into its thread.
    pub fn new(size: usize) -> Result<Vec<ThreadComm>, ParallelError> {
        if size == 0 {
            return Err(ParallelError::EmptyGroup);
        }

        let shared = Arc::new(Shared {
            size,
            state: Mutex::new(State {
                slots: vec![false; size],
                shared_text: None,
                arrived: 0,
                generation: 0,
                failed_rank: None,
            }),
            cvar: Condvar::new(),
        });

        Ok((0..size)
            .map(|rank| ThreadComm {
                rank,
                shared: shared.clone(),
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// Marks the group as failed and wakes every waiting rank.
    pub fn abort(&self) {
        let mut state = self.lock();
        state.failed_rank.get_or_insert(self.rank);
        drop(state);
        self.shared.cvar.notify_all();
    }

    /// First rank that aborted the group, if any.
    pub fn failed_rank(&self) -> Option<usize> {
        self.lock().failed_rank
    }

    /// Aborts the group if the current thread unwinds while the guard is
    /// alive.
    pub fn abort_on_panic(&self) -> AbortGuard<'_> {
        AbortGuard { comm: self }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits until every rank has arrived at the same collective.
    fn wait<'a>(&'a self, mut state: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.check(&state);

        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.shared.size {
            state.arrived = 0;
            state.generation += 1;
            self.shared.cvar.notify_all();
            return state;
        }

        let state = self
            .shared
            .cvar
            .wait_while(state, |s| s.generation == generation && s.failed_rank.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        if state.generation == generation {
            self.check(&state);
        }
        state
    }

    fn check(&self, state: &MutexGuard<'_, State>) {
        if let Some(failed) = state.failed_rank {
            panic!(
                "rank {}: process group aborted after rank {} failed",
                self.rank, failed
            );
        }
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn reduce_or(&self, value: bool) -> bool {
        // Each rank only writes its own slot, and only after everyone has
        // read the previous round, so no reset step is needed.
        let mut state = self.lock();
        state.slots[self.rank] = value;
        let state = self.wait(state);
        let combined = state.slots.iter().any(|v| *v);
        drop(self.wait(state));
        combined
    }

    fn broadcast(&self, value: Option<String>) -> Option<String> {
        let mut state = self.lock();
        if self.is_master() {
            state.shared_text = value;
        }
        let state = self.wait(state);
        let text = state.shared_text.clone();
        drop(self.wait(state));
        text
    }
}

/// See [`ThreadComm::abort_on_panic`].
pub struct AbortGuard<'a> {
    comm: &'a ThreadComm,
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.comm.abort();
        }
    }
}
