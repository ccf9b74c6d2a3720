use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::{RunnerError, RunnerResult};
use super::ConfigWatcher;
use crate::config::Config;
use crate::function_object::{FunctionObjectList, Registry, RunHandle};
use crate::parallel::{Communicator, Serial, ThreadGroup};
use crate::time::{RunTime, StopAt, TimeControl};

/// Drives one run: the iteration loop of every rank plus the function
/// objects named in the run file.
pub struct Runner {
    pub config: Config,
    pub config_path: PathBuf,
    pub case_root: PathBuf,
    pub ranks: usize,
    pub registry: Registry,
}

/// Outcome of a run as seen by the master rank.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub time_index: u64,
    pub written: Vec<u64>,
    pub stop_control: StopAt,
    pub stopped_early: bool,
}

struct RankOutcome {
    time_index: u64,
    written: Vec<u64>,
    stop_control: StopAt,
    stopped_early: bool,
}

impl Runner {
    /// Reads the run file at `path`. `case_root` overrides the one from the
    /// file.
    pub fn from_file(path: &Path, case_root: Option<PathBuf>, ranks: usize) -> RunnerResult<Self> {
        let config = Config::from_file(path)?;
        let case_root = case_root.unwrap_or_else(|| config.case_root(path));

        Ok(Self {
            config,
            config_path: path.to_path_buf(),
            case_root,
            ranks,
            registry: Registry::with_builtins(),
        })
    }

    pub fn run(&self) -> RunnerResult<RunSummary> {
        let started_at = Utc::now();

        let outcome = if self.ranks == 1 {
            self.run_rank(&Serial)?
        } else {
            let comms = ThreadGroup::new(self.ranks)?;
            let results: Vec<RunnerResult<RankOutcome>> = thread::scope(|s| {
                let handles: Vec<_> = comms
                    .iter()
                    .map(|comm| {
                        s.spawn(move || {
                            let _guard = comm.abort_on_panic();
                            let result = self.run_rank(comm);
                            if result.is_err() {
                                comm.abort();
                            }
                            result
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .enumerate()
                    .map(|(rank, h)| h.join().unwrap_or(Err(RunnerError::RankPanicked(rank))))
                    .collect()
            });

            let mut master = None;
            let mut error = None;
            let mut panicked = None;
            for result in results {
                match result {
                    Ok(outcome) => {
                        master.get_or_insert(outcome);
                    }
                    Err(RunnerError::RankPanicked(rank)) => {
                        panicked.get_or_insert(rank);
                    }
                    Err(e) => {
                        error.get_or_insert(e);
                    }
                }
            }

            // A rank that failed with an error aborts its peers, which then
            // unwind; report the root cause.
            if let Some(e) = error {
                return Err(e);
            }
            if let Some(rank) = panicked {
                let rank = comms[0].failed_rank().unwrap_or(rank);
                return Err(RunnerError::RankPanicked(rank));
            }
            master.ok_or(RunnerError::RankPanicked(0))?
        };

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            time_index: outcome.time_index,
            written: outcome.written,
            stop_control: outcome.stop_control,
            stopped_early: outcome.stopped_early,
        })
    }

    fn run_rank(&self, comm: &dyn Communicator) -> RunnerResult<RankOutcome> {
        let control = &self.config.control;
        let delay = control.step_delay()?;

        let time = RunTime::new(&self.case_root, control.end_index, control.write_interval);
        let mut functions = FunctionObjectList::new(
            RunHandle::new(&time, comm),
            &self.registry,
            &self.config.functions,
        )?;
        // Only the master watches and reads the run file; the others follow
        // its decisions through collectives.
        let watcher = if control.reload && comm.is_master() {
            Some(ConfigWatcher::new(&self.config_path)?)
        } else {
            None
        };

        if comm.is_master() {
            log::info!(
                "Starting run in {} on {} rank(s): {} iterations, {} function object(s)",
                self.case_root.display(),
                comm.size(),
                control.end_index,
                functions.len()
            );
        }

        while time.run() {
            time.advance();
            log::debug!("rank {}: iteration {}", comm.rank(), time.time_index());

            functions.execute();

            if control.reload {
                let changed = watcher.as_ref().is_some_and(ConfigWatcher::changed);
                if comm.reduce_or(changed) {
                    self.reload(&mut functions, comm);
                }
            }

            time.apply_stop_control();
            if time.write_time() {
                if comm.is_master() {
                    log::info!("Writing output at iteration {}", time.time_index());
                }
                time.record_write();
                functions.write();
            }

            if let Some(delay) = delay {
                thread::sleep(delay);
            }
        }

        functions.end();

        if comm.is_master() {
            if time.stopped_early() {
                log::info!(
                    "Run stopped at iteration {} ({:?})",
                    time.time_index(),
                    time.stop_control()
                );
            } else {
                log::info!("Run completed at iteration {}", time.time_index());
            }
        }

        Ok(RankOutcome {
            time_index: time.time_index(),
            written: time.written(),
            stop_control: time.stop_control(),
            stopped_early: time.stopped_early(),
        })
    }

    /// Re-reads the function objects from the run file.
    fn reload(&self, functions: &mut FunctionObjectList<'_>, comm: &dyn Communicator) {
        let local = if comm.is_master() {
            match fs::read_to_string(&self.config_path) {
                Ok(text) => Some(text),
                Err(e) => {
                    log::warn!(
                        "Keeping previous settings, cannot read {}: {}",
                        self.config_path.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };
        self.apply_reload(functions, comm, local);
    }

    /// Applies the master's copy of the run file on every rank, so all ranks
    /// reach the same settings. A broken file keeps the current settings.
    fn apply_reload(
        &self,
        functions: &mut FunctionObjectList<'_>,
        comm: &dyn Communicator,
        local: Option<String>,
    ) {
        let Some(text) = comm.broadcast(local) else {
            return;
        };

        let result = Config::from_str(&text)
            .map_err(RunnerError::from)
            .and_then(|config| {
                functions
                    .read(&self.registry, &config.functions)
                    .map_err(RunnerError::from)
            });

        match result {
            Ok(()) if comm.is_master() => {
                log::info!("Re-read function objects from {}", self.config_path.display())
            }
            Ok(()) => {}
            Err(e) if comm.is_master() => {
                log::warn!("Keeping previous settings, re-read failed: {}", e)
            }
            Err(_) => {}
        }
    }
}
