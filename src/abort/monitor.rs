use std::fs;
use std::path::{Path, PathBuf};

use super::{AbortNotice, ConfigurationError, StopMode, TYPE_NAME};
use crate::expand::{expand, Vars, CASE_ROOT_VAR};
use crate::function_object::{FunctionObject, FunctionObjectError, Options, RunHandle};

/// Watches for a sentinel file and asks the time controller to stop the run
/// when it appears. The file is removed again when the run ends.
pub struct AbortMonitor<'t> {
    name: String,
    run: RunHandle<'t>,
    sentinel_path: PathBuf,
    mode: StopMode,
}

impl<'t> AbortMonitor<'t> {
    /// Builds the monitor, applies `options` and sweeps away a sentinel file
    /// left over from a previous run.
    pub fn new(name: &str, run: RunHandle<'t>, options: &Options) -> Result<Self, ConfigurationError> {
        let default_path = expand(&format!("${}/{}", CASE_ROOT_VAR, name), &case_vars(run))?;

        let mut monitor = Self {
            name: name.to_string(),
            run,
            sentinel_path: default_path,
            mode: StopMode::default(),
        };
        monitor.configure(options)?;
        monitor.remove_sentinel();

        Ok(monitor)
    }

    /// Applies the `action` and `file` options. A missing `action` resets
    /// the mode to [`StopMode::NextWrite`]; a missing `file` keeps the
    /// current path.
    pub fn configure(&mut self, options: &Options) -> Result<bool, ConfigurationError> {
        let mode = match lookup_str(options, "action")? {
            Some(token) => StopMode::parse(token)?,
            None => StopMode::NextWrite,
        };
        let path = lookup_str(options, "file")?
            .map(|file| expand(file, &case_vars(self.run)))
            .transpose()?;

        self.mode = mode;
        if let Some(path) = path {
            self.sentinel_path = path;
        }
        log::debug!(
            "{}: watching {} (action {})",
            self.name,
            self.sentinel_path.display(),
            self.mode
        );

        Ok(true)
    }

    /// Checks for the sentinel file on every rank and, if any rank sees it,
    /// requests a stop. Returns the notice when the controller accepted the
    /// request.
    pub fn poll(&self) -> Option<AbortNotice> {
        if !self.sentinel_exists() {
            return None;
        }

        let accepted = self.run.time.stop_at(self.mode.into());
        accepted.then(|| AbortNotice {
            time_index: self.run.time.time_index(),
            mode: self.mode,
        })
    }

    /// Removes the sentinel file from the master rank if any rank sees it.
    pub fn remove_sentinel(&self) {
        if !self.sentinel_exists() || !self.run.comm.is_master() {
            return;
        }

        match fs::remove_file(&self.sentinel_path) {
            Ok(()) => log::info!("{}: removed {}", self.name, self.sentinel_path.display()),
            Err(e) => log::warn!(
                "{}: could not remove {}: {}",
                self.name,
                self.sentinel_path.display(),
                e
            ),
        }
    }

    pub fn sentinel_path(&self) -> &Path {
        &self.sentinel_path
    }

    pub fn mode(&self) -> StopMode {
        self.mode
    }

    fn sentinel_exists(&self) -> bool {
        self.run.comm.reduce_or(self.sentinel_path.is_file())
    }
}

impl FunctionObject for AbortMonitor<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn read(&mut self, options: &Options) -> Result<bool, FunctionObjectError> {
        self.configure(options)
            .map_err(|source| FunctionObjectError::Configuration {
                name: self.name.clone(),
                source,
            })
    }

    fn execute(&mut self) -> bool {
        if let Some(notice) = self.poll() {
            if self.run.comm.is_master() {
                log::info!("{}", notice);
            }
        }
        true
    }

    fn write(&mut self) -> bool {
        true
    }

    fn end(&mut self) -> bool {
        self.remove_sentinel();
        true
    }
}

fn case_vars(run: RunHandle<'_>) -> Vars {
    Vars::from([(
        CASE_ROOT_VAR.to_string(),
        run.time.case_root().display().to_string(),
    )])
}

fn lookup_str<'a>(options: &'a Options, key: &str) -> Result<Option<&'a str>, ConfigurationError> {
    match options.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| ConfigurationError::NotAString { key: key.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{Communicator, Serial, ThreadGroup};
    use crate::time::{StopAt, TimeControl};
    use std::cell::{Cell, RefCell};
    use std::thread;
    use tempfile::TempDir;

    /// Controller double that records every stop request.
    struct Recorder {
        root: PathBuf,
        index: Cell<u64>,
        current: Cell<StopAt>,
        requests: RefCell<Vec<StopAt>>,
    }

    impl Recorder {
        fn new(root: &Path) -> Self {
            Self {
                root: root.to_path_buf(),
                index: Cell::new(0),
                current: Cell::new(StopAt::EndTime),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn step(&self) {
            self.index.set(self.index.get() + 1);
        }
    }

    impl TimeControl for Recorder {
        fn stop_at(&self, stop: StopAt) -> bool {
            self.requests.borrow_mut().push(stop);
            let changed = self.current.get() != stop;
            self.current.set(stop);
            changed
        }

        fn time_index(&self) -> u64 {
            self.index.get()
        }

        fn case_root(&self) -> &Path {
            &self.root
        }
    }

    fn options(yaml: &str) -> Options {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn default_path_is_case_root_plus_name() {
        let case = TempDir::new().unwrap();
        let time = Recorder::new(case.path());
        let monitor = AbortMonitor::new("abort", RunHandle::new(&time, &Serial), &Options::new()).unwrap();

        assert_eq!(monitor.sentinel_path(), case.path().join("abort"));
        assert!(!monitor.sentinel_path().to_string_lossy().contains('$'));
        assert_eq!(monitor.mode(), StopMode::NextWrite);
    }

    #[test]
    fn each_action_token_sets_its_mode() {
        let case = TempDir::new().unwrap();
        let time = Recorder::new(case.path());
        let run = RunHandle::new(&time, &Serial);

        for mode in StopMode::ALL {
            let opts = options(&format!("action: {}", mode));
            let monitor = AbortMonitor::new("abort", run, &opts).unwrap();
            assert_eq!(monitor.mode(), mode);
        }
    }

    #[test]
    fn bad_action_fails_configuration() {
        let case = TempDir::new().unwrap();
        let time = Recorder::new(case.path());
        let run = RunHandle::new(&time, &Serial);

        let err = AbortMonitor::new("abort", run, &options("action: halt")).err().unwrap();
        assert!(matches!(err, ConfigurationError::InvalidAction(ref t) if t == "halt"));

        let err = AbortMonitor::new("abort", run, &options("action: 3")).err().unwrap();
        assert!(matches!(err, ConfigurationError::NotAString { ref key } if key == "action"));
    }

    #[test]
    fn reconfigure_resets_mode_and_keeps_path() {
        let case = TempDir::new().unwrap();
        let time = Recorder::new(case.path());
        let opts = options("action: writeNow\nfile: $CASE_ROOT/STOP");
        let mut monitor = AbortMonitor::new("abort", RunHandle::new(&time, &Serial), &opts).unwrap();
        assert_eq!(monitor.mode(), StopMode::WriteNow);

        assert!(monitor.configure(&Options::new()).unwrap());
        assert_eq!(monitor.mode(), StopMode::NextWrite);
        assert_eq!(monitor.sentinel_path(), case.path().join("STOP"));
    }

    #[test]
    fn failed_reconfigure_leaves_state_untouched() {
        let case = TempDir::new().unwrap();
        let time = Recorder::new(case.path());
        let opts = options("action: noWriteNow");
        let mut monitor = AbortMonitor::new("abort", RunHandle::new(&time, &Serial), &opts).unwrap();

        let bad = options("action: writeNow\nfile: $STOPFILE_SURELY_UNSET_42/STOP");
        assert!(matches!(monitor.configure(&bad), Err(ConfigurationError::Expand(_))));
        assert_eq!(monitor.mode(), StopMode::NoWriteNow);
        assert_eq!(monitor.sentinel_path(), case.path().join("abort"));
    }

    #[test]
    fn construction_removes_stale_sentinel() {
        let case = TempDir::new().unwrap();
        let stale = case.path().join("abort");
        fs::write(&stale, "").unwrap();

        let time = Recorder::new(case.path());
        let _monitor = AbortMonitor::new("abort", RunHandle::new(&time, &Serial), &Options::new()).unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn no_sentinel_no_request() {
        let case = TempDir::new().unwrap();
        let time = Recorder::new(case.path());
        let mut monitor = AbortMonitor::new("abort", RunHandle::new(&time, &Serial), &Options::new()).unwrap();

        for _ in 0..5 {
            time.step();
            assert!(monitor.poll().is_none());
            assert!(monitor.execute());
        }
        assert!(time.requests.borrow().is_empty());
    }

    #[test]
    fn sentinel_requests_stop_every_iteration() {
        let case = TempDir::new().unwrap();
        let time = Recorder::new(case.path());
        let opts = options("action: noWriteNow");
        let monitor = AbortMonitor::new("abort", RunHandle::new(&time, &Serial), &opts).unwrap();
        fs::write(monitor.sentinel_path(), "").unwrap();

        time.step();
        let notice = monitor.poll().unwrap();
        assert_eq!(
            notice.to_string(),
            "USER REQUESTED ABORT (timeIndex=1): stop without writing data"
        );

        time.step();
        assert!(monitor.poll().is_none(), "already accepted, no second notice");
        time.step();
        assert!(monitor.poll().is_none());

        assert_eq!(*time.requests.borrow(), vec![StopAt::NoWriteNow; 3]);
    }

    #[test]
    fn round_trip_with_explicit_file() {
        let dir = TempDir::new().unwrap();
        let stop = dir.path().join("STOP");
        let time = Recorder::new(Path::new("/nonexistent/case"));
        let opts = options(&format!("file: {}", stop.display()));
        let monitor = AbortMonitor::new("abort", RunHandle::new(&time, &Serial), &opts).unwrap();
        assert_eq!(monitor.sentinel_path(), stop);

        fs::write(&stop, "anything").unwrap();
        time.step();
        let notice = monitor.poll().unwrap();
        assert_eq!(notice.mode, StopMode::NextWrite);

        fs::remove_file(&stop).unwrap();
        time.step();
        assert!(monitor.poll().is_none());
        assert_eq!(time.requests.borrow().len(), 1);
    }

    #[test]
    fn run_end_removes_once() {
        let case = TempDir::new().unwrap();
        let time = Recorder::new(case.path());
        let mut monitor = AbortMonitor::new("abort", RunHandle::new(&time, &Serial), &Options::new()).unwrap();
        fs::write(monitor.sentinel_path(), "").unwrap();

        assert!(monitor.write());
        assert!(monitor.end());
        assert!(!monitor.sentinel_path().exists());
        assert!(monitor.end());
    }

    #[test]
    fn any_rank_seeing_sentinel_stops_all() {
        let comms = ThreadGroup::new(4).unwrap();
        let cases: Vec<TempDir> = (0..4).map(|_| TempDir::new().unwrap()).collect();

        let results: Vec<(bool, Vec<StopAt>)> = thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .zip(&cases)
                .map(|(comm, case)| {
                    s.spawn(move || {
                        let time = Recorder::new(case.path());
                        let opts = options("action: writeNow");
                        let monitor = AbortMonitor::new("abort", RunHandle::new(&time, comm), &opts).unwrap();
                        // Every rank is past construction (and its cleanup
                        // sweep) before the file appears on rank 2.
                        comm.reduce_or(false);
                        if comm.rank() == 2 {
                            fs::write(monitor.sentinel_path(), "").unwrap();
                        }
                        comm.reduce_or(false);

                        time.step();
                        let stopped = monitor.poll().is_some();
                        let requests = time.requests.borrow().clone();
                        (stopped, requests)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (stopped, requests) in results {
            assert!(stopped);
            assert_eq!(requests, vec![StopAt::WriteNow]);
        }
    }

    /// Runs `end` on three ranks, each with its own case directory, after
    /// creating the sentinel only in `holder`'s directory. Returns whether
    /// each rank's sentinel exists afterwards.
    fn run_end_with_sentinel_on(holder: usize) -> Vec<bool> {
        let comms = ThreadGroup::new(3).unwrap();
        let cases: Vec<TempDir> = (0..3).map(|_| TempDir::new().unwrap()).collect();

        thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .zip(&cases)
                .map(|(comm, case)| {
                    s.spawn(move || {
                        let time = Recorder::new(case.path());
                        let mut monitor =
                            AbortMonitor::new("abort", RunHandle::new(&time, comm), &Options::new()).unwrap();
                        comm.reduce_or(false);
                        if comm.rank() == holder {
                            fs::write(monitor.sentinel_path(), "").unwrap();
                        }
                        comm.reduce_or(false);
                        assert!(monitor.end());
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
        });

        cases.iter().map(|case| case.path().join("abort").exists()).collect()
    }

    #[test]
    fn only_master_removes_on_run_end() {
        assert_eq!(run_end_with_sentinel_on(1), vec![false, true, false]);
        assert_eq!(run_end_with_sentinel_on(0), vec![false, false, false]);
    }
}
