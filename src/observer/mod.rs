//! Filesystem change observation.
//!
//! A [`ChangeObserver`] records which files appear in one folder between
//! [`start`](ChangeObserver::start) and [`stop`](ChangeObserver::stop):
//!
//! ```text
//! Idle ──start()──> Running ──stop()──> Stopped
//!                      │                   │
//!               start(): AlreadyRunning    start(): AlreadyStopped
//!                                          retrieve_added_files()
//! ```
//!
//! Detection is delegated to a [`ChangeSource`]: [`NotifySource`] uses native
//! notifications, [`PollingSource`] scans on an interval. Either way `stop()`
//! finishes with a reconciliation scan, so a file created before `stop()`
//! and still present is reported even if its notification was late.

mod native;
mod polling;
mod recorder;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::config::{Config, ObserverBackend, ObserverConfig};
use crate::error::{Error, Result};

pub use native::NotifySource;
pub use polling::{PollingSource, DEFAULT_POLL_INTERVAL};
pub use recorder::{ChangeSet, Recorder};

/// Capability that feeds file creations into a [`Recorder`].
pub trait ChangeSource: Send {
    /// Start delivering creations in `recorder.folder()`.
    fn begin(&mut self, recorder: Arc<Recorder>) -> Result<()>;

    /// Stop delivering. On return no more calls reach the recorder.
    fn finish(&mut self) -> Result<()>;
}

/// Observer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Idle,
    Running,
    Stopped,
}

enum State {
    Idle,
    Running(Arc<Recorder>),
    Stopped(Vec<PathBuf>),
}

pub struct ChangeObserver {
    folder: PathBuf,
    ignore: Vec<glob::Pattern>,
    source: Box<dyn ChangeSource>,
    state: State,
}

impl ChangeObserver {
    /// Observer for `folder` using native notifications and ignoring
    /// dot-files.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self::with_source(folder, NotifySource::new())
    }

    /// Observer for `folder` scanning every `interval`.
    pub fn polling(folder: impl Into<PathBuf>, interval: std::time::Duration) -> Self {
        Self::with_source(folder, PollingSource::new(interval))
    }

    /// Observer for `folder` with a custom detection source.
    pub fn with_source(folder: impl Into<PathBuf>, source: impl ChangeSource + 'static) -> Self {
        Self {
            folder: folder.into(),
            ignore: default_ignore(),
            source: Box::new(source),
            state: State::Idle,
        }
    }

    /// Observer for the configured task folder and backend.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::for_folder(config.tasks_folder()?, &config.observer)
    }

    /// Observer for `folder` with backend and ignore list from `observer`.
    pub fn for_folder(folder: impl Into<PathBuf>, observer: &ObserverConfig) -> Result<Self> {
        let ignore = observer.ignore_patterns()?;
        let base = match observer.backend {
            ObserverBackend::Notify => Self::new(folder),
            ObserverBackend::Poll => Self::polling(folder, observer.poll_interval()),
        };
        Ok(base.with_ignore(ignore))
    }

    /// Replace the file-name patterns that are never reported.
    pub fn with_ignore(mut self, ignore: Vec<glob::Pattern>) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn state(&self) -> ObserverState {
        match self.state {
            State::Idle => ObserverState::Idle,
            State::Running(_) => ObserverState::Running,
            State::Stopped(_) => ObserverState::Stopped,
        }
    }

    /// Begin recording. Files already in the folder are never reported.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Running(_) => return Err(Error::AlreadyRunning),
            State::Stopped(_) => return Err(Error::AlreadyStopped),
        }

        let folder = fs::canonicalize(&self.folder)
            .map_err(|err| Error::storage_unavailable(&self.folder, err.to_string()))?;
        if !folder.is_dir() {
            return Err(Error::storage_unavailable(&folder, "not a directory"));
        }

        let recorder = Arc::new(Recorder::new(folder, self.ignore.clone())?);
        self.source.begin(Arc::clone(&recorder))?;
        info!(folder = %recorder.folder().display(), "change observer started");
        self.state = State::Running(recorder);
        Ok(())
    }

    /// Stop recording and freeze the observed set.
    pub fn stop(&mut self) -> Result<()> {
        let recorder = match &self.state {
            State::Running(recorder) => Arc::clone(recorder),
            State::Idle | State::Stopped(_) => return Err(Error::NotRunning),
        };

        let finished = self.source.finish();
        let reconciled = match recorder.scan() {
            Err(Error::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                warn!(folder = %recorder.folder().display(), "observed folder vanished");
                Ok(())
            }
            other => other,
        };

        let paths = recorder.paths();
        info!(added = paths.len(), "change observer stopped");
        self.state = State::Stopped(paths);
        finished.and(reconciled)
    }

    /// Files created during the window, in first-detected order.
    pub fn retrieve_added_files(&self) -> Result<Vec<PathBuf>> {
        match &self.state {
            State::Stopped(paths) => Ok(paths.clone()),
            State::Idle | State::Running(_) => Err(Error::NotStopped),
        }
    }
}

impl Drop for ChangeObserver {
    fn drop(&mut self) {
        if let State::Running(_) = self.state {
            debug!("dropping running change observer");
            let _ = self.source.finish();
        }
    }
}

fn default_ignore() -> Vec<glob::Pattern> {
    ObserverConfig::default()
        .ignore_patterns()
        .unwrap_or_default()
}

pub(crate) fn join_worker(worker: Option<JoinHandle<()>>) -> Result<()> {
    match worker {
        Some(handle) => handle
            .join()
            .map_err(|_| Error::Io(io::Error::other("observer thread panicked"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Source that records nothing itself; only the final scan finds files.
    #[derive(Default)]
    struct CountingSource {
        begins: Arc<AtomicUsize>,
        finishes: Arc<AtomicUsize>,
    }

    impl ChangeSource for CountingSource {
        fn begin(&mut self, _recorder: Arc<Recorder>) -> Result<()> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finishes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn state_machine_transitions() {
        let dir = TempDir::new().unwrap();
        let mut observer = ChangeObserver::with_source(dir.path(), CountingSource::default());

        assert_eq!(observer.state(), ObserverState::Idle);
        assert!(matches!(observer.stop(), Err(Error::NotRunning)));
        assert!(matches!(observer.retrieve_added_files(), Err(Error::NotStopped)));

        observer.start().unwrap();
        assert_eq!(observer.state(), ObserverState::Running);
        assert!(matches!(observer.start(), Err(Error::AlreadyRunning)));
        assert!(matches!(observer.retrieve_added_files(), Err(Error::NotStopped)));
        assert_eq!(observer.state(), ObserverState::Running);

        observer.stop().unwrap();
        assert_eq!(observer.state(), ObserverState::Stopped);
        assert!(matches!(observer.start(), Err(Error::AlreadyStopped)));
        assert!(matches!(observer.stop(), Err(Error::NotRunning)));
        assert!(observer.retrieve_added_files().unwrap().is_empty());
    }

    #[test]
    fn reconciliation_scan_catches_undelivered_files() {
        let dir = TempDir::new().unwrap();
        let source = CountingSource::default();
        let finishes = Arc::clone(&source.finishes);
        let mut observer = ChangeObserver::with_source(dir.path(), source);

        observer.start().unwrap();
        fs::write(dir.path().join("late.md"), "late").unwrap();
        observer.stop().unwrap();

        let added = observer.retrieve_added_files().unwrap();
        assert_eq!(added.len(), 1);
        assert!(added[0].ends_with("late.md"));
        assert!(added[0].is_absolute());
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn start_on_missing_folder_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut observer = ChangeObserver::new(dir.path().join("missing"));

        let err = observer.start().expect_err("missing folder");
        assert!(matches!(err, Error::StorageUnavailable { .. }));
        assert_eq!(observer.state(), ObserverState::Idle);
    }

    #[test]
    fn drop_while_running_finishes_source() {
        let dir = TempDir::new().unwrap();
        let source = CountingSource::default();
        let finishes = Arc::clone(&source.finishes);
        let mut observer = ChangeObserver::with_source(dir.path(), source);

        observer.start().unwrap();
        drop(observer);
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn polling_records_between_scans() {
        let dir = TempDir::new().unwrap();
        let mut observer = ChangeObserver::polling(dir.path(), Duration::from_millis(5));

        observer.start().unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        std::thread::sleep(Duration::from_millis(30));
        fs::write(dir.path().join("b.md"), "b").unwrap();
        observer.stop().unwrap();

        let names: Vec<String> = observer
            .retrieve_added_files()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }
}
