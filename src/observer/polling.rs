//! Polling change source.
//!
//! Scans the folder every `interval`. A file that is created and deleted
//! between two scans is missed, so keep the interval well below the time
//! such files live. Prefer [`NotifySource`](super::NotifySource) where the
//! platform supports it.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::recorder::Recorder;
use super::{join_worker, ChangeSource};
use crate::error::Result;

/// Default scan interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct PollingSource {
    interval: Duration,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl PollingSource {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stop_tx: None,
            worker: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PollingSource {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ChangeSource for PollingSource {
    fn begin(&mut self, recorder: Arc<Recorder>) -> Result<()> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let interval = self.interval;
        debug!(folder = %recorder.folder().display(), ?interval, "polling started");

        let worker = thread::spawn(move || loop {
            if let Err(err) = recorder.scan() {
                warn!(error = %err, "poll scan failed");
            }
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        self.stop_tx = Some(stop_tx);
        self.worker = Some(worker);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        join_worker(self.worker.take())
    }
}

impl Drop for PollingSource {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}
