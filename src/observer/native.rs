//! Notification-based change source.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use super::recorder::Recorder;
use super::{join_worker, ChangeSource};
use crate::error::Result;

/// Records creations reported by the platform's native watcher.
///
/// Events are handed from the watcher callback to a recording thread over a
/// channel; dropping the watcher closes the channel, so `finish` returns
/// once every delivered event is recorded.
#[derive(Default)]
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
}

impl NotifySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeSource for NotifySource {
    fn begin(&mut self, recorder: Arc<Recorder>) -> Result<()> {
        let (event_tx, event_rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        })?;
        watcher.watch(recorder.folder(), RecursiveMode::NonRecursive)?;
        debug!(folder = %recorder.folder().display(), "native watch started");

        let worker = thread::spawn(move || {
            for res in event_rx {
                match res {
                    Ok(event) => record_event(&recorder, event),
                    Err(err) => warn!(error = %err, "watch error"),
                }
            }
        });

        self.watcher = Some(watcher);
        self.worker = Some(worker);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        drop(self.watcher.take());
        join_worker(self.worker.take())
    }
}

impl Drop for NotifySource {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

fn record_event(recorder: &Recorder, event: Event) {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => {}
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in &event.paths {
                recorder.consider(path);
            }
        }
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in &event.paths {
                recorder.forget(path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if let [from, .., to] = event.paths.as_slice() {
                recorder.forget(from);
                recorder.consider(to);
            }
        }
        // Some backends cannot tell rename sides apart; only the side that
        // exists now is a creation.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            for path in &event.paths {
                if path.exists() {
                    recorder.consider(path);
                } else {
                    recorder.forget(path);
                }
            }
        }
        _ => {}
    }
}
