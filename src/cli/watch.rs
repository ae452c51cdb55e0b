//! calvault watch command implementation

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::config::ObserverConfig;
use crate::error::{Error, Result};
use crate::observer::ChangeObserver;
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub struct WatchOptions {
    pub folder: PathBuf,
    pub duration_ms: u64,
    pub observer: ObserverConfig,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct WatchReport {
    folder: PathBuf,
    duration_ms: u64,
    added: Vec<PathBuf>,
}

pub fn run(opts: WatchOptions) -> Result<()> {
    opts.observer.validate().map_err(|err| match err {
        Error::InvalidConfig(message) => Error::InvalidArgument(message),
        other => other,
    })?;

    let mut observer = ChangeObserver::for_folder(&opts.folder, &opts.observer)?;
    observer.start()?;
    std::thread::sleep(Duration::from_millis(opts.duration_ms));
    observer.stop()?;
    let added = observer.retrieve_added_files()?;

    let mut human = HumanOutput::new(format!(
        "calvault watch: {} new file(s) in {}ms",
        added.len(),
        opts.duration_ms
    ));
    human.push_summary("folder", opts.folder.display().to_string());
    for path in &added {
        human.push_detail(path.display().to_string());
    }

    let report = WatchReport {
        folder: opts.folder,
        duration_ms: opts.duration_ms,
        added,
    };
    emit_success(opts.output, "watch", &report, Some(&human))
}
