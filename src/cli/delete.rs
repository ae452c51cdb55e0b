//! calvault delete command implementation

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::author::FileAuthor;
use crate::error::{Error, Result};
use crate::naming;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::{parse_date, TaskRecord};

pub struct DeleteOptions {
    pub path: Option<PathBuf>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub folder: PathBuf,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct DeleteReport {
    path: PathBuf,
    removed: bool,
}

enum Target {
    Path(PathBuf),
    Task(TaskRecord),
}

pub fn run(opts: DeleteOptions) -> Result<()> {
    let target = match (opts.path, opts.title, opts.date) {
        (Some(path), _, _) => Target::Path(path),
        (None, Some(title), Some(date)) => {
            Target::Task(TaskRecord::builder(title, parse_date(&date)?).build()?)
        }
        _ => {
            return Err(Error::InvalidArgument(
                "pass a path or --title with --date".to_string(),
            ))
        }
    };

    let report = if opts.folder.exists() {
        let author = FileAuthor::open(&opts.folder)?;
        match target {
            Target::Path(path) => {
                let removed = author.delete_path(&path)?;
                DeleteReport { path, removed }
            }
            Target::Task(task) => DeleteReport {
                path: author.expected_path(&task)?,
                removed: author.delete_task(&task)?,
            },
        }
    } else {
        // Nothing to delete in a folder that does not exist; leave it absent.
        debug!(folder = %opts.folder.display(), "task folder missing");
        let path = match target {
            Target::Path(path) => path,
            Target::Task(task) => opts
                .folder
                .join(naming::task_filename(&task.date_key(), task.title())?),
        };
        DeleteReport {
            path,
            removed: false,
        }
    };

    let header = if report.removed {
        "calvault delete: removed"
    } else {
        "calvault delete: nothing to remove"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("path", report.path.display().to_string());

    emit_success(opts.output, "delete", &report, Some(&human))
}
