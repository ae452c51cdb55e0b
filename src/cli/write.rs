//! calvault write command implementation

use std::path::PathBuf;

use crate::author::FileAuthor;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::{parse_date, parse_time, TaskRecord};

pub struct WriteOptions {
    pub title: String,
    pub date: String,
    pub end_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub folder: PathBuf,
    pub marker: String,
    pub output: OutputOptions,
}

pub fn run(opts: WriteOptions) -> Result<()> {
    let mut builder = TaskRecord::builder(opts.title, parse_date(&opts.date)?);
    if let Some(end) = opts.end_date.as_deref() {
        builder = builder.end_date(parse_date(end)?);
    }
    if let (Some(start), Some(end)) = (opts.start_time.as_deref(), opts.end_time.as_deref()) {
        builder = builder.times(parse_time(start)?, parse_time(end)?);
    }
    let task = builder.build()?;

    let author = FileAuthor::new(&opts.folder)?.with_marker(opts.marker)?;
    let authored = author.write(&task)?;

    let mut human = HumanOutput::new(format!("calvault write: {}", authored.filename));
    human.push_summary("path", authored.path.display().to_string());
    human.push_summary("title", authored.record.title());
    if let Some(n) = authored.suffix {
        human.push_warning(format!(
            "'{}' already existed on {}; authored as suffix {n}",
            task.title(),
            task.date_key()
        ));
    }
    if authored.record.crosses_midnight() {
        human.push_detail("time span crosses midnight");
    }

    emit_success(opts.output, "write", &authored, Some(&human))
}
