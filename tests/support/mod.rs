#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use calvault::author::FileAuthor;
use calvault::render::{FrontMatterRenderer, TaskRenderer};
use calvault::task::{parse_date, parse_time, TaskRecord};
use tempfile::TempDir;

/// A throwaway vault with a task folder inside it.
pub struct TestVault {
    dir: TempDir,
    folder: PathBuf,
}

impl TestVault {
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let folder = dir
            .path()
            .join("6 - Tasks Management")
            .join("Calendar Tasks");
        fs::create_dir_all(&folder).expect("create task folder");
        let folder = fs::canonicalize(&folder).expect("canonical folder");
        Self { dir, folder }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn author(&self) -> FileAuthor {
        FileAuthor::new(&self.folder).expect("author")
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.folder.join(name);
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.folder.join(name).exists()
    }

    pub fn read_file(&self, name: &str) -> String {
        fs::read_to_string(self.folder.join(name))
            .unwrap_or_else(|err| panic!("failed to open task file {name}: {err}"))
    }

    /// Visible files in the task folder, sorted by name.
    pub fn list_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.folder)
            .expect("read folder")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        names
    }
}

pub fn task(title: &str, date: &str) -> TaskRecord {
    TaskRecord::builder(title, parse_date(date).expect("date"))
        .build()
        .expect("task")
}

pub fn multi_day_task(title: &str, start: &str, end: &str) -> TaskRecord {
    TaskRecord::builder(title, parse_date(start).expect("date"))
        .end_date(parse_date(end).expect("end date"))
        .build()
        .expect("task")
}

pub fn timed_task(
    title: &str,
    start: &str,
    end: Option<&str>,
    start_time: &str,
    end_time: &str,
) -> TaskRecord {
    let mut builder = TaskRecord::builder(title, parse_date(start).expect("date"))
        .times(
            parse_time(start_time).expect("start time"),
            parse_time(end_time).expect("end time"),
        );
    if let Some(end) = end {
        builder = builder.end_date(parse_date(end).expect("end date"));
    }
    builder.build().expect("task")
}

/// Expected body of an authored file with the default renderer and marker.
pub fn expected_content(task: &TaskRecord) -> String {
    format!("{}TimeTree\n", FrontMatterRenderer.render(task))
}

/// Remove every path an observer reported.
pub fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}
