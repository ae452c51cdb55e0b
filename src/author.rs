//! Task file authoring.
//!
//! [`FileAuthor`] maps a [`TaskRecord`] to a Markdown file inside one task
//! folder. Existing files are never overwritten: a taken name makes the
//! author move on to the next free `" {n}"` suffix.
//!
//! # Publishing
//!
//! ```text
//! <folder>/.calvault-XXXXXX.tmp      # body written + synced here
//!        └── link/rename (no clobber) ──> <folder>/2025-02-12 Title.md
//! ```
//!
//! Readers and watchers never see a partially written task file. The
//! temporary file is hidden so observers ignoring dot-files skip it.
//!
//! Filename resolution assumes a single writer per folder, title and date.
//! Concurrent writers cannot overwrite each other but may skip suffixes.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::naming;
use crate::render::{FrontMatterRenderer, TaskRenderer};
use crate::task::TaskRecord;

/// Marker literal appended to every authored file
pub const DEFAULT_MARKER: &str = "TimeTree";

/// Prefix of the hidden staging files used while publishing
pub const TEMP_PREFIX: &str = ".calvault-";

/// Result of a successful [`FileAuthor::write`]
#[derive(Debug, Clone, Serialize)]
pub struct AuthoredFile {
    /// Absolute path of the new file
    pub path: PathBuf,
    pub filename: String,
    /// Disambiguation integer, if the plain name was taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<u32>,
    /// The task as written, title including any suffix
    pub record: TaskRecord,
}

pub struct FileAuthor {
    folder: PathBuf,
    marker: String,
    renderer: Box<dyn TaskRenderer>,
}

impl std::fmt::Debug for FileAuthor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAuthor")
            .field("folder", &self.folder)
            .field("marker", &self.marker)
            .finish_non_exhaustive()
    }
}

impl FileAuthor {
    /// Create an author for `folder`, creating the folder if needed.
    ///
    /// Fails with `StorageUnavailable` when the path is not a directory or
    /// cannot be created.
    pub fn new(folder: impl AsRef<Path>) -> Result<Self> {
        Self::for_folder(ensure_folder(folder.as_ref(), true)?)
    }

    /// Create an author for a folder that must already exist.
    ///
    /// Nothing is created on disk; a missing folder is `StorageUnavailable`.
    pub fn open(folder: impl AsRef<Path>) -> Result<Self> {
        Self::for_folder(ensure_folder(folder.as_ref(), false)?)
    }

    fn for_folder(folder: PathBuf) -> Result<Self> {
        debug!(folder = %folder.display(), "task author ready");
        Ok(Self {
            folder,
            marker: DEFAULT_MARKER.to_string(),
            renderer: Box::new(FrontMatterRenderer),
        })
    }

    /// Create an author for the task folder and marker named in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.tasks_folder()?)?.with_marker(config.marker.clone())
    }

    /// Replace the body renderer.
    pub fn with_renderer(mut self, renderer: impl TaskRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Replace the marker literal. It must be a single non-empty line.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Result<Self> {
        let marker = marker.into();
        validate_marker(&marker)?;
        self.marker = marker;
        Ok(self)
    }

    /// Canonical path of the task folder
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// The trailing line every authored file ends with
    pub fn marker_line(&self) -> String {
        format!("{}\n", self.marker)
    }

    /// Full file body for `task`: rendered body followed by the marker line.
    pub fn render_body(&self, task: &TaskRecord) -> String {
        let mut body = self.renderer.render(task);
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(&self.marker_line());
        body
    }

    /// Where the file for `task` lives, taking its title as final.
    pub fn expected_path(&self, task: &TaskRecord) -> Result<PathBuf> {
        let filename = naming::task_filename(&task.date_key(), task.title())?;
        Ok(self.folder.join(filename))
    }

    /// Author `task` into the folder.
    ///
    /// The returned record carries the title actually used: when
    /// `"{date} {title}.md"` is taken, the file becomes
    /// `"{date} {title} {n}.md"` and the title `"{title} {n}"`, `n` being
    /// one more than the highest suffix in use for this title and date.
    pub fn write(&self, task: &TaskRecord) -> Result<AuthoredFile> {
        let date_key = task.date_key();
        let base = naming::task_filename(&date_key, task.title())?;
        self.check_folder()?;

        let mut suffix: Option<u32> = None;
        loop {
            let filename = match suffix {
                None => base.clone(),
                Some(n) => naming::suffixed_filename(&date_key, task.title(), n)?,
            };
            let path = self.folder.join(&filename);

            if !entry_exists(&path)? {
                let record = match suffix {
                    None => task.clone(),
                    Some(n) => task.with_title(naming::suffixed_title(task.title(), n)),
                };
                let body = self.render_body(&record);
                if self.publish(&path, body.as_bytes())? {
                    info!(path = %path.display(), suffix = ?suffix, "authored task file");
                    return Ok(AuthoredFile {
                        path,
                        filename,
                        suffix,
                        record,
                    });
                }
                debug!(path = %path.display(), "name taken while publishing");
            }

            suffix = Some(match suffix {
                None => naming::highest_suffix(&self.folder, &date_key, task.title())
                    .map_err(|err| self.classify(err))?
                    .checked_add(1)
                    .ok_or_else(|| Error::invalid_title(task.title(), "no free suffix left"))?,
                Some(n) => n
                    .checked_add(1)
                    .ok_or_else(|| Error::invalid_title(task.title(), "no free suffix left"))?,
            });
            debug!(title = task.title(), suffix = ?suffix, "filename collision");
        }
    }

    /// Author `task` and apply the disambiguated title to it.
    ///
    /// After this call `expected_path(task)` names the written file.
    pub fn write_in_place(&self, task: &mut TaskRecord) -> Result<PathBuf> {
        let authored = self.write(task)?;
        *task = authored.record;
        Ok(authored.path)
    }

    /// Remove the file for `task`. Returns whether a file was removed.
    pub fn delete_task(&self, task: &TaskRecord) -> Result<bool> {
        let path = self.expected_path(task)?;
        self.remove(&path)
    }

    /// Remove an authored file by path. Relative paths resolve against the
    /// task folder; paths elsewhere are refused.
    pub fn delete_path(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = self.resolve_owned(path.as_ref())?;
        self.remove(&path)
    }

    fn remove(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "deleted task file");
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "task file already gone");
                Ok(false)
            }
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn resolve_owned(&self, path: &Path) -> Result<PathBuf> {
        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.folder.join(path)
        };
        let name = candidate.file_name().ok_or_else(|| {
            Error::InvalidArgument(format!("{} does not name a file", path.display()))
        })?;
        let parent = candidate.parent().unwrap_or_else(|| Path::new(""));
        // The folder itself may be gone; its recorded path still matches.
        let inside = match fs::canonicalize(parent) {
            Ok(resolved) => resolved == self.folder,
            Err(_) => parent == self.folder,
        };
        if !inside {
            return Err(Error::InvalidArgument(format!(
                "{} is outside the task folder {}",
                path.display(),
                self.folder.display()
            )));
        }
        Ok(self.folder.join(name))
    }

    fn check_folder(&self) -> Result<()> {
        match fs::metadata(&self.folder) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(Error::storage_unavailable(
                &self.folder,
                "path is no longer a directory",
            )),
            Err(err) => Err(Error::storage_unavailable(&self.folder, err.to_string())),
        }
    }

    /// Stage `data` next to `path` and move it into place without clobbering.
    ///
    /// Returns `false` when `path` was taken in the meantime.
    fn publish(&self, path: &Path, data: &[u8]) -> Result<bool> {
        let mut staged = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.folder)
            .map_err(|err| self.classify(err))?;
        staged.write_all(data).map_err(|err| self.classify(err))?;
        staged.as_file().sync_all()?;

        match staged.persist_noclobber(path) {
            Ok(_) => Ok(true),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(self.classify(err.error)),
        }
    }

    fn classify(&self, err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                Error::storage_unavailable(&self.folder, err.to_string())
            }
            _ => Error::Io(err),
        }
    }
}

fn ensure_folder(folder: &Path, create: bool) -> Result<PathBuf> {
    match fs::metadata(folder) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(Error::storage_unavailable(
                folder,
                "path exists and is not a directory",
            ))
        }
        Err(err) if create && err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(folder).map_err(|err| {
                Error::storage_unavailable(folder, format!("cannot create folder: {err}"))
            })?;
        }
        Err(err) => return Err(Error::storage_unavailable(folder, err.to_string())),
    }
    fs::canonicalize(folder).map_err(|err| Error::storage_unavailable(folder, err.to_string()))
}

fn entry_exists(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(Error::Io(err)),
    }
}

fn validate_marker(marker: &str) -> Result<()> {
    if marker.trim().is_empty() {
        return Err(Error::InvalidConfig("marker cannot be empty".to_string()));
    }
    if marker.contains(['\n', '\r']) {
        return Err(Error::InvalidConfig(
            "marker must be a single line".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::parse_date;
    use tempfile::TempDir;

    fn task(title: &str) -> TaskRecord {
        TaskRecord::builder(title, parse_date("2025-02-12").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn new_creates_missing_folder_idempotently() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("6 - Tasks").join("Calendar Tasks");

        let first = FileAuthor::new(&folder).expect("create");
        let second = FileAuthor::new(&folder).expect("reuse");
        assert!(folder.is_dir());
        assert_eq!(first.folder(), second.folder());
        assert!(first.folder().is_absolute());
    }

    #[test]
    fn new_rejects_file_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();

        let err = FileAuthor::new(&file).expect_err("file path");
        assert!(matches!(err, Error::StorageUnavailable { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn body_is_render_plus_marker() {
        let dir = TempDir::new().unwrap();
        let author = FileAuthor::new(dir.path()).unwrap();
        let t = task("Body");

        let authored = author.write(&t).unwrap();
        let content = fs::read_to_string(&authored.path).unwrap();
        assert_eq!(content, format!("{}TimeTree\n", FrontMatterRenderer.render(&t)));
    }

    #[test]
    fn renderer_without_trailing_newline_gets_one() {
        let dir = TempDir::new().unwrap();
        let author = FileAuthor::new(dir.path())
            .unwrap()
            .with_renderer(|task: &TaskRecord| format!("# {}", task.title()))
            .with_marker("Source: test")
            .unwrap();

        let authored = author.write(&task("Heading")).unwrap();
        let content = fs::read_to_string(&authored.path).unwrap();
        assert_eq!(content, "# Heading\nSource: test\n");
    }

    #[test]
    fn multi_line_marker_rejected() {
        let dir = TempDir::new().unwrap();
        let err = FileAuthor::new(dir.path())
            .unwrap()
            .with_marker("a\nb")
            .expect_err("multi-line marker");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn collision_picks_next_suffix() {
        let dir = TempDir::new().unwrap();
        let author = FileAuthor::new(dir.path()).unwrap();

        let first = author.write(&task("Dup")).unwrap();
        let second = author.write(&task("Dup")).unwrap();
        let third = author.write(&task("Dup")).unwrap();

        assert_eq!(first.filename, "2025-02-12 Dup.md");
        assert_eq!(first.suffix, None);
        assert_eq!(second.filename, "2025-02-12 Dup 1.md");
        assert_eq!(second.record.title(), "Dup 1");
        assert_eq!(third.filename, "2025-02-12 Dup 2.md");
        assert_eq!(third.suffix, Some(2));
    }

    #[test]
    fn deleted_suffix_not_reused_below_higher_one() {
        let dir = TempDir::new().unwrap();
        let author = FileAuthor::new(dir.path()).unwrap();
        author.write(&task("Gap")).unwrap();
        let one = author.write(&task("Gap")).unwrap();
        author.write(&task("Gap")).unwrap();

        assert!(author.delete_path(&one.path).unwrap());
        let next = author.write(&task("Gap")).unwrap();
        assert_eq!(next.filename, "2025-02-12 Gap 3.md");
        assert!(!one.path.exists());
    }

    #[test]
    fn write_in_place_mutates_title() {
        let dir = TempDir::new().unwrap();
        let author = FileAuthor::new(dir.path()).unwrap();
        author.write(&task("Inplace")).unwrap();

        let mut t = task("Inplace");
        let path = author.write_in_place(&mut t).unwrap();
        assert_eq!(t.title(), "Inplace 1");
        assert_eq!(author.expected_path(&t).unwrap(), path);
    }

    #[test]
    fn invalid_title_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let author = FileAuthor::new(dir.path()).unwrap();

        let err = author.write(&task("a/b")).expect_err("illegal title");
        assert!(matches!(err, Error::InvalidTitle { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn no_staging_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let author = FileAuthor::new(dir.path()).unwrap();
        for _ in 0..5 {
            author.write(&task("Clean")).unwrap();
        }

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn write_after_folder_removed_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("tasks");
        let author = FileAuthor::new(&folder).unwrap();
        fs::remove_dir(&folder).unwrap();

        let err = author.write(&task("Gone")).expect_err("missing folder");
        assert!(matches!(err, Error::StorageUnavailable { .. }));
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let author = FileAuthor::new(dir.path()).unwrap();
        let t = task("Delete me");
        let authored = author.write(&t).unwrap();

        assert!(author.delete_task(&t).unwrap());
        assert!(!authored.path.exists());
        assert!(!author.delete_task(&t).unwrap());
        assert!(!author.delete_path(&authored.path).unwrap());
    }

    #[test]
    fn delete_after_folder_removed_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("tasks");
        let author = FileAuthor::new(&folder).unwrap();
        let authored = author.write(&task("Orphaned")).unwrap();
        fs::remove_dir_all(&folder).unwrap();

        assert!(!author.delete_path(&authored.path).unwrap());
        assert!(!author.delete_task(&authored.record).unwrap());
        assert!(matches!(
            author.delete_path(folder.join("..").join("elsewhere.md")),
            Err(Error::InvalidArgument(_))
        ));
        assert!(!folder.exists());
    }

    #[test]
    fn open_does_not_create_folder() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("absent");

        let err = FileAuthor::open(&folder).expect_err("missing folder");
        assert!(matches!(err, Error::StorageUnavailable { .. }));
        assert!(!folder.exists());

        fs::create_dir(&folder).unwrap();
        let author = FileAuthor::open(&folder).unwrap();
        assert!(author.folder().is_absolute());
    }

    #[test]
    fn delete_path_refuses_foreign_paths() {
        let dir = TempDir::new().unwrap();
        let author = FileAuthor::new(dir.path().join("tasks")).unwrap();
        let outside = dir.path().join("keep.md");
        fs::write(&outside, "keep").unwrap();

        let err = author.delete_path(&outside).expect_err("outside folder");
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(outside.exists());

        let err = author.delete_path("../keep.md").expect_err("escape");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
