//! Shared recording state for an observation window.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use tracing::trace;

use crate::error::Result;

/// Paths in first-seen order, each at most once.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    order: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl ChangeSet {
    /// Record `path`. Returns `false` if it was already recorded.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if !self.seen.insert(path.clone()) {
            return false;
        }
        self.order.push(path);
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Identity of a directory entry, so a file re-created under a known name
/// is told apart from the one that was there before. Writes to a file keep
/// its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileId {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
    created: Option<SystemTime>,
}

impl FileId {
    #[cfg(unix)]
    fn of(meta: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            dev: meta.dev(),
            ino: meta.ino(),
            created: meta.created().ok(),
        }
    }

    #[cfg(not(unix))]
    fn of(meta: &fs::Metadata) -> Self {
        Self {
            created: meta.created().ok(),
        }
    }
}

#[derive(Debug, Default)]
struct Tracked {
    /// Entries present when observation started and not removed since
    baseline: HashMap<PathBuf, FileId>,
    changes: ChangeSet,
}

impl Tracked {
    /// Whether `path` is still the entry captured at start.
    fn is_preexisting(&self, path: &Path, current: Option<FileId>) -> bool {
        match (self.baseline.get(path), current) {
            (Some(before), Some(now)) => *before == now,
            _ => false,
        }
    }
}

/// What a [`ChangeSource`](super::ChangeSource) feeds while running.
///
/// Holds the canonical folder, the entries present when observation started,
/// the ignore patterns and the growing [`ChangeSet`]. A starting entry that
/// is removed, or replaced by a different file, stops being part of the
/// baseline.
#[derive(Debug)]
pub struct Recorder {
    folder: PathBuf,
    ignore: Vec<glob::Pattern>,
    tracked: Mutex<Tracked>,
}

impl Recorder {
    /// Snapshot `folder` so existing entries are never reported.
    pub fn new(folder: PathBuf, ignore: Vec<glob::Pattern>) -> Result<Self> {
        let mut baseline = HashMap::new();
        for entry in fs::read_dir(&folder)? {
            let entry = entry?;
            // Entries can vanish between listing and stat.
            if let Ok(meta) = fs::symlink_metadata(entry.path()) {
                baseline.insert(entry.path(), FileId::of(&meta));
            }
        }
        Ok(Self {
            folder,
            ignore,
            tracked: Mutex::new(Tracked {
                baseline,
                changes: ChangeSet::default(),
            }),
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Record a path a notification reported as created.
    ///
    /// A path that is already gone still counts: it existed after
    /// observation started.
    pub fn consider(&self, path: &Path) {
        if !self.is_candidate(path) {
            return;
        }
        let meta = fs::symlink_metadata(path).ok();
        if meta.as_ref().is_some_and(|meta| meta.is_dir()) {
            return;
        }
        let mut tracked = self.lock();
        if tracked.is_preexisting(path, meta.as_ref().map(FileId::of)) {
            return;
        }
        tracked.baseline.remove(path);
        if tracked.changes.insert(path.to_path_buf()) {
            trace!(path = %path.display(), "observed new file");
        }
    }

    /// Drop a path a notification reported as removed from the baseline.
    pub fn forget(&self, path: &Path) {
        if self.lock().baseline.remove(path).is_some() {
            trace!(path = %path.display(), "starting entry removed");
        }
    }

    /// Record every new regular file currently in the folder.
    ///
    /// Files first seen in the same scan are ordered by modification time.
    pub fn scan(&self) -> Result<()> {
        let mut listed: Vec<(PathBuf, fs::Metadata)> = Vec::new();
        for entry in fs::read_dir(&self.folder)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            let path = entry.path();
            // Entries can vanish between listing and stat.
            if let Ok(meta) = fs::symlink_metadata(&path) {
                listed.push((path, meta));
            }
        }

        let mut tracked = self.lock();
        let present: HashSet<&Path> = listed.iter().map(|(path, _)| path.as_path()).collect();
        tracked
            .baseline
            .retain(|path, _| present.contains(path.as_path()));

        let mut found: Vec<(SystemTime, PathBuf)> = Vec::new();
        for (path, meta) in listed {
            if !meta.is_file()
                || tracked.changes.contains(&path)
                || !self.is_candidate(&path)
                || tracked.is_preexisting(&path, Some(FileId::of(&meta)))
            {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, path));
        }

        // Timestamps are coarse; equal ones fall back to numeric-aware names
        // so "Task 2" precedes "Task 10" and "Task" precedes "Task 1".
        found.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| natural_cmp(&stem(&a.1), &stem(&b.1)))
                .then_with(|| a.1.cmp(&b.1))
        });

        for (_, path) in found {
            tracked.baseline.remove(&path);
            if tracked.changes.insert(path.clone()) {
                trace!(path = %path.display(), "scanned new file");
            }
        }
        Ok(())
    }

    /// Snapshot of the recorded paths
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().changes.paths().to_vec()
    }

    fn is_candidate(&self, path: &Path) -> bool {
        if path.parent() != Some(self.folder.as_path()) {
            return false;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return true;
        };
        !self.ignore.iter().any(|pattern| pattern.matches(name))
    }

    fn lock(&self) -> MutexGuard<'_, Tracked> {
        // A poisoned set is still a valid set of paths.
        self.tracked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compare names treating digit runs as numbers.
fn natural_cmp(mut a: &str, mut b: &str) -> Ordering {
    loop {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        let (a_head, a_rest) = split_chunk(a);
        let (b_head, b_rest) = split_chunk(b);
        let both_numeric = a_head.starts_with(|c: char| c.is_ascii_digit())
            && b_head.starts_with(|c: char| c.is_ascii_digit());
        let ord = if both_numeric {
            let a_num = a_head.trim_start_matches('0');
            let b_num = b_head.trim_start_matches('0');
            a_num.len().cmp(&b_num.len()).then_with(|| a_num.cmp(b_num))
        } else {
            a_head.cmp(b_head)
        };
        if ord != Ordering::Equal {
            return ord;
        }
        a = a_rest;
        b = b_rest;
    }
}

fn split_chunk(s: &str) -> (&str, &str) {
    let numeric = s.starts_with(|c: char| c.is_ascii_digit());
    let end = s
        .find(|c: char| c.is_ascii_digit() != numeric)
        .unwrap_or(s.len());
    s.split_at(end)
}
