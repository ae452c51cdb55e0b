//! Task filename rules.
//!
//! Every authored task lives at `"{start_date} {title}.md"`, or at
//! `"{start_date} {title} {n}.md"` when that name is already taken. The
//! filename is the only link between a task and its file.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

/// Extension of authored task files
pub const EXTENSION: &str = "md";

/// Longest filename most filesystems accept, in bytes
pub const MAX_FILENAME_BYTES: usize = 255;

const ILLEGAL_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Reject titles that cannot be used verbatim inside a filename.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::invalid_title(title, "title cannot be empty"));
    }
    if title.trim() != title {
        return Err(Error::invalid_title(
            title,
            "title cannot start or end with whitespace",
        ));
    }
    if let Some(ch) = title.chars().find(|ch| ILLEGAL_CHARS.contains(ch)) {
        return Err(Error::invalid_title(
            title,
            format!("character '{ch}' is not allowed in filenames"),
        ));
    }
    if title.chars().any(|ch| ch.is_control()) {
        return Err(Error::invalid_title(
            title,
            "control characters are not allowed in filenames",
        ));
    }
    Ok(())
}

/// Undisambiguated filename for a task.
pub fn task_filename(date_key: &str, title: &str) -> Result<String> {
    validate_title(title)?;
    checked_len(title, format!("{date_key} {title}.{EXTENSION}"))
}

/// Filename carrying disambiguation suffix `n`.
pub fn suffixed_filename(date_key: &str, title: &str, n: u32) -> Result<String> {
    validate_title(title)?;
    checked_len(title, format!("{date_key} {title} {n}.{EXTENSION}"))
}

/// Title a task carries once its file received suffix `n`.
pub fn suffixed_title(title: &str, n: u32) -> String {
    format!("{title} {n}")
}

/// Parse the suffix out of `"{date_key} {title} {n}.md"`.
///
/// Returns `None` for the undisambiguated name and for anything that is not
/// a canonical positive integer suffix (`0`, `01`, `+1`).
pub fn suffix_of(filename: &str, date_key: &str, title: &str) -> Option<u32> {
    let rest = filename
        .strip_prefix(date_key)?
        .strip_prefix(' ')?
        .strip_prefix(title)?
        .strip_prefix(' ')?
        .strip_suffix(EXTENSION)?
        .strip_suffix('.')?;

    if rest.is_empty() || !rest.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    let n: u32 = rest.parse().ok()?;
    if n == 0 || n.to_string() != rest {
        return None;
    }
    Some(n)
}

/// Highest suffix currently used for this title and date, 0 if none.
pub fn highest_suffix(folder: &Path, date_key: &str, title: &str) -> io::Result<u32> {
    let mut highest = 0;
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(n) = suffix_of(name, date_key, title) {
            highest = highest.max(n);
        }
    }
    Ok(highest)
}

fn checked_len(title: &str, filename: String) -> Result<String> {
    if filename.len() > MAX_FILENAME_BYTES {
        return Err(Error::invalid_title(
            title,
            format!(
                "filename would be {} bytes (limit {MAX_FILENAME_BYTES})",
                filename.len()
            ),
        ));
    }
    Ok(filename)
}
