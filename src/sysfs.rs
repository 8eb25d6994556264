//! ═══════════════════════════════════════════════════════════════════════════════
//! SYSFS — Device-File I/O Wrappers
//! ═══════════════════════════════════════════════════════════════════════════════
//! Thin read/write helpers over the sysfs and procfs text protocol. No policy
//! lives here; callers decide what a failed read or write means.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ThermiteError, ThermiteResult};

/// Read a file and strip surrounding whitespace.
pub fn read_trimmed(path: &Path) -> io::Result<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}

/// Read a single integer value (the common sysfs attribute shape).
pub fn read_int(path: &Path) -> ThermiteResult<i64> {
    let raw = read_trimmed(path)?;
    raw.parse::<i64>().map_err(|_| ThermiteError::Parse {
        path: path.to_path_buf(),
        contents: raw,
    })
}

/// Read a whitespace-separated integer list (e.g. scaling_available_frequencies).
pub fn read_ints(path: &Path) -> ThermiteResult<Vec<i64>> {
    let raw = read_trimmed(path)?;
    let mut values = Vec::new();
    for token in raw.split_whitespace() {
        let v = token.parse::<i64>().map_err(|_| ThermiteError::Parse {
            path: path.to_path_buf(),
            contents: raw.clone(),
        })?;
        values.push(v);
    }
    Ok(values)
}

/// Write an integer as its decimal text form.
pub fn write_int(path: &Path, value: i64) -> io::Result<()> {
    fs::write(path, value.to_string())
}

/// Write a raw command string.
pub fn write_str(path: &Path, value: &str) -> io::Result<()> {
    fs::write(path, value)
}

/// List entries of `root` whose file name starts with `prefix` and ends with
/// `suffix` (empty suffix matches everything). Returns a sorted list; a
/// missing or unreadable root yields an empty list, matching the discovery
/// semantics of "nothing found there".
pub fn scan_dir(root: &Path, prefix: &str, suffix: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return found,
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(prefix) && name.ends_with(suffix) {
            found.push(entry.path());
        }
    }
    found.sort();
    found
}
