//! Directory scanning and age filtering.
//!
//! The scanner lists the immediate children of the root directory, drops
//! ignored names and the category folders themselves, and reads the
//! metadata needed to decide whether an entry is old enough to move.

use crate::config::CompiledIgnore;
use crate::file_organizer::{EntryError, OrganizeError, OrganizeResult};
use chrono::{DateTime, Duration, Local, Utc};
use log::debug;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A child of the root directory, read fresh from the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// File or directory name.
    pub name: String,
    /// Full path to the entry.
    pub path: PathBuf,
    /// True for directories. Symbolic links are never followed.
    pub is_directory: bool,
    /// Lowercase extension with leading dot, empty for directories.
    pub extension: String,
    /// Last modification time.
    pub last_modified: DateTime<Local>,
}

impl DirectoryEntry {
    /// Returns true if the entry was last modified at or before `cutoff`.
    pub fn is_eligible(&self, cutoff: DateTime<Local>) -> bool {
        self.last_modified <= cutoff
    }

    /// Age of the entry in hours relative to `now`.
    pub fn age_hours(&self, now: DateTime<Local>) -> f64 {
        (now - self.last_modified).num_milliseconds() as f64 / 3_600_000.0
    }
}

/// Returns the lowercase extension of a file name, including the dot.
///
/// Names without an extension (including dotfiles such as `.bashrc`)
/// yield an empty string.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Minimum age before an entry may be moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeThreshold {
    hours: f64,
}

impl AgeThreshold {
    /// Default threshold of one day.
    pub const DEFAULT_HOURS: f64 = 24.0;

    /// Largest accepted threshold, roughly 114,000 years.
    pub const MAX_HOURS: f64 = 1.0e9;

    /// Creates a threshold, rejecting zero, negative, non-finite and
    /// out-of-range values.
    pub fn from_hours(hours: f64) -> Option<Self> {
        (hours.is_finite() && hours > 0.0 && hours <= Self::MAX_HOURS).then_some(Self { hours })
    }

    /// The threshold in hours.
    pub fn hours(&self) -> f64 {
        self.hours
    }

    /// The threshold as a chrono duration, at millisecond precision.
    pub fn duration(&self) -> Duration {
        Duration::try_milliseconds((self.hours * 3_600_000.0).round() as i64)
            .unwrap_or(Duration::MAX)
    }

    /// The newest modification time an eligible entry may have.
    ///
    /// Saturates at the earliest representable instant.
    pub fn cutoff(&self, now: DateTime<Local>) -> DateTime<Local> {
        now.checked_sub_signed(self.duration())
            .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC.with_timezone(&Local))
    }
}

impl Default for AgeThreshold {
    fn default() -> Self {
        Self {
            hours: Self::DEFAULT_HOURS,
        }
    }
}

/// An entry whose metadata could not be read.
#[derive(Debug)]
pub struct ScanFailure {
    /// Name of the entry, or the root path when the name itself is unknown.
    pub name: String,
    /// What went wrong.
    pub error: EntryError,
}

/// Checks that `root` exists and is a directory.
pub fn ensure_root(root: &Path) -> OrganizeResult<()> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(OrganizeError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(OrganizeError::DirectoryNotFound {
            path: root.to_path_buf(),
        }),
        Err(e) => Err(OrganizeError::ReadDirFailed {
            path: root.to_path_buf(),
            source: e,
        }),
    }
}

/// Lists candidate entries of a root directory.
pub struct Scanner<'a> {
    root: &'a Path,
    ignore: &'a CompiledIgnore,
    protected: &'a HashSet<String>,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner. Names in `protected` (the category folders) are
    /// skipped along with anything `ignore` matches.
    pub fn new(root: &'a Path, ignore: &'a CompiledIgnore, protected: &'a HashSet<String>) -> Self {
        Self {
            root,
            ignore,
            protected,
        }
    }

    /// Starts a scan.
    ///
    /// # Errors
    ///
    /// Fails if the root is missing, not a directory, or cannot be listed.
    /// Per-entry problems are yielded as `Err(ScanFailure)` items instead.
    pub fn scan(&self) -> OrganizeResult<Scan<'a>> {
        ensure_root(self.root)?;
        let read_dir = fs::read_dir(self.root).map_err(|e| OrganizeError::ReadDirFailed {
            path: self.root.to_path_buf(),
            source: e,
        })?;

        Ok(Scan {
            root: self.root,
            read_dir,
            ignore: self.ignore,
            protected: self.protected,
        })
    }
}

/// Lazy iterator over the entries of one scan.
pub struct Scan<'a> {
    root: &'a Path,
    read_dir: fs::ReadDir,
    ignore: &'a CompiledIgnore,
    protected: &'a HashSet<String>,
}

impl Scan<'_> {
    fn read_entry(&self, entry: fs::DirEntry) -> Option<Result<DirectoryEntry, ScanFailure>> {
        let name = entry.file_name().to_string_lossy().into_owned();

        if self.protected.contains(&name) {
            debug!("Skipping category folder {}", name);
            return None;
        }
        if self.ignore.is_ignored(&name) {
            debug!("Skipping ignored entry {}", name);
            return None;
        }

        let path = entry.path();
        let metadata = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            // Removed between listing and stat
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                return Some(Err(ScanFailure {
                    name,
                    error: EntryError::from_io(&path, e),
                }));
            }
        };

        let modified = match metadata.modified() {
            Ok(time) => DateTime::<Local>::from(time),
            Err(e) => {
                return Some(Err(ScanFailure {
                    name,
                    error: EntryError::from_io(&path, e),
                }));
            }
        };

        let is_directory = metadata.is_dir();
        let extension = if is_directory {
            String::new()
        } else {
            extension_of(&name)
        };

        Some(Ok(DirectoryEntry {
            name,
            path,
            is_directory,
            extension,
            last_modified: modified,
        }))
    }
}

impl Iterator for Scan<'_> {
    type Item = Result<DirectoryEntry, ScanFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.read_dir.next()? {
                Ok(entry) => {
                    if let Some(item) = self.read_entry(entry) {
                        return Some(item);
                    }
                }
                Err(e) => {
                    return Some(Err(ScanFailure {
                        name: self.root.display().to_string(),
                        error: EntryError::from_io(self.root, e),
                    }));
                }
            }
        }
    }
}
