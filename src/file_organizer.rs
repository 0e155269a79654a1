//! Moving entries into category directories.
//!
//! This module provides the collision-safe mover used by the organizer and
//! the [`Organizer`] that ties scanning, classification and moving together
//! for one run over a root directory.

use crate::config::{CompiledIgnore, ConfigError, OrganizerConfig};
use crate::file_category::Classifier;
use crate::report::{EntryRecord, MoveOutcome, RunReport, SkipReason};
use crate::scanner::{AgeThreshold, DirectoryEntry, ScanFailure, Scanner};
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Format of the suffix appended to a colliding file name.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The root directory does not exist.
    #[error("Source directory {} does not exist", .path.display())]
    DirectoryNotFound { path: PathBuf },
    /// The root path exists but is not a directory.
    #[error("Source path {} is not a directory", .path.display())]
    NotADirectory { path: PathBuf },
    /// The root directory could not be listed.
    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDirFailed { path: PathBuf, source: io::Error },
}

/// Errors scoped to a single entry. The run continues past these.
#[derive(Debug, Error)]
pub enum EntryError {
    /// Metadata unreadable or the move was forbidden.
    #[error("Permission denied for {}: {source}", .path.display())]
    PermissionDenied { path: PathBuf, source: io::Error },
    /// Both the plain and the timestamped destination names are taken.
    #[error("Destination {} already exists, refusing to overwrite", .path.display())]
    UnresolvedNameCollision { path: PathBuf },
    /// Any other I/O failure (disk full, path too long, failed copy).
    #[error("I/O failure on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl EntryError {
    /// Wraps an I/O error, keeping permission problems distinct.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Result type for whole-run operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Result type for single-entry operations.
pub type EntryResult<T> = Result<T, EntryError>;

/// Builds `<stem>_<timestamp><.ext>` from a file name.
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use downsort::file_organizer::timestamped_name;
/// use std::ffi::OsStr;
///
/// let at = Local.with_ymd_and_hms(2024, 1, 15, 3, 0, 0).unwrap();
/// assert_eq!(timestamped_name(OsStr::new("report.pdf"), at), "report_20240115_030000.pdf");
/// assert_eq!(timestamped_name(OsStr::new("ProjectX"), at), "ProjectX_20240115_030000");
/// ```
pub fn timestamped_name(name: &OsStr, at: DateTime<Local>) -> OsString {
    let path = Path::new(name);
    let mut new_name = path.file_stem().unwrap_or(name).to_os_string();
    new_name.push(format!("_{}", at.format(TIMESTAMP_FORMAT)));
    if let Some(ext) = path.extension() {
        new_name.push(".");
        new_name.push(ext);
    }
    new_name
}

/// Returns true if anything (file, directory, dangling link) sits at `path`.
fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Moves entries into category subdirectories without overwriting.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Moves `source` into `<root>/<category>/` and returns the final path.
    ///
    /// The category directory is created if missing. When the plain name is
    /// taken, the name gets a `_YYYYMMDD_HHMMSS` suffix derived from `at`;
    /// if that is taken too, the entry is left in place.
    ///
    /// # Errors
    ///
    /// Returns an [`EntryError`] describing why this entry could not be moved.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use chrono::Local;
    /// use downsort::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let result = FileOrganizer::move_to_category(
    ///     Path::new("/home/me/Downloads"),
    ///     Path::new("/home/me/Downloads/report.pdf"),
    ///     "Documents",
    ///     Local::now(),
    /// );
    /// match result {
    ///     Ok(dest) => println!("Moved to {}", dest.display()),
    ///     Err(e) => eprintln!("Skipped: {}", e),
    /// }
    /// ```
    pub fn move_to_category(
        root: &Path,
        source: &Path,
        category: &str,
        at: DateTime<Local>,
    ) -> EntryResult<PathBuf> {
        let category_path = root.join(category);
        fs::create_dir_all(&category_path).map_err(|e| EntryError::from_io(&category_path, e))?;

        let destination = Self::resolve_destination(&category_path, source, at)?;
        Self::relocate(source, &destination)?;
        Ok(destination)
    }

    /// Computes where `source` would land without touching the filesystem.
    pub fn plan_destination(
        root: &Path,
        source: &Path,
        category: &str,
        at: DateTime<Local>,
    ) -> EntryResult<PathBuf> {
        Self::resolve_destination(&root.join(category), source, at)
    }

    /// Picks a free destination path inside `dir` for `source`.
    fn resolve_destination(dir: &Path, source: &Path, at: DateTime<Local>) -> EntryResult<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| EntryError::Io {
            path: source.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path has no name component"),
        })?;

        let candidate = dir.join(file_name);
        if !is_occupied(&candidate) {
            return Ok(candidate);
        }

        let renamed = dir.join(timestamped_name(file_name, at));
        if is_occupied(&renamed) {
            return Err(EntryError::UnresolvedNameCollision { path: renamed });
        }
        debug!(
            "{} exists, using {}",
            candidate.display(),
            renamed.display()
        );
        Ok(renamed)
    }

    /// Renames `source` to `destination`, copying across filesystems.
    fn relocate(source: &Path, destination: &Path) -> EntryResult<()> {
        match fs::rename(source, destination) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!(
                    "{} is on another filesystem, copying",
                    destination.display()
                );
                Self::copy_then_remove(source, destination)
            }
            Err(e) => Err(EntryError::from_io(source, e)),
        }
    }

    /// Copies `source` to `destination`, verifies the copy, then deletes
    /// `source`. A failed or incomplete copy is removed and `source` kept.
    pub(crate) fn copy_then_remove(source: &Path, destination: &Path) -> EntryResult<()> {
        let metadata = fs::symlink_metadata(source).map_err(|e| EntryError::from_io(source, e))?;
        let is_dir = metadata.is_dir();

        let copied = if is_dir {
            copy_tree(source, destination)
        } else {
            copy_entry(source, destination, &metadata)
        };

        if let Err(e) = copied {
            let cleanup = if is_dir {
                fs::remove_dir_all(destination)
            } else {
                fs::remove_file(destination)
            };
            if let Err(cleanup_err) = cleanup
                && cleanup_err.kind() != io::ErrorKind::NotFound
            {
                warn!(
                    "Could not remove partial copy {}: {}",
                    destination.display(),
                    cleanup_err
                );
            }
            return Err(e);
        }

        let removed = if is_dir {
            fs::remove_dir_all(source)
        } else {
            fs::remove_file(source)
        };
        removed.map_err(|e| EntryError::from_io(source, e))
    }
}

/// Size and file count of a tree, used to verify copies.
#[derive(Debug, Default, PartialEq, Eq)]
struct TreeTally {
    files: u64,
    bytes: u64,
}

fn tally(root: &Path) -> EntryResult<TreeTally> {
    let mut tally = TreeTally::default();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if entry.file_type().is_file() {
            let len = entry
                .metadata()
                .map_err(|e| walk_error(entry.path(), e))?
                .len();
            tally.files += 1;
            tally.bytes += len;
        }
    }
    Ok(tally)
}

fn walk_error(path: &Path, err: walkdir::Error) -> EntryError {
    let path = err.path().unwrap_or(path).to_path_buf();
    EntryError::from_io(&path, err.into())
}

fn copy_tree(source: &Path, destination: &Path) -> EntryResult<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| walk_error(source, e))?;
        let relative = entry.path().strip_prefix(source).map_err(|e| EntryError::Io {
            path: entry.path().to_path_buf(),
            source: io::Error::other(e),
        })?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| EntryError::from_io(&target, e))?;
        } else {
            let metadata = entry.metadata().map_err(|e| walk_error(entry.path(), e))?;
            copy_entry(entry.path(), &target, &metadata)?;
        }
    }

    let expected = tally(source)?;
    let actual = tally(destination)?;
    if expected != actual {
        return Err(EntryError::Io {
            path: destination.to_path_buf(),
            source: io::Error::other(format!(
                "copy verification failed: expected {} files ({} bytes), found {} files ({} bytes)",
                expected.files, expected.bytes, actual.files, actual.bytes
            )),
        });
    }
    Ok(())
}

fn copy_entry(source: &Path, destination: &Path, metadata: &fs::Metadata) -> EntryResult<()> {
    if metadata.file_type().is_symlink() {
        return copy_symlink(source, destination);
    }

    let written = fs::copy(source, destination).map_err(|e| EntryError::from_io(destination, e))?;
    fs::File::open(destination)
        .and_then(|file| file.sync_all())
        .map_err(|e| EntryError::from_io(destination, e))?;

    let on_disk = fs::metadata(destination)
        .map_err(|e| EntryError::from_io(destination, e))?
        .len();
    if written != metadata.len() || on_disk != metadata.len() {
        return Err(EntryError::Io {
            path: destination.to_path_buf(),
            source: io::Error::other(format!(
                "copy verification failed: expected {} bytes, wrote {}",
                metadata.len(),
                on_disk
            )),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> EntryResult<()> {
    let target = fs::read_link(source).map_err(|e| EntryError::from_io(source, e))?;
    std::os::unix::fs::symlink(target, destination).map_err(|e| EntryError::from_io(destination, e))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, destination: &Path) -> EntryResult<()> {
    fs::copy(source, destination)
        .map(|_| ())
        .map_err(|e| EntryError::from_io(destination, e))
}

/// Runs one organization pass over a root directory.
///
/// Holds everything a run needs: the root, compiled ignore rules, the
/// classifier and the age threshold. Nothing is carried between runs.
pub struct Organizer {
    root: PathBuf,
    ignore: CompiledIgnore,
    classifier: Classifier,
    threshold: AgeThreshold,
}

impl Organizer {
    /// Creates an organizer from already validated parts.
    pub fn new(
        root: PathBuf,
        ignore: CompiledIgnore,
        classifier: Classifier,
        threshold: AgeThreshold,
    ) -> Self {
        Self {
            root,
            ignore,
            classifier,
            threshold,
        }
    }

    /// Validates a configuration and builds an organizer from it.
    pub fn from_config(config: &OrganizerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.resolved_source_dir(),
            config.ignore.compile()?,
            Classifier::new(config.category_table()?),
            config.threshold()?,
        ))
    }

    /// The directory being organized.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The age threshold in effect.
    pub fn threshold(&self) -> AgeThreshold {
        self.threshold
    }

    /// Processes every entry of the root once.
    ///
    /// `now` fixes the age cutoff for the whole run; collision suffixes use
    /// the clock at the moment of each move. With `dry_run` set nothing is
    /// created or moved and the report lists the planned destinations.
    ///
    /// # Errors
    ///
    /// Only root-level failures are returned; per-entry failures are recorded
    /// in the report as skipped entries.
    pub fn run(&self, now: DateTime<Local>, dry_run: bool) -> OrganizeResult<RunReport> {
        let cutoff = self.threshold.cutoff(now);
        let protected = self.classifier.table().folder_names();
        let scan = Scanner::new(&self.root, &self.ignore, &protected).scan()?;

        info!(
            "Organizing {} (entries modified before {})",
            self.root.display(),
            cutoff.format("%Y-%m-%d %H:%M:%S")
        );

        let mut report = RunReport::new(
            self.root.clone(),
            now,
            cutoff,
            self.threshold.hours(),
            dry_run,
        );

        for item in scan {
            report.push(self.process(item, now, cutoff, dry_run));
        }

        Ok(report)
    }

    /// Decides and, unless `dry_run` is set, performs the fate of one
    /// scanned item.
    fn process(
        &self,
        item: Result<DirectoryEntry, ScanFailure>,
        now: DateTime<Local>,
        cutoff: DateTime<Local>,
        dry_run: bool,
    ) -> EntryRecord {
        let entry = match item {
            Ok(entry) => entry,
            Err(failure) => {
                warn!("Skipping {}: {}", failure.name, failure.error);
                return EntryRecord::new(
                    failure.name,
                    None,
                    MoveOutcome::Skipped(SkipReason::Failed(failure.error)),
                );
            }
        };

        if !entry.is_eligible(cutoff) {
            let age_hours = entry.age_hours(now);
            debug!("Skipping {}: too new ({:.1} hours)", entry.name, age_hours);
            return EntryRecord::new(
                entry.name,
                None,
                MoveOutcome::Skipped(SkipReason::TooRecent { age_hours }),
            );
        }

        let category = self.classifier.classify(&entry);
        debug!("{} -> {}", entry.name, category);

        let outcome = if dry_run {
            let planned =
                FileOrganizer::plan_destination(&self.root, &entry.path, category, Local::now());
            match planned {
                Ok(destination) => MoveOutcome::WouldMove {
                    source: entry.path.clone(),
                    destination,
                },
                Err(e) => MoveOutcome::Skipped(SkipReason::Failed(e)),
            }
        } else {
            let moved =
                FileOrganizer::move_to_category(&self.root, &entry.path, category, Local::now());
            match moved {
                Ok(destination) => {
                    info!("Moved {} -> {}", entry.name, destination.display());
                    MoveOutcome::Moved {
                        source: entry.path.clone(),
                        destination,
                    }
                }
                Err(e) => {
                    warn!("Error moving {}: {}", entry.name, e);
                    MoveOutcome::Skipped(SkipReason::Failed(e))
                }
            }
        };

        EntryRecord::new(entry.name, Some(category.to_string()), outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn stamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 3, 0, 0).unwrap()
    }

    #[test]
    fn test_move_to_category_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let dest = FileOrganizer::move_to_category(base_path, &file_path, "Documents", stamp())
            .expect("Failed to move file");

        let category_dir = base_path.join("Documents");
        assert!(category_dir.is_dir());
        assert!(!file_path.exists());
        assert_eq!(dest, category_dir.join("test.txt"));
        assert_eq!(fs::read_to_string(dest).unwrap(), "test content");
    }

    #[test]
    fn test_move_to_category_uses_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let category_dir = base_path.join("Images");
        fs::create_dir(&category_dir).expect("Failed to create category directory");
        fs::write(category_dir.join("other.png"), "other").unwrap();

        let file_path = base_path.join("test.png");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        FileOrganizer::move_to_category(base_path, &file_path, "Images", stamp())
            .expect("Failed to move file");

        assert!(!file_path.exists());
        assert!(category_dir.join("test.png").exists());
        assert!(category_dir.join("other.png").exists());
    }

    #[test]
    fn test_collision_appends_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();
        let docs = base_path.join("Documents");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("report.pdf"), "original").unwrap();

        let file_path = base_path.join("report.pdf");
        fs::write(&file_path, "newer").unwrap();

        let dest =
            FileOrganizer::move_to_category(base_path, &file_path, "Documents", stamp()).unwrap();

        assert_eq!(dest, docs.join("report_20240115_030000.pdf"));
        assert_eq!(fs::read_to_string(docs.join("report.pdf")).unwrap(), "original");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "newer");
        assert!(!file_path.exists());
    }

    #[test]
    fn test_second_collision_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();
        let docs = base_path.join("Documents");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("report.pdf"), "first").unwrap();
        fs::write(docs.join("report_20240115_030000.pdf"), "second").unwrap();

        let file_path = base_path.join("report.pdf");
        fs::write(&file_path, "third").unwrap();

        let result = FileOrganizer::move_to_category(base_path, &file_path, "Documents", stamp());
        assert!(matches!(
            result,
            Err(EntryError::UnresolvedNameCollision { .. })
        ));

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "third");
        assert_eq!(fs::read_to_string(docs.join("report.pdf")).unwrap(), "first");
        assert_eq!(
            fs::read_to_string(docs.join("report_20240115_030000.pdf")).unwrap(),
            "second"
        );
    }

    #[test]
    fn test_directory_collision_with_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();
        fs::create_dir_all(base_path.join("Folders").join("ProjectX")).unwrap();

        let source = base_path.join("ProjectX");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("main.rs"), "fn main() {}").unwrap();

        let dest =
            FileOrganizer::move_to_category(base_path, &source, "Folders", stamp()).unwrap();

        assert_eq!(dest, base_path.join("Folders").join("ProjectX_20240115_030000"));
        assert!(dest.join("main.rs").exists());
        assert!(base_path.join("Folders").join("ProjectX").is_dir());
    }

    #[test]
    fn test_plan_destination_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();
        let file_path = base_path.join("song.mp3");
        fs::write(&file_path, "x").unwrap();

        let dest =
            FileOrganizer::plan_destination(base_path, &file_path, "Audio", stamp()).unwrap();

        assert_eq!(dest, base_path.join("Audio").join("song.mp3"));
        assert!(!base_path.join("Audio").exists());
        assert!(file_path.exists());
    }

    #[test]
    fn test_copy_then_remove_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("big.bin");
        let dest = temp_dir.path().join("copied.bin");
        fs::write(&source, vec![7u8; 64 * 1024]).unwrap();

        FileOrganizer::copy_then_remove(&source, &dest).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(&dest).unwrap().len(), 64 * 1024);
    }

    #[test]
    fn test_copy_then_remove_directory() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("tree");
        fs::create_dir_all(source.join("a").join("b")).unwrap();
        fs::write(source.join("top.txt"), "top").unwrap();
        fs::write(source.join("a").join("b").join("deep.txt"), "deep").unwrap();
        let dest = temp_dir.path().join("moved");

        FileOrganizer::copy_then_remove(&source, &dest).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(dest.join("top.txt")).unwrap(), "top");
        assert_eq!(
            fs::read_to_string(dest.join("a").join("b").join("deep.txt")).unwrap(),
            "deep"
        );
    }

    #[test]
    fn test_copy_failure_keeps_source() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("keep.txt");
        fs::write(&source, "data").unwrap();
        let dest = temp_dir.path().join("missing-parent").join("keep.txt");

        let result = FileOrganizer::copy_then_remove(&source, &dest);

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&source).unwrap(), "data");
    }

    #[test]
    fn test_entry_error_from_io_kinds() {
        let denied = EntryError::from_io(
            Path::new("a"),
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(denied, EntryError::PermissionDenied { .. }));

        let other = EntryError::from_io(Path::new("a"), io::Error::other("disk full"));
        assert!(matches!(other, EntryError::Io { .. }));
    }

    fn organizer_at(root: &Path) -> Organizer {
        Organizer::new(
            root.to_path_buf(),
            crate::config::IgnoreRules::default().compile().unwrap(),
            Classifier::default(),
            AgeThreshold::default(),
        )
    }

    #[test]
    fn test_scan_failure_is_recorded_and_siblings_still_move() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();
        let song = base_path.join("song.flac");
        fs::write(&song, "audio").unwrap();
        let organizer = organizer_at(base_path);
        let now = Local::now();
        let cutoff = organizer.threshold().cutoff(now);

        let failure = ScanFailure {
            name: "locked.bin".to_string(),
            error: EntryError::from_io(
                &base_path.join("locked.bin"),
                io::Error::new(io::ErrorKind::PermissionDenied, "metadata unreadable"),
            ),
        };
        let record = organizer.process(Err(failure), now, cutoff, false);

        assert_eq!(record.source_name, "locked.bin");
        assert_eq!(record.decision, crate::report::Decision::Skipped);
        assert!(record.failed);
        assert_eq!(record.destination_category, None);
        assert!(record.reason.unwrap().contains("Permission denied"));

        let entry = DirectoryEntry {
            name: "song.flac".to_string(),
            path: song.clone(),
            is_directory: false,
            extension: ".flac".to_string(),
            last_modified: now - chrono::Duration::hours(30),
        };
        let record = organizer.process(Ok(entry), now, cutoff, false);

        assert_eq!(record.decision, crate::report::Decision::Moved);
        assert!(!record.failed);
        assert!(!song.exists());
        assert!(base_path.join("Audio").join("song.flac").exists());
    }

    #[test]
    fn test_timestamped_name_keeps_last_extension() {
        assert_eq!(
            timestamped_name(OsStr::new("backup.tar.gz"), stamp()),
            "backup.tar_20240115_030000.gz"
        );
        assert_eq!(
            timestamped_name(OsStr::new(".hidden"), stamp()),
            ".hidden_20240115_030000"
        );
    }
}
