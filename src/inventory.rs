//! Read-only inventory of an organized directory.
//!
//! Walks the root recursively to answer two questions: how much is stored
//! where (`stats`) and what arrived most recently (`recent`). Nothing here
//! modifies the filesystem.

use crate::file_organizer::OrganizeResult;
use crate::scanner::{ensure_root, extension_of};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A file found during an inventory walk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub path: PathBuf,
    /// Parent folder relative to the root, `/` for the root itself.
    pub location: String,
    pub size: u64,
    /// Lowercase extension, or `None` when the file has none.
    pub kind: String,
    /// The later of modification and creation time.
    pub date: DateTime<Local>,
}

/// Aggregate numbers for one directory tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderStats {
    pub name: String,
    pub count: usize,
    pub size: u64,
    pub oldest: Option<(String, DateTime<Local>)>,
    pub newest: Option<(String, DateTime<Local>)>,
}

impl FolderStats {
    fn empty(name: String) -> Self {
        Self {
            name,
            count: 0,
            size: 0,
            oldest: None,
            newest: None,
        }
    }

    fn add(&mut self, file: &FileRecord) {
        self.count += 1;
        self.size += file.size;

        if self.oldest.as_ref().is_none_or(|(_, date)| file.date < *date) {
            self.oldest = Some((file.name.clone(), file.date));
        }
        if self.newest.as_ref().is_none_or(|(_, date)| file.date > *date) {
            self.newest = Some((file.name.clone(), file.date));
        }
    }
}

/// Totals for the root plus a breakdown per immediate subdirectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryReport {
    pub overall: FolderStats,
    /// Sorted by size, largest first.
    pub folders: Vec<FolderStats>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn activity_time(metadata: &fs::Metadata) -> Option<DateTime<Local>> {
    let modified = metadata.modified().ok();
    let created = metadata.created().ok();
    modified.max(created).map(DateTime::<Local>::from)
}

/// Collects every non-hidden file under `root`.
///
/// Hidden directories are not descended into. Unreadable entries are skipped.
pub fn collect_files(root: &Path) -> Vec<FileRecord> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            let date = activity_time(&metadata)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let location = match entry.path().parent().and_then(|p| p.strip_prefix(root).ok()) {
                Some(relative) if relative.as_os_str().is_empty() => "/".to_string(),
                Some(relative) => relative.display().to_string(),
                None => root.display().to_string(),
            };
            let kind = match extension_of(&name) {
                ext if ext.is_empty() => "None".to_string(),
                ext => ext,
            };

            Some(FileRecord {
                path: entry.path().to_path_buf(),
                name,
                location,
                size: metadata.len(),
                kind,
                date,
            })
        })
        .collect()
}

/// Computes totals for one tree.
pub fn folder_stats(dir: &Path, name: String) -> FolderStats {
    let mut stats = FolderStats::empty(name);
    for file in collect_files(dir) {
        stats.add(&file);
    }
    stats
}

/// Builds the overview and per-folder breakdown for `root`.
///
/// # Errors
///
/// Fails only if `root` is missing or not a directory.
pub fn stats(root: &Path) -> OrganizeResult<InventoryReport> {
    ensure_root(root)?;

    let overall = folder_stats(root, root.display().to_string());

    let mut folders: Vec<FolderStats> = fs::read_dir(root)
        .map(|entries| {
            entries
                .flatten()
                .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
                .map(|entry| (entry.path(), entry.file_name().to_string_lossy().into_owned()))
                .filter(|(_, name)| !name.starts_with('.'))
                .map(|(path, name)| folder_stats(&path, name))
                .collect()
        })
        .unwrap_or_default();
    folders.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));

    Ok(InventoryReport { overall, folders })
}

/// Returns up to `limit` files under `root`, newest first.
///
/// # Errors
///
/// Fails only if `root` is missing or not a directory.
pub fn recent(root: &Path, limit: usize) -> OrganizeResult<Vec<FileRecord>> {
    ensure_root(root)?;

    let mut files = collect_files(root);
    files.sort_by(|a, b| b.date.cmp(&a.date));
    files.truncate(limit);
    Ok(files)
}

/// Formats a byte count with two decimals in base-1024 units.
///
/// # Examples
///
/// ```
/// use downsort::inventory::human_size;
///
/// assert_eq!(human_size(512), "512.00 B");
/// assert_eq!(human_size(1536), "1.50 KB");
/// ```
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} PB", size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn set_mtime(path: &Path, when: SystemTime) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(when)
            .unwrap();
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0.00 B");
        assert_eq!(human_size(1024), "1.00 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(human_size(3 * 1024u64.pow(3)), "3.00 GB");
        assert_eq!(human_size(1024u64.pow(5)), "1.00 PB");
    }

    #[test]
    fn test_stats_totals_and_breakdown() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("Documents")).unwrap();
        fs::create_dir(root.join("Images")).unwrap();
        fs::create_dir(root.join(".hidden")).unwrap();
        fs::write(root.join("loose.txt"), vec![0u8; 10]).unwrap();
        fs::write(root.join("Documents").join("a.pdf"), vec![0u8; 100]).unwrap();
        fs::write(root.join("Images").join("b.png"), vec![0u8; 1000]).unwrap();
        fs::write(root.join(".hidden").join("secret.txt"), vec![0u8; 5000]).unwrap();
        fs::write(root.join(".DS_Store"), vec![0u8; 7]).unwrap();

        let report = stats(root).unwrap();

        assert_eq!(report.overall.count, 3);
        assert_eq!(report.overall.size, 1110);
        let names: Vec<&str> = report.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Images", "Documents"]);
        assert_eq!(report.folders[0].size, 1000);
    }

    #[test]
    fn test_stats_oldest_and_newest() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("old.txt"), "a").unwrap();
        fs::write(root.join("new.txt"), "b").unwrap();
        set_mtime(
            &root.join("old.txt"),
            SystemTime::now() - Duration::from_secs(400 * 24 * 3600),
        );
        // Pushed past any creation time the filesystem may report
        set_mtime(&root.join("new.txt"), SystemTime::now() + Duration::from_secs(3600));

        let report = stats(root).unwrap();
        assert_eq!(report.overall.newest.unwrap().0, "new.txt");
        assert_eq!(report.overall.oldest.unwrap().0, "old.txt");
    }

    #[test]
    fn test_recent_orders_and_limits() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("Documents")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("Documents").join("b.pdf"), "b").unwrap();
        fs::write(root.join("README"), "c").unwrap();

        let files = recent(root, 2).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].date >= files[1].date);

        let all = recent(root, 10).unwrap();
        assert_eq!(all.len(), 3);
        let pdf = all.iter().find(|f| f.name == "b.pdf").unwrap();
        assert_eq!(pdf.location, "Documents");
        assert_eq!(pdf.kind, ".pdf");
        let readme = all.iter().find(|f| f.name == "README").unwrap();
        assert_eq!(readme.location, "/");
        assert_eq!(readme.kind, "None");
    }

    #[test]
    fn test_missing_root_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(stats(&temp.path().join("gone")).is_err());
        assert!(recent(&temp.path().join("gone"), 5).is_err());
    }
}
