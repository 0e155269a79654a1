//! File categorization for the organizer.
//!
//! This module maps a scanned entry to the name of the category folder it
//! belongs in. Categories are described by a [`CategoryTable`] and evaluated
//! through a small ordered list of typed [`Matcher`]s.
//!
//! # Examples
//!
//! ```
//! use downsort::file_category::{CategoryTable, Classifier};
//!
//! let classifier = Classifier::new(CategoryTable::default());
//! assert_eq!(classifier.category_for_name("report.PDF", false), "Documents");
//! assert_eq!(classifier.category_for_name("ProjectX", true), "Folders");
//! assert_eq!(classifier.category_for_name("mystery.xyz", false), "Misc");
//! ```

use crate::scanner::DirectoryEntry;
use std::collections::HashSet;

/// Category that receives every directory found in the root.
pub const FOLDERS_CATEGORY: &str = "Folders";

/// Category that receives files no other rule claims.
pub const MISC_CATEGORY: &str = "Misc";

/// A named destination folder and the rules that select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Folder name, created directly under the root.
    pub name: String,
    /// Extensions including the leading dot, lowercase.
    pub extensions: Vec<String>,
    /// Lowercase substrings matched against the whole file name.
    pub name_patterns: Vec<String>,
}

impl Category {
    /// Creates a category from extensions, normalizing each one.
    pub fn new<S: AsRef<str>>(name: &str, extensions: &[S]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions
                .iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
            name_patterns: Vec::new(),
        }
    }

    /// Adds name patterns to this category.
    pub fn with_name_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        self.name_patterns = patterns
            .iter()
            .map(|p| p.as_ref().to_lowercase())
            .collect();
        self
    }
}

/// Lowercases an extension and makes sure it carries a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Ordered mapping from category name to the extensions it owns.
///
/// Order matters only for name patterns; an extension may appear in at most
/// one category (see [`CategoryTable::find_duplicate_extension`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    /// Creates a table from categories in the order given.
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Returns the categories in table order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Returns every folder name the organizer may create, including
    /// `Folders` and `Misc`.
    pub fn folder_names(&self) -> HashSet<String> {
        self.categories
            .iter()
            .map(|c| c.name.clone())
            .chain([FOLDERS_CATEGORY.to_string(), MISC_CATEGORY.to_string()])
            .collect()
    }

    /// Finds the first extension claimed by two categories.
    ///
    /// Returns `(extension, first_category, second_category)`.
    pub fn find_duplicate_extension(&self) -> Option<(String, String, String)> {
        let mut seen: Vec<(&str, &str)> = Vec::new();
        for category in &self.categories {
            for ext in &category.extensions {
                if let Some((_, owner)) = seen.iter().find(|(e, _)| *e == ext.as_str()) {
                    return Some((ext.clone(), owner.to_string(), category.name.clone()));
                }
                seen.push((ext.as_str(), category.name.as_str()));
            }
        }
        None
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(vec![
            Category::new(
                "Documents",
                &[
                    ".txt", ".md", ".markdown", ".rtf", ".pdf", ".csv", ".doc", ".docx", ".odt",
                    ".xls", ".xlsx", ".ppt", ".pptx", ".key", ".epub", ".log", ".drawio", ".ics",
                    ".vcf", ".x-vcard",
                ],
            ),
            Category::new(
                "Images",
                &[
                    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".heic", ".tif", ".tiff", ".svg",
                    ".ico", ".icns", ".psd", ".ai", ".eps", ".xcf", ".ps", ".design", ".dwg",
                    ".tfw",
                ],
            ),
            Category::new("Audio", &[".mp3", ".wav", ".aac", ".flac", ".ogg", ".m4a"]),
            Category::new(
                "Video",
                &[".mp4", ".mov", ".avi", ".mkv", ".wmv", ".webm", ".m4v", ".3gp"],
            ),
            Category::new(
                "Code",
                &[
                    ".py", ".js", ".mjs", ".ts", ".java", ".c", ".cpp", ".php", ".rb", ".go",
                    ".rs", ".sh", ".html", ".css", ".json", ".xml", ".yaml", ".yml", ".sql",
                    ".plist", ".conf", ".ovpn", ".eslintrc", ".gitattributes", ".pod", ".trx",
                    ".nib", ".strings", ".dylib", ".car",
                ],
            ),
            Category::new(
                "Installers",
                &[".dmg", ".pkg", ".rpm", ".deb", ".iso", ".msi", ".apk"],
            ),
            Category::new("Executables", &[".exe"]).with_name_patterns(&["installerhelper"]),
            Category::new(
                "Archives",
                &[".zip", ".rar", ".7z", ".tar", ".gz", ".tgz", ".bkp", ".wpress"],
            ),
            Category::new("Fonts", &[".ttf", ".otf", ".woff", ".woff2"]),
        ])
    }
}

/// A single classification rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Matches any directory.
    IsDirectory,
    /// Matches a file whose lowercase name contains the pattern.
    NameContains(String),
    /// Matches a file whose lowercase extension equals this one exactly.
    Extension(String),
}

impl Matcher {
    fn matches(&self, name_lower: &str, extension: &str, is_directory: bool) -> bool {
        match self {
            Matcher::IsDirectory => is_directory,
            Matcher::NameContains(pattern) => !is_directory && name_lower.contains(pattern),
            Matcher::Extension(ext) => !is_directory && !extension.is_empty() && ext == extension,
        }
    }
}

/// Maps entries to category names.
///
/// Rules are flattened from the table into a single list in this order:
/// 1. `IsDirectory` → `Folders`
/// 2. every `NameContains` rule, in table order
/// 3. every `Extension` rule, in table order
///
/// Anything left over goes to `Misc`.
#[derive(Debug, Clone)]
pub struct Classifier {
    table: CategoryTable,
    rules: Vec<(Matcher, String)>,
}

impl Classifier {
    /// Builds a classifier for the given table.
    pub fn new(table: CategoryTable) -> Self {
        let mut rules = vec![(Matcher::IsDirectory, FOLDERS_CATEGORY.to_string())];

        for category in table.categories() {
            for pattern in &category.name_patterns {
                rules.push((Matcher::NameContains(pattern.clone()), category.name.clone()));
            }
        }
        for category in table.categories() {
            for ext in &category.extensions {
                rules.push((Matcher::Extension(ext.clone()), category.name.clone()));
            }
        }

        Self { table, rules }
    }

    /// Returns the table this classifier was built from.
    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Returns the category name for a scanned entry.
    pub fn classify(&self, entry: &DirectoryEntry) -> &str {
        self.resolve(&entry.name.to_lowercase(), &entry.extension, entry.is_directory)
    }

    /// Returns the category name for a bare file name.
    ///
    /// # Examples
    ///
    /// ```
    /// use downsort::file_category::{CategoryTable, Classifier};
    ///
    /// let classifier = Classifier::new(CategoryTable::default());
    /// assert_eq!(classifier.category_for_name("InstallerHelper", false), "Executables");
    /// assert_eq!(classifier.category_for_name("song.mp3", false), "Audio");
    /// ```
    pub fn category_for_name(&self, name: &str, is_directory: bool) -> &str {
        let extension = if is_directory {
            String::new()
        } else {
            crate::scanner::extension_of(name)
        };
        self.resolve(&name.to_lowercase(), &extension, is_directory)
    }

    fn resolve(&self, name_lower: &str, extension: &str, is_directory: bool) -> &str {
        self.rules
            .iter()
            .find(|(matcher, _)| matcher.matches(name_lower, extension, is_directory))
            .map(|(_, category)| category.as_str())
            .unwrap_or(MISC_CATEGORY)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(CategoryTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_has_no_duplicate_extensions() {
        assert_eq!(CategoryTable::default().find_duplicate_extension(), None);
    }

    #[test]
    fn test_extension_lookup() {
        let classifier = Classifier::default();
        assert_eq!(classifier.category_for_name("notes.txt", false), "Documents");
        assert_eq!(classifier.category_for_name("photo.jpeg", false), "Images");
        assert_eq!(classifier.category_for_name("main.rs", false), "Code");
        assert_eq!(classifier.category_for_name("setup.dmg", false), "Installers");
        assert_eq!(classifier.category_for_name("backup.tgz", false), "Archives");
        assert_eq!(classifier.category_for_name("font.woff2", false), "Fonts");
    }

    #[test]
    fn test_extension_lookup_case_insensitive() {
        let classifier = Classifier::default();
        assert_eq!(classifier.category_for_name("REPORT.PDF", false), "Documents");
        assert_eq!(classifier.category_for_name("Clip.MoV", false), "Video");
    }

    #[test]
    fn test_only_last_extension_counts() {
        let classifier = Classifier::default();
        assert_eq!(classifier.category_for_name("archive.tar.gz", false), "Archives");
        assert_eq!(classifier.category_for_name("notes.pdf.exe", false), "Executables");
    }

    #[test]
    fn test_directories_go_to_folders() {
        let classifier = Classifier::default();
        assert_eq!(classifier.category_for_name("ProjectX", true), "Folders");
        // A directory named like a file is still a directory
        assert_eq!(classifier.category_for_name("photos.zip", true), "Folders");
    }

    #[test]
    fn test_installer_helper_name_pattern() {
        let classifier = Classifier::default();
        assert_eq!(classifier.category_for_name("installerhelper", false), "Executables");
        assert_eq!(classifier.category_for_name("InstallerHelper", false), "Executables");
        assert_eq!(
            classifier.category_for_name("Zoom_InstallerHelper", false),
            "Executables"
        );
    }

    #[test]
    fn test_name_pattern_beats_extension() {
        let table = CategoryTable::new(vec![
            Category::new("Documents", &[".txt"]),
            Category::new("Receipts", &[] as &[&str]).with_name_patterns(&["receipt"]),
        ]);
        let classifier = Classifier::new(table);
        assert_eq!(classifier.category_for_name("Receipt-2024.txt", false), "Receipts");
        assert_eq!(classifier.category_for_name("plain.txt", false), "Documents");
    }

    #[test]
    fn test_unknown_and_missing_extensions_go_to_misc() {
        let classifier = Classifier::default();
        assert_eq!(classifier.category_for_name("data.xyz", false), "Misc");
        assert_eq!(classifier.category_for_name("README", false), "Misc");
        assert_eq!(classifier.category_for_name("trailingdot.", false), "Misc");
    }

    #[test]
    fn test_dotfile_extensions() {
        // ".eslintrc" has no extension of its own, but "config.eslintrc" does
        let classifier = Classifier::default();
        assert_eq!(classifier.category_for_name("config.eslintrc", false), "Code");
        assert_eq!(classifier.category_for_name(".eslintrc", false), "Misc");
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("PDF"), ".pdf");
        assert_eq!(normalize_extension(".Md"), ".md");
        assert_eq!(normalize_extension(" txt "), ".txt");
    }

    #[test]
    fn test_find_duplicate_extension() {
        let table = CategoryTable::new(vec![
            Category::new("Documents", &["txt", "pdf"]),
            Category::new("Notes", &[".TXT"]),
        ]);
        assert_eq!(
            table.find_duplicate_extension(),
            Some((
                ".txt".to_string(),
                "Documents".to_string(),
                "Notes".to_string()
            ))
        );
    }

    #[test]
    fn test_folder_names_include_fixed_categories() {
        let names = CategoryTable::default().folder_names();
        assert!(names.contains("Documents"));
        assert!(names.contains("Folders"));
        assert!(names.contains("Misc"));
        assert_eq!(names.len(), 11);
    }
}
