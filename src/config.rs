//! Organizer configuration.
//!
//! Settings are read from a TOML file: the directory to organize, the age
//! threshold, the ignore rules and the category table. Every key is
//! optional; anything left out falls back to the built-in defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! source_dir = "~/Downloads"
//! age_threshold_hours = 24
//!
//! [ignore]
//! filenames = [".DS_Store", ".localized", "desktop.ini"]
//! patterns = ["*.part", "*.crdownload"]
//! regex = []
//!
//! [[categories]]
//! name = "Documents"
//! extensions = [".txt", ".pdf"]
//!
//! [[categories]]
//! name = "Executables"
//! extensions = [".exe"]
//! name_patterns = ["installerhelper"]
//! ```

use crate::file_category::{Category, CategoryTable, FOLDERS_CATEGORY, MISC_CATEGORY};
use crate::scanner::AgeThreshold;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".downsortrc.toml";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Threshold is zero, negative, not a number or absurdly large.
    #[error("Invalid age threshold {0}: must be a positive number of hours up to 1e9")]
    InvalidThreshold(f64),
    /// Category name is empty or would escape the root directory.
    #[error("Invalid category name '{0}'")]
    InvalidCategoryName(String),
    /// Category name clashes with one of the fixed categories.
    #[error("Category name '{0}' is reserved")]
    ReservedCategoryName(String),
    /// The same category is declared twice.
    #[error("Category '{0}' is declared more than once")]
    DuplicateCategory(String),
    /// An extension belongs to more than one category.
    #[error("Extension '{extension}' is listed under both '{first}' and '{second}'")]
    DuplicateExtension {
        extension: String,
        first: String,
        second: String,
    },
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerConfig {
    /// Directory to organize. A leading `~/` expands to the home directory.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Minimum age in hours before an entry is moved.
    #[serde(default = "default_age_threshold_hours")]
    pub age_threshold_hours: f64,

    /// Entries that are never touched.
    #[serde(default)]
    pub ignore: IgnoreRules,

    /// Category table, in precedence order.
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
}

/// One `[[categories]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    /// Extensions, with or without the leading dot.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Substrings matched against the lowercase file name.
    #[serde(default)]
    pub name_patterns: Vec<String>,
}

/// Rules for entries the organizer must leave alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreRules {
    /// Exact filenames (e.g. ".DS_Store").
    #[serde(default = "default_ignore_filenames")]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the entry name (e.g. "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regex patterns matched against the entry name.
    #[serde(default)]
    pub regex: Vec<String>,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("~/Downloads")
}

fn default_age_threshold_hours() -> f64 {
    AgeThreshold::DEFAULT_HOURS
}

fn default_ignore_filenames() -> Vec<String> {
    vec![
        ".DS_Store".to_string(),
        ".localized".to_string(),
        "desktop.ini".to_string(),
    ]
}

fn default_categories() -> Vec<CategoryConfig> {
    CategoryTable::default()
        .categories()
        .iter()
        .map(|category| CategoryConfig {
            name: category.name.clone(),
            extensions: category.extensions.clone(),
            name_patterns: category.name_patterns.clone(),
        })
        .collect()
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            filenames: default_ignore_filenames(),
            patterns: Vec::new(),
            regex: Vec::new(),
        }
    }
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            age_threshold_hours: default_age_threshold_hours(),
            ignore: IgnoreRules::default(),
            categories: default_categories(),
        }
    }
}

impl OrganizerConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.downsortrc.toml` in the current directory
    /// 3. Look for `~/.config/downsort/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read, or if any file found is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(".config").join("downsort").join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if file does not exist.
    /// Returns `ConfigError::ConfigInvalid` if TOML parsing fails.
    /// Returns `ConfigError::IoError` if file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// The source directory with `~` expanded.
    pub fn resolved_source_dir(&self) -> PathBuf {
        expand_home(&self.source_dir)
    }

    /// Validates and returns the age threshold.
    pub fn threshold(&self) -> Result<AgeThreshold, ConfigError> {
        AgeThreshold::from_hours(self.age_threshold_hours)
            .ok_or(ConfigError::InvalidThreshold(self.age_threshold_hours))
    }

    /// Validates the category list and builds the lookup table.
    ///
    /// # Errors
    ///
    /// Rejects empty names, names containing path separators, the reserved
    /// names `Folders` and `Misc`, repeated categories and extensions that
    /// appear in more than one category.
    pub fn category_table(&self) -> Result<CategoryTable, ConfigError> {
        let mut names = HashSet::new();
        let mut categories = Vec::with_capacity(self.categories.len());

        for config in &self.categories {
            let name = config.name.trim();
            if name.is_empty()
                || name == "."
                || name == ".."
                || name.contains('/')
                || name.contains('\\')
            {
                return Err(ConfigError::InvalidCategoryName(config.name.clone()));
            }
            if name == FOLDERS_CATEGORY || name == MISC_CATEGORY {
                return Err(ConfigError::ReservedCategoryName(name.to_string()));
            }
            if !names.insert(name.to_string()) {
                return Err(ConfigError::DuplicateCategory(name.to_string()));
            }

            categories.push(
                Category::new(name, &config.extensions).with_name_patterns(&config.name_patterns),
            );
        }

        let table = CategoryTable::new(categories);
        if let Some((extension, first, second)) = table.find_duplicate_extension() {
            return Err(ConfigError::DuplicateExtension {
                extension,
                first,
                second,
            });
        }
        Ok(table)
    }

    /// Checks every setting without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.threshold()?;
        self.category_table()?;
        self.ignore.compile()?;
        Ok(())
    }
}

impl IgnoreRules {
    /// Compile rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn compile(&self) -> Result<CompiledIgnore, ConfigError> {
        let patterns = self
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let regexes = self
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledIgnore {
            filenames: self.filenames.iter().cloned().collect(),
            patterns,
            regexes,
        })
    }
}

/// Compiled ignore rules.
#[derive(Debug, Clone)]
pub struct CompiledIgnore {
    filenames: HashSet<String>,
    patterns: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl CompiledIgnore {
    /// Check if an entry name must be left alone.
    ///
    /// Checked in order: exact filename, glob pattern, regex.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.filenames.contains(name)
            || self.patterns.iter().any(|pattern| pattern.matches(name))
            || self.regexes.iter().any(|regex| regex.is_match(name))
    }
}
