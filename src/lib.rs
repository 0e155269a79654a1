//! downsort - keep a Downloads-style directory tidy
//!
//! This library scans a directory one level deep, classifies every entry old
//! enough to move by its extension, and moves it into a category folder
//! without ever overwriting an existing file. It also offers read-only
//! inventory reports over the organized tree.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod inventory;
pub mod output;
pub mod report;
pub mod scanner;

pub use config::{CompiledIgnore, ConfigError, IgnoreRules, OrganizerConfig};
pub use file_category::{Category, CategoryTable, Classifier, Matcher};
pub use file_organizer::{EntryError, FileOrganizer, OrganizeError, Organizer};
pub use report::{Decision, EntryRecord, MoveOutcome, RunReport, SkipReason};
pub use scanner::{AgeThreshold, DirectoryEntry, Scanner};
