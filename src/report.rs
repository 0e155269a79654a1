//! Per-entry outcomes and the end-of-run summary.

use crate::file_organizer::EntryError;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Why an entry was left where it was.
#[derive(Debug)]
pub enum SkipReason {
    /// Modified more recently than the age threshold allows.
    TooRecent { age_hours: f64 },
    /// Metadata could not be read or the move failed.
    Failed(EntryError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooRecent { age_hours } => {
                write!(f, "too new ({:.1} hours old)", age_hours)
            }
            SkipReason::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Result of a single relocation attempt.
#[derive(Debug)]
pub enum MoveOutcome {
    /// The entry now lives at `destination`.
    Moved { source: PathBuf, destination: PathBuf },
    /// Dry run: the entry would have been moved to `destination`.
    WouldMove { source: PathBuf, destination: PathBuf },
    /// The entry was left in place.
    Skipped(SkipReason),
}

/// What happened to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Moved,
    WouldMove,
    Skipped,
}

/// One line of the run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRecord {
    /// Name of the entry in the root directory.
    pub source_name: String,
    pub decision: Decision,
    /// Category chosen by the classifier, if the entry got that far.
    pub destination_category: Option<String>,
    /// Name inside the category folder, which differs from `source_name`
    /// after a collision.
    pub final_destination_name: Option<String>,
    pub destination: Option<PathBuf>,
    /// Set for skipped entries.
    pub reason: Option<String>,
    /// True when the skip came from an error rather than the age check.
    pub failed: bool,
}

impl EntryRecord {
    /// Flattens an outcome into a record.
    pub fn new(source_name: String, category: Option<String>, outcome: MoveOutcome) -> Self {
        match outcome {
            MoveOutcome::Moved { destination, .. } => {
                Self::relocated(source_name, category, Decision::Moved, destination)
            }
            MoveOutcome::WouldMove { destination, .. } => {
                Self::relocated(source_name, category, Decision::WouldMove, destination)
            }
            MoveOutcome::Skipped(reason) => Self {
                source_name,
                decision: Decision::Skipped,
                destination_category: category,
                final_destination_name: None,
                destination: None,
                failed: matches!(reason, SkipReason::Failed(_)),
                reason: Some(reason.to_string()),
            },
        }
    }

    fn relocated(
        source_name: String,
        category: Option<String>,
        decision: Decision,
        destination: PathBuf,
    ) -> Self {
        let final_name = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Self {
            source_name,
            decision,
            destination_category: category,
            final_destination_name: final_name,
            destination: Some(destination),
            reason: None,
            failed: false,
        }
    }
}

/// Everything that happened during one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub root: PathBuf,
    pub started_at: DateTime<Local>,
    /// Entries modified after this instant were left alone.
    pub cutoff: DateTime<Local>,
    pub threshold_hours: f64,
    pub dry_run: bool,
    pub entries: Vec<EntryRecord>,
}

impl RunReport {
    /// Creates an empty report.
    pub fn new(
        root: PathBuf,
        started_at: DateTime<Local>,
        cutoff: DateTime<Local>,
        threshold_hours: f64,
        dry_run: bool,
    ) -> Self {
        Self {
            root,
            started_at,
            cutoff,
            threshold_hours,
            dry_run,
            entries: Vec::new(),
        }
    }

    /// Appends a record.
    pub fn push(&mut self, record: EntryRecord) {
        self.entries.push(record);
    }

    /// Number of entries moved, or planned to move in a dry run.
    pub fn moved_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|r| r.decision != Decision::Skipped)
            .count()
    }

    /// Number of entries left in place for any reason.
    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    /// Number of entries left in place because of an error.
    pub fn failed_count(&self) -> usize {
        self.skipped().filter(|r| r.failed).count()
    }

    /// Iterates over skipped entries.
    pub fn skipped(&self) -> impl Iterator<Item = &EntryRecord> {
        self.entries
            .iter()
            .filter(|r| r.decision == Decision::Skipped)
    }

    /// Moved entries per destination category, sorted by name.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.entries {
            if record.decision != Decision::Skipped
                && let Some(category) = &record.destination_category
            {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Looks up the record for an entry name.
    pub fn record_for(&self, source_name: &str) -> Option<&EntryRecord> {
        self.entries.iter().find(|r| r.source_name == source_name)
    }
}
