//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status lines,
//! the end-of-run summary and the inventory tables. The engine itself only
//! logs; everything the user reads on the terminal goes through here.

use crate::inventory::{FileRecord, FolderStats, InventoryReport, human_size};
use crate::report::{Decision, RunReport};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Starts a spinner for a directory walk of unknown length.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use downsort::output::OutputFormatter;
    /// let spinner = OutputFormatter::spinner("Scanning ~/Downloads...");
    /// spinner.finish_and_clear();
    /// ```
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    /// Prints one line per entry and the summary of a run.
    pub fn run_report(report: &RunReport) {
        if report.dry_run {
            Self::dry_run_notice(&format!("Analyzing {}", report.root.display()));
        } else {
            Self::info(&format!("Organizing {}", report.root.display()));
        }
        println!(
            "Threshold: entries older than {} hours (modified before {})",
            report.threshold_hours,
            report.cutoff.format("%Y-%m-%d %H:%M")
        );

        for record in &report.entries {
            let category = record.destination_category.as_deref().unwrap_or("-");
            let final_name = record.final_destination_name.as_deref().unwrap_or("");
            match record.decision {
                Decision::Moved => {
                    println!(
                        " {} {} → {}/{}",
                        "✓".green(),
                        record.source_name,
                        category,
                        final_name
                    );
                }
                Decision::WouldMove => {
                    println!(
                        " {} {} → {}/{}",
                        "→".yellow(),
                        record.source_name,
                        category,
                        final_name
                    );
                }
                Decision::Skipped if record.failed => {
                    eprintln!(
                        " {} {}: {}",
                        "✗".red(),
                        record.source_name,
                        record.reason.as_deref().unwrap_or("unknown error")
                    );
                }
                // Too-new entries are summarized, not listed
                Decision::Skipped => {}
            }
        }

        Self::summary_table(report);
    }

    /// Prints only the entries that failed, for quiet runs.
    pub fn failures(report: &RunReport) {
        for record in report.entries.iter().filter(|record| record.failed) {
            eprintln!(
                " {} {}: {}",
                "✗".red(),
                record.source_name,
                record.reason.as_deref().unwrap_or("unknown error")
            );
        }
    }

    /// Prints the per-category counts and the skip reasons.
    pub fn summary_table(report: &RunReport) {
        Self::header("SUMMARY");

        let counts = report.category_counts();
        let width = counts.keys().map(|name| name.len()).max().unwrap_or(0).max(8);

        println!("{:<width$} | {}", "Category".bold(), "Entries".bold(), width = width);
        println!("{}", "-".repeat(width + 10));
        for (category, count) in &counts {
            println!(
                "{:<width$} | {}",
                category,
                count.to_string().green(),
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));

        let moved_label = if report.dry_run { "Would move" } else { "Moved" };
        println!(
            "{:<width$} | {}",
            moved_label.bold(),
            report.moved_count().to_string().green().bold(),
            width = width
        );
        println!(
            "{:<width$} | {}",
            "Skipped".bold(),
            report.skipped_count().to_string().yellow(),
            width = width
        );

        if report.skipped_count() > 0 {
            Self::header("Skipped entries");
            for record in report.skipped() {
                let reason = record.reason.as_deref().unwrap_or("");
                if record.failed {
                    println!("  - {}: {}", record.source_name, reason.red());
                } else {
                    println!("  - {}: {}", record.source_name, reason.dimmed());
                }
            }
        }

        println!();
        if report.failed_count() > 0 {
            Self::warning(&format!(
                "{} entries could not be moved. Please review errors above.",
                report.failed_count()
            ));
        } else if report.dry_run {
            Self::success("Dry run complete. No files were modified.");
        } else {
            Self::success("Organization complete!");
        }
    }

    /// Prints the overview and per-folder breakdown tables.
    pub fn inventory_tables(report: &InventoryReport) {
        Self::header("Overview");
        let overall = &report.overall;
        println!("{:<12} {}", "Total Size".cyan(), human_size(overall.size));
        println!("{:<12} {}", "Total Files".cyan(), overall.count);
        println!("{:<12} {}", "Oldest File".cyan(), describe_extreme(&overall.oldest));
        println!("{:<12} {}", "Newest File".cyan(), describe_extreme(&overall.newest));

        Self::header("Directory Breakdown");
        let width = report
            .folders
            .iter()
            .map(|f| f.name.len())
            .max()
            .unwrap_or(0)
            .max(9);
        println!(
            "{:<width$} | {:>7} | {:>12} | {:<10} | {:<10}",
            "Directory".bold(),
            "Files".bold(),
            "Size".bold(),
            "Oldest".bold(),
            "Newest".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 53));
        for folder in &report.folders {
            Self::folder_row(folder, width);
        }
    }

    fn folder_row(folder: &FolderStats, width: usize) {
        let date = |extreme: &Option<(String, chrono::DateTime<chrono::Local>)>| {
            extreme
                .as_ref()
                .map(|(_, d)| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "{:<width$} | {:>7} | {:>12} | {:<10} | {:<10}",
            folder.name.yellow().bold(),
            folder.count,
            human_size(folder.size).cyan(),
            date(&folder.oldest).dimmed(),
            date(&folder.newest).green(),
            width = width
        );
    }

    /// Prints the most recent files, newest first.
    pub fn recent_table(files: &[FileRecord]) {
        Self::header(&format!("Top {} Most Recent Files", files.len()));
        let name_width = files.iter().map(|f| f.name.len()).max().unwrap_or(0).max(4);
        println!(
            "{:<16} | {:<name_width$} | {:>12} | {:<8} | {}",
            "Date".bold(),
            "Name".bold(),
            "Size".bold(),
            "Type".bold(),
            "Location".bold(),
            name_width = name_width
        );
        println!("{}", "-".repeat(name_width + 60));
        for file in files {
            println!(
                "{:<16} | {:<name_width$} | {:>12} | {:<8} | {}",
                file.date.format("%Y-%m-%d %H:%M").to_string().green(),
                file.name.bold(),
                human_size(file.size).cyan(),
                file.kind.magenta(),
                file.location.yellow(),
                name_width = name_width
            );
        }
    }
}

fn describe_extreme(extreme: &Option<(String, chrono::DateTime<chrono::Local>)>) -> String {
    match extreme {
        Some((name, date)) => format!("{} ({})", name, date.format("%Y-%m-%d").to_string().green()),
        None => "N/A".to_string(),
    }
}
