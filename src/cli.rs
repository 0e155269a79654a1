//! Command-line interface module for downsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing with clap
//! - Configuration loading and command-line overrides
//! - Dispatching to the organizer and the inventory reports

use crate::config::OrganizerConfig;
use crate::file_organizer::Organizer;
use crate::inventory;
use crate::output::OutputFormatter;
use crate::report::RunReport;
use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

/// Move aged files out of a Downloads-style directory into category folders.
#[derive(Parser, Debug)]
#[command(name = "downsort", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./.downsortrc.toml, then ~/.config/downsort/config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands. `organize` runs when none is given.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Move aged entries into category folders
    Organize(OrganizeArgs),
    /// Show size and age statistics for the directory and its folders
    Stats {
        /// Directory to inspect (default: source_dir from configuration)
        directory: Option<PathBuf>,
    },
    /// List the most recently modified files
    Recent {
        /// Directory to inspect (default: source_dir from configuration)
        directory: Option<PathBuf>,
        /// Number of files to display
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

/// Options for the `organize` command.
#[derive(Args, Debug, Clone, Default)]
pub struct OrganizeArgs {
    /// Directory to organize (default: source_dir from configuration)
    pub directory: Option<PathBuf>,

    /// Minimum age in hours before an entry is moved
    #[arg(long, value_name = "HOURS")]
    pub hours: Option<f64>,

    /// Show what would be moved without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Runs the parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config =
        OrganizerConfig::load(cli.config.as_deref()).context("Error loading configuration")?;

    match cli.command.unwrap_or(Command::Organize(OrganizeArgs::default())) {
        Command::Organize(args) => {
            let report = organize(config, &args)?;
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Error serializing report")?
                );
            } else if cli.quiet {
                OutputFormatter::failures(&report);
            } else {
                OutputFormatter::run_report(&report);
            }
            Ok(())
        }
        Command::Stats { directory } => {
            let root = source_dir(&config, directory.as_deref());
            let spinner = (!cli.quiet).then(|| {
                OutputFormatter::spinner(&format!(
                    "Calculating statistics for {}...",
                    root.display()
                ))
            });
            let result = inventory::stats(&root);
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            OutputFormatter::inventory_tables(&result?);
            Ok(())
        }
        Command::Recent { directory, limit } => {
            let root = source_dir(&config, directory.as_deref());
            let spinner = (!cli.quiet)
                .then(|| OutputFormatter::spinner(&format!("Scanning {}...", root.display())));
            let result = inventory::recent(&root, limit);
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            OutputFormatter::recent_table(&result?);
            Ok(())
        }
    }
}

/// Applies command-line overrides to `config` and performs one run.
///
/// # Examples
///
/// ```no_run
/// use downsort::cli::{organize, OrganizeArgs};
/// use downsort::config::OrganizerConfig;
/// use std::path::PathBuf;
///
/// let args = OrganizeArgs {
///     directory: Some(PathBuf::from("/home/me/Downloads")),
///     dry_run: true,
///     ..OrganizeArgs::default()
/// };
/// let report = organize(OrganizerConfig::default(), &args).unwrap();
/// println!("{} entries would move", report.moved_count());
/// ```
pub fn organize(mut config: OrganizerConfig, args: &OrganizeArgs) -> Result<RunReport> {
    if let Some(directory) = &args.directory {
        config.source_dir = directory.clone();
    }
    if let Some(hours) = args.hours {
        config.age_threshold_hours = hours;
    }

    let organizer = Organizer::from_config(&config).context("Invalid configuration")?;
    info!(
        "Running on {} with a {} hour threshold",
        organizer.root().display(),
        organizer.threshold().hours()
    );

    let report = organizer.run(Local::now(), args.dry_run)?;
    Ok(report)
}

fn source_dir(config: &OrganizerConfig, directory: Option<&Path>) -> PathBuf {
    directory
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.resolved_source_dir())
}
