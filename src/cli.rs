//! Command-line interface module for downsort.
//!
//! This module handles:
//! - Argument parsing (target folder, configuration file, flags)
//! - Resolving process-wide defaults at the entry boundary
//! - Orchestrating config loading and the sweep
//! - Printing the final report

use crate::config::{ConfigError, DEFAULT_CONFIG_PATH, SortConfig};
use crate::mover::ConflictPolicy;
use crate::output::OutputFormatter;
use crate::sorter::{SortError, SortOptions, SweepEvent, SweepReport, sort_folder_with_progress};
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Sort a downloads folder into sub-folders by bracketed tag or file extension.
#[derive(Debug, Parser)]
#[command(name = "downsort", version, about)]
pub struct Args {
    /// Folder to sort [default: ~/Downloads]
    #[arg(env = "DOWNSORT_FOLDER")]
    pub folder: Option<PathBuf>,

    /// Category configuration file, resolved against the working directory
    #[arg(short, long, env = "DOWNSORT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Show where files would go without moving anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// What to do when the destination already holds a file of the same name
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Skip)]
    pub on_conflict: ConflictPolicy,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Default tracing filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "downsort=debug",
            (false, _) => "downsort=trace",
        }
    }
}

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sort(#[from] SortError),
    #[error("No folder given and no download or home directory found (pass a folder)")]
    NoHomeDirectory,
}

/// The folder sorted when none is given.
///
/// This is the platform's download folder (XDG user dirs on Linux, the known
/// folder on Windows), or `Downloads` under the home directory if the platform
/// does not name one.
pub fn default_downloads_folder() -> Option<PathBuf> {
    dirs::download_dir().or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
}

/// Runs one sweep as described by `args`.
///
/// Configuration is loaded before the folder is touched, so a bad config never
/// leaves a half-sorted folder behind.
///
/// # Errors
///
/// Returns an error only for fatal startup problems: unreadable or invalid
/// configuration, or an unreadable target folder. Individual files that fail
/// to move are reported in the returned [`SweepReport`].
pub fn run(args: &Args) -> Result<SweepReport, CliError> {
    let folder = match &args.folder {
        Some(folder) => folder.clone(),
        None => default_downloads_folder().ok_or(CliError::NoHomeDirectory)?,
    };

    let config = SortConfig::load(&args.config)?;
    let index = config.extension_index();
    tracing::debug!(extensions = index.len(), "Built extension index");

    let options = SortOptions::new(&folder)
        .dry_run(args.dry_run)
        .conflict_policy(args.on_conflict);

    if !args.quiet {
        if args.dry_run {
            OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", folder.display()));
        } else {
            OutputFormatter::info(&format!("Sorting contents of: {}", folder.display()));
        }
    }

    let progress = if args.quiet {
        None
    } else {
        Some(OutputFormatter::create_progress_bar(0))
    };
    let report = sort_folder_with_progress(&options, &index, |event| {
        let Some(pb) = &progress else { return };
        match event {
            SweepEvent::Started { total } => pb.set_length(total as u64),
            SweepEvent::Handled { name } => {
                pb.set_message(name.to_string());
                pb.inc(1);
            }
        }
    })?;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if args.quiet {
        for failed in &report.failed {
            OutputFormatter::error(&failed.error.to_string());
        }
    } else {
        OutputFormatter::sweep_report(&report, args.dry_run);
    }

    Ok(report)
}
