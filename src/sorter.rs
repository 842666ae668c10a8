//! The sweep: one pass over the top level of a folder.
//!
//! The listing is materialised before anything is moved, so folders created
//! during the sweep and files already relocated are never revisited.

use crate::classifier::{Classification, Classifier, FileEntry, Rule};
use crate::config::ExtensionIndex;
use crate::mover::{ConflictPolicy, MoveError, MovedFile, Mover, resolve_destination};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal errors that stop a sweep before any file is touched.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("Error reading directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Options for one sweep.
#[derive(Debug, Clone)]
pub struct SortOptions {
    /// The folder whose top-level files are sorted.
    pub folder: PathBuf,
    /// Classify and report, but move nothing.
    pub dry_run: bool,
    /// How to handle a same-named file already at the destination.
    pub conflict_policy: ConflictPolicy,
}

impl SortOptions {
    /// Options for a real sweep of `folder` with the default conflict policy.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            dry_run: false,
            conflict_policy: ConflictPolicy::default(),
        }
    }

    /// Sets whether the sweep only plans moves.
    ///
    /// # Arguments
    ///
    /// * `dry_run` - If true, classify and check destinations but move nothing
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets what happens when a same-named file already sits at the destination.
    pub fn conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }
}

/// A file that was (or in a dry run would be) sorted.
#[derive(Debug, Clone)]
pub struct SortedFile {
    pub name: String,
    /// Destination sub-folder name.
    pub folder: String,
    pub rule: Rule,
    /// Where the file is now, or would be for a dry run.
    pub destination: PathBuf,
}

/// A file that could not be sorted.
#[derive(Debug)]
pub struct FailedFile {
    pub path: PathBuf,
    pub folder: String,
    pub error: MoveError,
}

/// Outcome of one sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Files moved into their destination folder.
    pub moved: Vec<SortedFile>,
    /// Files that a dry run would have moved.
    pub planned: Vec<SortedFile>,
    /// Files whose move failed; the sweep carried on past them.
    pub failed: Vec<FailedFile>,
    /// Hidden files left untouched.
    pub skipped_hidden: usize,
    /// Directories and other non-file entries left untouched.
    pub skipped_non_files: usize,
}

impl SweepReport {
    pub fn moved_count(&self) -> usize {
        self.moved.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// True when no file failed to move.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of sorted (or planned) files per destination folder.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for file in self.moved.iter().chain(&self.planned) {
            *counts.entry(file.folder.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Snapshot the sortable files directly inside `folder`.
///
/// Returns the candidate files plus counts of hidden and non-file entries skipped.
fn snapshot(folder: &Path) -> Result<(Vec<(PathBuf, FileEntry)>, usize, usize), SortError> {
    let entries = fs::read_dir(folder).map_err(|source| SortError::ReadDir {
        path: folder.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    let mut hidden = 0;
    let mut non_files = 0;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        // Follows symlinks, so a link to a regular file is sorted like the file itself.
        if !path.is_file() {
            non_files += 1;
            continue;
        }

        let file_entry = FileEntry::from_name(&entry.file_name().to_string_lossy());
        if file_entry.is_hidden() {
            hidden += 1;
            continue;
        }
        files.push((path, file_entry));
    }

    files.sort_by(|a, b| a.1.name.cmp(&b.1.name));
    Ok((files, hidden, non_files))
}

/// Sort every visible top-level file of `options.folder` into sub-folders.
///
/// Per-file failures are logged and collected in the report; only an
/// unreadable folder is an error.
///
/// # Examples
///
/// ```no_run
/// use downsort::config::SortConfig;
/// use downsort::sorter::{SortOptions, sort_folder};
/// use std::path::Path;
///
/// let config = SortConfig::load(Path::new("config.json")).unwrap();
/// let report = sort_folder(&SortOptions::new("/home/me/Downloads"), &config.extension_index()).unwrap();
/// println!("{} moved, {} failed", report.moved_count(), report.failed_count());
/// ```
pub fn sort_folder(options: &SortOptions, index: &ExtensionIndex) -> Result<SweepReport, SortError> {
    sort_folder_with_progress(options, index, |_| {})
}

/// Progress notifications from [`sort_folder_with_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepEvent<'a> {
    /// The snapshot is taken; `total` candidate files will be handled.
    Started { total: usize },
    /// One candidate file has been moved, planned, or has failed.
    Handled { name: &'a str },
}

/// Like [`sort_folder`], reporting progress to `on_event`.
///
/// `on_event` gets one [`SweepEvent::Started`] and then one
/// [`SweepEvent::Handled`] per candidate file.
pub fn sort_folder_with_progress<F>(
    options: &SortOptions,
    index: &ExtensionIndex,
    mut on_event: F,
) -> Result<SweepReport, SortError>
where
    F: FnMut(SweepEvent<'_>),
{
    let (files, skipped_hidden, skipped_non_files) = snapshot(&options.folder)?;
    tracing::debug!(
        folder = %options.folder.display(),
        candidates = files.len(),
        hidden = skipped_hidden,
        "Snapshot taken"
    );
    on_event(SweepEvent::Started { total: files.len() });

    let classifier = Classifier::new(index);
    let mover = Mover::new(options.conflict_policy);
    let mut report = SweepReport {
        skipped_hidden,
        skipped_non_files,
        ..SweepReport::default()
    };

    for (path, entry) in files {
        let Classification { folder, rule } = classifier.classify(&entry);
        tracing::debug!(file = %entry.name, folder = %folder, %rule, "Classified");

        let outcome = resolve_destination(&options.folder, &folder).and_then(|destination| {
            if options.dry_run {
                mover.plan_target(&path, &destination).map(|to| MovedFile {
                    from: path.clone(),
                    to,
                })
            } else {
                mover.move_file(&path, &destination)
            }
        });
        on_event(SweepEvent::Handled { name: &entry.name });

        match outcome {
            Ok(MovedFile { to, .. }) => {
                let sorted = SortedFile {
                    name: entry.name,
                    folder,
                    rule,
                    destination: to,
                };
                if options.dry_run {
                    report.planned.push(sorted);
                } else {
                    report.moved.push(sorted);
                }
            }
            Err(error) => {
                // The caller reports failures from the returned report.
                tracing::debug!(file = %path.display(), error = %error, "Could not sort file");
                report.failed.push(FailedFile {
                    path,
                    folder,
                    error,
                });
            }
        }
    }

    Ok(report)
}
