//! downsort - sort a downloads folder into sub-folders
//!
//! Files are classified by a bracketed tag at the start of their name
//! (`[Summer] beach.png` goes to `Summer/`) or, failing that, by an
//! extension-to-category mapping loaded from a JSON configuration file.
//! Unmapped files go to `Other/`.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod mover;
pub mod output;
pub mod sorter;

pub use classifier::{Classification, Classifier, FALLBACK_CATEGORY, FileEntry, Rule};
pub use config::{CategoryConfig, ConfigError, ExtensionIndex, SortConfig};
pub use mover::{ConflictPolicy, MoveError, MovedFile, Mover};
pub use sorter::{SortError, SortOptions, SweepEvent, SweepReport, sort_folder, sort_folder_with_progress};
