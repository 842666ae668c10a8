//! File classification: picks the sub-folder a file belongs in.
//!
//! Two rules are applied in order:
//! 1. A bracketed tag at the very start of the file stem (`[Summer] beach.png`)
//!    names the folder directly.
//! 2. Otherwise the file extension is looked up in the [`ExtensionIndex`],
//!    falling back to [`FALLBACK_CATEGORY`].
//!
//! # Examples
//!
//! ```
//! use downsort::classifier::{Classifier, FileEntry};
//! use downsort::config::{CategoryConfig, SortConfig};
//!
//! let index = SortConfig::new(vec![CategoryConfig::new("Images", &[".png"])]).extension_index();
//! let classifier = Classifier::new(&index);
//!
//! assert_eq!(classifier.classify(&FileEntry::from_name("cat.png")).folder, "Images");
//! assert_eq!(classifier.classify(&FileEntry::from_name("[Summer] beach.png")).folder, "Summer");
//! assert_eq!(classifier.classify(&FileEntry::from_name("notes.txt")).folder, "Other");
//! ```

use crate::config::ExtensionIndex;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Folder used when neither a tag nor an extension mapping applies.
pub const FALLBACK_CATEGORY: &str = "Other";

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(.*?)\]").expect("tag pattern is valid"));

/// A directory entry name split into the parts classification looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Full file name, e.g. `report.final.pdf`.
    pub name: String,
    /// Name without its final extension, e.g. `report.final`.
    pub stem: String,
    /// Final extension including the dot, e.g. `.pdf`; empty if there is none.
    pub extension: String,
}

impl FileEntry {
    /// Split a file name into stem and extension.
    ///
    /// The extension starts at the last `.` unless that dot is the first or
    /// the last character of the name, in which case there is no extension.
    pub fn from_name(name: &str) -> Self {
        let (stem, extension) = match name.rfind('.') {
            Some(dot) if dot > 0 && dot < name.len() - 1 => (&name[..dot], &name[dot..]),
            _ => (name, ""),
        };

        Self {
            name: name.to_string(),
            stem: stem.to_string(),
            extension: extension.to_string(),
        }
    }

    /// Hidden entries start with a dot and are never sorted.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Return the text of a bracketed tag at the start of `stem`, if any.
///
/// Only the first `[...]` counts, and only when it begins at position 0.
/// An empty tag (`[]`) is treated as no tag.
pub fn extract_tag(stem: &str) -> Option<&str> {
    TAG_PATTERN
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|tag| !tag.is_empty())
}

/// Which rule decided the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Tag,
    Extension,
    Fallback,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rule::Tag => "tag",
            Rule::Extension => "extension",
            Rule::Fallback => "fallback",
        };
        f.write_str(label)
    }
}

/// Result of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Destination sub-folder name, relative to the sorted folder.
    pub folder: String,
    pub rule: Rule,
}

/// Maps file entries to destination folder names. Pure; never touches the filesystem.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    index: &'a ExtensionIndex,
}

impl<'a> Classifier<'a> {
    pub fn new(index: &'a ExtensionIndex) -> Self {
        Self { index }
    }

    /// Determine the destination folder for `entry`.
    ///
    /// A tag always wins over the extension mapping.
    pub fn classify(&self, entry: &FileEntry) -> Classification {
        if let Some(tag) = extract_tag(&entry.stem) {
            return Classification {
                folder: tag.to_string(),
                rule: Rule::Tag,
            };
        }

        match self.index.get(&entry.extension) {
            Some(category) => Classification {
                folder: category.to_string(),
                rule: Rule::Extension,
            },
            None => Classification {
                folder: FALLBACK_CATEGORY.to_string(),
                rule: Rule::Fallback,
            },
        }
    }
}
