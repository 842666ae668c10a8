//! Category configuration.
//!
//! Categories are loaded from a JSON document holding an ordered array of
//! category objects:
//!
//! ```json
//! [
//!   { "name": "Images", "extensions": [".jpg", ".png"] },
//!   { "name": "Documents", "extensions": [".pdf", ".txt"] }
//! ]
//! ```
//!
//! The array order matters: when two categories claim the same extension,
//! the later one wins.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default location of the category file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Errors that can occur while loading the category configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// The file exists but could not be read.
    #[error("IO error reading configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Invalid JSON syntax or structure.
    #[error("Invalid configuration {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },
    /// A category has an empty `name`.
    #[error("Category #{index} has an empty name")]
    EmptyCategoryName { index: usize },
    /// A category name cannot be used as a single sub-folder name.
    #[error("Category name '{name}' is not a plain folder name")]
    InvalidCategoryName { name: String },
}

/// One named category and the extensions it claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Sub-folder name files of this category are moved into.
    pub name: String,
    /// Extensions including the leading dot, e.g. `".pdf"`. Matched case-sensitively.
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl CategoryConfig {
    /// Builds a category from borrowed parts.
    ///
    /// # Example
    ///
    /// ```
    /// use downsort::config::CategoryConfig;
    ///
    /// let images = CategoryConfig::new("Images", &[".jpg", ".png"]);
    /// assert_eq!(images.extensions.len(), 2);
    /// ```
    pub fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

/// The full, ordered set of categories for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortConfig {
    pub categories: Vec<CategoryConfig>,
}

impl SortConfig {
    pub fn new(categories: Vec<CategoryConfig>) -> Self {
        Self { categories }
    }

    /// Load and validate the category file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if the file does not exist,
    /// `ConfigError::ConfigInvalid` if it is not a JSON array of categories,
    /// and a validation error if a category name is unusable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json(&content).map_err(|e| match e {
            ConfigError::ConfigInvalid { reason, .. } => ConfigError::ConfigInvalid {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        tracing::debug!(
            path = %path.display(),
            categories = config.categories.len(),
            "Loaded category configuration"
        );
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::ConfigInvalid {
                path: PathBuf::new(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every category name and warn about extensions that can never match.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, category) in self.categories.iter().enumerate() {
            if category.name.is_empty() {
                return Err(ConfigError::EmptyCategoryName { index });
            }
            if !is_plain_folder_name(&category.name) {
                return Err(ConfigError::InvalidCategoryName {
                    name: category.name.clone(),
                });
            }

            for ext in &category.extensions {
                if !ext.is_empty() && !ext.starts_with('.') {
                    tracing::warn!(
                        category = %category.name,
                        extension = %ext,
                        "Extension has no leading '.', it will never match a file"
                    );
                }
            }
        }
        Ok(())
    }

    /// Flatten all categories into an extension lookup.
    ///
    /// Later categories override earlier ones for a shared extension.
    pub fn extension_index(&self) -> ExtensionIndex {
        let mut index = ExtensionIndex::default();
        for category in &self.categories {
            for ext in &category.extensions {
                index.insert(ext, &category.name);
            }
        }
        index
    }
}

/// A name is usable as a category folder if it is exactly one normal path component.
fn is_plain_folder_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Extension to category-name lookup, built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionIndex {
    map: HashMap<String, String>,
}

impl ExtensionIndex {
    /// Map `ext` to `category`, replacing any earlier mapping.
    pub fn insert(&mut self, ext: &str, category: &str) {
        if let Some(previous) = self.map.insert(ext.to_string(), category.to_string())
            && previous != category
        {
            tracing::debug!(
                extension = %ext,
                previous = %previous,
                category = %category,
                "Extension claimed by a later category"
            );
        }
    }

    /// Look up the category for an extension (leading dot included, exact case).
    pub fn get(&self, ext: &str) -> Option<&str> {
        self.map.get(ext).map(String::as_str)
    }

    /// Number of distinct extensions mapped.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no category claims any extension; every file then goes to `Other`.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
