//! `.codetomdrc.yaml` run-control files.
//!
//! Settings are read from the home directory first and from the project
//! directory second; every key present in a later file overrides the earlier
//! value, and list values replace the built-in defaults. Command-line flags
//! are applied on top by the caller.

use crate::config::{ClipboardMode, ConfigBuilder};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name looked up in the home and project directories.
pub const RC_FILENAME: &str = ".codetomdrc.yaml";

/// Settings read from a run-control file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RcFile {
    /// Replaces the default ignore table
    pub ignore_patterns: Option<Vec<String>>,
    /// Force-include extensions
    pub include_extensions: Option<Vec<String>>,
    /// Force-exclude extensions
    pub exclude_extensions: Option<Vec<String>>,
    /// Files included regardless of other rules
    pub extra_files: Option<Vec<PathBuf>>,
    /// Size cap in bytes, `0` for unlimited
    pub max_file_size: Option<u64>,
    /// Emit the tree section
    pub include_tree: Option<bool>,
    /// Load `.gitignore` files under the root
    pub respect_gitignore: Option<bool>,
    /// Output file
    #[serde(alias = "output_filename")]
    pub output: Option<PathBuf>,
    /// Clipboard behavior
    pub clipboard: Option<ClipboardMode>,
}

impl RcFile {
    /// Parses YAML text. An empty document yields the empty settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or has mistyped values.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(text)?)
    }

    /// Reads and parses a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&text)
    }

    /// Looks for rc files for `input` in the home and project directories
    /// and merges whatever could be loaded. Broken files are skipped with a
    /// warning.
    #[must_use]
    pub fn discover(input: &Path) -> Self {
        let project_dir = if input.is_file() {
            input.parent().map(Path::to_path_buf)
        } else {
            Some(input.to_path_buf())
        };

        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(RC_FILENAME));
        }
        if let Some(dir) = project_dir {
            let path = dir.join(RC_FILENAME);
            let duplicate = candidates.iter().any(|known| same_file(known, &path));
            if !duplicate {
                candidates.push(path);
            }
        }

        let mut merged = Self::default();
        for path in candidates.iter().filter(|p| p.is_file()) {
            match Self::load(path) {
                Ok(settings) => {
                    info!("Loaded config: {}", path.display());
                    merged = merged.merge(settings);
                }
                Err(e) => warn!("Skipping config file {}: {}", path.display(), e),
            }
        }

        if merged == Self::default() {
            debug!("No {} found, using built-in defaults", RC_FILENAME);
        }
        merged
    }

    /// Overlays `other` on top of `self`, key by key.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            ignore_patterns: other.ignore_patterns.or(self.ignore_patterns),
            include_extensions: other.include_extensions.or(self.include_extensions),
            exclude_extensions: other.exclude_extensions.or(self.exclude_extensions),
            extra_files: other.extra_files.or(self.extra_files),
            max_file_size: other.max_file_size.or(self.max_file_size),
            include_tree: other.include_tree.or(self.include_tree),
            respect_gitignore: other.respect_gitignore.or(self.respect_gitignore),
            output: other.output.or(self.output),
            clipboard: other.clipboard.or(self.clipboard),
        }
    }

    /// Transfers the present keys onto a config builder.
    #[must_use]
    pub fn apply(self, mut builder: ConfigBuilder) -> ConfigBuilder {
        if let Some(patterns) = self.ignore_patterns {
            builder = builder.ignore_patterns(patterns);
        }
        if let Some(extensions) = self.include_extensions {
            builder = builder.include_extensions(extensions);
        }
        if let Some(extensions) = self.exclude_extensions {
            builder = builder.exclude_extensions(extensions);
        }
        if let Some(files) = self.extra_files {
            builder = builder.extra_files(files);
        }
        if let Some(bytes) = self.max_file_size {
            builder = builder.max_file_size((bytes > 0).then_some(bytes));
        }
        if let Some(enabled) = self.include_tree {
            builder = builder.show_tree(enabled);
        }
        if let Some(enabled) = self.respect_gitignore {
            builder = builder.respect_gitignore(enabled);
        }
        if let Some(output) = self.output {
            builder = builder.output(output);
        }
        if let Some(mode) = self.clipboard {
            builder = builder.clipboard(mode);
        }
        builder
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use assert_fs::prelude::*;

    #[test]
    fn test_parse_full_file() {
        let rc = RcFile::parse(
            r"
comment: unknown keys are ignored
ignore_patterns:
  - .git
  - '*.log'
include_extensions: [.md]
max_file_size: 0
include_tree: false
output_filename: context.md
clipboard: never
",
        )
        .unwrap();

        assert_eq!(
            rc.ignore_patterns,
            Some(vec![".git".to_string(), "*.log".to_string()])
        );
        assert_eq!(rc.include_extensions, Some(vec![".md".to_string()]));
        assert_eq!(rc.max_file_size, Some(0));
        assert_eq!(rc.include_tree, Some(false));
        assert_eq!(rc.output, Some(PathBuf::from("context.md")));
        assert_eq!(rc.clipboard, Some(ClipboardMode::Never));
    }

    #[test]
    fn test_parse_empty_file() {
        assert_eq!(RcFile::parse("\n").unwrap(), RcFile::default());
    }

    #[test]
    fn test_parse_mistyped_value() {
        assert!(RcFile::parse("include_tree: maybe-later\n").is_err());
    }

    #[test]
    fn test_merge_prefers_later_file() {
        let home = RcFile {
            include_tree: Some(false),
            max_file_size: Some(10),
            ..RcFile::default()
        };
        let project = RcFile {
            include_tree: Some(true),
            ..RcFile::default()
        };

        let merged = home.merge(project);
        assert_eq!(merged.include_tree, Some(true));
        assert_eq!(merged.max_file_size, Some(10));
    }

    #[test]
    fn test_apply_onto_builder() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rc = RcFile {
            ignore_patterns: Some(vec!["docs/".to_string()]),
            max_file_size: Some(0),
            include_tree: Some(false),
            ..RcFile::default()
        };

        let config = rc.apply(Config::builder().root(temp.path())).build().unwrap();
        assert_eq!(config.ignore_patterns, vec!["docs/".to_string()]);
        assert_eq!(config.max_file_size, None);
        assert!(!config.show_tree);
    }

    #[test]
    fn test_discover_reads_project_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(RC_FILENAME)
            .write_str("exclude_extensions: [.md]\n")
            .unwrap();

        let rc = RcFile::discover(temp.path());
        assert_eq!(rc.exclude_extensions, Some(vec![".md".to_string()]));
    }

    #[test]
    fn test_discover_skips_broken_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(RC_FILENAME).write_str("ignore_patterns: [").unwrap();

        let rc = RcFile::discover(temp.path());
        assert_eq!(rc.ignore_patterns, None);
    }
}
