use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Default maximum size of a single embedded file (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Ignore patterns applied before any repository or user rules.
///
/// Gitignore syntax: a bare name matches at any depth, a trailing `/`
/// restricts the pattern to directories.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // VCS
    ".git", ".svn", ".hg",
    // Python
    "__pycache__", "*.pyc", "*.pyo", "*.pyd",
    ".env", "venv", ".venv", "env", "ENV", "*activate*",
    ".pytest_cache", ".mypy_cache", ".ruff_cache",
    // Node
    "node_modules", ".npm", "yarn.lock", "package-lock.json", "pnpm-lock.yaml", ".yarn", ".next",
    // Build outputs
    "build", "dist", "target", "out", "bin", "obj",
    // IDE/OS
    ".vscode", ".idea", ".DS_Store", "Thumbs.db",
    // Logs/temp
    "*.log", "*.tmp", "*.temp", "*.swp", "*.swo", "*.swn",
    // Minified assets
    "*.min.js", "*.min.css",
    // Images
    "*.svg", "*.png", "*.jpg", "*.jpeg", "*.gif", "*.bmp", "*.ico", "*.webp",
    // Documents
    "*.pdf", "*.doc", "*.docx", "*.xls", "*.xlsx", "*.ppt", "*.pptx",
    // Archives
    "*.zip", "*.tar", "*.gz", "*.bz2", "*.rar", "*.7z",
    // Media
    "*.mp3", "*.wav", "*.ogg", "*.mp4", "*.avi", "*.mov", "*.webm",
    // Databases
    "*.db", "*.sqlite", "*.sqlite3",
    // Lock files
    "poetry.lock", "Pipfile.lock", "Cargo.lock",
];

/// When the document is copied to the system clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardMode {
    /// Copy only when no output file is requested
    #[default]
    Auto,
    /// Always copy
    Always,
    /// Never copy
    Never,
}

/// Effective, immutable configuration for one run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct Config {
    /// Canonical input path (file or directory)
    pub input: PathBuf,

    /// Directory paths are resolved against: the input itself, or the
    /// parent of a single-file input
    pub root_dir: PathBuf,

    /// True when the input is a single file
    pub single_file: bool,

    /// Base ignore patterns (defaults unless replaced)
    pub ignore_patterns: Vec<String>,

    /// User patterns evaluated after every other pattern source
    pub extra_ignore_patterns: Vec<String>,

    /// Load `.gitignore` files found under the root
    pub respect_gitignore: bool,

    /// Extensions that override ignore patterns (normalized, e.g. `.log`)
    pub include_extensions: Vec<String>,

    /// Extensions that are always excluded (normalized)
    pub exclude_extensions: Vec<String>,

    /// Files included regardless of every other rule, relative to the root
    pub extra_files: Vec<PathBuf>,

    /// Files above this size are skipped (`None` = unlimited)
    pub max_file_size: Option<u64>,

    /// Emit the directory tree section
    pub show_tree: bool,

    /// Output file for the document
    pub output: Option<PathBuf>,

    /// Clipboard behavior
    pub clipboard: ClipboardMode,

    /// Print the document to stdout
    pub stdout: bool,

    /// Path to an external Tera template replacing the built-in one
    pub template_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use codetomd::Config;
    ///
    /// let config = Config::builder()
    ///     .root("./src")
    ///     .include_extensions(vec!["log".to_string()])
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input path no longer exists
    /// - The template path is missing or not a file
    pub fn validate(&self) -> Result<()> {
        if !self.input.exists() {
            return Err(Error::root_not_found(&self.input));
        }

        if let Some(ref template_path) = self.template_path {
            if !template_path.is_file() {
                return Err(Error::config(format!(
                    "Template path is not a file: {}",
                    template_path.display()
                )));
            }
        }

        if let Some(ref output) = self.output {
            if output.is_dir() {
                return Err(Error::config(format!(
                    "Output path is a directory: {}",
                    output.display()
                )));
            }
        }

        Ok(())
    }

    /// Name of the project, taken from the root directory.
    #[must_use]
    pub fn project_name(&self) -> String {
        self.root_dir
            .file_name()
            .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().into_owned())
    }

    /// The input path as shown in the document header: relative to the
    /// root's parent, so `project` for a directory and `project/a.py` for a
    /// single file.
    #[must_use]
    pub fn display_source(&self) -> String {
        self.root_dir
            .parent()
            .and_then(|parent| pathdiff::diff_paths(&self.input, parent))
            .map_or_else(
                || self.input.display().to_string(),
                |relative| slash_path(&relative),
            )
    }

    /// The effective configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the configuration cannot be
    /// serialized.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root: Option<PathBuf>,
    ignore_patterns: Option<Vec<String>>,
    extra_ignore_patterns: Vec<String>,
    respect_gitignore: Option<bool>,
    include_extensions: Vec<String>,
    exclude_extensions: Vec<String>,
    extra_files: Vec<PathBuf>,
    max_file_size: Option<Option<u64>>,
    show_tree: Option<bool>,
    output: Option<PathBuf>,
    clipboard: Option<ClipboardMode>,
    stdout: bool,
    template_path: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Sets the input path (directory or single file).
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Replaces the default ignore table.
    #[must_use]
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = Some(patterns);
        self
    }

    /// Appends user ignore patterns, evaluated after all other patterns.
    #[must_use]
    pub fn add_ignore_patterns(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.extra_ignore_patterns.extend(patterns);
        self
    }

    /// Enables or disables `.gitignore` discovery.
    #[must_use]
    pub fn respect_gitignore(mut self, enabled: bool) -> Self {
        self.respect_gitignore = Some(enabled);
        self
    }

    /// Sets the force-include extension list.
    #[must_use]
    pub fn include_extensions(mut self, extensions: Vec<String>) -> Self {
        self.include_extensions = extensions;
        self
    }

    /// Sets the force-exclude extension list.
    #[must_use]
    pub fn exclude_extensions(mut self, extensions: Vec<String>) -> Self {
        self.exclude_extensions = extensions;
        self
    }

    /// Sets the files included regardless of other rules.
    #[must_use]
    pub fn extra_files(mut self, files: Vec<PathBuf>) -> Self {
        self.extra_files = files;
        self
    }

    /// Sets the per-file size cap (`None` = unlimited).
    #[must_use]
    pub fn max_file_size(mut self, bytes: Option<u64>) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Enables or disables the tree section.
    #[must_use]
    pub fn show_tree(mut self, enabled: bool) -> Self {
        self.show_tree = Some(enabled);
        self
    }

    /// Sets the output file.
    #[must_use]
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Sets the clipboard behavior.
    #[must_use]
    pub fn clipboard(mut self, mode: ClipboardMode) -> Self {
        self.clipboard = Some(mode);
        self
    }

    /// Requests the document on stdout.
    #[must_use]
    pub fn stdout(mut self, enabled: bool) -> Self {
        self.stdout = enabled;
        self
    }

    /// Sets the path to an external Tera template.
    #[must_use]
    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input path does not exist
    /// - An extension is malformed
    /// - An extra file lies outside the root
    /// - Validation fails
    pub fn build(self) -> Result<Config> {
        let requested = self.root.unwrap_or_else(|| PathBuf::from("."));
        if !requested.exists() {
            return Err(Error::root_not_found(requested));
        }
        let input = requested
            .canonicalize()
            .map_err(|e| Error::io(&requested, e))?;

        let single_file = input.is_file();
        let root_dir = if single_file {
            input
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| Error::config("Single-file input has no parent directory"))?
        } else {
            input.clone()
        };

        let extra_files = self
            .extra_files
            .iter()
            .map(|file| relative_to_root(&root_dir, file))
            .collect::<Result<Vec<_>>>()?;

        let config = Config {
            ignore_patterns: self.ignore_patterns.unwrap_or_else(|| {
                DEFAULT_IGNORE_PATTERNS
                    .iter()
                    .map(|p| (*p).to_string())
                    .collect()
            }),
            extra_ignore_patterns: self.extra_ignore_patterns,
            respect_gitignore: self.respect_gitignore.unwrap_or(true),
            include_extensions: normalize_extensions(&self.include_extensions)?,
            exclude_extensions: normalize_extensions(&self.exclude_extensions)?,
            extra_files,
            max_file_size: self.max_file_size.unwrap_or(Some(DEFAULT_MAX_FILE_SIZE)),
            show_tree: self.show_tree.unwrap_or(true),
            output: self.output,
            clipboard: self.clipboard.unwrap_or_default(),
            stdout: self.stdout,
            template_path: self.template_path,
            input,
            root_dir,
            single_file,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Normalizes a user-supplied extension to lowercase with a leading dot.
///
/// # Errors
///
/// Returns an error for empty values and values containing path separators,
/// whitespace or glob characters.
pub fn normalize_extension(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix('.').unwrap_or(trimmed);

    if bare.is_empty() {
        return Err(Error::invalid_extension(raw, "extension is empty"));
    }
    if bare
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_whitespace())
    {
        return Err(Error::invalid_extension(
            raw,
            "extension must not contain separators or whitespace",
        ));
    }
    if bare.chars().any(|c| matches!(c, '*' | '?' | '[' | ']')) {
        return Err(Error::invalid_extension(
            raw,
            "extension must not contain glob characters",
        ));
    }

    Ok(format!(".{}", bare.to_lowercase()))
}

fn normalize_extensions(raw: &[String]) -> Result<Vec<String>> {
    let mut normalized = raw
        .iter()
        .map(|ext| normalize_extension(ext))
        .collect::<Result<Vec<_>>>()?;
    normalized.sort();
    normalized.dedup();
    Ok(normalized)
}

/// Resolves an extra-file path to a clean path relative to `root`.
fn relative_to_root(root: &Path, file: &Path) -> Result<PathBuf> {
    let absolute = if file.is_absolute() {
        file.canonicalize().unwrap_or_else(|_| lexical_clean(file))
    } else {
        lexical_clean(&root.join(file))
    };

    absolute
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|_| {
            Error::config(format!(
                "Extra file '{}' lies outside the root '{}'",
                file.display(),
                root.display()
            ))
        })
}

/// Removes `.` components and folds `..` without touching the filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Renders a path with forward slashes regardless of platform.
#[must_use]
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder().root(temp.path()).build().unwrap();

        assert!(!config.single_file);
        assert!(config.show_tree);
        assert!(config.respect_gitignore);
        assert_eq!(config.clipboard, ClipboardMode::Auto);
        assert_eq!(config.max_file_size, Some(DEFAULT_MAX_FILE_SIZE));
        assert_eq!(config.ignore_patterns.len(), DEFAULT_IGNORE_PATTERNS.len());
    }

    #[test]
    fn test_invalid_root_dir() {
        let result = Config::builder()
            .root("/nonexistent/path/that/should/not/exist")
            .build();

        assert!(matches!(result, Err(Error::RootNotFound { .. })));
    }

    #[test]
    fn test_single_file_root() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("proj/a.py").write_str("print(1)").unwrap();

        let config = Config::builder()
            .root(temp.child("proj/a.py").path())
            .build()
            .unwrap();

        assert!(config.single_file);
        assert_eq!(config.root_dir.file_name().unwrap(), "proj");
        assert_eq!(config.display_source(), "proj/a.py");
    }

    #[test]
    fn test_extensions_are_normalized() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .root(temp.path())
            .include_extensions(vec!["LOG".to_string(), ".log".to_string(), "rs".to_string()])
            .build()
            .unwrap();

        assert_eq!(config.include_extensions, vec![".log", ".rs"]);
    }

    #[test]
    fn test_invalid_extension() {
        let temp = assert_fs::TempDir::new().unwrap();
        for bad in ["", ".", "a/b", "*.py", "p y"] {
            let result = Config::builder()
                .root(temp.path())
                .exclude_extensions(vec![bad.to_string()])
                .build();
            assert!(result.unwrap_err().is_config(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_extra_files_relative_to_root() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/a.py").touch().unwrap();

        let config = Config::builder()
            .root(temp.path())
            .extra_files(vec![
                PathBuf::from("./src/../src/a.py"),
                temp.child("src/a.py").path().to_path_buf(),
            ])
            .build()
            .unwrap();

        assert_eq!(config.extra_files[0], PathBuf::from("src/a.py"));
        assert_eq!(config.extra_files[1], PathBuf::from("src/a.py"));
    }

    #[test]
    fn test_extra_file_outside_root() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("inner").create_dir_all().unwrap();

        let result = Config::builder()
            .root(temp.child("inner").path())
            .extra_files(vec![PathBuf::from("../escape.py")])
            .build();

        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_missing_template() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder()
            .root(temp.path())
            .template_path(temp.path().join("missing.tera"))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_to_json() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .root(temp.path())
            .exclude_extensions(vec!["PY".to_string()])
            .build()
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(json["exclude_extensions"], serde_json::json!([".py"]));
        assert_eq!(json["clipboard"], "auto");
        assert_eq!(json["show_tree"], true);
    }

    #[test]
    fn test_slash_path() {
        assert_eq!(slash_path(Path::new("src/bin/main.rs")), "src/bin/main.rs");
    }
}
