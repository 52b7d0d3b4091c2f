//! Include/exclude decisions for walked paths.
//!
//! A [`RuleSet`] is an ordered list of rules evaluated first-match-wins:
//!
//! 1. extra files are always included;
//! 2. excluded extensions are excluded;
//! 3. included extensions are included, overriding ignore patterns;
//! 4. ignore patterns (defaults, discovered `.gitignore` files, user
//!    patterns) decide by the last matching pattern, so a later `!pattern`
//!    re-includes what an earlier one excluded;
//! 5. anything else is included.
//!
//! Extension and extra-file rules only ever apply to files. Directories are
//! decided by patterns alone; pruning them is the walker's job.

use crate::config::Config;
use crate::error::{Error, Result};
use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Repository ignore file picked up under the root.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Outcome for a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep the file / descend into the directory
    Include,
    /// Drop the file / prune the directory
    Exclude,
}

/// Where an ignore pattern came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    /// Built-in (or rc-replaced) ignore table
    Defaults,
    /// A discovered ignore file, relative to the root
    IgnoreFile(PathBuf),
    /// Patterns given on the command line
    User,
}

/// Which rule produced a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// Listed as an extra file
    ExtraFile,
    /// Extension is in the exclude list
    ExcludedExtension(String),
    /// Extension is in the include list
    IncludedExtension(String),
    /// Last matching ignore pattern
    Pattern {
        /// Pattern text as written
        pattern: String,
        /// Where it was defined
        source: PatternSource,
        /// `!pattern` re-include
        negated: bool,
    },
    /// No rule matched
    NoMatch,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtraFile => f.write_str("extra file"),
            Self::ExcludedExtension(ext) => write!(f, "extension '{ext}' is excluded"),
            Self::IncludedExtension(ext) => write!(f, "extension '{ext}' is included"),
            Self::Pattern {
                pattern, source, ..
            } => match source {
                PatternSource::Defaults => write!(f, "default pattern '{pattern}'"),
                PatternSource::User => write!(f, "user pattern '{pattern}'"),
                PatternSource::IgnoreFile(file) => {
                    write!(f, "pattern '{pattern}' from {}", file.display())
                }
            },
            Self::NoMatch => f.write_str("no rule matched"),
        }
    }
}

/// A decision together with the rule that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Include or exclude
    pub decision: Decision,
    /// The rule that fired
    pub reason: Reason,
}

impl Verdict {
    const fn new(decision: Decision, reason: Reason) -> Self {
        Self { decision, reason }
    }

    /// Returns true if the path is included.
    #[must_use]
    pub fn is_included(&self) -> bool {
        self.decision == Decision::Include
    }

    /// Returns true if the path was forced in as an extra file.
    #[must_use]
    pub fn is_extra_file(&self) -> bool {
        self.reason == Reason::ExtraFile
    }
}

/// A path under evaluation.
struct Candidate<'a> {
    relative: &'a Path,
    absolute: PathBuf,
    is_dir: bool,
    extension: Option<String>,
}

impl<'a> Candidate<'a> {
    fn new(root: &Path, relative: &'a Path, is_dir: bool) -> Self {
        let extension = if is_dir {
            None
        } else {
            relative
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e.to_lowercase()))
        };

        Self {
            relative,
            absolute: root.join(relative),
            is_dir,
            extension,
        }
    }
}

/// One compiled set of gitignore-style lines with its scope.
struct PatternLayer {
    /// Absolute directory the patterns are anchored to
    scope: PathBuf,
    source: PatternSource,
    matcher: Gitignore,
}

impl PatternLayer {
    /// Compiles `lines`; returns `None` when nothing but blanks/comments remain.
    fn compile<'l>(
        scope: &Path,
        source: PatternSource,
        lines: impl IntoIterator<Item = &'l str>,
        origin: Option<&Path>,
    ) -> Result<Option<Self>> {
        let mut builder = GitignoreBuilder::new(scope);
        for line in lines {
            builder
                .add_line(origin.map(Path::to_path_buf), line)
                .map_err(|e| Error::invalid_pattern(line.trim(), pattern_error(&e, origin)))?;
        }

        let matcher = builder
            .build()
            .map_err(|e| Error::invalid_pattern("<pattern set>", e.to_string()))?;

        if matcher.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            scope: scope.to_path_buf(),
            source,
            matcher,
        }))
    }

    /// Returns `(pattern, negated)` for the last pattern matching `path`.
    fn matched(&self, path: &Path, is_dir: bool) -> Option<(&str, bool)> {
        if !path.starts_with(&self.scope) {
            return None;
        }

        match self.matcher.matched(path, is_dir) {
            Match::None => None,
            Match::Ignore(glob) => Some((glob.original(), false)),
            Match::Whitelist(glob) => Some((glob.original(), true)),
        }
    }
}

fn pattern_error(error: &ignore::Error, origin: Option<&Path>) -> String {
    match origin {
        Some(file) => format!("{error} (in {})", file.display()),
        None => error.to_string(),
    }
}

/// Last-match-wins over the layers in order.
fn last_pattern_match<'a>(
    layers: &'a [PatternLayer],
    path: &Path,
    is_dir: bool,
) -> Option<(&'a PatternLayer, &'a str, bool)> {
    layers
        .iter()
        .filter_map(|layer| {
            layer
                .matched(path, is_dir)
                .map(|(pattern, negated)| (layer, pattern, negated))
        })
        .last()
}

/// A single rule kind, evaluated in [`RuleSet`] order.
enum Rule {
    ExtraFile(BTreeSet<PathBuf>),
    ExcludeExtension(BTreeSet<String>),
    IncludeExtension(BTreeSet<String>),
    Patterns(Vec<PatternLayer>),
}

impl Rule {
    fn evaluate(&self, candidate: &Candidate<'_>) -> Option<Verdict> {
        match self {
            Self::ExtraFile(files) => (!candidate.is_dir && files.contains(candidate.relative))
                .then(|| Verdict::new(Decision::Include, Reason::ExtraFile)),
            Self::ExcludeExtension(extensions) => candidate
                .extension
                .as_ref()
                .filter(|ext| extensions.contains(*ext))
                .map(|ext| {
                    Verdict::new(Decision::Exclude, Reason::ExcludedExtension(ext.clone()))
                }),
            Self::IncludeExtension(extensions) => candidate
                .extension
                .as_ref()
                .filter(|ext| extensions.contains(*ext))
                .map(|ext| {
                    Verdict::new(Decision::Include, Reason::IncludedExtension(ext.clone()))
                }),
            Self::Patterns(layers) => {
                last_pattern_match(layers, &candidate.absolute, candidate.is_dir).map(
                    |(layer, pattern, negated)| {
                        let decision = if negated {
                            Decision::Include
                        } else {
                            Decision::Exclude
                        };
                        Verdict::new(
                            decision,
                            Reason::Pattern {
                                pattern: pattern.to_string(),
                                source: layer.source.clone(),
                                negated,
                            },
                        )
                    },
                )
            }
        }
    }
}

/// The effective rules for one run; a pure function of path to decision.
pub struct RuleSet {
    root: PathBuf,
    rules: Vec<Rule>,
    extra_files: BTreeSet<PathBuf>,
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("root", &self.root)
            .field("rules", &self.rules.len())
            .field("extra_files", &self.extra_files)
            .finish()
    }
}

impl RuleSet {
    /// Builds the rule set, compiling every pattern up front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for the first malformed pattern,
    /// whether it comes from the defaults, a discovered ignore file or the
    /// user.
    pub fn from_config(config: &Config) -> Result<Self> {
        let root = config.root_dir.clone();

        let defaults = PatternLayer::compile(
            &root,
            PatternSource::Defaults,
            config.ignore_patterns.iter().map(String::as_str),
            None,
        )?;
        let user = PatternLayer::compile(
            &root,
            PatternSource::User,
            config.extra_ignore_patterns.iter().map(String::as_str),
            None,
        )?;

        let mut layers: Vec<PatternLayer> = defaults.into_iter().collect();
        if config.respect_gitignore && !config.single_file {
            discover_ignore_files(&root, &mut layers, user.as_ref())?;
        }
        layers.extend(user);

        debug!("Compiled {} ignore pattern layer(s)", layers.len());

        let extra_files: BTreeSet<PathBuf> = config.extra_files.iter().cloned().collect();
        for file in &extra_files {
            if !root.join(file).is_file() {
                warn!("Extra file '{}' does not exist under the root", file.display());
            }
        }

        let rules = vec![
            Rule::ExtraFile(extra_files.clone()),
            Rule::ExcludeExtension(config.exclude_extensions.iter().cloned().collect()),
            Rule::IncludeExtension(config.include_extensions.iter().cloned().collect()),
            Rule::Patterns(layers),
        ];

        Ok(Self {
            root,
            rules,
            extra_files,
        })
    }

    /// Decides a path given relative to the root.
    #[must_use]
    pub fn decide(&self, relative: &Path, is_dir: bool) -> Verdict {
        let candidate = Candidate::new(&self.root, relative, is_dir);
        self.rules
            .iter()
            .find_map(|rule| rule.evaluate(&candidate))
            .unwrap_or_else(|| Verdict::new(Decision::Include, Reason::NoMatch))
    }

    /// Returns true if some extra file lives beneath `dir`, in which case an
    /// excluded directory must still be entered to reach it.
    #[must_use]
    pub fn shelters_extra_file(&self, dir: &Path) -> bool {
        self.extra_files
            .iter()
            .any(|file| file != dir && file.starts_with(dir))
    }
}

/// Walks `root` for `.gitignore` files and appends one layer per file.
///
/// A directory's ignore file is compiled as soon as the directory is
/// entered, so its patterns (and every shallower layer) already prune its
/// subdirectories. Ignore files inside pruned directories are never read.
fn discover_ignore_files(
    root: &Path,
    layers: &mut Vec<PatternLayer>,
    user: Option<&PatternLayer>,
) -> Result<()> {
    let mut failure = None;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if failure.is_some() || !entry.file_type().is_dir() {
                return false;
            }
            if entry.depth() > 0 && excludes_dir(layers.as_slice(), user, entry.path()) {
                return false;
            }
            match load_ignore_file(root, entry.path()) {
                Ok(layer) => {
                    layers.extend(layer);
                    true
                }
                Err(e) => {
                    failure = Some(e);
                    false
                }
            }
        });

    for error in walker.filter_map(|entry| entry.err()) {
        debug!("Ignore-file discovery skipped an entry: {}", error);
    }

    failure.map_or(Ok(()), Err)
}

/// User patterns are evaluated last, so they override every other layer.
fn excludes_dir(layers: &[PatternLayer], user: Option<&PatternLayer>, path: &Path) -> bool {
    let negated = user
        .and_then(|layer| layer.matched(path, true))
        .map(|(_, negated)| negated)
        .or_else(|| last_pattern_match(layers, path, true).map(|(_, _, negated)| negated));
    negated == Some(false)
}

fn load_ignore_file(root: &Path, dir: &Path) -> Result<Option<PatternLayer>> {
    let path = dir.join(IGNORE_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }

    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            return Ok(None);
        }
    };
    let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

    debug!("Loading ignore rules from {}", relative.display());
    PatternLayer::compile(
        dir,
        PatternSource::IgnoreFile(relative),
        text.lines(),
        Some(&path),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn rules_for(root: &Path, configure: impl FnOnce(crate::ConfigBuilder) -> crate::ConfigBuilder) -> RuleSet {
        let config = configure(Config::builder().root(root)).build().unwrap();
        RuleSet::from_config(&config).unwrap()
    }

    #[test]
    fn test_default_patterns() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rules = rules_for(temp.path(), |b| b);

        assert!(rules.decide(Path::new("a.py"), false).is_included());
        assert!(!rules.decide(Path::new("b.log"), false).is_included());
        assert!(!rules.decide(Path::new("node_modules"), true).is_included());
        assert!(!rules.decide(Path::new("src/__pycache__"), true).is_included());
        assert_eq!(
            rules.decide(Path::new("a.py"), false).reason,
            Reason::NoMatch
        );
    }

    #[test]
    fn test_include_extension_beats_patterns() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rules = rules_for(temp.path(), |b| {
            b.include_extensions(vec![".log".to_string()])
        });

        let verdict = rules.decide(Path::new("b.log"), false);
        assert!(verdict.is_included());
        assert_eq!(verdict.reason, Reason::IncludedExtension(".log".to_string()));
    }

    #[test]
    fn test_exclude_extension_beats_include_extension() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rules = rules_for(temp.path(), |b| {
            b.include_extensions(vec!["py".to_string()])
                .exclude_extensions(vec!["PY".to_string()])
        });

        let verdict = rules.decide(Path::new("a.py"), false);
        assert_eq!(verdict.decision, Decision::Exclude);
        assert_eq!(verdict.reason, Reason::ExcludedExtension(".py".to_string()));
    }

    #[test]
    fn test_extra_file_beats_everything() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.py").touch().unwrap();
        let rules = rules_for(temp.path(), |b| {
            b.exclude_extensions(vec![".py".to_string()])
                .add_ignore_patterns(vec!["a.py".to_string()])
                .extra_files(vec![PathBuf::from("a.py")])
        });

        assert!(rules.decide(Path::new("a.py"), false).is_extra_file());
        assert!(!rules.decide(Path::new("b.py"), false).is_included());
    }

    #[test]
    fn test_user_negation_reincludes_default_exclusion() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rules = rules_for(temp.path(), |b| {
            b.add_ignore_patterns(vec!["!keep.log".to_string()])
        });

        let verdict = rules.decide(Path::new("keep.log"), false);
        assert!(verdict.is_included());
        assert!(matches!(
            verdict.reason,
            Reason::Pattern {
                source: PatternSource::User,
                negated: true,
                ..
            }
        ));
        assert!(!rules.decide(Path::new("other.log"), false).is_included());
    }

    #[test]
    fn test_directory_only_pattern() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rules = rules_for(temp.path(), |b| {
            b.add_ignore_patterns(vec!["docs/".to_string()])
        });

        assert!(!rules.decide(Path::new("docs"), true).is_included());
        assert!(rules.decide(Path::new("docs"), false).is_included());
    }

    #[test]
    fn test_malformed_pattern_fails_at_construction() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .root(temp.path())
            .add_ignore_patterns(vec!["src/[z-a]".to_string()])
            .build()
            .unwrap();

        let err = RuleSet::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_unclosed_class_is_literal() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rules = rules_for(temp.path(), |b| {
            b.add_ignore_patterns(vec!["src/[".to_string()])
        });

        assert!(!rules.decide(Path::new("src/["), false).is_included());
        assert!(rules.decide(Path::new("src/a"), false).is_included());
    }

    #[test]
    fn test_discovered_gitignore_with_negation() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("*.txt\n!keep.txt\n").unwrap();

        let rules = rules_for(temp.path(), |b| b);
        assert!(!rules.decide(Path::new("notes.txt"), false).is_included());
        assert!(rules.decide(Path::new("keep.txt"), false).is_included());
    }

    #[test]
    fn test_nested_gitignore_is_scoped() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("sub/.gitignore").write_str("*.md\n").unwrap();

        let rules = rules_for(temp.path(), |b| b);
        assert!(!rules.decide(Path::new("sub/readme.md"), false).is_included());
        assert!(rules.decide(Path::new("readme.md"), false).is_included());
    }

    #[test]
    fn test_deeper_gitignore_overrides_shallower() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("*.cfg\n").unwrap();
        temp.child("sub/.gitignore").write_str("!local.cfg\n").unwrap();

        let rules = rules_for(temp.path(), |b| b);
        assert!(rules.decide(Path::new("sub/local.cfg"), false).is_included());
        assert!(!rules.decide(Path::new("local.cfg"), false).is_included());
    }

    #[test]
    fn test_gitignore_discovery_can_be_disabled() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("*.txt\n").unwrap();

        let rules = rules_for(temp.path(), |b| b.respect_gitignore(false));
        assert!(rules.decide(Path::new("notes.txt"), false).is_included());
    }

    #[test]
    fn test_gitignore_under_excluded_directory_is_not_loaded() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("node_modules/.gitignore").write_str("[z-a]\n").unwrap();

        // the malformed file would fail construction if it were read
        let config = Config::builder().root(temp.path()).build().unwrap();
        assert!(RuleSet::from_config(&config).is_ok());
    }

    #[test]
    fn test_gitignore_under_gitignored_directory_is_not_loaded() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("vendor/\n").unwrap();
        temp.child("vendor/.gitignore").write_str("[z-a]\n").unwrap();
        temp.child("vendor/lib/.gitignore").write_str("[z-a]\n").unwrap();
        temp.child("src/.gitignore").write_str("*.gen\n").unwrap();

        let rules = rules_for(temp.path(), |b| b);
        assert!(!rules.decide(Path::new("vendor"), true).is_included());
        assert!(!rules.decide(Path::new("src/a.gen"), false).is_included());
    }

    #[test]
    fn test_malformed_gitignore_in_walked_directory_fails() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/.gitignore").write_str("ok.txt\n[z-a]\n").unwrap();

        let config = Config::builder().root(temp.path()).build().unwrap();
        let err = RuleSet::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { pattern, .. } if pattern == "[z-a]"));
    }

    #[test]
    fn test_shelters_extra_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rules = rules_for(temp.path(), |b| {
            b.extra_files(vec![PathBuf::from("build/gen/keep.rs")])
        });

        assert!(rules.shelters_extra_file(Path::new("build")));
        assert!(rules.shelters_extra_file(Path::new("build/gen")));
        assert!(!rules.shelters_extra_file(Path::new("dist")));
        assert!(!rules.shelters_extra_file(Path::new("build/gen/keep.rs")));
    }
}
