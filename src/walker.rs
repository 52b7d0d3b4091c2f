use crate::{
    config::Config,
    error::{Error, Result, Warning},
    rules::RuleSet,
};
use std::cmp::Ordering;
use std::ffi::OsString;
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Kind of a node in the walked tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Directory with its included children, in walk order
    Directory(Vec<TreeNode>),
    /// Regular file (or a symlink to one)
    File,
}

/// One included entry of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// File name as displayed
    pub name: String,
    /// Path relative to the root
    pub relative_path: PathBuf,
    /// File or directory
    pub kind: NodeKind,
}

impl TreeNode {
    fn file(name: String, relative_path: PathBuf) -> Self {
        Self {
            name,
            relative_path,
            kind: NodeKind::File,
        }
    }

    /// Returns true if this node is a directory.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }
}

/// An included file, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the root
    pub relative_path: PathBuf,
    /// Path on disk
    pub absolute_path: PathBuf,
}

/// Ordered result of a walk.
#[derive(Debug, Clone)]
pub struct Listing {
    /// Root directory
    pub root: PathBuf,
    /// Display name of the root directory
    pub root_name: String,
    /// True when the input was a single file
    pub single_file: bool,
    /// Top-level included entries
    pub entries: Vec<TreeNode>,
    /// Excluded files plus pruned directories
    pub skipped: usize,
    /// Non-fatal problems met while walking
    pub warnings: Vec<Warning>,
}

impl Listing {
    /// Included files in depth-first order, the same order the tree shows.
    #[must_use]
    pub fn files(&self) -> Vec<FileEntry> {
        fn collect(root: &Path, nodes: &[TreeNode], out: &mut Vec<FileEntry>) {
            for node in nodes {
                match &node.kind {
                    NodeKind::Directory(children) => collect(root, children, out),
                    NodeKind::File => out.push(FileEntry {
                        relative_path: node.relative_path.clone(),
                        absolute_path: root.join(&node.relative_path),
                    }),
                }
            }
        }

        let mut files = Vec::new();
        collect(&self.root, &self.entries, &mut files);
        files
    }
}

/// What a directory entry turned out to be.
enum EntryKind {
    Directory,
    File { size: u64 },
    LinkedDirectory,
    Other,
}

/// A readable directory entry, ready for sorting.
struct Child {
    /// Name on disk; joined into paths
    file_name: OsString,
    /// Lossy name for display and ordering
    name: String,
    kind: EntryKind,
}

impl Child {
    const fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    /// Directories first, then case-insensitive name, then exact name.
    fn walk_order(a: &Self, b: &Self) -> Ordering {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    }
}

#[derive(Default)]
struct WalkState {
    skipped: usize,
    warnings: Vec<Warning>,
}

impl WalkState {
    fn warn(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Depth-first directory walker driven by a [`RuleSet`].
pub struct Walker<'a> {
    rules: &'a RuleSet,
    root: PathBuf,
    input: PathBuf,
    single_file: bool,
    max_file_size: Option<u64>,
    artifact: Option<PathBuf>,
}

impl<'a> Walker<'a> {
    /// Creates a walker for the configured input.
    #[must_use]
    pub fn new(config: &Config, rules: &'a RuleSet) -> Self {
        Self {
            rules,
            root: config.root_dir.clone(),
            input: config.input.clone(),
            single_file: config.single_file,
            max_file_size: config.max_file_size,
            artifact: None,
        }
    }

    /// Never lists `path`; used for the output file so re-runs do not
    /// embed the previous document.
    #[must_use]
    pub fn skip_artifact(mut self, path: Option<PathBuf>) -> Self {
        self.artifact = path;
        self
    }

    /// Walks the input and returns the ordered listing.
    ///
    /// # Errors
    ///
    /// Returns an error only if the root directory itself cannot be read.
    /// Unreadable subdirectories become [`Warning::Traversal`].
    pub fn walk(&self) -> Result<Listing> {
        let root_name = self
            .root
            .file_name()
            .map_or_else(|| self.root.display().to_string(), |n| n.to_string_lossy().into_owned());

        let mut state = WalkState::default();

        let entries = if self.single_file {
            self.single_file_entry()
        } else {
            let reader = fs::read_dir(&self.root).map_err(|e| Error::io(&self.root, e))?;
            self.walk_entries(Path::new(""), reader, false, &mut state)
        };

        debug!(
            "Walk complete: {} top-level entries, {} skipped, {} warnings",
            entries.len(),
            state.skipped,
            state.warnings.len()
        );

        Ok(Listing {
            root: self.root.clone(),
            root_name,
            single_file: self.single_file,
            entries,
            skipped: state.skipped,
            warnings: state.warnings,
        })
    }

    /// A single-file input is listed unconditionally.
    fn single_file_entry(&self) -> Vec<TreeNode> {
        self.input
            .file_name()
            .map(|name| TreeNode::file(name.to_string_lossy().into_owned(), PathBuf::from(name)))
            .into_iter()
            .collect()
    }

    fn walk_dir(&self, dir: &Path, sheltered: bool, state: &mut WalkState) -> Vec<TreeNode> {
        let absolute = self.root.join(dir);
        match fs::read_dir(&absolute) {
            Ok(reader) => self.walk_entries(dir, reader, sheltered, state),
            Err(e) => {
                state.warn(Warning::traversal(dir, e.to_string()));
                Vec::new()
            }
        }
    }

    /// Visits one directory's entries. In sheltered mode the directory was
    /// excluded and is only entered to reach extra files.
    fn walk_entries(
        &self,
        dir: &Path,
        reader: fs::ReadDir,
        sheltered: bool,
        state: &mut WalkState,
    ) -> Vec<TreeNode> {
        let mut children: Vec<Child> = reader
            .filter_map(|entry| match entry {
                Ok(entry) => self.classify(dir, &entry, state),
                Err(e) => {
                    state.warn(Warning::traversal(dir, e.to_string()));
                    None
                }
            })
            .collect();
        children.sort_by(Child::walk_order);

        let mut nodes = Vec::with_capacity(children.len());
        for child in children {
            let relative = dir.join(&child.file_name);
            match child.kind {
                EntryKind::Directory => {
                    if let Some(node) = self.visit_dir(child.name, relative, sheltered, state) {
                        nodes.push(node);
                    }
                }
                EntryKind::File { size } => {
                    if self.admit_file(&relative, size, sheltered, state) {
                        nodes.push(TreeNode::file(child.name, relative));
                    }
                }
                EntryKind::LinkedDirectory => {
                    if let Some(node) = self.visit_linked_dir(child.name, relative, sheltered, state)
                    {
                        nodes.push(node);
                    }
                }
                EntryKind::Other => {
                    trace!("Ignoring special file {}", relative.display());
                }
            }
        }
        nodes
    }

    fn visit_dir(
        &self,
        name: String,
        relative: PathBuf,
        sheltered: bool,
        state: &mut WalkState,
    ) -> Option<TreeNode> {
        let shelters = self.rules.shelters_extra_file(&relative);
        let children = if sheltered {
            if !shelters {
                state.skipped += 1;
                return None;
            }
            self.walk_dir(&relative, true, state)
        } else {
            let verdict = self.rules.decide(&relative, true);
            if verdict.is_included() {
                trace!("Descending into {}", relative.display());
                self.walk_dir(&relative, false, state)
            } else if shelters {
                debug!(
                    "Entering excluded {} ({}) for extra files",
                    relative.display(),
                    verdict.reason
                );
                self.walk_dir(&relative, true, state)
            } else {
                debug!("Pruned {}: {}", relative.display(), verdict.reason);
                state.skipped += 1;
                return None;
            }
        };

        if children.is_empty() {
            trace!("Omitting empty directory {}", relative.display());
            return None;
        }

        Some(TreeNode {
            name,
            relative_path: relative,
            kind: NodeKind::Directory(children),
        })
    }

    /// Symlinked directories are only entered, sheltered, to reach extra
    /// files listed through them. Extra-file paths are finite, so no link
    /// cycle can be followed forever.
    fn visit_linked_dir(
        &self,
        name: String,
        relative: PathBuf,
        sheltered: bool,
        state: &mut WalkState,
    ) -> Option<TreeNode> {
        if self.rules.shelters_extra_file(&relative) {
            debug!("Entering symlinked {} for extra files", relative.display());
            return self.visit_dir(name, relative, true, state);
        }

        state.skipped += 1;
        if sheltered || !self.rules.decide(&relative, true).is_included() {
            debug!("Not following symlinked directory {}", relative.display());
        } else {
            state.warn(Warning::traversal(
                relative,
                "symbolic link to a directory not followed",
            ));
        }
        None
    }

    fn admit_file(&self, relative: &Path, size: u64, sheltered: bool, state: &mut WalkState) -> bool {
        let verdict = self.rules.decide(relative, false);

        if !verdict.is_included() || (sheltered && !verdict.is_extra_file()) {
            debug!("Excluded {}: {}", relative.display(), verdict.reason);
            state.skipped += 1;
            return false;
        }

        if self
            .artifact
            .as_deref()
            .is_some_and(|artifact| artifact == self.root.join(relative))
        {
            debug!("Skipping output file {}", relative.display());
            return false;
        }

        if let Some(limit) = self.max_file_size {
            if size > limit && !verdict.is_extra_file() {
                debug!(
                    "Excluded {}: {} bytes exceeds the {} byte limit",
                    relative.display(),
                    size,
                    limit
                );
                state.skipped += 1;
                return false;
            }
        }

        trace!("Included {}: {}", relative.display(), verdict.reason);
        true
    }

    fn classify(&self, dir: &Path, entry: &DirEntry, state: &mut WalkState) -> Option<Child> {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy().into_owned();
        let relative = dir.join(&file_name);

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                state.warn(Warning::traversal(relative, e.to_string()));
                return None;
            }
        };

        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            let size = entry.metadata().map_or(0, |m| m.len());
            EntryKind::File { size }
        } else if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(target) if target.is_dir() => EntryKind::LinkedDirectory,
                Ok(target) if target.is_file() => EntryKind::File { size: target.len() },
                Ok(_) => EntryKind::Other,
                Err(e) => {
                    state.warn(Warning::traversal(
                        relative,
                        format!("dangling symbolic link: {e}"),
                    ));
                    return None;
                }
            }
        } else {
            EntryKind::Other
        };

        Some(Child {
            file_name,
            name,
            kind,
        })
    }
}
