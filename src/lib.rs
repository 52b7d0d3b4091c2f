//! # codetomd
//!
//! Collects a project's source files into one annotated Markdown document,
//! ready to paste into an LLM conversation.
//!
//! ## Features
//!
//! - Built-in ignore table plus `.gitignore` discovery
//! - Extension include/exclude lists and force-included extra files
//! - Unicode directory tree that doubles as a table of contents
//! - Fenced code blocks with language tags and collision-free fences
//! - Output to a file, the clipboard and/or stdout
//!
//! ## Quick Start
//!
//! ```no_run
//! use codetomd::{Config, Pipeline, SystemClipboard};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .root("./my-project")
//!     .include_extensions(vec![".log".to_string()])
//!     .output("context.md")
//!     .build()?;
//!
//! Pipeline::new(config)?.run(&mut SystemClipboard::new(), &mut std::io::stdout())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Rules**: Compiles every include/exclude rule into a [`RuleSet`]
//! 2. **Walker**: Depth-first traversal producing an ordered [`Listing`]
//! 3. **Template**: Renders the tree and file sections with Tera
//! 4. **Sink**: Delivers the document to file, clipboard and stdout

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod file;
mod language;
mod pipeline;
mod rcfile;
mod rules;
mod sink;
mod template;
mod tree;
mod walker;

pub use config::{
    normalize_extension, ClipboardMode, Config, ConfigBuilder, DEFAULT_IGNORE_PATTERNS,
    DEFAULT_MAX_FILE_SIZE,
};
pub use error::{Error, Result, Warning};
pub use file::{fence_for, FileContent, FileData};
pub use language::language_for;
pub use pipeline::{Document, Pipeline, PipelineStats};
pub use rcfile::{RcFile, RC_FILENAME};
pub use rules::{Decision, PatternSource, Reason, RuleSet, Verdict, IGNORE_FILE_NAME};
pub use sink::{ClipboardProvider, Delivery, SinkKind, SinkPlan, SystemClipboard};
pub use template::{TemplateEngine, SINGLE_FILE_NOTICE, TREE_SKIPPED_NOTICE};
pub use tree::render_tree;
pub use walker::{FileEntry, Listing, NodeKind, TreeNode, Walker};

/// Runs the complete pipeline against the system clipboard and stdout.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid or a pattern is malformed
/// - The root directory cannot be read
/// - The output file cannot be written
///
/// # Examples
///
/// ```no_run
/// use codetomd::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .root(".")
///     .build()?;
///
/// run(config)?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    let mut clipboard = SystemClipboard::new();
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    Pipeline::new(config)?.run(&mut clipboard, &mut handle)
}
