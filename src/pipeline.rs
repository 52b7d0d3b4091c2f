use crate::{
    config::Config,
    error::{Result, Warning},
    file::FileData,
    rules::RuleSet,
    sink::{ClipboardProvider, SinkKind, SinkPlan},
    template::TemplateEngine,
    walker::Walker,
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// The rendered document and what went into it.
#[derive(Debug, Clone)]
pub struct Document {
    /// Full Markdown text, ending with a single newline
    pub text: String,

    /// Included files, relative to the root, in document order
    pub files: Vec<String>,

    /// Excluded files plus pruned directories
    pub skipped: usize,

    /// Files rendered as placeholders
    pub placeholders: usize,

    /// Bytes of embedded file content
    pub content_bytes: u64,

    /// Traversal and render warnings
    pub warnings: Vec<Warning>,
}

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Number of files in the document
    pub included_files: usize,

    /// Excluded files plus pruned directories
    pub skipped_entries: usize,

    /// Files rendered as placeholders
    pub placeholder_files: usize,

    /// Bytes of embedded file content
    pub content_bytes: u64,

    /// Size of the document in bytes
    pub document_bytes: usize,

    /// Sinks that received the document
    pub sinks: Vec<String>,

    /// All warnings of the run
    pub warnings: Vec<String>,

    /// Total execution time
    pub duration: Duration,
}

impl PipelineStats {
    /// Prints a human-readable summary to stderr.
    pub fn print_summary(&self) {
        eprintln!("\n╔═══════════════════════════════════════════════════════╗");
        eprintln!("║                   Run Summary                         ║");
        eprintln!("╠═══════════════════════════════════════════════════════╣");
        eprintln!(
            "║ Files Included:       {:>8}                        ║",
            self.included_files
        );
        eprintln!(
            "║   - Placeholders:     {:>8}                        ║",
            self.placeholder_files
        );
        eprintln!(
            "║ Entries Skipped:      {:>8}                        ║",
            self.skipped_entries
        );
        eprintln!(
            "║ Content Size:         {:>8} bytes                  ║",
            self.content_bytes
        );
        eprintln!(
            "║ Document Size:        {:>8} bytes                  ║",
            self.document_bytes
        );
        eprintln!(
            "║ Delivered To:         {:<32}║",
            if self.sinks.is_empty() {
                "-".to_string()
            } else {
                self.sinks.join(", ")
            }
        );
        eprintln!(
            "║ Total Time:           {:>8.2}s                       ║",
            self.duration.as_secs_f64()
        );
        eprintln!("╚═══════════════════════════════════════════════════════╝");

        if !self.warnings.is_empty() {
            eprintln!("Warnings ({}):", self.warnings.len());
            for warning in &self.warnings {
                eprintln!("  - {warning}");
            }
        }
        eprintln!();
    }
}

/// Main pipeline: rules, walk, render, deliver.
pub struct Pipeline {
    config: Config,
    rules: RuleSet,
    template_engine: TemplateEngine,
    sinks: SinkPlan,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// Every pattern and the document template are compiled here, so
    /// configuration errors surface before anything is traversed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - An ignore pattern is malformed
    /// - The custom template cannot be loaded
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let rules = RuleSet::from_config(&config)?;
        let template_engine = TemplateEngine::new(&config)?;
        let sinks = SinkPlan::from_config(&config);

        Ok(Self {
            config,
            rules,
            template_engine,
            sinks,
        })
    }

    /// The sinks this pipeline will deliver to.
    #[must_use]
    pub const fn sinks(&self) -> &SinkPlan {
        &self.sinks
    }

    /// Walks the input and renders the document without delivering it.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be read or rendering fails.
    #[instrument(skip(self), fields(root = %self.config.root_dir.display()))]
    pub fn render(&self) -> Result<Document> {
        info!("Walking {}", self.config.input.display());
        let listing = Walker::new(&self.config, &self.rules)
            .skip_artifact(self.artifact_path())
            .walk()?;

        let files: Vec<FileData> = listing.files().iter().map(FileData::load).collect();

        let mut warnings = listing.warnings.clone();
        for warning in files.iter().filter_map(FileData::warning) {
            warn!("{}", warning);
            warnings.push(warning);
        }

        info!("Rendering {} files", files.len());
        let text = self.template_engine.render(&self.config, &listing, &files)?;

        Ok(Document {
            text,
            files: files.iter().map(|f| f.relative_path.clone()).collect(),
            skipped: listing.skipped,
            placeholders: files.iter().filter(|f| !f.is_text()).count(),
            content_bytes: files
                .iter()
                .filter(|f| f.is_text())
                .map(FileData::size_bytes)
                .sum(),
            warnings,
        })
    }

    /// Renders the document and writes it to the planned sinks.
    ///
    /// # Errors
    ///
    /// Returns an error if any stage fails critically; clipboard failures
    /// are only recorded as warnings.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use codetomd::{Config, Pipeline, SystemClipboard};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .root("./src")
    ///     .output("context.md")
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?
    ///     .run(&mut SystemClipboard::new(), &mut std::io::stdout())?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    pub fn run(
        self,
        clipboard: &mut dyn ClipboardProvider,
        stdout: &mut dyn Write,
    ) -> Result<PipelineStats> {
        let start_time = Instant::now();

        let document = self.render()?;
        let delivery = self.sinks.deliver(&document.text, clipboard, stdout)?;

        let mut warnings = document.warnings;
        warnings.extend(delivery.warnings);

        let stats = PipelineStats {
            included_files: document.files.len(),
            skipped_entries: document.skipped,
            placeholder_files: document.placeholders,
            content_bytes: document.content_bytes,
            document_bytes: document.text.len(),
            sinks: delivery
                .delivered
                .iter()
                .map(SinkKind::to_string)
                .collect(),
            warnings: warnings.iter().map(ToString::to_string).collect(),
            duration: start_time.elapsed(),
        };

        info!(
            "✓ Included {} files ({} skipped, {} warnings) in {:.2}s",
            stats.included_files,
            stats.skipped_entries,
            stats.warnings.len(),
            stats.duration.as_secs_f64()
        );

        Ok(stats)
    }

    /// Absolute path of the output file, as the walker would see it.
    fn artifact_path(&self) -> Option<PathBuf> {
        let output = self.config.output.as_ref()?;
        let absolute = if output.is_absolute() {
            output.clone()
        } else {
            std::env::current_dir().ok()?.join(output)
        };
        let name = absolute.file_name()?;
        let parent = absolute.parent()?.canonicalize().ok()?;
        Some(parent.join(name))
    }
}
