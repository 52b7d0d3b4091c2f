use anyhow::Context;
use clap::Parser;
use codetomd::{ClipboardMode, Config, Pipeline, RcFile, SystemClipboard};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "codetomd",
    version,
    author,
    about = "Collect a project's source files into one Markdown document",
    long_about = "Collect a project's source files into one annotated Markdown document.\n\n\
    The tool walks a directory (or reads a single file), applies ignore rules, renders a \
    directory tree and appends every included file as a fenced code block. The result is \
    copied to the clipboard unless an output file is given.\n\n\
    USAGE EXAMPLES:\n  \
      # Copy the current project to the clipboard\n  \
      codetomd\n\n  \
      # Write to a file instead\n  \
      codetomd ./my-project -o context.md\n\n  \
      # Include log files, drop Python files but keep one of them\n  \
      codetomd --include-ext .log --exclude-ext .py --extra-file tools/run.py\n\n  \
      # Print to stdout without the tree\n  \
      codetomd src --stdout --no-clip --no-tree"
)]
struct Cli {
    /// Directory or single file to process
    #[arg(default_value = ".", value_name = "PATH")]
    path: PathBuf,

    /// Write the document to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Copy to the clipboard even when writing a file
    #[arg(long, overrides_with = "no_clip")]
    clip: bool,

    /// Never copy to the clipboard
    #[arg(long, overrides_with = "clip")]
    no_clip: bool,

    /// Also print the document to stdout
    #[arg(long)]
    stdout: bool,

    /// Include the directory tree (default)
    #[arg(long, overrides_with = "no_tree")]
    show_tree: bool,

    /// Omit the directory tree
    #[arg(long, overrides_with = "show_tree")]
    no_tree: bool,

    /// Extensions to include even if an ignore pattern matches (e.g. .log)
    #[arg(long, value_name = "EXT", num_args = 1.., value_delimiter = ',', action = clap::ArgAction::Append)]
    include_ext: Vec<String>,

    /// Extensions to always exclude (e.g. .py)
    #[arg(long, value_name = "EXT", num_args = 1.., value_delimiter = ',', action = clap::ArgAction::Append)]
    exclude_ext: Vec<String>,

    /// Additional gitignore-style patterns, evaluated after all others
    #[arg(long, value_name = "PATTERN", num_args = 1.., action = clap::ArgAction::Append)]
    ignore_pattern: Vec<String>,

    /// Files to include regardless of any other rule (relative to the root)
    #[arg(long, value_name = "PATH", num_args = 1.., action = clap::ArgAction::Append)]
    extra_file: Vec<PathBuf>,

    /// Skip files larger than this many bytes (0 = unlimited)
    #[arg(long, value_name = "BYTES")]
    max_size: Option<u64>,

    /// Do not read .gitignore files under the root
    #[arg(long)]
    no_gitignore: bool,

    /// Drop the built-in ignore table
    #[arg(long)]
    no_default_ignores: bool,

    /// Do not read .codetomdrc.yaml files
    #[arg(long)]
    no_config: bool,

    /// Path to a custom Tera template replacing the built-in one
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    show_config: bool,

    /// Do not print the run summary
    #[arg(short, long)]
    quiet: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn clipboard_mode(&self) -> Option<ClipboardMode> {
        if self.no_clip {
            Some(ClipboardMode::Never)
        } else if self.clip {
            Some(ClipboardMode::Always)
        } else {
            None
        }
    }

    fn show_tree(&self) -> Option<bool> {
        if self.no_tree {
            Some(false)
        } else if self.show_tree {
            Some(true)
        } else {
            None
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let config = build_config(&cli).context("Failed to build configuration")?;

    if cli.show_config {
        let json = config
            .to_json()
            .context("Failed to serialize configuration")?;
        println!("{json}");
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run(&mut SystemClipboard::new(), &mut handle)
        .context("Pipeline execution failed")?;

    if !cli.quiet {
        stats.print_summary();
    }

    Ok(())
}

/// Layers rc files under the command-line flags.
fn build_config(cli: &Cli) -> codetomd::Result<Config> {
    let mut builder = Config::builder().root(&cli.path);

    if !cli.no_config {
        builder = RcFile::discover(&cli.path).apply(builder);
    }

    if cli.no_default_ignores {
        builder = builder.ignore_patterns(Vec::new());
    }
    builder = builder.add_ignore_patterns(cli.ignore_pattern.iter().cloned());

    if cli.no_gitignore {
        builder = builder.respect_gitignore(false);
    }
    if !cli.include_ext.is_empty() {
        builder = builder.include_extensions(cli.include_ext.clone());
    }
    if !cli.exclude_ext.is_empty() {
        builder = builder.exclude_extensions(cli.exclude_ext.clone());
    }
    if !cli.extra_file.is_empty() {
        builder = builder.extra_files(cli.extra_file.clone());
    }
    if let Some(bytes) = cli.max_size {
        builder = builder.max_file_size((bytes > 0).then_some(bytes));
    }
    if let Some(enabled) = cli.show_tree() {
        builder = builder.show_tree(enabled);
    }
    if let Some(output) = &cli.output {
        builder = builder.output(output);
    }
    if let Some(mode) = cli.clipboard_mode() {
        builder = builder.clipboard(mode);
    }
    if let Some(template) = &cli.template {
        builder = builder.template_path(template);
    }

    builder.stdout(cli.stdout).build()
}

fn setup_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "codetomd=info",
        1 => "codetomd=debug",
        _ => "codetomd=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("codetomd").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.clipboard_mode(), None);
        assert_eq!(cli.show_tree(), None);
    }

    #[test]
    fn test_cli_list_arguments() {
        let cli = parse(&[
            "proj",
            "--include-ext",
            ".log",
            "md",
            "--exclude-ext",
            ".py,.js",
            "--extra-file",
            "a.py",
        ]);
        assert_eq!(cli.include_ext, vec![".log", "md"]);
        assert_eq!(cli.exclude_ext, vec![".py", ".js"]);
        assert_eq!(cli.extra_file, vec![PathBuf::from("a.py")]);
    }

    #[test]
    fn test_cli_last_toggle_wins() {
        let cli = parse(&["--clip", "--no-clip", "--no-tree", "--show-tree"]);
        assert_eq!(cli.clipboard_mode(), Some(ClipboardMode::Never));
        assert_eq!(cli.show_tree(), Some(true));
    }

    #[test]
    fn test_build_config_layers_rc_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(codetomd::RC_FILENAME)
            .write_str("include_tree: false\nexclude_extensions: [.md]\nignore_patterns: [docs/]\n")
            .unwrap();
        let root = temp.path().to_str().unwrap();

        let config = build_config(&parse(&[root, "--ignore-pattern", "*.tmp"])).unwrap();
        assert!(!config.show_tree);
        assert_eq!(config.exclude_extensions, vec![".md"]);
        assert_eq!(config.ignore_patterns, vec!["docs/"]);
        assert_eq!(config.extra_ignore_patterns, vec!["*.tmp"]);

        let config = build_config(&parse(&[root, "--show-tree", "--exclude-ext", "rs"])).unwrap();
        assert!(config.show_tree);
        assert_eq!(config.exclude_extensions, vec![".rs"]);

        let config = build_config(&parse(&[root, "--no-config"])).unwrap();
        assert!(config.show_tree);
        assert!(config.exclude_extensions.is_empty());
    }
}
