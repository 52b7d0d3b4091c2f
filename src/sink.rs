use crate::{
    config::{ClipboardMode, Config},
    error::{Error, Result, Warning},
};
use std::{
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Something that can hold a copy of the document.
///
/// The system clipboard is host-dependent, so the pipeline takes it through
/// this trait.
pub trait ClipboardProvider {
    /// Replaces the clipboard contents with `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Clipboard`] when no clipboard can be reached.
    fn copy_text(&mut self, text: &str) -> Result<()>;
}

/// The host clipboard via `arboard`, opened on first use.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    /// Creates a handle; no connection is made until the first copy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardProvider for SystemClipboard {
    fn copy_text(&mut self, text: &str) -> Result<()> {
        let clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => {
                debug!("Initializing clipboard");
                arboard::Clipboard::new().map_err(|e| Error::clipboard(e.to_string()))?
            }
        };
        let clipboard = self.inner.insert(clipboard);

        clipboard
            .set_text(text.to_owned())
            .map_err(|e| Error::clipboard(e.to_string()))
    }
}

/// A destination the document was delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// The output file
    File,
    /// The clipboard
    Clipboard,
    /// Standard output
    Stdout,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Clipboard => "clipboard",
            Self::Stdout => "stdout",
        })
    }
}

/// Result of delivering the document.
#[derive(Debug, Default)]
pub struct Delivery {
    /// Sinks that received the document, in delivery order
    pub delivered: Vec<SinkKind>,
    /// Non-fatal sink failures
    pub warnings: Vec<Warning>,
}

/// Which sinks a run writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkPlan {
    /// Output file, if requested
    pub file: Option<PathBuf>,
    /// Copy to the clipboard
    pub clipboard: bool,
    /// Print to stdout
    pub stdout: bool,
}

impl SinkPlan {
    /// Resolves the sink settings.
    ///
    /// The clipboard is on in `auto` mode only when no output file is given;
    /// stdout is used when asked for or when nothing else is active.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let file = config.output.clone();
        let clipboard = match config.clipboard {
            ClipboardMode::Always => true,
            ClipboardMode::Never => false,
            ClipboardMode::Auto => file.is_none(),
        };
        let stdout = config.stdout || (file.is_none() && !clipboard);

        Self {
            file,
            clipboard,
            stdout,
        }
    }

    /// Writes `document` to every planned sink.
    ///
    /// The file is written first and its failure is fatal. A clipboard
    /// failure is a warning; if the clipboard was the only sink the document
    /// goes to stdout instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file or stdout cannot be written.
    pub fn deliver(
        &self,
        document: &str,
        clipboard: &mut dyn ClipboardProvider,
        stdout: &mut dyn Write,
    ) -> Result<Delivery> {
        let mut delivery = Delivery::default();
        let mut use_stdout = self.stdout;

        if let Some(path) = &self.file {
            write_file_atomic(path, document)?;
            info!("Wrote {} bytes to {}", document.len(), path.display());
            delivery.delivered.push(SinkKind::File);
        }

        if self.clipboard {
            match clipboard.copy_text(document) {
                Ok(()) => {
                    info!("Copied document to clipboard");
                    delivery.delivered.push(SinkKind::Clipboard);
                }
                Err(e) => {
                    let warning = Warning::Clipboard {
                        message: e.to_string(),
                    };
                    warn!("{}", warning);
                    delivery.warnings.push(warning);

                    if self.file.is_none() && !use_stdout {
                        info!("Falling back to stdout");
                        use_stdout = true;
                    }
                }
            }
        }

        if use_stdout {
            stdout
                .write_all(document.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| Error::io("<stdout>", e))?;
            delivery.delivered.push(SinkKind::Stdout);
        }

        Ok(delivery)
    }
}

/// Writes a file atomically.
///
/// # Process
///
/// 1. Creates the parent directory if needed
/// 2. Writes content to a temporary sibling file
/// 3. Syncs the temporary file to disk
/// 4. Renames the temporary file to the target path
fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::config(format!("Invalid output path: {}", path.display())))?;
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    drop(temp_file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(path, e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[derive(Default)]
    struct MemoryClipboard {
        contents: Option<String>,
    }

    impl ClipboardProvider for MemoryClipboard {
        fn copy_text(&mut self, text: &str) -> Result<()> {
            self.contents = Some(text.to_string());
            Ok(())
        }
    }

    struct NoClipboard;

    impl ClipboardProvider for NoClipboard {
        fn copy_text(&mut self, _text: &str) -> Result<()> {
            Err(Error::clipboard("no display"))
        }
    }

    fn plan_for(configure: impl FnOnce(crate::ConfigBuilder) -> crate::ConfigBuilder) -> SinkPlan {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = configure(Config::builder().root(temp.path())).build().unwrap();
        SinkPlan::from_config(&config)
    }

    #[test]
    fn test_default_plan_uses_clipboard() {
        let plan = plan_for(|b| b);
        assert!(plan.clipboard);
        assert!(!plan.stdout);
        assert_eq!(plan.file, None);
    }

    #[test]
    fn test_output_file_turns_clipboard_off() {
        let plan = plan_for(|b| b.output("out.md"));
        assert!(!plan.clipboard);
        assert!(!plan.stdout);

        let plan = plan_for(|b| b.output("out.md").clipboard(ClipboardMode::Always));
        assert!(plan.clipboard);
    }

    #[test]
    fn test_no_sink_falls_back_to_stdout() {
        let plan = plan_for(|b| b.clipboard(ClipboardMode::Never));
        assert!(plan.stdout);
    }

    #[test]
    fn test_deliver_to_clipboard() {
        let plan = SinkPlan {
            file: None,
            clipboard: true,
            stdout: false,
        };
        let mut clipboard = MemoryClipboard::default();
        let mut stdout = Vec::new();

        let delivery = plan.deliver("doc\n", &mut clipboard, &mut stdout).unwrap();

        assert_eq!(delivery.delivered, vec![SinkKind::Clipboard]);
        assert_eq!(clipboard.contents.as_deref(), Some("doc\n"));
        assert!(stdout.is_empty());
    }

    #[test]
    fn test_clipboard_failure_falls_back_to_stdout() {
        let plan = SinkPlan {
            file: None,
            clipboard: true,
            stdout: false,
        };
        let mut stdout = Vec::new();

        let delivery = plan.deliver("doc\n", &mut NoClipboard, &mut stdout).unwrap();

        assert_eq!(delivery.delivered, vec![SinkKind::Stdout]);
        assert_eq!(delivery.warnings.len(), 1);
        assert_eq!(stdout, b"doc\n");
    }

    #[test]
    fn test_clipboard_failure_with_file_is_only_a_warning() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("out/context.md");
        let plan = SinkPlan {
            file: Some(output.path().to_path_buf()),
            clipboard: true,
            stdout: false,
        };
        let mut stdout = Vec::new();

        let delivery = plan.deliver("doc\n", &mut NoClipboard, &mut stdout).unwrap();

        assert_eq!(delivery.delivered, vec![SinkKind::File]);
        assert_eq!(delivery.warnings.len(), 1);
        assert!(stdout.is_empty());
        output.assert("doc\n");
        assert!(!temp.child("out/.context.md.tmp").path().exists());
    }

    #[test]
    fn test_unwritable_output_is_fatal() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("blocker").write_str("not a dir").unwrap();
        let plan = SinkPlan {
            file: Some(temp.path().join("blocker/context.md")),
            clipboard: false,
            stdout: false,
        };

        let result = plan.deliver("doc\n", &mut MemoryClipboard::default(), &mut Vec::new());
        assert!(result.unwrap_err().is_io());
    }
}
