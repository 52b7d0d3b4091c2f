use crate::config::slash_path;
use crate::error::Warning;
use crate::language::language_for;
use crate::walker::FileEntry;
use std::fs;
use std::path::PathBuf;
use tracing::trace;

/// Number of leading bytes inspected for null bytes.
const SNIFF_LEN: usize = 8192;

/// Represents a file with its content and metadata.
#[derive(Debug, Clone)]
pub struct FileData {
    /// Absolute path to the file
    pub absolute_path: PathBuf,

    /// Relative path from the root, with forward slashes
    pub relative_path: String,

    /// Fence language tag, empty when unknown
    pub language: &'static str,

    /// File content (text or placeholder)
    pub content: FileContent,
}

/// What could be made of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Valid UTF-8 text
    Text(String),

    /// Null bytes in the leading sample
    Binary {
        /// Size of the file in bytes
        size: u64,
    },

    /// Not valid UTF-8
    NonUtf8 {
        /// Size of the file in bytes
        size: u64,
    },

    /// Read failed after the file was listed
    Unreadable {
        /// Error message
        message: String,
    },
}

impl FileData {
    /// Reads a listed file and classifies its content.
    #[must_use]
    pub fn load(entry: &FileEntry) -> Self {
        let content = match fs::read(&entry.absolute_path) {
            Ok(bytes) => classify(bytes),
            Err(e) => FileContent::Unreadable {
                message: e.to_string(),
            },
        };

        let data = Self {
            absolute_path: entry.absolute_path.clone(),
            relative_path: slash_path(&entry.relative_path),
            language: language_for(&entry.relative_path),
            content,
        };
        trace!("Loaded {} ({} bytes)", data.relative_path, data.size_bytes());
        data
    }

    /// Returns true if this is a text file.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self.content, FileContent::Text(_))
    }

    /// Returns the text content if this is a text file.
    #[must_use]
    pub fn content_str(&self) -> Option<&str> {
        match &self.content {
            FileContent::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        match &self.content {
            FileContent::Text(s) => s.len() as u64,
            FileContent::Binary { size } | FileContent::NonUtf8 { size } => *size,
            FileContent::Unreadable { .. } => 0,
        }
    }

    /// Placeholder sentence for content that cannot be embedded.
    #[must_use]
    pub fn placeholder(&self) -> Option<String> {
        match &self.content {
            FileContent::Text(_) => None,
            FileContent::Binary { size } => {
                Some(format!("Binary file ({size} bytes), content omitted."))
            }
            FileContent::NonUtf8 { size } => Some(format!(
                "File is not valid UTF-8 text ({size} bytes), content omitted."
            )),
            FileContent::Unreadable { message } => {
                Some(format!("File could not be read: {message}"))
            }
        }
    }

    /// The render warning matching [`Self::placeholder`].
    #[must_use]
    pub fn warning(&self) -> Option<Warning> {
        let message = match &self.content {
            FileContent::Text(_) => return None,
            FileContent::Binary { .. } => "binary content".to_string(),
            FileContent::NonUtf8 { .. } => "not valid UTF-8".to_string(),
            FileContent::Unreadable { message } => message.clone(),
        };
        Some(Warning::render(&self.relative_path, message))
    }
}

fn classify(bytes: Vec<u8>) -> FileContent {
    let size = bytes.len() as u64;
    let sample = &bytes[..bytes.len().min(SNIFF_LEN)];

    if memchr::memchr(0, sample).is_some() {
        return FileContent::Binary { size };
    }

    match String::from_utf8(bytes) {
        Ok(mut text) => {
            if text.starts_with('\u{feff}') {
                text.remove(0);
            }
            FileContent::Text(text)
        }
        Err(_) => FileContent::NonUtf8 { size },
    }
}

/// Shortest backtick fence that cannot be closed by the content: at least
/// three, and longer than the longest backtick run inside.
#[must_use]
pub fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}
