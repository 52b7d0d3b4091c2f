use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error types for the codetomd library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// Malformed ignore pattern.
    #[error("Invalid ignore pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// Malformed file extension in an include/exclude list.
    #[error("Invalid extension '{value}': {reason}")]
    InvalidExtension {
        /// The value as given
        value: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// The input path does not exist.
    #[error("Input path '{path}' does not exist")]
    RootNotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// Document template error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// No clipboard provider could be reached.
    #[error("Clipboard unavailable: {message}")]
    Clipboard {
        /// Error message
        message: String,
    },

    /// JSON/YAML serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid extension error.
    #[must_use]
    pub fn invalid_extension(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidExtension {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing root error.
    #[must_use]
    pub fn root_not_found(path: impl Into<PathBuf>) -> Self {
        Self::RootNotFound { path: path.into() }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: &tera::Error) -> Self {
        // tera keeps the useful part of the message in the source chain
        let mut message = source.to_string();
        let mut cause = std::error::Error::source(source);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = std::error::Error::source(inner);
        }

        Self::Template {
            template: template.into(),
            message,
        }
    }

    /// Creates a clipboard error.
    #[must_use]
    pub fn clipboard(message: impl Into<String>) -> Self {
        Self::Clipboard {
            message: message.into(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this error stems from bad configuration input
    /// (generic, pattern or extension).
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidPattern { .. } | Self::InvalidExtension { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<serde_yml::Error> for Error {
    fn from(e: serde_yml::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

/// Non-fatal condition recorded during a run.
///
/// Warnings are logged when they occur and collected into the run summary;
/// they never change the exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A directory or entry could not be read; its subtree was skipped.
    Traversal {
        /// Offending path
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// A file could not be rendered as text; a placeholder was emitted.
    Render {
        /// Offending file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// The clipboard could not be written.
    Clipboard {
        /// What went wrong
        message: String,
    },
}

impl Warning {
    /// Creates a traversal warning.
    #[must_use]
    pub fn traversal(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Traversal {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a render warning.
    #[must_use]
    pub fn render(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Render {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Traversal { path, message } => {
                write!(f, "skipped '{}': {message}", path.display())
            }
            Self::Render { path, message } => {
                write!(f, "placeholder for '{}': {message}", path.display())
            }
            Self::Clipboard { message } => write!(f, "clipboard copy failed: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test message");
        assert!(err.is_config());
        assert!(err.to_string().contains("test message"));
    }

    #[test]
    fn test_pattern_and_extension_errors_are_config_errors() {
        assert!(Error::invalid_pattern("a/**b[", "unclosed class").is_config());
        assert!(Error::invalid_extension("a/b", "contains a separator").is_config());
        assert!(!Error::root_not_found("/nope").is_config());
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io("/tmp/test.txt", io_err);
        assert!(err.is_io());
        assert!(err.to_string().contains("/tmp/test.txt"));
    }

    #[test]
    fn test_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::traversal("src/locked", "permission denied");
        assert_eq!(warning.to_string(), "skipped 'src/locked': permission denied");

        let warning = Warning::Clipboard {
            message: "no display".to_string(),
        };
        assert!(warning.to_string().contains("no display"));
    }
}
