use crate::{
    config::Config,
    error::{Error, Result},
    file::{fence_for, FileData},
    language::language_for,
    tree::render_tree,
    walker::Listing,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tera::{Context, Tera, Value};
use tracing::debug;

const BUILTIN_TEMPLATE: &str = "markdown";
const CUSTOM_TEMPLATE: &str = "custom";

/// Shown in place of the tree for a single-file input.
pub const SINGLE_FILE_NOTICE: &str = "Input is a single file (no tree generated).";

/// Shown in place of the tree when it was turned off.
pub const TREE_SKIPPED_NOTICE: &str = "Project tree generation skipped.";

#[derive(Serialize)]
struct DocumentContext<'a> {
    project_name: String,
    source: String,
    tree: Option<String>,
    tree_notice: Option<&'static str>,
    has_files: bool,
    files: Vec<FileView<'a>>,
}

#[derive(Serialize)]
struct FileView<'a> {
    path: &'a str,
    language: &'a str,
    fence: String,
    is_text: bool,
    body: String,
    note: Option<String>,
    size: u64,
}

impl<'a> FileView<'a> {
    fn new(file: &'a FileData) -> Self {
        let body = file.content_str().map_or_else(String::new, |text| {
            let trimmed = text.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                String::new()
            } else {
                format!("{trimmed}\n")
            }
        });

        Self {
            path: &file.relative_path,
            language: file.language,
            fence: fence_for(&body),
            is_text: file.is_text(),
            note: file.placeholder(),
            size: file.size_bytes(),
            body,
        }
    }
}

/// Renders the document with the built-in or a user-supplied template.
pub struct TemplateEngine {
    tera: Tera,
    template_name: &'static str,
}

impl TemplateEngine {
    /// Creates a new template engine from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the custom template cannot be read or does not
    /// parse.
    pub fn new(config: &Config) -> Result<Self> {
        let mut tera = Tera::default();
        tera.register_filter("language", Self::language_filter);

        tera.add_raw_template(BUILTIN_TEMPLATE, include_str!("../templates/markdown.tera"))
            .map_err(|e| Error::template(BUILTIN_TEMPLATE, &e))?;

        let template_name = match &config.template_path {
            Some(path) => {
                Self::register_custom(&mut tera, path)?;
                CUSTOM_TEMPLATE
            }
            None => BUILTIN_TEMPLATE,
        };

        Ok(Self {
            tera,
            template_name,
        })
    }

    fn register_custom(tera: &mut Tera, path: &Path) -> Result<()> {
        let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        tera.add_raw_template(CUSTOM_TEMPLATE, &source)
            .map_err(|e| Error::template(path.display().to_string(), &e))?;
        debug!("Using custom template {}", path.display());
        Ok(())
    }

    /// Maps a path string to its fence language.
    fn language_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let language = value
            .as_str()
            .map_or("", |path| language_for(Path::new(path)));
        Ok(Value::String(language.to_string()))
    }

    /// Renders the full document.
    ///
    /// The result always ends with exactly one newline.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render(&self, config: &Config, listing: &Listing, files: &[FileData]) -> Result<String> {
        let (tree, tree_notice) = if listing.single_file {
            (None, Some(SINGLE_FILE_NOTICE))
        } else if config.show_tree {
            (Some(render_tree(listing)), None)
        } else {
            (None, Some(TREE_SKIPPED_NOTICE))
        };

        let context = DocumentContext {
            project_name: config.project_name(),
            source: config.display_source(),
            tree,
            tree_notice,
            has_files: !files.is_empty(),
            files: files.iter().map(FileView::new).collect(),
        };

        let mut tera_context = Context::new();
        tera_context.insert("ctx", &context);

        let rendered = self
            .tera
            .render(self.template_name, &tera_context)
            .map_err(|e| Error::template(self.template_name, &e))?;

        let mut document = rendered.trim_end().to_string();
        document.push('\n');
        Ok(document)
    }
}
