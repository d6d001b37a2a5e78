//! Template rendering used by `copy_tpl`, `copy_tpl_async` and `append_tpl`.
//!
//! Rendering goes through the [`TemplateEngine`] trait so callers can plug
//! in their own engine; [`JinjaEngine`] is the default.

use std::path::{Path, PathBuf};

use minijinja::syntax::SyntaxConfig;
use minijinja::Environment;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::paths::to_slash;

/// Per-render settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateOptions {
    /// The file the template came from. Includes resolve relative to its
    /// directory, and errors name it.
    pub filename: Option<PathBuf>,
    /// Custom delimiters, `None` for the engine defaults.
    pub delimiters: Option<Delimiters>,
}

impl TemplateOptions {
    pub(crate) fn with_filename(&self, filename: &Path) -> Self {
        Self {
            filename: Some(filename.to_path_buf()),
            ..self.clone()
        }
    }
}

/// Start/end markers for the three kinds of template tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub block: (String, String),
    pub variable: (String, String),
    pub comment: (String, String),
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            block: ("{%".into(), "%}".into()),
            variable: ("{{".into(), "}}".into()),
            comment: ("{#".into(), "#}".into()),
        }
    }
}

/// A synchronous string templating engine.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, context: &Value, options: &TemplateOptions) -> Result<String>;

    /// File suffix marking templates, stripped from copy destinations.
    fn template_suffix(&self) -> Option<&str> {
        None
    }
}

// ---------------------------------------------------------------------------
// JinjaEngine
// ---------------------------------------------------------------------------

/// Jinja2-style templates rendered with `minijinja`.
///
/// Trailing newlines are kept so rendered files end the way their templates
/// do. Template files are recognised by a `.jinja` suffix.
#[derive(Debug, Clone, Default)]
pub struct JinjaEngine;

impl JinjaEngine {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEngine for JinjaEngine {
    fn render(&self, template: &str, context: &Value, options: &TemplateOptions) -> Result<String> {
        let name = options
            .filename
            .as_deref()
            .map(to_slash)
            .unwrap_or_else(|| "<string>".to_string());

        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        if let Some(d) = &options.delimiters {
            let syntax = SyntaxConfig::builder()
                .block_delimiters(d.block.0.clone(), d.block.1.clone())
                .variable_delimiters(d.variable.0.clone(), d.variable.1.clone())
                .comment_delimiters(d.comment.0.clone(), d.comment.1.clone())
                .build()
                .map_err(|e| Error::template(&name, e))?;
            env.set_syntax(syntax);
        }
        if let Some(dir) = options.filename.as_deref().and_then(Path::parent) {
            env.set_loader(minijinja::path_loader(dir));
        }

        env.render_named_str(&name, template, context)
            .map_err(|e| Error::template(&name, e))
    }

    fn template_suffix(&self) -> Option<&str> {
        Some(".jinja")
    }
}
