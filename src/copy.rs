//! Copy operations: `copy`, `copy_async`, `copy_tpl`, `copy_tpl_async`.
//!
//! A single existing literal source is copied to `to` verbatim. Anything
//! else (a list, a glob, a directory) is expanded against both the disk and
//! the store, and each match lands under `to` at its path relative to the
//! sources' common root.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;

use crate::binary;
use crate::disk;
use crate::editor::{AppendOptions, Editor, WriteOptions};
use crate::error::{Error, Result};
use crate::glob::{self, GlobOptions, PatternSet, Sources};
use crate::paths::{self, to_slash};
use crate::template::{TemplateEngine, TemplateOptions};
use crate::types::File;

/// Rewrites contents: `(contents, source, destination) -> new contents`.
pub type ProcessFn = Arc<dyn Fn(&[u8], &Path, &Path) -> Result<Vec<u8>> + Send + Sync>;

/// Produces contents for a source path asynchronously, bypassing the store.
pub type ProcessFileFn = Arc<dyn Fn(PathBuf) -> BoxFuture<'static, Result<Vec<u8>>> + Send + Sync>;

/// Rewrites each destination generated by a multi-file copy.
pub type DestinationFn = Arc<dyn Fn(PathBuf) -> PathBuf + Send + Sync>;

// ---------------------------------------------------------------------------
// CopyOptions
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct CopyOptions {
    pub glob: GlobOptions,
    /// Take every source literally: only existing files on disk match.
    /// Cannot be combined with non-default `glob` options.
    pub no_glob: bool,
    /// Succeed without copying anything when the sources match nothing.
    pub ignore_no_match: bool,
    /// Root destinations are computed relative to, instead of the sources'
    /// common path.
    pub from_base_path: Option<PathBuf>,
    pub process: Option<ProcessFn>,
    /// Used by the async variants for sources not yet loaded into the store.
    pub process_file: Option<ProcessFileFn>,
    pub process_destination_path: Option<DestinationFn>,
    /// Append to destinations already held in memory instead of overwriting.
    pub append: bool,
    /// When set, destination paths are rendered as templates with it.
    pub context: Option<Value>,
    pub template: TemplateOptions,
}

impl fmt::Debug for CopyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyOptions")
            .field("glob", &self.glob)
            .field("no_glob", &self.no_glob)
            .field("ignore_no_match", &self.ignore_no_match)
            .field("from_base_path", &self.from_base_path)
            .field("process", &self.process.is_some())
            .field("process_file", &self.process_file.is_some())
            .field("process_destination_path", &self.process_destination_path.is_some())
            .field("append", &self.append)
            .field("context", &self.context)
            .field("template", &self.template)
            .finish()
    }
}

impl CopyOptions {
    fn validate(&self) -> Result<()> {
        if self.no_glob && self.glob != GlobOptions::default() {
            return Err(Error::invalid_argument(
                "no_glob cannot be combined with glob options",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Editor operations
// ---------------------------------------------------------------------------

impl Editor {
    /// Copy `from` to `to` in memory.
    pub fn copy(&self, from: impl Into<Sources>, to: impl AsRef<Path>, options: CopyOptions) -> Result<()> {
        options.validate()?;
        let from = from.into().resolve(self.cwd());
        let to = self.resolve(to);

        if let Some(source) = self.single_source(&from, &options) {
            if self.exists(&source)? {
                return self.copy_single(&source, &to, &options);
            }
        }
        for (source, destination) in self.plan_multi(&from, &to, &options)? {
            self.copy_single(&source, &destination, &options)?;
        }
        Ok(())
    }

    /// Like [`copy`](Editor::copy), but sources not yet loaded into the
    /// store go through `options.process_file`, concurrently.
    pub async fn copy_async(
        &self,
        from: impl Into<Sources>,
        to: impl AsRef<Path>,
        options: CopyOptions,
    ) -> Result<()> {
        options.validate()?;
        let from = from.into().resolve(self.cwd());
        let to = self.resolve(to);

        if let Some(source) = self.single_source(&from, &options) {
            if self.store().exists_in_memory(&source) == Some(true) {
                return self.copy_single(&source, &to, &options);
            }
            if is_disk_file(&source).await {
                return self.copy_single_async(&source, &to, &options).await;
            }
        }
        let plan = self.plan_multi(&from, &to, &options)?;
        future::try_join_all(
            plan.iter()
                .map(|(source, destination)| self.copy_one_async(source, destination, &options)),
        )
        .await?;
        Ok(())
    }

    /// Copy with contents rendered through the template engine.
    ///
    /// Binary files are copied untouched. Destinations of multi-file copies
    /// lose the engine's template suffix unless
    /// `options.process_destination_path` says otherwise. A caller-supplied
    /// `options.process` is replaced.
    pub fn copy_tpl(
        &self,
        from: impl Into<Sources>,
        to: impl AsRef<Path>,
        context: Value,
        options: CopyOptions,
    ) -> Result<()> {
        let options = self.template_options(context, options);
        self.copy(from, to, options)
    }

    /// Async [`copy_tpl`](Editor::copy_tpl): files not yet in the store are
    /// read from disk and rendered without being loaded first.
    pub async fn copy_tpl_async(
        &self,
        from: impl Into<Sources>,
        to: impl AsRef<Path>,
        context: Value,
        options: CopyOptions,
    ) -> Result<()> {
        let mut options = self.template_options(context.clone(), options);
        let engine = Arc::clone(&self.inner.engine);
        let template = options.template.clone();
        options.process_file = Some(Arc::new(move |path: PathBuf| {
            let engine = Arc::clone(&engine);
            let template = template.clone();
            let context = context.clone();
            async move {
                let bytes = disk::read(&path).await?;
                render_contents(&*engine, &bytes, &path, &context, &template)
            }
            .boxed()
        }));
        self.copy_async(from, to, options).await
    }

    // -- internals ----------------------------------------------------------

    /// The path to copy verbatim, if `from` names exactly one literal path.
    fn single_source(&self, from: &Sources, options: &CopyOptions) -> Option<PathBuf> {
        let one = from.as_one()?;
        if !options.no_glob && glob::is_dynamic_pattern(one) {
            return None;
        }
        Some(PathBuf::from(one))
    }

    /// Expand `from` and pair every match with its destination under `to`.
    fn plan_multi(&self, from: &Sources, to: &Path, options: &CopyOptions) -> Result<Vec<(PathBuf, PathBuf)>> {
        let mut files = Vec::new();
        for path in self.match_sources(from, options)? {
            if !self.is_deleted_in_memory(&path)? {
                files.push(path);
            }
        }
        if files.is_empty() && !options.ignore_no_match {
            return Err(Error::missing_source(from));
        }

        if self.exists(to)? {
            return Err(Error::invalid_argument(
                "When copying multiple files, provide a directory as destination",
            ));
        }

        let root = match &options.from_base_path {
            Some(base) => self.resolve(base),
            None => glob::common_path(from),
        };
        Ok(files
            .into_iter()
            .map(|source| {
                let mut destination = paths::normalize(&to.join(paths::relative(&root, &source)));
                if let Some(rewrite) = &options.process_destination_path {
                    destination = rewrite(destination);
                }
                (source, destination)
            })
            .collect())
    }

    /// Disk matches first, then store-only matches.
    fn match_sources(&self, from: &Sources, options: &CopyOptions) -> Result<Vec<PathBuf>> {
        if options.no_glob {
            return Ok(from
                .patterns()
                .into_iter()
                .filter(|p| !p.starts_with('!'))
                .map(PathBuf::from)
                .filter(|p| p.is_file())
                .collect());
        }

        let patterns = glob::globify(&from.patterns());
        let mut files = glob::disk_glob(&patterns, &options.glob)?;
        let on_disk: HashSet<PathBuf> = files.iter().cloned().collect();
        let set = PatternSet::new(&patterns, &options.glob)?;
        self.store().each(&mut |file: &mut File| {
            let stored_glob = glob::is_dynamic_pattern(&to_slash(&file.path));
            if !stored_glob && !on_disk.contains(&file.path) && set.is_match(&file.path) {
                files.push(file.path.clone());
            }
        });
        log::debug!("copy source {} matched {} file(s)", from, files.len());
        Ok(files)
    }

    fn is_deleted_in_memory(&self, path: &Path) -> Result<bool> {
        if self.store().exists_in_memory(path) != Some(true) {
            return Ok(false);
        }
        Ok(!self.store().get(path)?.exists())
    }

    fn copy_single(&self, from: &Path, to: &Path, options: &CopyOptions) -> Result<()> {
        let to = self.render_destination(to, options)?;
        let file = self.store().get(from)?;
        let mode = file.mode();
        let Some(contents) = file.contents else {
            return Err(Error::missing_source(from.display()));
        };
        let contents = match &options.process {
            Some(process) => process(&contents, from, &to)?,
            None => contents,
        };
        log::debug!("copy {} -> {}", from.display(), to.display());

        if self.append_in_memory(&to, &contents, options)? {
            return Ok(());
        }
        self.write(&to, contents, WriteOptions { mode })?;
        Ok(())
    }

    async fn copy_single_async(&self, from: &Path, to: &Path, options: &CopyOptions) -> Result<()> {
        let Some(process_file) = &options.process_file else {
            return self.copy_single(from, to, options);
        };
        let contents = process_file(from.to_path_buf()).await?;
        let to = self.render_destination(to, options)?;
        log::debug!("copy {} -> {} (async)", from.display(), to.display());

        if self.append_in_memory(&to, &contents, options)? {
            return Ok(());
        }
        let mode = disk::stat(from).await?.map(|stat| stat.mode);
        self.write(&to, contents, WriteOptions { mode })?;
        Ok(())
    }

    /// Files already in memory are copied from there; the rest from disk.
    async fn copy_one_async(&self, from: &Path, to: &Path, options: &CopyOptions) -> Result<()> {
        if self.store().exists_in_memory(from) == Some(true) {
            self.copy_single(from, to, options)
        } else {
            self.copy_single_async(from, to, options).await
        }
    }

    /// Returns `true` when `contents` were appended to an in-memory file.
    fn append_in_memory(&self, to: &Path, contents: &[u8], options: &CopyOptions) -> Result<bool> {
        if !options.append {
            return Ok(false);
        }
        match self.store().exists_in_memory(to) {
            None => Err(Error::capability_missing(
                "copy with `append` needs a store that implements exists_in_memory",
            )),
            Some(false) => Ok(false),
            Some(true) => {
                let options = AppendOptions {
                    create: true,
                    ..Default::default()
                };
                self.append(to, &String::from_utf8_lossy(contents), options)?;
                Ok(true)
            }
        }
    }

    fn render_destination(&self, to: &Path, options: &CopyOptions) -> Result<PathBuf> {
        match &options.context {
            Some(context) => {
                let rendered = self.engine().render(&to_slash(to), context, &options.template)?;
                Ok(self.resolve(rendered))
            }
            None => Ok(to.to_path_buf()),
        }
    }

    /// `options` with template rendering wired in.
    fn template_options(&self, context: Value, mut options: CopyOptions) -> CopyOptions {
        let engine = Arc::clone(&self.inner.engine);
        let template = options.template.clone();
        let render_context = context.clone();
        options.process = Some(Arc::new(move |contents: &[u8], from: &Path, _to: &Path| {
            render_contents(&*engine, contents, from, &render_context, &template)
        }));
        if options.process_destination_path.is_none() {
            if let Some(suffix) = self.engine().template_suffix().map(str::to_string) {
                options.process_destination_path =
                    Some(Arc::new(move |path: PathBuf| strip_suffix(path, &suffix)));
            }
        }
        options.context = Some(context);
        options
    }
}

fn render_contents(
    engine: &dyn TemplateEngine,
    contents: &[u8],
    filename: &Path,
    context: &Value,
    template: &TemplateOptions,
) -> Result<Vec<u8>> {
    if binary::is_binary(filename, Some(contents)) {
        return Ok(contents.to_vec());
    }
    let text = String::from_utf8_lossy(contents);
    let rendered = engine.render(&text, context, &template.with_filename(filename))?;
    Ok(rendered.into_bytes())
}

fn strip_suffix(path: PathBuf, suffix: &str) -> PathBuf {
    let stripped = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(suffix))
        .filter(|stem| !stem.is_empty())
        .map(|stem| path.with_file_name(stem));
    stripped.unwrap_or(path)
}

async fn is_disk_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
