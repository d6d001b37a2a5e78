use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::fileobj::FileWriter;
use crate::glob::{self, GlobOptions, PatternSet, Sources};
use crate::paths::{self, to_slash};
use crate::state;
use crate::store::Store;
use crate::template::{JinjaEngine, TemplateEngine, TemplateOptions};
use crate::types::{Contents, DumpEntry, File, FileStat};

/// Files materialised concurrently by a commit unless configured otherwise.
pub const DEFAULT_COMMIT_CONCURRENCY: usize = 16;

#[cfg(windows)]
const DEFAULT_EOL: &str = "\r\n";
#[cfg(not(windows))]
const DEFAULT_EOL: &str = "\n";

// ---------------------------------------------------------------------------
// Option structs
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct EditorOptions {
    /// Base for relative paths. Defaults to the process working directory.
    pub cwd: Option<PathBuf>,
    /// Default `append` separator. Defaults to the platform line terminator.
    pub eol: Option<String>,
    /// Defaults to [`JinjaEngine`].
    pub engine: Option<Arc<dyn TemplateEngine>>,
    /// Upper bound on files written or removed at once during a commit.
    pub commit_concurrency: usize,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            eol: None,
            engine: None,
            commit_concurrency: DEFAULT_COMMIT_CONCURRENCY,
        }
    }
}

impl fmt::Debug for EditorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorOptions")
            .field("cwd", &self.cwd)
            .field("eol", &self.eol)
            .field("engine", &self.engine.as_ref().map(|_| ".."))
            .field("commit_concurrency", &self.commit_concurrency)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Return [`Contents::Raw`] instead of decoded text.
    pub raw: bool,
    /// Returned when the file has no contents. `Some(None)` means "return
    /// nothing" rather than failing; `None` makes a missing file an error.
    pub defaults: Option<Option<Contents>>,
}

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Permission mode applied on commit. `None` keeps the current mode.
    pub mode: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AppendOptions {
    /// Write the contents as-is when the file does not exist yet.
    pub create: bool,
    /// Strip trailing whitespace from the current contents first.
    pub trim_end: bool,
    /// Defaults to the editor's `eol`.
    pub separator: Option<String>,
}

impl Default for AppendOptions {
    fn default() -> Self {
        Self {
            create: false,
            trim_end: true,
            separator: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub glob: GlobOptions,
}

#[derive(Debug, Clone, Default)]
pub struct MoveOptions {
    pub glob: GlobOptions,
    pub from_base_path: Option<PathBuf>,
}

/// Predicate used by [`DumpFilter::Predicate`].
pub type DumpPredicate = Arc<dyn Fn(&File) -> bool + Send + Sync>;

/// Which tracked files [`Editor::dump`] reports.
#[derive(Clone, Default)]
pub enum DumpFilter {
    /// Files with a pending or cleared state.
    #[default]
    Changed,
    /// Files whose cwd-relative path matches this glob.
    Pattern(String),
    Predicate(DumpPredicate),
}

impl fmt::Debug for DumpFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed => f.write_str("Changed"),
            Self::Pattern(p) => f.debug_tuple("Pattern").field(p).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Keys are made relative to this directory. Defaults to the editor cwd.
    pub cwd: Option<PathBuf>,
    pub filter: DumpFilter,
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

pub(crate) struct EditorInner {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) cwd: PathBuf,
    pub(crate) eol: String,
    pub(crate) engine: Arc<dyn TemplateEngine>,
    pub(crate) commit_concurrency: usize,
}

/// Editing facade over a [`Store`].
///
/// Edits only touch the store; [`commit`](Editor::commit) writes the
/// pending ones to disk. Cheap to clone (`Arc` internally); clones edit the
/// same store.
#[derive(Clone)]
pub struct Editor {
    pub(crate) inner: Arc<EditorInner>,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("cwd", &self.inner.cwd)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// An editor over `store` with default options.
    pub fn new(store: impl Store + 'static) -> Result<Self> {
        Self::with_options(store, EditorOptions::default())
    }

    pub fn with_options(store: impl Store + 'static, options: EditorOptions) -> Result<Self> {
        Self::from_shared(Arc::new(store), options)
    }

    /// An editor over a store that is already shared.
    pub fn from_shared(store: Arc<dyn Store>, options: EditorOptions) -> Result<Self> {
        let here = std::env::current_dir().map_err(|e| Error::io(".", e))?;
        let cwd = match options.cwd {
            Some(dir) => paths::resolve(&here, dir),
            None => paths::normalize(&here),
        };
        Ok(Self {
            inner: Arc::new(EditorInner {
                store,
                cwd,
                eol: options.eol.unwrap_or_else(|| DEFAULT_EOL.to_string()),
                engine: options.engine.unwrap_or_else(|| Arc::new(JinjaEngine::new())),
                commit_concurrency: options.commit_concurrency.max(1),
            }),
        })
    }

    pub fn store(&self) -> &dyn Store {
        &*self.inner.store
    }

    pub fn cwd(&self) -> &Path {
        &self.inner.cwd
    }

    pub fn engine(&self) -> &dyn TemplateEngine {
        &*self.inner.engine
    }

    /// Resolve `path` against the editor cwd.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        paths::resolve(&self.inner.cwd, path)
    }

    // -- Read ---------------------------------------------------------------

    /// Read `path` as text.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<String> {
        let contents = self.read_with(path, ReadOptions::default())?;
        Ok(contents.map(Contents::into_string).unwrap_or_default())
    }

    /// Read `path` as bytes.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let contents = self.read_with(
            path,
            ReadOptions {
                raw: true,
                ..Default::default()
            },
        )?;
        Ok(contents.map(Contents::into_bytes).unwrap_or_default())
    }

    /// Read `path`, falling back to `options.defaults` when it has no
    /// contents.
    pub fn read_with(&self, path: impl AsRef<Path>, options: ReadOptions) -> Result<Option<Contents>> {
        let path = self.resolve(path);
        let file = self.store().get(&path)?;
        match file.contents {
            Some(bytes) if options.raw => Ok(Some(Contents::Raw(bytes))),
            Some(bytes) => Ok(Some(Contents::Text(decode(bytes)))),
            None => match options.defaults {
                Some(defaults) => Ok(defaults),
                None => Err(Error::not_found(format!("{} doesn't exist", path.display()))),
            },
        }
    }

    /// Whether `path` has readable contents, in memory or on disk.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = self.resolve(path);
        Ok(self.store().get(&path)?.exists())
    }

    // -- Write --------------------------------------------------------------

    /// Replace the contents of `path` and mark it modified.
    ///
    /// Writing the bytes (and mode) a modified file already holds leaves the
    /// store untouched. Returns the contents as text.
    pub fn write(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>, options: WriteOptions) -> Result<String> {
        let path = self.resolve(path);
        let bytes = contents.as_ref();
        let mut file = self.store().get(&path)?;

        let unchanged = state::is_modified(&file)
            && file.contents.as_deref() == Some(bytes)
            && options.mode.map_or(true, |mode| file.mode() == Some(mode));
        if !unchanged {
            state::set_modified(&mut file);
            file.contents = Some(bytes.to_vec());
            if let Some(mode) = options.mode {
                file.stat = Some(FileStat::new(mode));
            }
            self.store().add(file);
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// A buffered [`std::io::Write`] sink that writes `path` on close.
    pub fn writer(&self, path: impl AsRef<Path>, options: WriteOptions) -> FileWriter {
        FileWriter::new(self.clone(), self.resolve(path), options)
    }

    // -- Append -------------------------------------------------------------

    /// Append `contents` to `path`, separated by `options.separator`.
    pub fn append(&self, path: impl AsRef<Path>, contents: &str, options: AppendOptions) -> Result<String> {
        let path = self.resolve(path);
        if options.create && !self.exists(&path)? {
            return self.write(&path, contents, WriteOptions::default());
        }

        let mut current = self.read(&path)?;
        if options.trim_end {
            current.truncate(current.trim_end().len());
        }
        current.push_str(options.separator.as_deref().unwrap_or(&self.inner.eol));
        current.push_str(contents);
        self.write(&path, current, WriteOptions::default())
    }

    /// Render `template` with `context` and append the result to `path`.
    pub fn append_tpl(
        &self,
        path: impl AsRef<Path>,
        template: &str,
        context: &Value,
        template_options: TemplateOptions,
        options: AppendOptions,
    ) -> Result<String> {
        let rendered = self.engine().render(template, context, &template_options)?;
        self.append(path, &rendered, options)
    }

    // -- Delete -------------------------------------------------------------

    /// Mark every file matched by `sources` as deleted.
    ///
    /// Files held only in memory are matched too, so deleting a directory
    /// also deletes files created under it that never reached the disk.
    pub fn delete(&self, sources: impl Into<Sources>, options: DeleteOptions) -> Result<()> {
        let sources = sources.into().resolve(self.cwd());
        let patterns = glob::globify(&sources.patterns());

        for path in glob::disk_glob(&patterns, &options.glob)? {
            self.mark_deleted(&path)?;
        }

        let set = PatternSet::new(&patterns, &options.glob)?;
        let mut tracked = Vec::new();
        self.store().each(&mut |file: &mut File| {
            if set.is_match(&file.path) {
                tracked.push(file.path.clone());
            }
        });
        for path in tracked {
            self.mark_deleted(&path)?;
        }
        Ok(())
    }

    fn mark_deleted(&self, path: &Path) -> Result<()> {
        let mut file = self.store().get(path)?;
        log::debug!("delete {}", path.display());
        state::set_deleted(&mut file);
        file.contents = None;
        self.store().add(file);
        Ok(())
    }

    // -- Move ---------------------------------------------------------------

    /// Copy `sources` to `to`, then delete the sources.
    pub fn move_paths(&self, sources: impl Into<Sources>, to: impl AsRef<Path>, options: MoveOptions) -> Result<()> {
        let sources = sources.into();
        self.copy(
            sources.clone(),
            to,
            crate::copy::CopyOptions {
                glob: options.glob.clone(),
                from_base_path: options.from_base_path,
                ..Default::default()
            },
        )?;
        self.delete(sources, DeleteOptions { glob: options.glob })
    }

    // -- Dump ---------------------------------------------------------------

    /// Snapshot tracked files as a map from cwd-relative path to contents
    /// and state.
    pub fn dump(&self, options: DumpOptions) -> Result<BTreeMap<String, DumpEntry>> {
        let cwd = match &options.cwd {
            Some(dir) => self.resolve(dir),
            None => self.inner.cwd.clone(),
        };
        let pattern = match &options.filter {
            DumpFilter::Pattern(p) => Some(PatternSet::new(std::slice::from_ref(p), &GlobOptions::default())?),
            _ => None,
        };

        let mut out = BTreeMap::new();
        for file in self.store().all() {
            let key = to_slash(&paths::relative(&cwd, &file.path));
            let keep = match &options.filter {
                DumpFilter::Changed => state::has_state(&file) || state::has_cleared_state(&file),
                DumpFilter::Pattern(_) => pattern
                    .as_ref()
                    .is_some_and(|set| set.is_match(Path::new(&key))),
                DumpFilter::Predicate(f) => f(&file),
            };
            if keep {
                out.insert(key, DumpEntry::from_file(&file));
            }
        }
        Ok(out)
    }
}

/// UTF-8 text, lossy only when the bytes are not valid UTF-8.
fn decode(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
