//! The commit pipeline.
//!
//! Pending files flow through three kinds of stage:
//!
//! 1. a pending re-check that drops anything [`state::is_pending`] rejects,
//!    even when the caller supplied its own source stream;
//! 2. the caller's [`Transform`]s, in order, each turning one file into
//!    zero or more;
//! 3. materialisation: write or remove the file on disk, then clear its
//!    state in the store.
//!
//! Stages 1 and 2 handle one file at a time. Stage 3 runs up to
//! `commit_concurrency` files at once but reports them in emission order.
//! The first error stops the pipeline; files already materialised stay on
//! disk.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::disk;
use crate::editor::Editor;
use crate::error::{Error, Result};
use crate::state;
use crate::store::FileStream;
use crate::types::{CommitReport, File, FileState};

/// Selects the files a commit starts from.
pub type FilterFn = Arc<dyn Fn(&mut File) -> bool + Send + Sync>;

/// A caller-supplied pipeline stage.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Return the files to pass downstream. An empty vector drops the file;
    /// it then keeps its pending state.
    async fn transform(&self, file: File) -> Result<Vec<File>>;
}

struct FnTransform<F>(F);

#[async_trait]
impl<F> Transform for FnTransform<F>
where
    F: Fn(File) -> Result<Vec<File>> + Send + Sync,
{
    async fn transform(&self, file: File) -> Result<Vec<File>> {
        (self.0)(file)
    }
}

/// Wrap a synchronous closure as a [`Transform`].
pub fn transform_fn<F>(f: F) -> Arc<dyn Transform>
where
    F: Fn(File) -> Result<Vec<File>> + Send + Sync + 'static,
{
    Arc::new(FnTransform(f))
}

#[derive(Default)]
pub struct CommitOptions {
    /// Replaces the default [`state::is_pending`] selection.
    pub filter: Option<FilterFn>,
    /// Replaces the store stream entirely; `filter` is then ignored.
    pub source: Option<FileStream>,
    pub transforms: Vec<Arc<dyn Transform>>,
}

impl fmt::Debug for CommitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitOptions")
            .field("filter", &self.filter.is_some())
            .field("source", &self.source.is_some())
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

/// What the terminal stage did with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Written,
    Deleted,
    Unchanged,
}

impl Editor {
    /// Write pending changes to disk.
    pub async fn commit(&self, options: CommitOptions) -> Result<CommitReport> {
        let CommitOptions {
            filter,
            source,
            transforms,
        } = options;

        let source = match (source, filter) {
            (Some(source), _) => source,
            (None, Some(filter)) => self.store().stream(&mut |file: &mut File| filter(file)),
            (None, None) => self.store().stream(&mut state::is_pending),
        };

        let mut files: FileStream = source
            .try_filter_map(|mut file| async move { Ok(state::is_pending(&mut file).then_some(file)) })
            .boxed();

        for stage in transforms {
            files = files
                .and_then(move |file| {
                    let stage = Arc::clone(&stage);
                    async move { stage.transform(file).await }
                })
                .map_ok(|out| stream::iter(out.into_iter().map(Ok::<File, Error>)))
                .try_flatten()
                .boxed();
        }

        let report = files
            .map_ok(|file| self.commit_file(file))
            .try_buffered(self.inner.commit_concurrency)
            .try_fold(CommitReport::new(), |mut report, (path, outcome)| async move {
                match outcome {
                    Outcome::Written => report.written.push(path),
                    Outcome::Deleted => report.deleted.push(path),
                    Outcome::Unchanged => report.unchanged.push(path),
                }
                Ok(report)
            })
            .await?;

        log::debug!(
            "commit: {} written, {} deleted, {} unchanged",
            report.written.len(),
            report.deleted.len(),
            report.unchanged.len()
        );
        Ok(report)
    }

    /// Materialise one file and clear its state.
    async fn commit_file(&self, mut file: File) -> Result<(PathBuf, Outcome)> {
        let store = self.store();
        let current = store.get(&file.path)?;
        let expected = if same_record(&current, &file) {
            current
        } else {
            store.add(file.clone());
            file.clone()
        };

        let pending = file.state;
        let outcome = match pending {
            Some(FileState::Modified) => {
                state::set_committed(&mut file);
                let contents = file.contents.clone().unwrap_or_default();
                disk::write(&file.path, contents, file.mode()).await?;
                log::debug!("commit: wrote {}", file.path.display());
                Outcome::Written
            }
            Some(FileState::Deleted) if !state::is_new(&mut file) => {
                state::set_committed(&mut file);
                disk::remove(&file.path).await?;
                log::debug!("commit: removed {}", file.path.display());
                Outcome::Deleted
            }
            _ => Outcome::Unchanged,
        };

        state::clear_state(&mut file);
        let path = file.path.clone();
        if !store.compare_and_add(&expected, file)? {
            log::debug!("commit: {} was edited meanwhile; keeping the edit", path.display());
        }
        Ok((path, outcome))
    }
}

/// Equal apart from the memoized `is_new` flag.
fn same_record(a: &File, b: &File) -> bool {
    a.path == b.path
        && a.contents == b.contents
        && a.stat == b.stat
        && a.state == b.state
        && a.state_cleared == b.state_cleared
        && a.committed == b.committed
}
