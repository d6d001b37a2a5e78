use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{Error, Result};
use crate::types::{File, FileStat};

/// A stream of file records flowing through the commit pipeline.
pub type FileStream = BoxStream<'static, Result<File>>;

/// The path-keyed in-memory file store an [`Editor`](crate::Editor) edits.
///
/// Paths handed to a store are absolute and normalized. Callbacks passed to
/// [`each`](Store::each) and [`stream`](Store::stream) must not call back
/// into the store.
pub trait Store: Send + Sync {
    /// The record for `path`, loading it from disk on first access.
    ///
    /// Paths that are absent on disk (including paths below a regular file)
    /// or are directories load with `contents == None`.
    fn get(&self, path: &Path) -> Result<File>;

    /// Insert or replace the record for `file.path`.
    fn add(&self, file: File);

    /// Visit every record. Mutations made by the callback are kept.
    fn each(&self, f: &mut dyn FnMut(&mut File));

    /// A snapshot of every record.
    fn all(&self) -> Vec<File>;

    /// Whether `path` is already held in memory.
    ///
    /// `None` means the store cannot answer; operations that depend on the
    /// answer fail with [`Error::CapabilityMissing`].
    fn exists_in_memory(&self, _path: &Path) -> Option<bool> {
        None
    }

    /// Stream the records accepted by `filter`.
    ///
    /// The filter sees the stored records, so memoized flags it computes
    /// (see [`crate::state::is_new`]) stick.
    fn stream(&self, filter: &mut dyn FnMut(&mut File) -> bool) -> FileStream {
        let mut selected = Vec::new();
        self.each(&mut |file: &mut File| {
            if filter(file) {
                selected.push(file.clone());
            }
        });
        stream::iter(selected.into_iter().map(Ok)).boxed()
    }

    /// Replace the record for `file.path` only if it still equals `expected`.
    ///
    /// Returns `true` when the replacement happened. The default is not
    /// atomic; implementations with internal locking should override it.
    fn compare_and_add(&self, expected: &File, file: File) -> Result<bool> {
        let current = self.get(&file.path)?;
        if &current == expected {
            self.add(file);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

// ---------------------------------------------------------------------------
// MemStore
// ---------------------------------------------------------------------------

/// Internal state shared via `Arc`.
#[derive(Debug, Default)]
struct MemStoreInner {
    files: Mutex<BTreeMap<PathBuf, File>>,
}

/// The default [`Store`]: records kept in a path-ordered map.
///
/// Cheap to clone (`Arc` internally); clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    inner: Arc<MemStoreInner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held in memory.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, File>> {
        // A panicking callback cannot leave a record half-written.
        self.inner.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build a record from whatever is on disk at `path`.
pub fn load_file(path: &Path) -> Result<File> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if crate::disk::is_absent(path, &e) => return Ok(File::new(path)),
        Err(e) => return Err(Error::io(path, e)),
    };
    if meta.is_dir() {
        return Ok(File::new(path));
    }
    let contents = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(File {
        contents: Some(contents),
        stat: Some(FileStat::from_metadata(&meta)),
        ..File::new(path)
    })
}

impl Store for MemStore {
    fn get(&self, path: &Path) -> Result<File> {
        if let Some(file) = self.lock().get(path) {
            return Ok(file.clone());
        }
        log::trace!("loading {} from disk", path.display());
        let file = load_file(path)?;
        // Another caller may have loaded or written it meanwhile; theirs wins.
        let mut files = self.lock();
        Ok(files.entry(path.to_path_buf()).or_insert(file).clone())
    }

    fn add(&self, file: File) {
        self.lock().insert(file.path.clone(), file);
    }

    fn each(&self, f: &mut dyn FnMut(&mut File)) {
        for file in self.lock().values_mut() {
            f(file);
        }
    }

    fn all(&self) -> Vec<File> {
        self.lock().values().cloned().collect()
    }

    fn exists_in_memory(&self, path: &Path) -> Option<bool> {
        Some(self.lock().contains_key(path))
    }

    fn compare_and_add(&self, expected: &File, file: File) -> Result<bool> {
        let mut files = self.lock();
        match files.get(&file.path) {
            Some(current) if current != expected => Ok(false),
            _ => {
                files.insert(file.path.clone(), file);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_loads_from_disk_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"disk").unwrap();

        let store = MemStore::new();
        assert_eq!(store.exists_in_memory(&path), Some(false));
        let file = store.get(&path).unwrap();
        assert_eq!(file.contents.as_deref(), Some(&b"disk"[..]));
        assert!(file.stat.is_some());
        assert_eq!(store.exists_in_memory(&path), Some(true));

        // Later disk edits are not observed.
        std::fs::write(&path, b"changed").unwrap();
        assert_eq!(store.get(&path).unwrap().contents.as_deref(), Some(&b"disk"[..]));
    }

    #[test]
    fn get_missing_and_directories_have_no_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemStore::new();
        assert!(store.get(&dir.path().join("nope")).unwrap().contents.is_none());
        assert!(store.get(dir.path()).unwrap().contents.is_none());
    }

    #[test]
    fn add_replaces_by_path() {
        let store = MemStore::new();
        store.add(File::with_contents("/x/a", "1"));
        store.add(File::with_contents("/x/a", "2"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].contents.as_deref(), Some(&b"2"[..]));
    }

    #[test]
    fn compare_and_add_refuses_stale_expectation() {
        let store = MemStore::new();
        let original = File::with_contents("/x/a", "1");
        store.add(original.clone());
        store.add(File::with_contents("/x/a", "newer"));
        assert!(!store.compare_and_add(&original, File::with_contents("/x/a", "old")).unwrap());
        assert_eq!(store.all()[0].contents.as_deref(), Some(&b"newer"[..]));
    }

    #[test]
    fn each_mutations_stick() {
        let store = MemStore::new();
        store.add(File::with_contents("/x/a", "1"));
        store.each(&mut |f: &mut File| f.committed = true);
        assert!(store.all()[0].committed);
    }
}
