use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stagefs::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An editor over a fresh `MemStore`, rooted at `dir`.
pub fn create_editor(dir: &Path) -> Editor {
    init_logging();
    Editor::with_options(
        MemStore::new(),
        EditorOptions {
            cwd: Some(dir.to_path_buf()),
            eol: Some("\n".into()),
            ..Default::default()
        },
    )
    .unwrap()
}

/// Write `files` (relative path, contents) to disk under `dir`.
#[allow(dead_code)]
pub fn write_disk(dir: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}

#[allow(dead_code)]
pub fn read_disk(dir: &Path, rel: &str) -> String {
    std::fs::read_to_string(dir.join(rel)).unwrap()
}

/// A `MemStore` wrapper counting `add` calls.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct CountingStore {
    pub inner: MemStore,
    pub adds: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }
}

impl Store for CountingStore {
    fn get(&self, path: &Path) -> Result<File> {
        self.inner.get(path)
    }

    fn add(&self, file: File) {
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.inner.add(file);
    }

    fn each(&self, f: &mut dyn FnMut(&mut File)) {
        self.inner.each(f)
    }

    fn all(&self) -> Vec<File> {
        self.inner.all()
    }

    fn exists_in_memory(&self, path: &Path) -> Option<bool> {
        self.inner.exists_in_memory(path)
    }
}

/// A store that cannot answer `exists_in_memory`.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct BareStore {
    pub inner: MemStore,
}

impl Store for BareStore {
    fn get(&self, path: &Path) -> Result<File> {
        self.inner.get(path)
    }

    fn add(&self, file: File) {
        self.inner.add(file);
    }

    fn each(&self, f: &mut dyn FnMut(&mut File)) {
        self.inner.each(f)
    }

    fn all(&self) -> Vec<File> {
        self.inner.all()
    }
}
