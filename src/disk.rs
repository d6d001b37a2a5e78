//! Filesystem side of a commit: one file written or removed at a time.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{FileStat, PERMISSION_BITS};

/// Mode of the file at `path`, or `None` if nothing is there.
pub async fn stat(path: &Path) -> Result<Option<FileStat>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(FileStat::from_metadata(&meta))),
        Err(e) if is_absent(path, &e) => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Whether a failed lookup of `path` just means nothing is there: the path
/// is missing, or one of its ancestors is not a directory.
pub(crate) fn is_absent(path: &Path, err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::NotFound || blocking_file(path).is_some()
}

/// The nearest existing ancestor of `path`, if it is not a directory.
fn blocking_file(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .skip(1)
        .find(|ancestor| std::fs::symlink_metadata(ancestor).is_ok())
        .filter(|ancestor| !ancestor.is_dir())
        .map(Path::to_path_buf)
}

/// Make sure `dir` exists as a directory, creating it and its parents.
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::not_a_directory(dir)),
        Err(e) => match blocking_file(dir) {
            Some(file) => Err(Error::not_a_directory(file)),
            None if e.kind() == std::io::ErrorKind::NotFound => tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::io(dir, e)),
            None => Err(Error::io(dir, e)),
        },
    }
}

/// Write `contents` to `path` through a sibling temp file and a rename.
///
/// The parent directory is created when missing. With `mode == None` an
/// existing file keeps its permissions and a new one gets
/// [`DEFAULT_CREATE_MODE`](crate::types::DEFAULT_CREATE_MODE) minus the umask.
/// A symlink at `path` is followed: its target is replaced and the link
/// stays in place.
pub async fn write(path: &Path, contents: Vec<u8>, mode: Option<u32>) -> Result<()> {
    let target = resolve_link(path);
    let dir = crate::paths::dirname(&target);
    ensure_dir(&dir).await?;

    tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &contents, mode))
        .await
        .map_err(|e| Error::io(path, std::io::Error::other(e)))?
}

/// Links followed before giving up and writing over the last one.
const MAX_LINK_DEPTH: usize = 40;

/// The file a chain of symlinks at `path` ends at, or `path` itself.
fn resolve_link(path: &Path) -> PathBuf {
    let mut current = path.to_path_buf();
    for _ in 0..MAX_LINK_DEPTH {
        match std::fs::read_link(&current) {
            Ok(target) => {
                let next = crate::paths::dirname(&current).join(target);
                current = crate::paths::normalize(&next);
            }
            Err(_) => break,
        }
    }
    current
}

fn write_atomic(dir: &Path, path: &Path, contents: &[u8], mode: Option<u32>) -> Result<()> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".stagefs-").suffix(".tmp");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let create_mode = match mode {
            Some(m) => m,
            None => std::fs::metadata(path)
                .map(|meta| meta.permissions().mode())
                .unwrap_or(crate::types::DEFAULT_CREATE_MODE),
        };
        builder.permissions(std::fs::Permissions::from_mode(create_mode & 0o7777));
    }

    let mut tmp = builder.tempfile_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(contents).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;

    if let Some(mode) = mode {
        apply_mode(path, mode)?;
    }
    Ok(())
}

/// chmod `path` when its permission bits differ from `mode`'s.
fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    let meta = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
    let current = FileStat::from_metadata(&meta).mode;
    if current & PERMISSION_BITS == mode & PERMISSION_BITS {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(mode & 0o7777);
        std::fs::set_permissions(path, perms).map_err(|e| Error::io(path, e))?;
    }
    #[cfg(not(unix))]
    {
        let mut perms = meta.permissions();
        perms.set_readonly(mode & 0o222 == 0);
        std::fs::set_permissions(path, perms).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

/// Remove `path`, recursively for directories. Absent paths are fine.
pub async fn remove(path: &Path) -> Result<()> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(path, e)),
    };
    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Read a file from disk, for async copy hooks.
pub async fn read(path: impl Into<PathBuf>) -> Result<Vec<u8>> {
    let path = path.into();
    tokio::fs::read(&path).await.map_err(|e| Error::io(&path, e))
}
