//! Lifecycle flags of a tracked [`File`].
//!
//! A file moves `untouched → modified | deleted → committed → untouched`,
//! with the last pending state kept in `state_cleared` once a commit has
//! processed it. Every function here is total: none of them fail.

use crate::types::{File, FileState};

pub fn set_modified(file: &mut File) {
    file.state = Some(FileState::Modified);
}

pub fn set_deleted(file: &mut File) {
    file.state = Some(FileState::Deleted);
}

pub fn is_modified(file: &File) -> bool {
    file.state == Some(FileState::Modified)
}

pub fn is_deleted(file: &File) -> bool {
    file.state == Some(FileState::Deleted)
}

pub fn has_state(file: &File) -> bool {
    file.state.is_some()
}

pub fn has_cleared_state(file: &File) -> bool {
    file.state_cleared.is_some()
}

/// Returns `true` if nothing exists at the file's path on disk.
///
/// Computed once and cached on the record; [`clear_state`] drops the cache.
pub fn is_new(file: &mut File) -> bool {
    if let Some(cached) = file.is_new {
        return cached;
    }
    let new = std::fs::symlink_metadata(&file.path).is_err();
    file.is_new = Some(new);
    new
}

/// Returns `true` if the file needs the commit pipeline.
///
/// A file created and deleted in memory never reached the disk, so there is
/// nothing to remove.
pub fn is_pending(file: &mut File) -> bool {
    is_modified(file) || (is_deleted(file) && !is_new(file))
}

pub fn set_committed(file: &mut File) {
    file.committed = true;
}

pub fn is_committed(file: &File) -> bool {
    file.committed
}

/// Move `state` into `state_cleared` and forget the cached `is_new` flag.
pub fn clear_state(file: &mut File) {
    if let Some(state) = file.state.take() {
        file.state_cleared = Some(state);
    }
    file.is_new = None;
}

/// Drop every lifecycle flag.
pub fn reset_all(file: &mut File) {
    file.state = None;
    file.state_cleared = None;
    file.committed = false;
    file.is_new = None;
}
