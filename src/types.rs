use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

// ---------------------------------------------------------------------------
// Mode constants
// ---------------------------------------------------------------------------

/// Permission bits compared when deciding whether a follow-up chmod is needed.
pub const PERMISSION_BITS: u32 = 0o777;

/// Mode given to files created on disk when no explicit mode was requested.
/// The process umask still applies.
pub const DEFAULT_CREATE_MODE: u32 = 0o666;

// ---------------------------------------------------------------------------
// FileState
// ---------------------------------------------------------------------------

/// A pending change recorded on a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Modified,
    Deleted,
}

impl FileState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FileStat
// ---------------------------------------------------------------------------

/// The subset of filesystem metadata carried alongside file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileStat {
    pub mode: u32,
}

impl FileStat {
    pub fn new(mode: u32) -> Self {
        Self { mode }
    }

    /// Read the mode of an on-disk file or directory.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            Self::new(meta.permissions().mode())
        }
        #[cfg(not(unix))]
        {
            if meta.permissions().readonly() {
                Self::new(0o444)
            } else {
                Self::new(0o666)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// A path-keyed file record tracked by a [`Store`](crate::store::Store).
///
/// `contents == None` means the path has no readable content: it is either
/// absent on disk or has been deleted in memory. The lifecycle fields are
/// manipulated through the functions in [`crate::state`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Absolute, normalized path. Unique within a store.
    pub path: PathBuf,
    pub contents: Option<Vec<u8>>,
    pub stat: Option<FileStat>,
    /// Pending change, `None` when untouched.
    pub state: Option<FileState>,
    /// The last pending change, kept after a commit clears `state`.
    pub state_cleared: Option<FileState>,
    /// Cached "no file at this path on disk" flag; `None` until computed.
    pub is_new: Option<bool>,
    /// Set once the commit pipeline has materialized this file.
    pub committed: bool,
}

impl File {
    /// A record with no contents and no lifecycle state.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contents: None,
            stat: None,
            state: None,
            state_cleared: None,
            is_new: None,
            committed: false,
        }
    }

    /// A record holding `contents`, with no lifecycle state.
    pub fn with_contents(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: Some(contents.into()),
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the record has readable contents.
    pub fn exists(&self) -> bool {
        self.contents.is_some()
    }

    /// The explicit mode, if any.
    pub fn mode(&self) -> Option<u32> {
        self.stat.map(|s| s.mode)
    }

    /// Contents decoded as UTF-8 (lossy), or `None` when absent.
    pub fn contents_string(&self) -> Option<String> {
        self.contents
            .as_ref()
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }
}

// ---------------------------------------------------------------------------
// Contents
// ---------------------------------------------------------------------------

/// The result of a read: decoded text, or raw bytes when requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    Text(String),
    Raw(Vec<u8>),
}

impl Contents {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Raw(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(s) => s.into_bytes(),
            Self::Raw(b) => b,
        }
    }

    /// The text form, decoding raw bytes lossily.
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Raw(b) => String::from_utf8_lossy(&b).into_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// CommitReport
// ---------------------------------------------------------------------------

/// What a commit did, per path, in the order files reached the disk stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub written: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    /// Files that flowed through the pipeline without a disk operation.
    pub unchanged: Vec<PathBuf>,
}

impl CommitReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.deleted.is_empty() && self.unchanged.is_empty()
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.deleted.len() + self.unchanged.len()
    }
}

// ---------------------------------------------------------------------------
// DumpEntry
// ---------------------------------------------------------------------------

/// One file in the output of [`Editor::dump`](crate::Editor::dump).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpEntry {
    pub contents: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<FileState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_cleared: Option<FileState>,
}

impl DumpEntry {
    pub fn from_file(file: &File) -> Self {
        Self {
            contents: file.contents_string(),
            state: file.state,
            state_cleared: file.state_cleared,
        }
    }
}
