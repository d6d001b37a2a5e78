//! A staged file editor.
//!
//! `stagefs` lets you read, write, copy, template and delete files in
//! memory, then commit the pending changes to disk in one pass. Nothing
//! touches the filesystem until [`Editor::commit`] runs, and each file is
//! written atomically when it does.
//!
//! # Key types
//!
//! - [`Editor`]: the editing facade. Paths are resolved against its cwd;
//!   every edit marks the file `modified` or `deleted` in the store.
//! - [`Store`]: the path-keyed record store an editor works on.
//!   [`MemStore`] is the default implementation.
//! - [`File`]: one tracked record: contents, mode, and lifecycle flags
//!   (see [`state`]).
//! - [`Transform`]: a caller-supplied stage in the commit pipeline.
//!
//! # Quick example
//!
//! ```rust,no_run
//! use stagefs::{CommitOptions, Editor, MemStore, WriteOptions};
//!
//! # async fn run() -> stagefs::Result<()> {
//! let editor = Editor::new(MemStore::new())?;
//!
//! editor.write("hello.txt", "world", WriteOptions::default())?;
//! assert_eq!(editor.read("hello.txt")?, "world");
//!
//! // Nothing is on disk until the commit.
//! let report = editor.commit(CommitOptions::default()).await?;
//! assert_eq!(report.written.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod binary;
pub mod commit;
pub mod copy;
pub mod disk;
pub mod editor;
pub mod error;
pub mod fileobj;
pub mod glob;
pub mod json;
pub mod paths;
pub mod state;
pub mod store;
pub mod template;
pub mod types;

// Re-export primary public types at crate root.
pub use commit::{transform_fn, CommitOptions, FilterFn, Transform};
pub use copy::{CopyOptions, DestinationFn, ProcessFileFn, ProcessFn};
pub use editor::{
    AppendOptions, DeleteOptions, DumpFilter, DumpOptions, DumpPredicate, Editor, EditorOptions, MoveOptions,
    ReadOptions, WriteOptions,
};
pub use error::{Error, Result};
pub use fileobj::FileWriter;
pub use glob::{GlobOptions, Sources};
pub use json::{JsonIndent, JsonOptions, ReadJsonOptions, Replacer};
pub use store::{FileStream, MemStore, Store};
pub use template::{Delimiters, JinjaEngine, TemplateEngine, TemplateOptions};
pub use types::*;
