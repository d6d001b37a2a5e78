//! Buffered writer for [`Editor`].
//!
//! [`FileWriter`] accumulates writes and hands them to
//! [`Editor::write`] on [`close()`](FileWriter::close). It implements
//! [`std::io::Write`] so you can use `write!` / `write_all`.

use std::io;
use std::path::{Path, PathBuf};

use crate::editor::{Editor, WriteOptions};
use crate::error::Result;

/// Buffered writer that lands in the store on close.
///
/// Nothing reaches the store until [`close()`](FileWriter::close), which
/// also runs on drop (errors are then discarded).
///
/// # Example
///
/// ```rust,no_run
/// use std::io::Write;
/// use stagefs::{Editor, MemStore, WriteOptions};
///
/// let editor = Editor::new(MemStore::new()).unwrap();
/// let mut w = editor.writer("out/report.txt", WriteOptions::default());
/// writeln!(w, "line 1").unwrap();
/// writeln!(w, "line 2").unwrap();
/// w.close().unwrap();
/// ```
pub struct FileWriter {
    editor: Editor,
    path: PathBuf,
    options: WriteOptions,
    buf: Vec<u8>,
    closed: bool,
}

impl FileWriter {
    pub(crate) fn new(editor: Editor, path: PathBuf, options: WriteOptions) -> Self {
        Self {
            editor,
            path,
            options,
            buf: Vec::new(),
            closed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this writer has been closed.
    pub fn closed(&self) -> bool {
        self.closed
    }

    /// Write the buffered bytes to the store.
    ///
    /// After closing, the writer cannot be used again. Closing twice is a
    /// no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let data = std::mem::take(&mut self.buf);
        self.closed = true;
        self.editor.write(&self.path, data, self.options.clone())?;
        Ok(())
    }
}

impl io::Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::other("I/O operation on closed writer"));
        }
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}
