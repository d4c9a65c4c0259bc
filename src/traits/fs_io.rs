//! Byte-level I/O through an open session.

use crate::FsError;

/// Offset-based reads and writes on an open file.
///
/// Reads take the file's lock in shared mode and writes in exclusive mode
/// for the whole call, including the flush a write performs.
pub trait FsIo: Send + Sync {
    /// Read up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes near the end of the content and none at all when
    /// `offset` is at or past the end. Never fails for out-of-range offsets.
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, FsError>;

    /// Write `data` and persist the tree. Returns the number of bytes written.
    ///
    /// In normal mode the bytes overwrite `[offset, offset + data.len())`,
    /// zero-filling any gap past the current end. In append mode `offset` is
    /// ignored and `data` is added to the end.
    fn write_at(&self, offset: u64, data: &[u8]) -> Result<usize, FsError>;
}
