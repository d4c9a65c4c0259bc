//! Opening a file node.

use crate::{FileSession, FsError, OpenFlags};

/// Open a file for reading and writing.
pub trait FsOpen: Send + Sync {
    /// Start a session on this file.
    ///
    /// With `flags.truncate` the content is cleared and the tree persisted
    /// before the session is returned. With `flags.append` every write through
    /// the session lands at the end of the content.
    ///
    /// # Errors
    ///
    /// - [`FsError::IsADirectory`] if this entry is a directory
    fn open(&self, flags: OpenFlags) -> Result<FileSession, FsError>;
}
