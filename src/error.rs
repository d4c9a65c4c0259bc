//! Error types for the jsonfs tree.

use std::path::PathBuf;

/// Filesystem error type with contextual variants.
///
/// Every failure is scoped to the single operation that raised it: the tree
/// stays usable afterwards. Uses `#[non_exhaustive]` for forward compatibility.
///
/// # Examples
///
/// ```rust
/// use jsonfs::FsError;
/// use std::path::PathBuf;
///
/// let err = FsError::NotFound { path: PathBuf::from("/missing") };
/// assert_eq!(err.to_string(), "not found: /missing");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Path/Entry Errors
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: PathBuf,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Expected a directory but found a file.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: PathBuf,
    },

    /// Expected a file but found a directory.
    #[error("is a directory: {path}")]
    IsADirectory {
        /// The path that is a directory.
        path: PathBuf,
    },

    /// Directory is not empty when it should be.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The path to the non-empty directory.
        path: PathBuf,
    },

    /// A child name is empty, `.`/`..`, or contains a path separator.
    #[error("invalid name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A directory would be moved into itself or one of its descendants.
    #[error("cannot move {from} into {to}")]
    InvalidRename {
        /// The directory being moved.
        from: PathBuf,
        /// The requested destination.
        to: PathBuf,
    },

    /// Inode does not exist (or was unlinked by a rename).
    #[error("inode not found: {inode}")]
    InodeNotFound {
        /// The inode number that was not found.
        inode: u64,
    },

    /// File handle is invalid or closed.
    #[error("invalid handle: {}", handle.0)]
    InvalidHandle {
        /// The invalid handle.
        handle: crate::Handle,
    },

    // Backend/Operation Errors
    /// Operation is not supported.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    // Data Errors
    /// The backing document is not a valid tree document.
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The backing document path.
        path: PathBuf,
        /// Details about the invalid data.
        details: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Returns `true` if this error came from reading or writing the backing document.
    ///
    /// When a mutating operation returns such an error the mutation has already
    /// been applied in memory; callers may retry with [`JsonFs::flush`](crate::JsonFs::flush).
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, FsError::Io { .. } | FsError::Serialization(_))
    }
}
