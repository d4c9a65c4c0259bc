//! Directory operations on a tree node.

use crate::{DirEntry, Entry, FileSession, FsError, Mode, OpenFlags};

/// Directory operations on a node.
///
/// Every method fails with [`FsError::NotADirectory`] when called on a file.
/// Mutating methods persist the whole tree before returning; if that write
/// fails the change stays applied in memory and the error is returned (see
/// [`FsError::is_persistence_failure`]).
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsDir`.
pub trait FsDir: Send + Sync {
    /// List children as `(name, kind, inode)` in listing order.
    ///
    /// The listing is a snapshot taken under the directory's read lock.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if this entry is a file
    fn read_dir(&self) -> Result<ReadDirIter, FsError>;

    /// Find the child called `name`. If a hand-written document holds
    /// duplicate names, the first one wins.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if no child has that name
    /// - [`FsError::NotADirectory`] if this entry is a file
    fn lookup(&self, name: &str) -> Result<Entry, FsError>;

    /// Create a regular file and open it.
    ///
    /// If `name` already exists and `flags.exclusive` is not set, the existing
    /// entry is opened with `flags` instead (honoring `truncate`).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if this entry is a file
    /// - [`FsError::NotSupported`] if `mode` does not request a regular file
    /// - [`FsError::InvalidName`] if `name` is not a single path component
    /// - [`FsError::AlreadyExists`] if `name` exists and `flags.exclusive` is set
    /// - [`FsError::IsADirectory`] if `name` exists and is a directory
    fn create(&self, name: &str, flags: OpenFlags, mode: Mode) -> Result<FileSession, FsError>;

    /// Create an empty directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if this entry is a file
    /// - [`FsError::InvalidName`] if `name` is not a single path component
    /// - [`FsError::AlreadyExists`] if `name` exists
    fn mkdir(&self, name: &str) -> Result<Entry, FsError>;

    /// Move the child `old_name` to `new_parent` under `new_name`.
    ///
    /// | Destination | Source file | Source directory |
    /// |-------------|-------------|------------------|
    /// | absent | moved | moved |
    /// | file | content copied over it, source removed | `AlreadyExists` |
    /// | empty directory | `AlreadyExists` | replaces it |
    /// | non-empty directory | `AlreadyExists` | `DirectoryNotEmpty` |
    ///
    /// Renaming an entry onto its own name in its own directory does nothing.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `old_name` does not exist
    /// - [`FsError::NotADirectory`] if this entry or `new_parent` is a file
    /// - [`FsError::InvalidName`] if `new_name` is not a single path component
    /// - [`FsError::InvalidRename`] if a directory would move into its own subtree
    /// - [`FsError::AlreadyExists`] or [`FsError::DirectoryNotEmpty`] as tabled above
    fn rename(&self, old_name: &str, new_parent: &Entry, new_name: &str) -> Result<(), FsError>;
}

/// Iterator over directory entries.
///
/// - Outer `Result` (from [`FsDir::read_dir`]) = "is this a directory?"
/// - Inner `Result` (per item) = "can I read this entry?"
///
/// # Example
///
/// ```rust
/// use jsonfs::{FsDir, FsError};
///
/// fn list_names<D: FsDir>(dir: &D) -> Result<Vec<String>, FsError> {
///     let mut names = Vec::new();
///     for entry in dir.read_dir()? {
///         names.push(entry?.name);
///     }
///     Ok(names)
/// }
/// ```
pub struct ReadDirIter(Box<dyn Iterator<Item = Result<DirEntry, FsError>> + Send + 'static>);

impl ReadDirIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<DirEntry, FsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(entries: Vec<Result<DirEntry, FsError>>) -> Self {
        Self(Box::new(entries.into_iter()))
    }

    /// Collect all entries, short-circuiting on first error.
    pub fn collect_all(self) -> Result<Vec<DirEntry>, FsError> {
        self.collect()
    }
}

impl Iterator for ReadDirIter {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}
