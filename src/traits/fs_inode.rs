//! Inode-number access for a protocol engine.
//!
//! Kernel-facing protocol engines (FUSE and friends) address nodes by number
//! rather than by path. [`FsInode`] maps between the two and exposes the
//! lookups such an engine issues most often.
//!
//! # Example
//!
//! ```rust
//! use jsonfs::{FsError, FsInode, Metadata};
//! use std::ffi::OsStr;
//!
//! fn child_metadata<B: FsInode>(
//!     fs: &B,
//!     parent: u64,
//!     name: &OsStr,
//! ) -> Result<Metadata, FsError> {
//!     let child = fs.lookup(parent, name)?;
//!     fs.metadata_by_inode(child)
//! }
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::{Entry, FsError, Metadata};

/// Inode-based access to a mounted tree.
///
/// # Root Inode
///
/// The root is always [`crate::ROOT_INODE`]. Other inode numbers are handed
/// out in increasing order and never reused within one mount. An entry that a
/// rename unlinks stops resolving, even while sessions on it stay open.
pub trait FsInode: Send + Sync {
    /// Walk an absolute path from the root.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if a component does not exist
    /// - [`FsError::NotADirectory`] if a non-final component is a file
    fn path_to_inode(&self, path: &Path) -> Result<u64, FsError>;

    /// Current absolute path of an inode.
    ///
    /// # Errors
    ///
    /// - [`FsError::InodeNotFound`] if the inode does not exist
    fn inode_to_path(&self, inode: u64) -> Result<PathBuf, FsError>;

    /// Find the child `name` of directory `parent_inode`.
    ///
    /// # Errors
    ///
    /// - [`FsError::InodeNotFound`] if the parent inode does not exist
    /// - [`FsError::NotADirectory`] if the parent is a file
    /// - [`FsError::NotFound`] if the child does not exist
    fn lookup(&self, parent_inode: u64, name: &OsStr) -> Result<u64, FsError>;

    /// Attributes of an inode.
    ///
    /// # Errors
    ///
    /// - [`FsError::InodeNotFound`] if the inode does not exist
    fn metadata_by_inode(&self, inode: u64) -> Result<Metadata, FsError>;

    /// The [`Entry`] behind an inode, for calling node operations directly.
    ///
    /// # Errors
    ///
    /// - [`FsError::InodeNotFound`] if the inode does not exist
    fn entry(&self, inode: u64) -> Result<Entry, FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_inode_is_object_safe() {
        fn _check(_: &dyn FsInode) {}
    }
}
