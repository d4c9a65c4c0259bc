//! Attribute operations on a tree node.

use crate::{FsError, Metadata, SetAttr};

/// Read and update a node's attributes.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsAttr`.
pub trait FsAttr: Send + Sync {
    /// Kind, size (content length for files, 0 for directories), timestamps
    /// and inode number.
    fn getattr(&self) -> Result<Metadata, FsError>;

    /// Apply the fields `attr` carries and persist the result.
    ///
    /// Timestamps are taken as given. A size change truncates or zero-extends
    /// a file's content and also moves its modification time to now, unless
    /// `attr` sets that explicitly. Returns the updated metadata.
    ///
    /// # Errors
    ///
    /// - [`FsError::IsADirectory`] if `attr.size` is set on a directory
    fn setattr(&self, attr: SetAttr) -> Result<Metadata, FsError>;
}
