//! # Filesystem Traits
//!
//! The operation set of a mounted tree, split by capability.
//!
//! ## Trait Layers
//!
//! ```text
//! Per node (Entry):       FsDir + FsAttr + FsOpen = FsNode
//! Per session:            FsIo
//! Per mount (JsonFs):     FsInode + FsHandles = FsMount
//! ```
//!
//! ## Quick Reference
//!
//! | Trait | Implemented by | Operations |
//! |-------|----------------|------------|
//! | [`FsDir`] | [`Entry`](crate::Entry) | `read_dir`, `lookup`, `create`, `mkdir`, `rename` |
//! | [`FsAttr`] | [`Entry`](crate::Entry) | `getattr`, `setattr` |
//! | [`FsOpen`] | [`Entry`](crate::Entry) | `open` |
//! | [`FsIo`] | [`FileSession`](crate::FileSession) | `read_at`, `write_at` |
//! | [`FsInode`] | [`JsonFs`](crate::JsonFs) | `path_to_inode`, `inode_to_path`, `lookup`, `metadata_by_inode`, `entry` |
//! | [`FsHandles`] | [`JsonFs`](crate::JsonFs) | `open`, `create`, `read_at`, `write_at`, `close` |
//!
//! ## Blanket Implementations
//!
//! The composite traits [`FsNode`] and [`FsMount`] are implemented for every
//! type that implements their components.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self`; the tree uses
//! per-node reader/writer locks internally.
//!
//! ## Object Safety
//!
//! All traits are object-safe:
//!
//! ```rust
//! use jsonfs::{FsError, FsNode};
//!
//! fn size_of_child(dir: &dyn FsNode, name: &str) -> Result<u64, FsError> {
//!     use jsonfs::FsAttr;
//!     Ok(dir.lookup(name)?.getattr()?.size)
//! }
//! ```

mod fs_attr;
mod fs_dir;
mod fs_handles;
mod fs_inode;
mod fs_io;
mod fs_open;

// Node operations
pub use fs_attr::FsAttr;
pub use fs_dir::{FsDir, ReadDirIter};
pub use fs_open::FsOpen;

// Sessions
pub use fs_io::FsIo;

// Mount bridge
pub use fs_handles::FsHandles;
pub use fs_inode::FsInode;

/// Every operation a tree node supports.
///
/// Combines directory operations ([`FsDir`]), attributes ([`FsAttr`]) and
/// opening ([`FsOpen`]).
///
/// # Blanket Implementation
///
/// Automatically implemented for any type that implements all three component
/// traits.
///
/// # Example
///
/// ```rust
/// use jsonfs::{FsError, FsNode, OpenFlags};
///
/// fn touch<N: FsNode>(dir: &N, name: &str) -> Result<(), FsError> {
///     dir.create(name, OpenFlags::READ_WRITE, jsonfs::Mode::REGULAR)?.close();
///     Ok(())
/// }
/// ```
pub trait FsNode: FsDir + FsAttr + FsOpen {}

impl<T: FsDir + FsAttr + FsOpen> FsNode for T {}

/// Number-addressed access for a protocol engine.
///
/// Combines [`FsInode`] and [`FsHandles`].
///
/// # Blanket Implementation
///
/// Automatically implemented for any type that implements both.
pub trait FsMount: FsInode + FsHandles {}

impl<T: FsInode + FsHandles> FsMount for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composites_are_object_safe() {
        fn _node(_: &dyn FsNode) {}
        fn _mount(_: &dyn FsMount) {}
    }

    #[test]
    fn entry_and_mount_get_composites() {
        fn assert_node<T: FsNode>() {}
        fn assert_mount<T: FsMount>() {}
        assert_node::<crate::Entry>();
        assert_mount::<crate::JsonFs>();
    }
}
