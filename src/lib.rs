//! # jsonfs
//!
//! A virtual filesystem tree backed by a **single JSON document**.
//!
//! A mounted tree presents nested files and directories through ordinary
//! filesystem operations (listing, lookup, open, read, write, create, mkdir,
//! rename, getattr, setattr) and rewrites the whole document on every
//! mutation, before the mutation reports success.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use jsonfs::{FsDir, FsIo, JsonFs, Mode, OpenFlags};
//!
//! # fn main() -> Result<(), jsonfs::FsError> {
//! # let dir = tempfile::tempdir().unwrap();
//! # let path = dir.path().join("tree.json");
//! let fs = JsonFs::mount(&path)?;
//! let root = fs.root();
//!
//! let docs = root.mkdir("docs")?;
//! let notes = docs.create("notes.txt", OpenFlags::READ_WRITE, Mode::REGULAR)?;
//! notes.write_at(0, b"hello")?;
//!
//! root.rename("docs", &root, "archive")?;
//! assert_eq!(notes.entry().path().to_str(), Some("/archive/notes.txt"));
//! # Ok(())
//! # }
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`JsonFs`] | One mounted tree: root, backing document, handle table |
//! | [`Entry`] | Cheap handle to one file or directory; equality is identity |
//! | [`FileSession`] | One open of a file, used for reads and writes |
//! | [`MountOptions`] | Root name for new documents, output format, write strategy |
//! | [`FsError`] | Error type with path and operation context |
//! | [`Metadata`] | Kind, size, timestamps, inode |
//! | [`DirEntry`] | Single directory listing entry |
//!
//! ---
//!
//! ## Operations
//!
//! | Trait | On | Methods |
//! |-------|----|---------|
//! | [`FsDir`] | [`Entry`] | `read_dir`, `lookup`, `create`, `mkdir`, `rename` |
//! | [`FsAttr`] | [`Entry`] | `getattr`, `setattr` |
//! | [`FsOpen`] | [`Entry`] | `open` |
//! | [`FsIo`] | [`FileSession`] | `read_at`, `write_at` |
//! | [`FsInode`] | [`JsonFs`] | inode-number lookups for a protocol engine |
//! | [`FsHandles`] | [`JsonFs`] | numeric file handles for a protocol engine |
//!
//! [`FsNode`] and [`FsMount`] are the composites, with blanket implementations.
//!
//! ---
//!
//! ## Persistence
//!
//! Every mutating call serializes the whole tree and overwrites the backing
//! document before returning. If that write fails the call returns
//! [`FsError::Io`] but the change stays applied in memory; nothing is rolled
//! back. [`JsonFs::flush`] writes the tree again.
//!
//! ```rust
//! use jsonfs::FsError;
//! use std::path::PathBuf;
//!
//! let err = FsError::Io {
//!     operation: "flush",
//!     path: PathBuf::from("/ro/tree.json"),
//!     source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
//! };
//! assert!(err.is_persistence_failure());
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! Everything is `Send + Sync` and every method takes `&self`. Each node has
//! its own reader/writer lock, so writes to different files proceed in
//! parallel; only the document writes themselves are serialized. Renames
//! that touch several nodes lock them in ascending inode order.
//!
//! ---
//!
//! ## Logging
//!
//! Operations emit [`tracing`](https://docs.rs/tracing) events: `debug` per
//! operation with the entry's path, `info` on mount, `warn` when a document
//! write fails and `trace` for each successful write. The crate never installs
//! a subscriber.

// Private modules
mod document;
mod entry;
mod error;
mod fs;
mod guard;
mod node;
mod ops;
mod options;
mod persist;
mod session;
mod traits;
mod tree;
mod types;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - core types
pub use entry::Entry;
pub use fs::JsonFs;
pub use options::MountOptions;
pub use session::FileSession;
pub use types::{
    DirEntry, FileType, Handle, Metadata, Mode, OpenFlags, ROOT_INODE, SetAttr, Timestamps,
};

// Public re-exports - node operations
pub use traits::{FsAttr, FsDir, FsNode, FsOpen, ReadDirIter};

// Public re-exports - sessions
pub use traits::FsIo;

// Public re-exports - protocol engine bridge
pub use traits::{FsHandles, FsInode, FsMount};
