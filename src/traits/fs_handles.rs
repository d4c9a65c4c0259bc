//! Numeric file handles for a protocol engine.
//!
//! This module provides the [`FsHandles`] trait, which keeps open sessions in
//! a table and lets callers address them by an opaque [`Handle`]. The
//! workflow is:
//!
//! 1. `open()` or `create()` - start a session and get a handle
//! 2. `read_at()` / `write_at()` - perform I/O through the handle
//! 3. `close()` - release the handle
//!
//! # Example
//!
//! ```rust
//! use jsonfs::{FsError, FsHandles, OpenFlags};
//!
//! fn copy_file<B: FsHandles>(fs: &B, src: u64, dst: u64) -> Result<(), FsError> {
//!     let src = fs.open(src, OpenFlags::READ)?;
//!     let dst = fs.open(dst, OpenFlags::WRITE)?;
//!
//!     let mut buf = [0u8; 4096];
//!     let mut offset = 0;
//!     loop {
//!         let n = fs.read_at(src, &mut buf, offset)?;
//!         if n == 0 {
//!             break;
//!         }
//!         fs.write_at(dst, &buf[..n], offset)?;
//!         offset += n as u64;
//!     }
//!
//!     fs.close(src)?;
//!     fs.close(dst)?;
//!     Ok(())
//! }
//! ```

use std::ffi::OsStr;

use crate::{FsError, Handle, Mode, OpenFlags};

/// Handle-based file operations.
///
/// # Handle Lifecycle
///
/// 1. Obtain a handle via [`open`](FsHandles::open) or [`create`](FsHandles::create)
/// 2. Perform operations with [`read_at`](FsHandles::read_at) and
///    [`write_at`](FsHandles::write_at)
/// 3. Release the handle with [`close`](FsHandles::close)
///
/// Handle numbers start at 1 and are never reused within one mount.
pub trait FsHandles: Send + Sync {
    /// Open a file by inode.
    ///
    /// # Errors
    ///
    /// - [`FsError::InodeNotFound`] if the inode does not exist
    /// - [`FsError::IsADirectory`] if the inode is a directory
    fn open(&self, inode: u64, flags: OpenFlags) -> Result<Handle, FsError>;

    /// Create (or, without `flags.exclusive`, reuse) the file `name` in
    /// directory `parent_inode` and open it. Returns the file's inode and
    /// the new handle.
    ///
    /// # Errors
    ///
    /// - [`FsError::InodeNotFound`] if the parent inode does not exist
    /// - Any error of [`FsDir::create`](crate::FsDir::create)
    fn create(
        &self,
        parent_inode: u64,
        name: &OsStr,
        flags: OpenFlags,
        mode: Mode,
    ) -> Result<(u64, Handle), FsError>;

    /// Read into `buf` starting at `offset`.
    ///
    /// Returns the number of bytes read; 0 at or past the end of the file.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    fn read_at(&self, handle: Handle, buf: &mut [u8], offset: u64) -> Result<usize, FsError>;

    /// Write `data` at `offset` (ignored for append sessions).
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    /// - Any persistence error of the write
    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError>;

    /// Close a file handle.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is already closed or invalid
    fn close(&self, handle: Handle) -> Result<(), FsError>;
}
