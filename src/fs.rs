//! A mounted tree and its protocol-engine bridge.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::tree::{self, Tree};
use crate::{
    Entry, FileSession, FsAttr, FsDir, FsError, FsHandles, FsInode, FsIo, FsOpen, Handle,
    Metadata, Mode, MountOptions, OpenFlags,
};

/// One mounted tree backed by a JSON document.
///
/// `JsonFs` owns the root and the table of numeric handles. Node operations
/// are reached through [`root`](JsonFs::root) and the traits on [`Entry`];
/// a kernel-facing protocol engine can instead drive everything by number
/// through [`FsInode`] and [`FsHandles`].
///
/// # Example
///
/// ```rust
/// use jsonfs::{FsDir, FsIo, FsOpen, JsonFs, Mode, OpenFlags};
/// use std::path::Path;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("tree.json");
///
/// let fs = JsonFs::mount(&path).unwrap();
/// let docs = fs.root().mkdir("docs").unwrap();
/// docs.create("a.txt", OpenFlags::WRITE, Mode::REGULAR)
///     .unwrap()
///     .write_at(0, b"hello")
///     .unwrap();
/// drop(fs);
///
/// // Every mutation was already written through.
/// let fs = JsonFs::mount(&path).unwrap();
/// let file = fs.resolve(Path::new("/docs/a.txt")).unwrap();
/// assert_eq!(file.open(OpenFlags::READ).unwrap().read_at(0, 16).unwrap(), b"hello");
/// ```
pub struct JsonFs {
    root: Entry,
    next_handle: AtomicU64,
    handles: RwLock<HashMap<u64, Arc<FileSession>>>,
}

impl JsonFs {
    /// Mount the document at `path` with default options.
    ///
    /// A missing or empty document is initialized with an empty root
    /// directory and written out immediately.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] if the document cannot be read or initialized
    /// - [`FsError::InvalidData`] if the document is not a tree document
    pub fn mount(path: impl AsRef<Path>) -> Result<Self, FsError> {
        Self::mount_with(path, MountOptions::default())
    }

    /// Mount the document at `path` with explicit options.
    pub fn mount_with(path: impl AsRef<Path>, options: MountOptions) -> Result<Self, FsError> {
        let root = tree::load(path.as_ref().to_path_buf(), options)?;
        Ok(Self {
            root: Entry::from_node(root),
            next_handle: AtomicU64::new(1),
            handles: RwLock::new(HashMap::new()),
        })
    }

    /// The root directory. Its path is `/` and its inode is [`crate::ROOT_INODE`].
    pub fn root(&self) -> Entry {
        self.root.clone()
    }

    /// Path of the backing document.
    pub fn backing_path(&self) -> &Path {
        self.tree().store().path()
    }

    /// The options this tree was mounted with.
    pub fn options(&self) -> &MountOptions {
        self.tree().store().options()
    }

    /// Write the whole tree to the backing document again.
    ///
    /// Use this to retry after a mutation reported a persistence failure.
    pub fn flush(&self) -> Result<(), FsError> {
        self.tree().store().flush()
    }

    /// Resolve an absolute path by looking up each component from the root.
    ///
    /// `.` components are skipped and `..` moves to the parent (staying at
    /// the root when already there).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if a component does not exist, or the path is relative
    /// - [`FsError::NotADirectory`] if a non-final component is a file
    pub fn resolve(&self, path: &Path) -> Result<Entry, FsError> {
        if !path.has_root() {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut current = self.root();
        for component in path.components() {
            current = match component {
                Component::RootDir | Component::CurDir => continue,
                Component::ParentDir => current.parent().unwrap_or_else(|| self.root()),
                Component::Normal(name) => {
                    let name = name.to_str().ok_or_else(|| FsError::NotFound {
                        path: path.to_path_buf(),
                    })?;
                    current.lookup(name)?
                }
                Component::Prefix(_) => {
                    return Err(FsError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
            };
        }
        Ok(current)
    }

    fn tree(&self) -> &Arc<Tree> {
        self.root.node().tree()
    }

    fn session(&self, handle: Handle) -> Result<Arc<FileSession>, FsError> {
        self.handles
            .read()
            .get(&handle.0)
            .cloned()
            .ok_or(FsError::InvalidHandle { handle })
    }

    fn insert(&self, session: FileSession) -> Handle {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.handles.write().insert(id, Arc::new(session));
        Handle(id)
    }
}

impl std::fmt::Debug for JsonFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFs")
            .field("backing_path", &self.backing_path())
            .field("open_handles", &self.handles.read().len())
            .finish()
    }
}

fn utf8_name(name: &OsStr) -> Result<&str, FsError> {
    name.to_str().ok_or_else(|| FsError::InvalidName {
        name: name.to_string_lossy().into_owned(),
    })
}

impl FsInode for JsonFs {
    fn path_to_inode(&self, path: &Path) -> Result<u64, FsError> {
        self.resolve(path).map(|entry| entry.inode())
    }

    fn inode_to_path(&self, inode: u64) -> Result<PathBuf, FsError> {
        self.entry(inode).map(|entry| entry.path())
    }

    fn lookup(&self, parent_inode: u64, name: &OsStr) -> Result<u64, FsError> {
        let parent = self.entry(parent_inode)?;
        let name = name.to_str().ok_or_else(|| FsError::NotFound {
            path: parent.path().join(name),
        })?;
        parent.lookup(name).map(|entry| entry.inode())
    }

    fn metadata_by_inode(&self, inode: u64) -> Result<Metadata, FsError> {
        self.entry(inode)?.getattr()
    }

    fn entry(&self, inode: u64) -> Result<Entry, FsError> {
        self.tree()
            .node(inode)
            .map(Entry::from_node)
            .ok_or(FsError::InodeNotFound { inode })
    }
}

impl FsHandles for JsonFs {
    fn open(&self, inode: u64, flags: OpenFlags) -> Result<Handle, FsError> {
        let session = self.entry(inode)?.open(flags)?;
        Ok(self.insert(session))
    }

    fn create(
        &self,
        parent_inode: u64,
        name: &OsStr,
        flags: OpenFlags,
        mode: Mode,
    ) -> Result<(u64, Handle), FsError> {
        let parent = self.entry(parent_inode)?;
        let session = parent.create(utf8_name(name)?, flags, mode)?;
        let inode = session.entry().inode();
        Ok((inode, self.insert(session)))
    }

    fn read_at(&self, handle: Handle, buf: &mut [u8], offset: u64) -> Result<usize, FsError> {
        let bytes = self.session(handle)?.read_at(offset, buf.len())?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError> {
        self.session(handle)?.write_at(offset, data)
    }

    fn close(&self, handle: Handle) -> Result<(), FsError> {
        let session = self
            .handles
            .write()
            .remove(&handle.0)
            .ok_or(FsError::InvalidHandle { handle })?;
        tracing::debug!(handle = handle.0, path = %session.entry().path().display(), "close");
        Ok(())
    }
}
