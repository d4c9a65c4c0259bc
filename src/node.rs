//! Tree nodes and navigation.
//!
//! A [`Node`] is one file or directory. Its payload ([`EntryData`]) sits behind
//! the node's reader/writer lock; its name and parent back-reference sit in a
//! separate [`Link`] behind a short-lived mutex. The link mutex is a leaf lock:
//! it is never held while waiting for anything else, so path computation and
//! directory listings never block on payload locks.
//!
//! Ownership runs strictly downward: a directory's `children` own the child
//! nodes, and a child only holds a [`Weak`] pointer to its parent.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::tree::Tree;
use crate::{FileType, FsError, ROOT_INODE, Timestamps};

/// Identity of a node within one mounted tree. Doubles as the inode number.
pub(crate) type NodeId = u64;

/// Payload of a node: exactly one of file or directory.
#[derive(Debug)]
pub(crate) enum EntryData {
    File(FileData),
    Directory(DirectoryData),
}

#[derive(Debug)]
pub(crate) struct FileData {
    /// Shared with the persistence journal; writes go through `Arc::make_mut`.
    pub(crate) content: Arc<Vec<u8>>,
    pub(crate) times: Timestamps,
}

#[derive(Debug)]
pub(crate) struct DirectoryData {
    /// Insertion order is listing order.
    pub(crate) children: Vec<Arc<Node>>,
    pub(crate) times: Timestamps,
}

impl EntryData {
    pub(crate) fn file_type(&self) -> FileType {
        match self {
            EntryData::File(_) => FileType::File,
            EntryData::Directory(_) => FileType::Directory,
        }
    }

    pub(crate) fn times(&self) -> &Timestamps {
        match self {
            EntryData::File(file) => &file.times,
            EntryData::Directory(dir) => &dir.times,
        }
    }

    pub(crate) fn times_mut(&mut self) -> &mut Timestamps {
        match self {
            EntryData::File(file) => &mut file.times,
            EntryData::Directory(dir) => &mut dir.times,
        }
    }

    /// Content length for files, 0 for directories.
    pub(crate) fn size(&self) -> u64 {
        match self {
            EntryData::File(file) => file.content.len() as u64,
            EntryData::Directory(_) => 0,
        }
    }
}

impl FileData {
    /// Truncate or zero-extend the content to `len` bytes.
    ///
    /// Fails without touching the content when `len` cannot be allocated.
    pub(crate) fn set_len(&mut self, len: u64, operation: &'static str) -> Result<(), FsError> {
        let len = addressable(len, operation)?;
        let content = Arc::make_mut(&mut self.content);
        if let Some(extra) = len.checked_sub(content.len()) {
            content
                .try_reserve_exact(extra)
                .map_err(|_| FsError::NotSupported { operation })?;
        }
        content.resize(len, 0);
        Ok(())
    }

    /// Overwrite `data` at `offset`, zero-filling any gap past the end.
    pub(crate) fn write_at(
        &mut self,
        offset: u64,
        data: &[u8],
        operation: &'static str,
    ) -> Result<(), FsError> {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(FsError::NotSupported { operation })?;
        if end > self.content.len() as u64 {
            self.set_len(end, operation)?;
        }
        // `end` fits in the content now, so `offset` does too.
        let start = addressable(offset, operation)?;
        Arc::make_mut(&mut self.content)[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    pub(crate) fn append(&mut self, data: &[u8], operation: &'static str) -> Result<(), FsError> {
        let content = Arc::make_mut(&mut self.content);
        content
            .try_reserve(data.len())
            .map_err(|_| FsError::NotSupported { operation })?;
        content.extend_from_slice(data);
        Ok(())
    }
}

/// A byte count no `Vec` could ever hold is rejected before allocating.
fn addressable(len: u64, operation: &'static str) -> Result<usize, FsError> {
    usize::try_from(len)
        .ok()
        .filter(|&len| len <= isize::MAX as usize)
        .ok_or(FsError::NotSupported { operation })
}

#[derive(Debug)]
struct Link {
    name: String,
    parent: Weak<Node>,
}

/// One file or directory in a mounted tree.
pub(crate) struct Node {
    id: NodeId,
    kind: FileType,
    tree: Arc<Tree>,
    link: Mutex<Link>,
    /// The node's concurrency guard.
    pub(crate) data: RwLock<EntryData>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        tree: Arc<Tree>,
        name: String,
        parent: Weak<Node>,
        data: EntryData,
    ) -> Self {
        Self {
            id,
            kind: data.file_type(),
            tree,
            link: Mutex::new(Link { name, parent }),
            data: RwLock::new(data),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// Kind never changes after construction, so no lock is needed.
    #[inline]
    pub(crate) fn kind(&self) -> FileType {
        self.kind
    }

    #[inline]
    pub(crate) fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    pub(crate) fn name(&self) -> String {
        self.link.lock().name.clone()
    }

    pub(crate) fn has_name(&self, name: &str) -> bool {
        self.link.lock().name == name
    }

    pub(crate) fn parent(&self) -> Option<Arc<Node>> {
        self.link.lock().parent.upgrade()
    }

    /// Re-home the node. Callers hold the write locks of both directories involved.
    pub(crate) fn relink(&self, name: &str, parent: &Arc<Node>) {
        let mut link = self.link.lock();
        link.name = name.to_owned();
        link.parent = Arc::downgrade(parent);
    }

    /// Cut the parent link of a node that left the tree.
    pub(crate) fn detach(&self) {
        self.link.lock().parent = Weak::new();
    }

    /// Whether the node is still part of the tree. Rename only ever unlinks
    /// files and empty directories, so no linked node has an unlinked ancestor.
    pub(crate) fn is_linked(&self) -> bool {
        self.tree.node(self.id).is_some()
    }

    /// `NotFound` for a directory a rename has unlinked. Callers hold the
    /// node's payload lock so the answer cannot change underneath them.
    pub(crate) fn ensure_linked(&self) -> Result<(), FsError> {
        if self.is_linked() {
            Ok(())
        } else {
            Err(FsError::NotFound { path: self.path() })
        }
    }

    /// Absolute path, built by walking parent links up to the root.
    ///
    /// A node that a rename unlinked has no way back to the root. Its path is
    /// relative and starts at its own last name, e.g. `notes.txt`.
    pub(crate) fn path(&self) -> PathBuf {
        let mut names = Vec::new();
        let mut top = self.id;
        let (mut pending, mut parent) = {
            let link = self.link.lock();
            (link.name.clone(), link.parent.upgrade())
        };
        while let Some(node) = parent {
            names.push(pending);
            top = node.id;
            let link = node.link.lock();
            pending = link.name.clone();
            parent = link.parent.upgrade();
        }

        if top != ROOT_INODE {
            names.push(pending);
            return names.iter().rev().collect();
        }
        // `pending` holds the root's own name, which is not part of any path.
        let mut path = PathBuf::from("/");
        path.extend(names.iter().rev());
        path
    }

    /// Path of a child that may not exist yet.
    pub(crate) fn child_path(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Returns `true` if `self` is `other` or one of its ancestors.
    pub(crate) fn contains(&self, other: &Arc<Node>) -> bool {
        let mut current = Some(Arc::clone(other));
        while let Some(node) = current {
            if node.id == self.id {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Payload as a directory, or `NotADirectory`.
    pub(crate) fn as_dir<'a>(&self, data: &'a EntryData) -> Result<&'a DirectoryData, FsError> {
        match data {
            EntryData::Directory(dir) => Ok(dir),
            EntryData::File(_) => Err(FsError::NotADirectory { path: self.path() }),
        }
    }

    pub(crate) fn as_dir_mut<'a>(
        &self,
        data: &'a mut EntryData,
    ) -> Result<&'a mut DirectoryData, FsError> {
        match data {
            EntryData::Directory(dir) => Ok(dir),
            EntryData::File(_) => Err(FsError::NotADirectory { path: self.path() }),
        }
    }

    pub(crate) fn as_file<'a>(&self, data: &'a EntryData) -> Result<&'a FileData, FsError> {
        match data {
            EntryData::File(file) => Ok(file),
            EntryData::Directory(_) => Err(FsError::IsADirectory { path: self.path() }),
        }
    }

    pub(crate) fn as_file_mut<'a>(
        &self,
        data: &'a mut EntryData,
    ) -> Result<&'a mut FileData, FsError> {
        match data {
            EntryData::File(file) => Ok(file),
            EntryData::Directory(_) => Err(FsError::IsADirectory { path: self.path() }),
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name())
            .finish()
    }
}

impl DirectoryData {
    /// First child with the given name.
    pub(crate) fn find_child(&self, name: &str) -> Option<&Arc<Node>> {
        self.children.iter().find(|child| child.has_name(name))
    }

    pub(crate) fn position_of(&self, id: NodeId) -> Option<usize> {
        self.children.iter().position(|child| child.id() == id)
    }

    /// Remove a child by identity, returning it.
    pub(crate) fn unlink(&mut self, id: NodeId) -> Option<Arc<Node>> {
        let index = self.position_of(id)?;
        Some(self.children.remove(index))
    }
}

/// Reject names that cannot appear as a single path component.
pub(crate) fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\0')
    {
        return Err(FsError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}
