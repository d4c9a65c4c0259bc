//! The public handle to one node of a mounted tree.

use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use crate::FileType;
use crate::node::Node;

/// A file or directory in a mounted tree.
///
/// `Entry` is a cheap, cloneable reference. Every lookup of the same node
/// yields an `Entry` that compares equal to the others and shares the same
/// underlying payload, so a protocol engine can treat repeated lookups of a
/// path as the same logical node. Equality is identity, not structure: two
/// files with equal names and content are still different entries.
///
/// Node operations live on the [`FsDir`](crate::FsDir),
/// [`FsAttr`](crate::FsAttr) and [`FsOpen`](crate::FsOpen) traits.
///
/// # Example
///
/// ```rust
/// use jsonfs::{FsDir, JsonFs};
///
/// let dir = tempfile::tempdir().unwrap();
/// let fs = JsonFs::mount(dir.path().join("tree.json")).unwrap();
/// let root = fs.root();
///
/// let docs = root.mkdir("docs").unwrap();
/// assert_eq!(root.lookup("docs").unwrap(), docs);
/// assert_eq!(docs.path().to_str(), Some("/docs"));
/// ```
#[derive(Clone)]
pub struct Entry {
    node: Arc<Node>,
}

impl Entry {
    pub(crate) fn from_node(node: Arc<Node>) -> Self {
        Self { node }
    }

    pub(crate) fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// Inode number of this entry. Stable for the life of the mount.
    #[inline]
    pub fn inode(&self) -> u64 {
        self.node.id()
    }

    /// Whether this is a file or a directory. Never changes.
    #[inline]
    pub fn file_type(&self) -> FileType {
        self.node.kind()
    }

    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type() == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Directory
    }

    /// Current name within the parent directory.
    pub fn name(&self) -> String {
        self.node.name()
    }

    /// Absolute path from the root. The root itself is `/`.
    ///
    /// An entry that a rename unlinked gets a relative path made of its last
    /// name only, so it never passes for a live path.
    pub fn path(&self) -> PathBuf {
        self.node.path()
    }

    /// The containing directory, or `None` for the root and for entries a
    /// rename has unlinked.
    pub fn parent(&self) -> Option<Entry> {
        self.node.parent().map(Entry::from_node)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.id().hash(state);
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("inode", &self.inode())
            .field("type", &self.file_type())
            .field("path", &self.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::scratch_tree;
    use std::collections::HashSet;

    #[test]
    fn equality_is_identity() {
        let (_dir, tree, root) = scratch_tree();
        let a = tree.new_file_node("same", &root, b"x");
        let b = tree.new_file_node("same", &root, b"x");

        let a1 = Entry::from_node(Arc::clone(&a));
        let a2 = Entry::from_node(a);
        let b1 = Entry::from_node(b);
        assert_eq!(a1, a2);
        assert_ne!(a1, b1);

        let set: HashSet<_> = [a1.clone(), a2, b1].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a1));
    }

    #[test]
    fn accessors_reflect_node() {
        let (_dir, tree, root) = scratch_tree();
        let d = tree.new_dir_node("d", &root);
        let f = Entry::from_node(tree.new_file_node("f", &d, b""));

        assert!(f.is_file());
        assert!(!f.is_dir());
        assert_eq!(f.name(), "f");
        assert_eq!(f.path(), PathBuf::from("/d/f"));
        assert_eq!(f.parent().unwrap().inode(), d.id());

        let root = Entry::from_node(root);
        assert!(root.parent().is_none());
        assert_eq!(root.inode(), crate::ROOT_INODE);
    }

    #[test]
    fn entry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Entry>();
    }
}
