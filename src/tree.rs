//! A mounted tree: node allocation, the inode index and startup loading.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

use crate::document::{self, DocNode};
use crate::node::{DirectoryData, EntryData, FileData, Node, NodeId};
use crate::persist::{Journal, Record, Store};
use crate::{FsError, MountOptions, ROOT_INODE, Timestamps};

/// State shared by every node of one mounted tree.
///
/// The tree never owns nodes: the root is owned by the mount and everything
/// else by its parent directory. The index only holds weak references so
/// inode numbers can be resolved back to live nodes.
pub(crate) struct Tree {
    store: Store,
    next_id: AtomicU64,
    index: Mutex<HashMap<NodeId, Weak<Node>>>,
    /// Taken before any node lock by renames that move between directories.
    renames: Mutex<()>,
}

impl Tree {
    fn new(path: PathBuf, options: MountOptions) -> Arc<Self> {
        Arc::new(Self {
            store: Store::new(path, options, Journal::new(ROOT_INODE)),
            next_id: AtomicU64::new(ROOT_INODE),
            index: Mutex::new(HashMap::new()),
            renames: Mutex::new(()),
        })
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    fn allocate_id(&self) -> NodeId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn register(&self, node: &Arc<Node>) {
        self.index.lock().insert(node.id(), Arc::downgrade(node));
    }

    /// Allocate a fresh node. The caller links it into its parent.
    pub(crate) fn new_node(
        self: &Arc<Self>,
        name: String,
        parent: Weak<Node>,
        data: EntryData,
    ) -> Arc<Node> {
        let node = Arc::new(Node::new(
            self.allocate_id(),
            Arc::clone(self),
            name,
            parent,
            data,
        ));
        self.register(&node);
        node
    }

    /// Resolve a node id, if the node is still linked into the tree.
    pub(crate) fn node(&self, id: NodeId) -> Option<Arc<Node>> {
        self.index.lock().get(&id).and_then(Weak::upgrade)
    }

    /// Drop an unlinked node from the index.
    pub(crate) fn forget(&self, id: NodeId) {
        self.index.lock().remove(&id);
    }

    pub(crate) fn rename_lock(&self) -> MutexGuard<'_, ()> {
        self.renames.lock()
    }

    /// Build a subtree from the document, assigning ids in pre-order.
    fn build(self: &Arc<Self>, doc: DocNode, parent: Weak<Node>) -> Arc<Node> {
        let id = self.allocate_id();
        let node = match doc {
            DocNode::File(file) => {
                let times = file.times();
                let data = EntryData::File(FileData {
                    content: Arc::new(file.content.into_bytes()),
                    times,
                });
                Arc::new(Node::new(id, Arc::clone(self), file.name, parent, data))
            }
            DocNode::Directory(dir) => {
                let times = dir.times();
                Arc::new_cyclic(|me| {
                    let children = dir
                        .content
                        .into_iter()
                        .map(|child| self.build(child, me.clone()))
                        .collect();
                    let data = EntryData::Directory(DirectoryData { children, times });
                    Node::new(id, Arc::clone(self), dir.name, parent, data)
                })
            }
        };
        self.register(&node);
        node
    }
}

/// Load the tree stored at `path`, initializing an empty document if needed.
pub(crate) fn load(path: PathBuf, options: MountOptions) -> Result<Arc<Node>, FsError> {
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(source) => {
            return Err(FsError::Io {
                operation: "load",
                path,
                source,
            });
        }
    };
    let doc = document::parse(&bytes, &path)?;

    let tree = Tree::new(path, options);
    let root = match doc {
        None => {
            let name = tree.store().options().root_name.clone();
            let data = EntryData::Directory(DirectoryData {
                children: Vec::new(),
                times: Timestamps::now(),
            });
            let root = tree.new_node(name, Weak::new(), data);
            seed(&tree, &root);
            tree.store().flush()?;
            tracing::info!(path = %tree.store().path().display(), "initialized empty document");
            root
        }
        Some(DocNode::File(_)) => {
            return Err(FsError::InvalidData {
                path: tree.store().path().to_path_buf(),
                details: "root node is not a directory".into(),
            });
        }
        Some(doc @ DocNode::Directory(_)) => {
            let root = tree.build(doc, Weak::new());
            seed(&tree, &root);
            root
        }
    };

    tracing::info!(
        path = %tree.store().path().display(),
        nodes = tree.store().with_journal(|journal| journal.len()),
        "mounted"
    );
    Ok(root)
}

/// Mirror a freshly built subtree into the journal.
fn seed(tree: &Tree, node: &Arc<Node>) {
    let data = node.data.read();
    let record = Record::capture(node.name(), &data);
    tree.store()
        .with_journal(|journal| journal.seed(node.id(), record));
    if let EntryData::Directory(dir) = &*data {
        for child in &dir.children {
            seed(tree, child);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::document::DocFile;
    use tempfile::TempDir;

    /// A freshly initialized tree in a throwaway directory.
    pub(crate) fn scratch_tree() -> (TempDir, Arc<Tree>, Arc<Node>) {
        let dir = tempfile::tempdir().unwrap();
        let root = load(dir.path().join("tree.json"), MountOptions::default()).unwrap();
        let tree = Arc::clone(root.tree());
        (dir, tree, root)
    }

    impl Tree {
        fn attach(self: &Arc<Self>, name: &str, parent: &Arc<Node>, data: EntryData) -> Arc<Node> {
            let record = Record::capture(name.into(), &data);
            let node = self.new_node(name.into(), Arc::downgrade(parent), data);
            let mut parent_data = parent.data.write();
            parent.as_dir_mut(&mut parent_data).unwrap().children.push(Arc::clone(&node));
            let parent_record = Record::capture(parent.name(), &parent_data);
            self.store().with_journal(|journal| {
                journal.seed(node.id(), record);
                journal.seed(parent.id(), parent_record);
            });
            node
        }

        pub(crate) fn new_dir_node(self: &Arc<Self>, name: &str, parent: &Arc<Node>) -> Arc<Node> {
            self.attach(
                name,
                parent,
                EntryData::Directory(DirectoryData {
                    children: Vec::new(),
                    times: Timestamps::default(),
                }),
            )
        }

        pub(crate) fn new_file_node(
            self: &Arc<Self>,
            name: &str,
            parent: &Arc<Node>,
            content: &[u8],
        ) -> Arc<Node> {
            self.attach(
                name,
                parent,
                EntryData::File(FileData {
                    content: Arc::new(content.to_vec()),
                    times: Timestamps::default(),
                }),
            )
        }
    }

    fn write_doc(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("tree.json");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn missing_document_is_initialized() {
        let (dir, _tree, root) = scratch_tree();
        assert_eq!(root.id(), ROOT_INODE);
        assert_eq!(root.name(), "root");

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("tree.json")).unwrap()).unwrap();
        assert_eq!(value["type"], "directory");
        assert_eq!(value["name"], "root");
        assert_eq!(value["content"], serde_json::json!([]));
    }

    #[test]
    fn whitespace_document_uses_configured_root_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, "  \n");
        let root = load(path, MountOptions::default().with_root_name("mnt")).unwrap();
        assert_eq!(root.name(), "mnt");
    }

    #[test]
    fn ids_are_assigned_in_pre_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(
            &dir,
            r#"{"type":"directory","name":"r","content":[
                {"type":"directory","name":"a","content":[
                    {"type":"file","name":"x","content":"1"}
                ]},
                {"type":"file","name":"b","content":"2"}
            ]}"#,
        );
        let root = load(path, MountOptions::default()).unwrap();
        let tree = Arc::clone(root.tree());

        let data = root.data.read();
        let dir = root.as_dir(&data).unwrap();
        let a = dir.find_child("a").unwrap();
        let b = dir.find_child("b").unwrap();
        assert_eq!((root.id(), a.id(), b.id()), (1, 2, 4));

        let x = tree.node(3).unwrap();
        assert_eq!(x.path(), PathBuf::from("/a/x"));
        assert!(Arc::ptr_eq(&x.parent().unwrap(), a));
        assert_eq!(tree.store().with_journal(|journal| journal.len()), 4);
    }

    #[test]
    fn file_root_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let doc = DocNode::File(DocFile {
            name: "f".into(),
            content: String::new(),
            created_at: 0,
            last_accessed_at: 0,
            last_modified_at: 0,
        });
        let path = dir.path().join("tree.json");
        std::fs::write(&path, document::encode(&doc, false).unwrap()).unwrap();

        let err = load(path, MountOptions::default()).unwrap_err();
        assert!(matches!(err, FsError::InvalidData { .. }));
    }

    #[test]
    fn unreadable_document_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a document.
        let err = load(dir.path().to_path_buf(), MountOptions::default()).unwrap_err();
        assert!(matches!(err, FsError::Io { operation: "load", .. }));
    }

    #[test]
    fn forgotten_nodes_stop_resolving() {
        let (_dir, tree, root) = scratch_tree();
        let f = tree.new_file_node("f", &root, b"");
        assert!(tree.node(f.id()).is_some());
        tree.forget(f.id());
        assert!(tree.node(f.id()).is_none());
    }

    #[test]
    fn new_ids_are_never_reused() {
        let (_dir, tree, root) = scratch_tree();
        let a = tree.new_file_node("a", &root, b"");
        tree.forget(a.id());
        let b = tree.new_file_node("b", &root, b"");
        assert!(b.id() > a.id());
    }
}
