//! Persistence writer.
//!
//! The store keeps a journal: a mirror of every linked node's persisted form,
//! keyed by node id. Mutating operations describe what they changed as a list
//! of [`Change`]s and commit them while still holding their node locks; the
//! commit applies the changes and rewrites the whole document from the
//! journal under one tree-wide mutex.
//!
//! The journal mutex is the last lock in the lock order. Nothing waits for a
//! node lock while holding it, so flushes are serialized without ever needing
//! to read a payload some other writer has locked.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::document::{self, DocDirectory, DocFile, DocNode};
use crate::node::{EntryData, Node, NodeId};
use crate::{FsError, MountOptions, Timestamps};

/// Persisted form of one node.
#[derive(Debug, Clone)]
pub(crate) struct Record {
    name: String,
    body: Body,
}

#[derive(Debug, Clone)]
enum Body {
    File {
        content: Arc<Vec<u8>>,
        times: Timestamps,
    },
    Directory {
        children: Vec<NodeId>,
        times: Timestamps,
    },
}

impl Record {
    /// Snapshot a node's payload. The caller holds the node's lock.
    pub(crate) fn capture(name: String, data: &EntryData) -> Self {
        let body = match data {
            EntryData::File(file) => Body::File {
                content: Arc::clone(&file.content),
                times: file.times,
            },
            EntryData::Directory(dir) => Body::Directory {
                children: dir.children.iter().map(|child| child.id()).collect(),
                times: dir.times,
            },
        };
        Self { name, body }
    }
}

/// One journal update.
#[derive(Debug)]
pub(crate) enum Change {
    /// A node was added under `parent`. Ignored if the parent is no longer linked.
    Insert {
        parent: NodeId,
        id: NodeId,
        record: Record,
    },
    /// An existing node's payload changed. Ignored for unlinked nodes.
    Update { id: NodeId, record: Record },
    /// An existing node was renamed in place or moved.
    Rename { id: NodeId, name: String },
    /// A node left the tree.
    Remove { id: NodeId },
}

impl Change {
    /// Refresh `node`'s record from its payload. The caller holds the node's lock.
    pub(crate) fn update(node: &Node, data: &EntryData) -> Self {
        Change::Update {
            id: node.id(),
            record: Record::capture(node.name(), data),
        }
    }
}

/// Mirror of the persisted tree.
#[derive(Debug)]
pub(crate) struct Journal {
    root: NodeId,
    records: HashMap<NodeId, Record>,
}

impl Journal {
    pub(crate) fn new(root: NodeId) -> Self {
        Self {
            root,
            records: HashMap::new(),
        }
    }

    /// Seed a record during mount, before the tree is shared.
    pub(crate) fn seed(&mut self, id: NodeId, record: Record) {
        self.records.insert(id, record);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    fn apply(&mut self, change: Change) {
        match change {
            Change::Insert { parent, id, record } => {
                if self.records.contains_key(&parent) {
                    self.records.insert(id, record);
                }
            }
            Change::Update { id, record } => {
                if let Some(slot) = self.records.get_mut(&id) {
                    *slot = record;
                }
            }
            Change::Rename { id, name } => {
                if let Some(slot) = self.records.get_mut(&id) {
                    slot.name = name;
                }
            }
            Change::Remove { id } => {
                self.records.remove(&id);
            }
        }
    }

    /// Rebuild the document rooted at the journal's root.
    pub(crate) fn to_document(&self) -> Result<DocNode, FsError> {
        self.node_document(self.root)
    }

    fn node_document(&self, id: NodeId) -> Result<DocNode, FsError> {
        let record = self
            .records
            .get(&id)
            .ok_or_else(|| FsError::Serialization(format!("journal has no record for node {id}")))?;
        let doc = match &record.body {
            Body::File { content, times } => {
                let (created_at, last_accessed_at, last_modified_at) =
                    document::times_to_secs(times);
                DocNode::File(DocFile {
                    name: record.name.clone(),
                    content: String::from_utf8_lossy(content).into_owned(),
                    created_at,
                    last_accessed_at,
                    last_modified_at,
                })
            }
            Body::Directory { children, times } => {
                let mut dir = DocDirectory::new(record.name.clone(), times);
                dir.content = children
                    .iter()
                    .map(|child| self.node_document(*child))
                    .collect::<Result<_, _>>()?;
                DocNode::Directory(dir)
            }
        };
        Ok(doc)
    }
}

/// The backing document and its journal.
pub(crate) struct Store {
    path: PathBuf,
    options: MountOptions,
    journal: Mutex<Journal>,
}

impl Store {
    pub(crate) fn new(path: PathBuf, options: MountOptions, journal: Journal) -> Self {
        Self {
            path,
            options,
            journal: Mutex::new(journal),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn options(&self) -> &MountOptions {
        &self.options
    }

    /// Run `f` against the journal without writing. Used while mounting.
    pub(crate) fn with_journal<R>(&self, f: impl FnOnce(&mut Journal) -> R) -> R {
        f(&mut self.journal.lock())
    }

    /// Apply changes and rewrite the document.
    ///
    /// The journal keeps the changes even if the write fails; the in-memory
    /// tree is never rolled back.
    pub(crate) fn commit(&self, changes: Vec<Change>) -> Result<(), FsError> {
        let mut journal = self.journal.lock();
        for change in changes {
            journal.apply(change);
        }
        self.write(&journal)
    }

    /// Rewrite the document from the journal as it stands.
    pub(crate) fn flush(&self) -> Result<(), FsError> {
        let journal = self.journal.lock();
        self.write(&journal)
    }

    fn write(&self, journal: &Journal) -> Result<(), FsError> {
        let bytes = document::encode(&journal.to_document()?, self.options.pretty)?;
        match write_document(&self.path, &bytes, &self.options) {
            Ok(()) => {
                tracing::trace!(path = %self.path.display(), bytes = bytes.len(), "flushed");
                Ok(())
            }
            Err(source) => {
                tracing::warn!(path = %self.path.display(), error = %source, "flush failed");
                Err(FsError::Io {
                    operation: "flush",
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }
}

fn write_document(path: &Path, bytes: &[u8], options: &MountOptions) -> std::io::Result<()> {
    if options.atomic_replace {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        if options.sync {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;
    } else {
        let mut file = std::fs::File::create(path)?;
        file.write_all(bytes)?;
        if options.sync {
            file.sync_all()?;
        }
    }
    Ok(())
}
