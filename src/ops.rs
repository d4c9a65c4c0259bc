//! Node operations on [`Entry`].
//!
//! Lock discipline, in acquisition order:
//!
//! 1. the tree's rename mutex (cross-directory renames only)
//! 2. node payload locks, ascending by node id ([`WriteSet`])
//! 3. link mutexes and the inode index (leaf locks, held briefly)
//! 4. the journal mutex inside [`Store::commit`](crate::persist::Store::commit)
//!
//! Single-node operations take exactly one payload lock. Mutations commit
//! their journal changes before releasing their payload locks.

use std::sync::Arc;

use crate::guard::WriteSet;
use crate::node::{DirectoryData, EntryData, FileData, Node, validate_name};
use crate::persist::{Change, Record};
use crate::types::now;
use crate::{
    DirEntry, Entry, FileSession, FileType, FsAttr, FsDir, FsError, FsOpen, Metadata, Mode,
    OpenFlags, ReadDirIter, SetAttr, Timestamps,
};

fn metadata(node: &Node, data: &EntryData) -> Metadata {
    let times = data.times();
    Metadata {
        file_type: data.file_type(),
        size: data.size(),
        created: times.created,
        modified: times.modified,
        accessed: times.accessed,
        inode: node.id(),
    }
}

impl Entry {
    /// Append a new child to this directory and persist it.
    fn add_child(
        &self,
        name: &str,
        data: EntryData,
        operation: &'static str,
    ) -> Result<Arc<Node>, FsError> {
        let node = self.node();
        let mut guard = node.data.write();
        let dir = node.as_dir_mut(&mut guard)?;
        node.ensure_linked()?;
        if dir.find_child(name).is_some() {
            return Err(FsError::AlreadyExists {
                path: node.child_path(name),
                operation,
            });
        }

        let modified = data.times().modified;
        let record = Record::capture(name.to_owned(), &data);
        let child = node
            .tree()
            .new_node(name.to_owned(), Arc::downgrade(node), data);
        dir.children.push(Arc::clone(&child));
        dir.times.modified = modified;

        node.tree().store().commit(vec![
            Change::Insert {
                parent: node.id(),
                id: child.id(),
                record,
            },
            Change::update(node, &guard),
        ])?;
        Ok(child)
    }
}

impl FsDir for Entry {
    fn read_dir(&self) -> Result<ReadDirIter, FsError> {
        let node = self.node();
        let guard = node.data.read();
        let entries: Vec<_> = node
            .as_dir(&guard)?
            .children
            .iter()
            .map(|child| {
                Ok(DirEntry {
                    name: child.name(),
                    file_type: child.kind(),
                    inode: child.id(),
                })
            })
            .collect();
        drop(guard);

        tracing::debug!(path = %node.path().display(), entries = entries.len(), "read_dir");
        Ok(ReadDirIter::from_vec(entries))
    }

    fn lookup(&self, name: &str) -> Result<Entry, FsError> {
        let node = self.node();
        tracing::debug!(path = %node.path().display(), name, "lookup");

        let guard = node.data.read();
        node.as_dir(&guard)?
            .find_child(name)
            .map(|child| Entry::from_node(Arc::clone(child)))
            .ok_or_else(|| FsError::NotFound {
                path: node.child_path(name),
            })
    }

    fn create(&self, name: &str, flags: OpenFlags, mode: Mode) -> Result<FileSession, FsError> {
        let node = self.node();
        tracing::debug!(path = %node.path().display(), name, ?flags, mode = mode.raw(), "create");

        if node.kind() != FileType::Directory {
            return Err(FsError::NotADirectory { path: node.path() });
        }
        if !mode.is_regular() {
            return Err(FsError::NotSupported {
                operation: "create non-regular file",
            });
        }
        validate_name(name)?;

        let existing = {
            let guard = node.data.read();
            node.as_dir(&guard)?.find_child(name).cloned()
        };
        if let Some(existing) = existing {
            if flags.exclusive {
                return Err(FsError::AlreadyExists {
                    path: node.child_path(name),
                    operation: "create",
                });
            }
            return Entry::from_node(existing).open(flags);
        }

        let data = EntryData::File(FileData {
            content: Arc::default(),
            times: Timestamps::now(),
        });
        match self.add_child(name, data, "create") {
            Ok(child) => Ok(FileSession::new(Entry::from_node(child), flags)),
            // Lost a race with another create of the same name.
            Err(FsError::AlreadyExists { .. }) if !flags.exclusive => {
                self.lookup(name)?.open(flags)
            }
            Err(e) => Err(e),
        }
    }

    fn mkdir(&self, name: &str) -> Result<Entry, FsError> {
        let node = self.node();
        tracing::debug!(path = %node.path().display(), name, "mkdir");

        validate_name(name)?;
        let data = EntryData::Directory(DirectoryData {
            children: Vec::new(),
            times: Timestamps::now(),
        });
        self.add_child(name, data, "mkdir").map(Entry::from_node)
    }

    fn rename(&self, old_name: &str, new_parent: &Entry, new_name: &str) -> Result<(), FsError> {
        let cur = self.node();
        let newp = new_parent.node();
        tracing::debug!(
            from = %cur.child_path(old_name).display(),
            to = %newp.child_path(new_name).display(),
            "rename"
        );

        validate_name(new_name)?;
        if !Arc::ptr_eq(cur.tree(), newp.tree()) {
            return Err(FsError::NotSupported {
                operation: "rename across mounts",
            });
        }
        let same_dir = Arc::ptr_eq(cur, newp);
        let _moving = (!same_dir).then(|| cur.tree().rename_lock());

        loop {
            let mut dirs = WriteSet::lock(&[cur, newp]);
            let source = cur
                .as_dir(dirs.get(0))?
                .find_child(old_name)
                .cloned()
                .ok_or_else(|| FsError::NotFound {
                    path: cur.child_path(old_name),
                })?;
            let target = newp.as_dir(dirs.get(1))?.find_child(new_name).cloned();
            cur.ensure_linked()?;
            newp.ensure_linked()?;

            if same_dir && old_name == new_name {
                return Ok(());
            }
            if source.kind() == FileType::Directory && source.contains(newp) {
                return Err(FsError::InvalidRename {
                    from: source.path(),
                    to: newp.child_path(new_name),
                });
            }

            let Some(target) = target else {
                return move_child(&mut dirs, cur, newp, &source, new_name);
            };
            drop(dirs);

            // Relock with both children in the canonical order, then make sure
            // nothing moved while no locks were held.
            let mut set = WriteSet::lock(&[cur, newp, &source, &target]);
            let source_ok = cur
                .as_dir(set.get(0))?
                .find_child(old_name)
                .is_some_and(|child| Arc::ptr_eq(child, &source));
            let target_ok = newp
                .as_dir(set.get(1))?
                .find_child(new_name)
                .is_some_and(|child| Arc::ptr_eq(child, &target));
            if !(source_ok && target_ok && cur.is_linked() && newp.is_linked()) {
                continue;
            }
            return replace_child(&mut set, cur, newp, &source, &target, new_name);
        }
    }
}

/// Rename with no existing destination. Slots: 0 = `cur`, 1 = `newp`.
fn move_child(
    dirs: &mut WriteSet<'_>,
    cur: &Arc<Node>,
    newp: &Arc<Node>,
    source: &Arc<Node>,
    new_name: &str,
) -> Result<(), FsError> {
    let stamp = now();
    let same_dir = Arc::ptr_eq(cur, newp);

    let dir = cur.as_dir_mut(dirs.get_mut(0))?;
    if !same_dir {
        dir.unlink(source.id());
    }
    dir.times.modified = stamp;
    if !same_dir {
        let dir = newp.as_dir_mut(dirs.get_mut(1))?;
        dir.children.push(Arc::clone(source));
        dir.times.modified = stamp;
    }
    source.relink(new_name, newp);

    let mut changes = vec![
        Change::Rename {
            id: source.id(),
            name: new_name.to_owned(),
        },
        Change::update(cur, dirs.get(0)),
    ];
    if !same_dir {
        changes.push(Change::update(newp, dirs.get(1)));
    }
    cur.tree().store().commit(changes)
}

/// Rename onto an existing destination.
/// Slots: 0 = `cur`, 1 = `newp`, 2 = `source`, 3 = `target`.
fn replace_child(
    set: &mut WriteSet<'_>,
    cur: &Arc<Node>,
    newp: &Arc<Node>,
    source: &Arc<Node>,
    target: &Arc<Node>,
    new_name: &str,
) -> Result<(), FsError> {
    let tree = cur.tree();
    let stamp = now();
    let same_dir = Arc::ptr_eq(cur, newp);

    match (source.kind(), target.kind()) {
        (FileType::File, FileType::File) => {
            // The destination keeps its identity and takes the source's bytes.
            let content = Arc::clone(&source.as_file(set.get(2))?.content);
            let file = target.as_file_mut(set.get_mut(3))?;
            file.content = content;
            file.times.modified = stamp;

            let dir = cur.as_dir_mut(set.get_mut(0))?;
            dir.unlink(source.id());
            dir.times.modified = stamp;
            source.detach();
            tree.forget(source.id());

            tree.store().commit(vec![
                Change::Remove { id: source.id() },
                Change::update(target, set.get(3)),
                Change::update(cur, set.get(0)),
            ])
        }
        (FileType::Directory, FileType::Directory) => {
            if !target.as_dir(set.get(3))?.children.is_empty() {
                return Err(FsError::DirectoryNotEmpty {
                    path: target.path(),
                });
            }

            let dir = cur.as_dir_mut(set.get_mut(0))?;
            dir.unlink(source.id());
            dir.times.modified = stamp;

            let dir = newp.as_dir_mut(set.get_mut(1))?;
            match dir.position_of(target.id()) {
                Some(index) => dir.children[index] = Arc::clone(source),
                None => dir.children.push(Arc::clone(source)),
            }
            dir.times.modified = stamp;
            source.relink(new_name, newp);
            target.detach();
            tree.forget(target.id());

            let mut changes = vec![
                Change::Remove { id: target.id() },
                Change::Rename {
                    id: source.id(),
                    name: new_name.to_owned(),
                },
                Change::update(cur, set.get(0)),
            ];
            if !same_dir {
                changes.push(Change::update(newp, set.get(1)));
            }
            tree.store().commit(changes)
        }
        _ => Err(FsError::AlreadyExists {
            path: newp.child_path(new_name),
            operation: "rename",
        }),
    }
}

impl FsAttr for Entry {
    fn getattr(&self) -> Result<Metadata, FsError> {
        let node = self.node();
        tracing::debug!(path = %node.path().display(), "getattr");
        let guard = node.data.read();
        Ok(metadata(node, &guard))
    }

    fn setattr(&self, attr: SetAttr) -> Result<Metadata, FsError> {
        let node = self.node();
        tracing::debug!(path = %node.path().display(), ?attr, "setattr");

        let mut guard = node.data.write();
        if let Some(size) = attr.size {
            let file = node.as_file_mut(&mut guard)?;
            file.set_len(size, "resize past the addressable size")?;
            file.times.touch_modified();
        }
        guard.times_mut().apply(&attr);

        node.tree()
            .store()
            .commit(vec![Change::update(node, &guard)])?;
        Ok(metadata(node, &guard))
    }
}

impl FsOpen for Entry {
    fn open(&self, flags: OpenFlags) -> Result<FileSession, FsError> {
        let node = self.node();
        tracing::debug!(path = %node.path().display(), ?flags, "open");

        if node.kind() == FileType::Directory {
            return Err(FsError::IsADirectory { path: node.path() });
        }
        if flags.truncate {
            let mut guard = node.data.write();
            let file = node.as_file_mut(&mut guard)?;
            file.content = Arc::default();
            file.times.touch_modified();
            node.tree()
                .store()
                .commit(vec![Change::update(node, &guard)])?;
        }
        Ok(FileSession::new(self.clone(), flags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FsIo;
    use crate::tree::tests::scratch_tree;
    use std::path::PathBuf;

    fn root_entry() -> (tempfile::TempDir, Entry) {
        let (dir, _tree, root) = scratch_tree();
        (dir, Entry::from_node(root))
    }

    fn names(dir: &Entry) -> Vec<String> {
        dir.read_dir()
            .unwrap()
            .collect_all()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect()
    }

    fn write(dir: &Entry, name: &str, content: &[u8]) -> Entry {
        let s = dir.create(name, OpenFlags::READ_WRITE, Mode::REGULAR).unwrap();
        s.write_at(0, content).unwrap();
        s.entry().clone()
    }

    fn read(file: &Entry) -> Vec<u8> {
        file.open(OpenFlags::READ).unwrap().read_at(0, usize::MAX).unwrap()
    }

    #[test]
    fn read_dir_lists_in_insertion_order() {
        let (_dir, root) = root_entry();
        root.mkdir("b").unwrap();
        write(&root, "a", b"");
        root.mkdir("c").unwrap();

        let listing = root.read_dir().unwrap().collect_all().unwrap();
        let kinds: Vec<_> = listing.iter().map(|e| (e.name.as_str(), e.file_type)).collect();
        assert_eq!(
            kinds,
            [
                ("b", FileType::Directory),
                ("a", FileType::File),
                ("c", FileType::Directory)
            ]
        );
    }

    #[test]
    fn file_is_not_a_directory() {
        let (_dir, root) = root_entry();
        let f = write(&root, "f", b"");
        assert!(matches!(f.read_dir(), Err(FsError::NotADirectory { .. })));
        assert!(matches!(f.lookup("x"), Err(FsError::NotADirectory { .. })));
        assert!(matches!(f.mkdir("x"), Err(FsError::NotADirectory { .. })));
        assert!(matches!(
            f.create("x", OpenFlags::WRITE, Mode::REGULAR),
            Err(FsError::NotADirectory { .. })
        ));
        assert!(matches!(
            f.rename("x", &root, "y"),
            Err(FsError::NotADirectory { .. })
        ));
    }

    #[test]
    fn lookup_returns_same_identity() {
        let (_dir, root) = root_entry();
        let made = root.mkdir("d").unwrap();
        let a = root.lookup("d").unwrap();
        let b = root.lookup("d").unwrap();
        assert_eq!(a, made);
        assert_eq!(a, b);
        assert!(matches!(root.lookup("nope"), Err(FsError::NotFound { path }) if path == PathBuf::from("/nope")));
    }

    #[test]
    fn create_existing_opens_or_rejects() {
        let (_dir, root) = root_entry();
        let a = write(&root, "a", b"keep");

        let err = root.create("a", OpenFlags::CREATE_NEW, Mode::REGULAR).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { operation: "create", .. }));

        let s = root.create("a", OpenFlags::READ_WRITE, Mode::REGULAR).unwrap();
        assert_eq!(s.entry(), &a);
        assert_eq!(s.read_at(0, 10).unwrap(), b"keep");

        // Non-exclusive create with truncate clears the existing file.
        root.create("a", OpenFlags::WRITE, Mode::REGULAR).unwrap();
        assert!(read(&a).is_empty());
    }

    #[test]
    fn create_existing_directory_is_a_directory() {
        let (_dir, root) = root_entry();
        root.mkdir("d").unwrap();
        let err = root.create("d", OpenFlags::READ_WRITE, Mode::REGULAR).unwrap_err();
        assert!(matches!(err, FsError::IsADirectory { .. }));
    }

    #[test]
    fn create_rejects_non_regular_mode_and_bad_names() {
        let (_dir, root) = root_entry();
        let fifo = Mode::from_raw(0o010644);
        assert!(matches!(
            root.create("p", OpenFlags::WRITE, fifo),
            Err(FsError::NotSupported { .. })
        ));
        assert!(matches!(
            root.create("a/b", OpenFlags::WRITE, Mode::REGULAR),
            Err(FsError::InvalidName { .. })
        ));
        assert!(names(&root).is_empty());
    }

    #[test]
    fn create_and_mkdir_bump_parent_modified() {
        let (_dir, tree, root) = scratch_tree();
        let d = Entry::from_node(tree.new_dir_node("d", &root));
        assert_eq!(d.getattr().unwrap().modified, std::time::UNIX_EPOCH);

        d.mkdir("sub").unwrap();
        assert!(d.getattr().unwrap().modified > std::time::UNIX_EPOCH);
    }

    #[test]
    fn mkdir_existing_name_fails() {
        let (_dir, root) = root_entry();
        write(&root, "x", b"");
        assert!(matches!(
            root.mkdir("x"),
            Err(FsError::AlreadyExists { operation: "mkdir", .. })
        ));
    }

    #[test]
    fn getattr_reports_size_and_kind() {
        let (_dir, root) = root_entry();
        let f = write(&root, "f", b"12345");
        let meta = f.getattr().unwrap();
        assert!(meta.is_file());
        assert_eq!(meta.size, 5);
        assert_eq!(meta.inode, f.inode());

        let meta = root.getattr().unwrap();
        assert!(meta.is_dir());
        assert_eq!(meta.size, 0);
    }

    #[test]
    fn setattr_overwrites_times() {
        let (_dir, root) = root_entry();
        let f = write(&root, "f", b"");
        let t = crate::types::from_unix_secs(1_000);
        let meta = f.setattr(SetAttr::times(Timestamps::at(t))).unwrap();
        assert_eq!(meta.times(), Timestamps::at(t));
        assert_eq!(f.getattr().unwrap().times(), Timestamps::at(t));
    }

    #[test]
    fn setattr_size_extends_with_zeros() {
        let (_dir, root) = root_entry();
        let f = write(&root, "f", b"ab");
        f.setattr(SetAttr::default().with_size(4)).unwrap();
        assert_eq!(read(&f), b"ab\0\0");
    }

    #[test]
    fn setattr_unaddressable_size_fails_cleanly() {
        let (_dir, root) = root_entry();
        let f = write(&root, "f", b"ab");
        for size in [u64::MAX, i64::MAX as u64 + 1] {
            assert!(matches!(
                f.setattr(SetAttr::default().with_size(size)),
                Err(FsError::NotSupported { .. })
            ));
        }
        assert_eq!(read(&f), b"ab");
    }

    #[test]
    fn setattr_truncates_sub_second_times() {
        let (_dir, root) = root_entry();
        let f = write(&root, "f", b"");
        let t = std::time::UNIX_EPOCH + std::time::Duration::from_millis(2_750);
        let meta = f.setattr(SetAttr::default().with_modified(t)).unwrap();
        assert_eq!(meta.modified, crate::types::from_unix_secs(2));
    }

    #[test]
    fn setattr_size_on_directory_fails() {
        let (_dir, root) = root_entry();
        assert!(matches!(
            root.setattr(SetAttr::default().with_size(1)),
            Err(FsError::IsADirectory { .. })
        ));
    }

    #[test]
    fn open_directory_fails_and_truncate_clears() {
        let (_dir, root) = root_entry();
        assert!(matches!(
            root.open(OpenFlags::READ),
            Err(FsError::IsADirectory { .. })
        ));

        let f = write(&root, "f", b"data");
        let flags = OpenFlags {
            truncate: true,
            ..OpenFlags::READ_WRITE
        };
        f.open(flags).unwrap();
        assert_eq!(f.getattr().unwrap().size, 0);
    }

    #[test]
    fn rename_within_directory_keeps_position() {
        let (_dir, root) = root_entry();
        write(&root, "a", b"");
        let b = write(&root, "b", b"");
        write(&root, "c", b"");

        root.rename("b", &root, "z").unwrap();
        assert_eq!(names(&root), ["a", "z", "c"]);
        assert_eq!(b.name(), "z");
        assert_eq!(root.lookup("z").unwrap(), b);
    }

    #[test]
    fn rename_same_name_is_noop() {
        let (_dir, root) = root_entry();
        write(&root, "a", b"");
        root.rename("a", &root, "a").unwrap();
        assert_eq!(names(&root), ["a"]);
    }

    #[test]
    fn rename_moves_across_directories() {
        let (_dir, root) = root_entry();
        let src = root.mkdir("src").unwrap();
        let dst = root.mkdir("dst").unwrap();
        let f = write(&src, "f", b"x");

        src.rename("f", &dst, "g").unwrap();
        assert!(names(&src).is_empty());
        assert_eq!(names(&dst), ["g"]);
        assert_eq!(f.path(), PathBuf::from("/dst/g"));
        assert_eq!(f.parent().unwrap(), dst);
    }

    #[test]
    fn rename_missing_source_fails() {
        let (_dir, root) = root_entry();
        assert!(matches!(
            root.rename("ghost", &root, "x"),
            Err(FsError::NotFound { .. })
        ));
    }

    #[test]
    fn rename_file_over_file_copies_content() {
        let (_dir, root) = root_entry();
        let a = write(&root, "a", b"new");
        let b = write(&root, "b", b"old contents");

        root.rename("a", &root, "b").unwrap();
        assert_eq!(names(&root), ["b"]);
        assert_eq!(root.lookup("b").unwrap(), b);
        assert_eq!(read(&b), b"new");
        assert!(a.parent().is_none());
        assert!(root.lookup("a").is_err());
    }

    #[test]
    fn rename_dir_over_empty_dir_replaces_it() {
        let (_dir, root) = root_entry();
        let a = root.mkdir("a").unwrap();
        let b = root.mkdir("b").unwrap();
        write(&b, "inner", b"");

        root.rename("b", &root, "a").unwrap();
        assert_eq!(names(&root), ["a"]);
        let now_a = root.lookup("a").unwrap();
        assert_eq!(now_a, b);
        assert_ne!(now_a, a);
        assert_eq!(names(&now_a), ["inner"]);
    }

    #[test]
    fn rename_dir_over_non_empty_dir_fails_unchanged() {
        let (_dir, root) = root_entry();
        let a = root.mkdir("a").unwrap();
        write(&a, "keep", b"");
        root.mkdir("b").unwrap();

        let err = root.rename("b", &root, "a").unwrap_err();
        assert!(matches!(err, FsError::DirectoryNotEmpty { .. }));
        assert_eq!(names(&root), ["a", "b"]);
        assert_eq!(names(&a), ["keep"]);
    }

    #[test]
    fn rename_type_mismatch_is_already_exists() {
        let (_dir, root) = root_entry();
        root.mkdir("d").unwrap();
        write(&root, "f", b"");

        assert!(matches!(
            root.rename("f", &root, "d"),
            Err(FsError::AlreadyExists { operation: "rename", .. })
        ));
        assert!(matches!(
            root.rename("d", &root, "f"),
            Err(FsError::AlreadyExists { operation: "rename", .. })
        ));
        assert_eq!(names(&root), ["d", "f"]);
    }

    #[test]
    fn rename_into_own_subtree_fails() {
        let (_dir, root) = root_entry();
        let a = root.mkdir("a").unwrap();
        let b = a.mkdir("b").unwrap();

        assert!(matches!(
            root.rename("a", &b, "a"),
            Err(FsError::InvalidRename { .. })
        ));
        assert!(matches!(
            root.rename("a", &a, "self"),
            Err(FsError::InvalidRename { .. })
        ));
        assert_eq!(b.path(), PathBuf::from("/a/b"));
    }

    #[test]
    fn rename_rejects_bad_target_name() {
        let (_dir, root) = root_entry();
        write(&root, "a", b"");
        assert!(matches!(
            root.rename("a", &root, ".."),
            Err(FsError::InvalidName { .. })
        ));
    }
}
