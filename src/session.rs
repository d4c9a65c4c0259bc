//! Open file sessions.

use crate::persist::Change;
use crate::{Entry, FsAttr, FsError, FsIo, Metadata, OpenFlags, SetAttr};

/// One successful open of a file.
///
/// A session pins its file: it keeps working even if a rename later unlinks
/// the file, although such writes are no longer persisted. Sessions are not
/// persisted themselves. Dropping a session closes it.
///
/// # Example
///
/// ```rust
/// use jsonfs::{FsDir, FsIo, JsonFs, Mode, OpenFlags};
///
/// let dir = tempfile::tempdir().unwrap();
/// let fs = JsonFs::mount(dir.path().join("tree.json")).unwrap();
///
/// let session = fs.root().create("notes.txt", OpenFlags::READ_WRITE, Mode::REGULAR).unwrap();
/// session.write_at(0, b"hello").unwrap();
/// session.write_at(2, b"XY").unwrap();
/// assert_eq!(session.read_at(0, 64).unwrap(), b"heXYo");
/// ```
#[derive(Debug)]
pub struct FileSession {
    entry: Entry,
    flags: OpenFlags,
}

impl FileSession {
    pub(crate) fn new(entry: Entry, flags: OpenFlags) -> Self {
        Self { entry, flags }
    }

    /// The file this session was opened on.
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// The flags the session was opened with.
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Set attributes on the session's file. Same as [`FsAttr::setattr`].
    pub fn set_attr(&self, attr: SetAttr) -> Result<Metadata, FsError> {
        self.entry.setattr(attr)
    }

    /// End the session.
    pub fn close(self) {
        tracing::debug!(path = %self.entry.path().display(), "close");
    }
}

impl FsIo for FileSession {
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        let node = self.entry.node();
        tracing::debug!(path = %node.path().display(), offset, len, "read");

        let data = node.data.read();
        let content = &node.as_file(&data)?.content;
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(content.len());
        let end = start.saturating_add(len).min(content.len());
        Ok(content[start..end].to_vec())
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> Result<usize, FsError> {
        let node = self.entry.node();
        tracing::debug!(
            path = %node.path().display(),
            offset,
            len = data.len(),
            append = self.flags.append,
            "write"
        );

        let mut guard = node.data.write();
        let file = node.as_file_mut(&mut guard)?;
        if self.flags.append {
            file.append(data, "write past the addressable size")?;
        } else {
            file.write_at(offset, data, "write past the addressable size")?;
        }
        file.times.touch_modified();

        node.tree()
            .store()
            .commit(vec![Change::update(node, &guard)])?;
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::scratch_tree;

    fn session(content: &[u8], flags: OpenFlags) -> (tempfile::TempDir, FileSession) {
        let (dir, tree, root) = scratch_tree();
        let file = tree.new_file_node("f", &root, content);
        (dir, FileSession::new(Entry::from_node(file), flags))
    }

    #[test]
    fn read_is_clamped_to_content() {
        let (_dir, s) = session(b"hello", OpenFlags::READ);
        assert_eq!(s.read_at(0, 5).unwrap(), b"hello");
        assert_eq!(s.read_at(1, 3).unwrap(), b"ell");
        assert_eq!(s.read_at(3, 100).unwrap(), b"lo");
        assert!(s.read_at(5, 10).unwrap().is_empty());
        assert!(s.read_at(u64::MAX, 10).unwrap().is_empty());
    }

    #[test]
    fn write_overwrites_in_place() {
        let (_dir, s) = session(b"hello", OpenFlags::READ_WRITE);
        assert_eq!(s.write_at(2, b"XY").unwrap(), 2);
        assert_eq!(s.read_at(0, 64).unwrap(), b"heXYo");
    }

    #[test]
    fn write_past_end_zero_fills_gap() {
        let (_dir, s) = session(b"hello", OpenFlags::READ_WRITE);
        s.write_at(10, b"Z").unwrap();
        assert_eq!(s.read_at(0, 64).unwrap(), b"hello\0\0\0\0\0Z");
    }

    #[test]
    fn write_extends_when_overlapping_end() {
        let (_dir, s) = session(b"hello", OpenFlags::READ_WRITE);
        s.write_at(3, b"p me").unwrap();
        assert_eq!(s.read_at(0, 64).unwrap(), b"help me");
    }

    #[test]
    fn append_ignores_offset() {
        let (_dir, s) = session(b"hello", OpenFlags::APPEND);
        s.write_at(0, b" world").unwrap();
        assert_eq!(s.read_at(0, 64).unwrap(), b"hello world");
    }

    #[test]
    fn unaddressable_write_fails_cleanly() {
        let (_dir, s) = session(b"hello", OpenFlags::READ_WRITE);
        for offset in [i64::MAX as u64, u64::MAX - 1] {
            assert!(matches!(
                s.write_at(offset, b"x"),
                Err(FsError::NotSupported { .. })
            ));
        }
        assert_eq!(s.read_at(0, 64).unwrap(), b"hello");

        // The session is still usable afterwards.
        s.write_at(5, b"!").unwrap();
        assert_eq!(s.read_at(0, 64).unwrap(), b"hello!");
    }

    #[test]
    fn write_bumps_modified() {
        let (_dir, s) = session(b"", OpenFlags::READ_WRITE);
        let before = s.entry().getattr().unwrap().modified;
        s.write_at(0, b"x").unwrap();
        assert!(s.entry().getattr().unwrap().modified > before);
    }

    #[test]
    fn session_set_attr_truncates() {
        let (_dir, s) = session(b"hello", OpenFlags::READ_WRITE);
        let meta = s.set_attr(SetAttr::default().with_size(2)).unwrap();
        assert_eq!(meta.size, 2);
        assert_eq!(s.read_at(0, 64).unwrap(), b"he");
    }

    #[test]
    fn session_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileSession>();
    }
}
