//! Core value types for the jsonfs tree.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The root directory always has inode 1 (FUSE convention).
pub const ROOT_INODE: u64 = 1;

/// Type of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// The three timestamps every entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    /// Creation time.
    pub created: SystemTime,
    /// Last access time.
    pub accessed: SystemTime,
    /// Last modification time.
    pub modified: SystemTime,
}

impl Timestamps {
    /// All three timestamps set to the current time, truncated to whole seconds.
    pub fn now() -> Self {
        let now = now();
        Self {
            created: now,
            accessed: now,
            modified: now,
        }
    }

    /// All three timestamps set to the same instant.
    pub fn at(time: SystemTime) -> Self {
        Self {
            created: time,
            accessed: time,
            modified: time,
        }
    }

    /// Bump the modification time to now.
    pub(crate) fn touch_modified(&mut self) {
        self.modified = now();
    }

    /// Overwrite every timestamp the request carries, truncated to whole
    /// seconds like everything the document stores.
    pub(crate) fn apply(&mut self, attr: &SetAttr) {
        if let Some(created) = attr.created {
            self.created = whole_secs(created);
        }
        if let Some(accessed) = attr.accessed {
            self.accessed = whole_secs(accessed);
        }
        if let Some(modified) = attr.modified {
            self.modified = whole_secs(modified);
        }
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::at(UNIX_EPOCH)
    }
}

/// Metadata for a tree entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Type of the entry.
    pub file_type: FileType,
    /// Size in bytes (content length for files, 0 for directories).
    pub size: u64,
    /// Creation time.
    pub created: SystemTime,
    /// Last modification time.
    pub modified: SystemTime,
    /// Last access time.
    pub accessed: SystemTime,
    /// Inode number (unique identifier within the mounted tree).
    pub inode: u64,
}

impl Metadata {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// The three timestamps as one value.
    pub fn times(&self) -> Timestamps {
        Timestamps {
            created: self.created,
            accessed: self.accessed,
            modified: self.modified,
        }
    }
}

/// A directory entry returned from `read_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name of the entry (filename only, not full path).
    pub name: String,
    /// Type of the entry.
    pub file_type: FileType,
    /// Inode number.
    pub inode: u64,
}

/// Opaque file handle issued by [`FsHandles::open`](crate::FsHandles::open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub u64);

/// Flags for opening or creating a file.
///
/// Access-mode bits (`read`/`write`) are recorded but not enforced; the
/// kernel side of a mount checks them before a call ever reaches the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// Create file if it doesn't exist.
    pub create: bool,
    /// Fail creation if the file already exists (`O_EXCL`).
    pub exclusive: bool,
    /// Truncate file to zero length on open.
    pub truncate: bool,
    /// Append to end of file; write offsets are ignored.
    pub append: bool,
}

impl OpenFlags {
    /// Read-only access.
    pub const READ: Self = Self {
        read: true,
        write: false,
        create: false,
        exclusive: false,
        truncate: false,
        append: false,
    };

    /// Write access with create and truncate.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        create: true,
        exclusive: false,
        truncate: true,
        append: false,
    };

    /// Read and write access.
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        create: false,
        exclusive: false,
        truncate: false,
        append: false,
    };

    /// Append mode - writes go to end of file.
    pub const APPEND: Self = Self {
        read: false,
        write: true,
        create: true,
        exclusive: false,
        truncate: false,
        append: true,
    };

    /// Exclusive creation - fails if the name is taken.
    pub const CREATE_NEW: Self = Self {
        read: false,
        write: true,
        create: true,
        exclusive: true,
        truncate: false,
        append: false,
    };
}

/// A Unix-style mode word as passed to `create`, including the file-type bits.
///
/// Only the type bits are interpreted; permission bits are accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode(u32);

impl Mode {
    /// Mask selecting the file-type bits.
    pub const S_IFMT: u32 = 0o170000;
    /// File-type bits of a regular file.
    pub const S_IFREG: u32 = 0o100000;
    /// File-type bits of a directory.
    pub const S_IFDIR: u32 = 0o040000;

    /// A regular file with 0o644 permission bits.
    pub const REGULAR: Self = Self(Self::S_IFREG | 0o644);

    /// Wrap a raw mode word.
    #[inline]
    pub const fn from_raw(mode: u32) -> Self {
        Self(mode)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Returns `true` if the type bits request a regular file.
    #[inline]
    pub const fn is_regular(&self) -> bool {
        self.0 & Self::S_IFMT == Self::S_IFREG
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::REGULAR
    }
}

/// An attribute update. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetAttr {
    /// New content length (files only): truncates or zero-extends.
    pub size: Option<u64>,
    /// New creation time.
    pub created: Option<SystemTime>,
    /// New last access time.
    pub accessed: Option<SystemTime>,
    /// New last modification time.
    pub modified: Option<SystemTime>,
}

impl SetAttr {
    /// Overwrite all three timestamps.
    pub fn times(times: Timestamps) -> Self {
        Self {
            size: None,
            created: Some(times.created),
            accessed: Some(times.accessed),
            modified: Some(times.modified),
        }
    }

    /// Also change the content length.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Also change the modification time.
    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Also change the access time.
    pub fn with_accessed(mut self, accessed: SystemTime) -> Self {
        self.accessed = Some(accessed);
        self
    }
}

/// Current time truncated to whole seconds, the resolution of the backing document.
pub(crate) fn now() -> SystemTime {
    whole_secs(SystemTime::now())
}

/// Drop the sub-second part, rounding toward the past.
pub(crate) fn whole_secs(time: SystemTime) -> SystemTime {
    from_unix_secs(to_unix_secs(time))
}

/// Seconds since the Unix epoch; negative for earlier instants.
pub(crate) fn to_unix_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(before) => {
            let secs = before.duration().as_secs();
            // Round toward negative infinity so sub-second parts never move forward.
            let whole = if before.duration().subsec_nanos() > 0 {
                secs.saturating_add(1)
            } else {
                secs
            };
            i64::try_from(whole).map(|s| -s).unwrap_or(i64::MIN)
        }
    }
}

pub(crate) fn from_unix_secs(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs.unsigned_abs())
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_equality() {
        assert_eq!(FileType::File, FileType::File);
        assert_ne!(FileType::File, FileType::Directory);
    }

    #[test]
    fn metadata_kind_predicates() {
        let m = Metadata {
            file_type: FileType::Directory,
            size: 0,
            created: UNIX_EPOCH,
            modified: UNIX_EPOCH,
            accessed: UNIX_EPOCH,
            inode: ROOT_INODE,
        };
        assert!(m.is_dir());
        assert!(!m.is_file());
        assert_eq!(m.times(), Timestamps::default());
    }

    #[test]
    fn open_flags_constants() {
        assert!(OpenFlags::READ.read);
        assert!(!OpenFlags::READ.write);

        assert!(OpenFlags::WRITE.create);
        assert!(OpenFlags::WRITE.truncate);
        assert!(!OpenFlags::WRITE.exclusive);

        assert!(OpenFlags::APPEND.append);
        assert!(!OpenFlags::APPEND.truncate);

        assert!(OpenFlags::CREATE_NEW.exclusive);
        assert!(OpenFlags::CREATE_NEW.create);
    }

    #[test]
    fn mode_type_bits() {
        assert!(Mode::REGULAR.is_regular());
        assert!(Mode::from_raw(Mode::S_IFREG | 0o600).is_regular());
        assert!(!Mode::from_raw(Mode::S_IFDIR | 0o755).is_regular());
        // FIFO
        assert!(!Mode::from_raw(0o010644).is_regular());
        assert_eq!(Mode::default(), Mode::REGULAR);
    }

    #[test]
    fn set_attr_applies_only_present_fields() {
        let mut times = Timestamps::at(from_unix_secs(100));
        let attr = SetAttr::default().with_modified(from_unix_secs(200));
        times.apply(&attr);
        assert_eq!(times.created, from_unix_secs(100));
        assert_eq!(times.accessed, from_unix_secs(100));
        assert_eq!(times.modified, from_unix_secs(200));
    }

    #[test]
    fn unix_secs_round_trip() {
        for secs in [0, 1, 1_700_000_000, -1, -86_400] {
            assert_eq!(to_unix_secs(from_unix_secs(secs)), secs);
        }
    }

    #[test]
    fn unix_secs_truncates_sub_second() {
        let t = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(to_unix_secs(t), 1);
        let t = UNIX_EPOCH - Duration::from_millis(1_500);
        assert_eq!(to_unix_secs(t), -2);
    }

    #[test]
    fn now_has_whole_seconds() {
        let t = now();
        let d = t.duration_since(UNIX_EPOCH).unwrap();
        assert_eq!(d.subsec_nanos(), 0);
    }

    #[test]
    fn apply_truncates_to_whole_seconds() {
        let mut times = Timestamps::default();
        let attr = SetAttr::default()
            .with_modified(UNIX_EPOCH + Duration::from_millis(1_500))
            .with_accessed(UNIX_EPOCH + Duration::from_secs(9));
        times.apply(&attr);
        assert_eq!(times.modified, UNIX_EPOCH + Duration::from_secs(1));
        assert_eq!(times.accessed, UNIX_EPOCH + Duration::from_secs(9));
        assert_eq!(times.created, UNIX_EPOCH);
    }

    #[test]
    fn handle_equality() {
        assert_eq!(Handle(42), Handle(42));
        assert_ne!(Handle(1), Handle(2));
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileType>();
        assert_send_sync::<Metadata>();
        assert_send_sync::<DirEntry>();
        assert_send_sync::<Handle>();
        assert_send_sync::<OpenFlags>();
        assert_send_sync::<Mode>();
        assert_send_sync::<SetAttr>();
        assert_send_sync::<Timestamps>();
    }
}
