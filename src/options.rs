//! Mount configuration.

/// Options controlling how a tree is mounted and persisted.
///
/// # Example
///
/// ```rust
/// use jsonfs::MountOptions;
///
/// let options = MountOptions::default()
///     .with_pretty(true)
///     .with_atomic_replace(true);
/// assert_eq!(options.root_name, "root");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// Name of the root directory created when the document is missing or empty.
    pub root_name: String,
    /// Write indented JSON instead of compact JSON.
    pub pretty: bool,
    /// Write to a temporary file beside the document and rename it into place.
    pub atomic_replace: bool,
    /// `fsync` the document before a flush reports success.
    pub sync: bool,
}

impl MountOptions {
    /// Set the name used for a freshly initialized root.
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    /// Toggle indented output.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Toggle write-then-rename replacement of the document.
    pub fn with_atomic_replace(mut self, atomic: bool) -> Self {
        self.atomic_replace = atomic;
        self
    }

    /// Toggle `fsync` after every flush.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            root_name: "root".to_owned(),
            pretty: false,
            atomic_replace: false,
            sync: false,
        }
    }
}
