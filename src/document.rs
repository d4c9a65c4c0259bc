//! The backing document format.
//!
//! A node is either
//! `{"type":"file","name":...,"content":"...","created_at":0,"last_accessed_at":0,"last_modified_at":0}`
//! or `{"type":"directory","name":...,"content":[...nodes...], ...same timestamp fields}`.
//! Timestamps are whole seconds since the Unix epoch. Missing fields default
//! to empty/zero so hand-written documents stay loadable.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{from_unix_secs, to_unix_secs};
use crate::{FsError, Timestamps};

/// One node of the backing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum DocNode {
    File(DocFile),
    Directory(DocDirectory),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DocFile {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) content: String,
    #[serde(default)]
    pub(crate) created_at: i64,
    #[serde(default)]
    pub(crate) last_accessed_at: i64,
    #[serde(default)]
    pub(crate) last_modified_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DocDirectory {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) content: Vec<DocNode>,
    #[serde(default)]
    pub(crate) created_at: i64,
    #[serde(default)]
    pub(crate) last_accessed_at: i64,
    #[serde(default)]
    pub(crate) last_modified_at: i64,
}

/// The three document timestamp fields, in document order.
pub(crate) fn times_from_secs(created: i64, accessed: i64, modified: i64) -> Timestamps {
    Timestamps {
        created: from_unix_secs(created),
        accessed: from_unix_secs(accessed),
        modified: from_unix_secs(modified),
    }
}

pub(crate) fn times_to_secs(times: &Timestamps) -> (i64, i64, i64) {
    (
        to_unix_secs(times.created),
        to_unix_secs(times.accessed),
        to_unix_secs(times.modified),
    )
}

impl DocFile {
    pub(crate) fn times(&self) -> Timestamps {
        times_from_secs(self.created_at, self.last_accessed_at, self.last_modified_at)
    }
}

impl DocDirectory {
    pub(crate) fn new(name: String, times: &Timestamps) -> Self {
        let (created_at, last_accessed_at, last_modified_at) = times_to_secs(times);
        Self {
            name,
            content: Vec::new(),
            created_at,
            last_accessed_at,
            last_modified_at,
        }
    }

    pub(crate) fn times(&self) -> Timestamps {
        times_from_secs(self.created_at, self.last_accessed_at, self.last_modified_at)
    }
}

/// Parse a backing document.
///
/// Returns `Ok(None)` for an empty (or whitespace-only) document.
pub(crate) fn parse(bytes: &[u8], path: &Path) -> Result<Option<DocNode>, FsError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| FsError::InvalidData {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
}

/// Encode a document, compact or indented.
pub(crate) fn encode(node: &DocNode, pretty: bool) -> Result<Vec<u8>, FsError> {
    let encoded = if pretty {
        serde_json::to_vec_pretty(node)
    } else {
        serde_json::to_vec(node)
    };
    encoded.map_err(|e| FsError::Serialization(e.to_string()))
}
