//! Values returned to the filesystem driver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

impl FileKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, FileKind::Directory)
    }
}

/// One entry of a listing, or the answer to a stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Entry name (not full path).
    pub name: String,
    pub kind: FileKind,
    /// Exact length of the bytes a read returns. Always 0 for directories.
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl FileInfo {
    pub fn file(name: impl Into<String>, size: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            kind: FileKind::File,
            size,
            created_at,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FileKind::Directory,
            size: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Access requested when a path is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub truncate: bool,
    pub append: bool,
}

impl OpenFlags {
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Whether the open would modify anything.
    pub fn is_mutating(&self) -> bool {
        self.write || self.create || self.truncate || self.append
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSpace {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub label: String,
    pub file_system_name: String,
    pub read_only: bool,
    pub case_sensitive: bool,
}
