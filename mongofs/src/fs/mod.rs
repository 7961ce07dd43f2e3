// Filesystem facade - the callback surface a filesystem driver calls into

pub mod error;
pub mod types;

pub use error::{FsError, FsResult};
pub use types::{DiskSpace, FileInfo, FileKind, OpenFlags, VolumeInfo};

use crate::config::Config;
use crate::error::Result;
use crate::path::{PathNode, PathParser};
use crate::resolver::Resolver;
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub const FILE_SYSTEM_NAME: &str = "MongoFs";

/// Read-only filesystem over a [`DocumentStore`].
///
/// Every callback parses its path afresh and resolves against the store;
/// nothing is cached between calls. Mutating callbacks return
/// [`FsError::NotImplemented`] without touching the store.
pub struct MongoFs {
    name: String,
    parser: PathParser,
    resolver: Resolver,
}

impl MongoFs {
    /// Fails only when the path grammar is misconfigured.
    pub fn new(store: Arc<dyn DocumentStore>, name: impl Into<String>, separator: char) -> Result<Self> {
        Ok(MongoFs {
            name: name.into(),
            parser: PathParser::new(separator)?,
            resolver: Resolver::new(store, separator),
        })
    }

    pub fn from_config(config: &Config, store: Arc<dyn DocumentStore>) -> Result<Self> {
        Self::new(store, config.name.clone(), config.separator)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn separator(&self) -> char {
        self.parser.separator()
    }

    fn parse(&self, path: &str) -> FsResult<PathNode> {
        self.parser
            .parse(path)
            .ok_or_else(|| FsError::not_found(path))
    }

    // ── Read callbacks ───────────────────────────────────────────────

    /// Opening for read always succeeds; any write access is refused.
    pub fn open(&self, path: &str, flags: OpenFlags) -> FsResult<()> {
        log::trace!("open({path}, {flags:?})");
        if flags.is_mutating() {
            return Err(FsError::NotImplemented("open for writing"));
        }
        Ok(())
    }

    pub fn find_files(&self, path: &str, pattern: Option<&str>) -> FsResult<Vec<FileInfo>> {
        log::trace!("find_files({path}, {pattern:?})");
        let node = self.parse(path)?;
        self.resolver.list_children(&node, pattern)
    }

    pub fn file_info(&self, path: &str) -> FsResult<FileInfo> {
        log::trace!("file_info({path})");
        let node = self.parse(path)?;
        self.resolver.stat(&node)
    }

    pub fn read_file(&self, path: &str, offset: u64, len: usize) -> FsResult<Vec<u8>> {
        log::trace!("read_file({path}, {offset}, {len})");
        let node = self.parse(path)?;
        self.resolver.read_range(&node, offset, len)
    }

    /// Total is the storage used by every database. Nothing is free.
    pub fn disk_space(&self) -> FsResult<DiskSpace> {
        log::trace!("disk_space()");
        let total_bytes = self.resolver.store().total_size().map_err(|e| {
            log::warn!("Failed to compute total size: {e}");
            FsError::from(e)
        })?;
        Ok(DiskSpace {
            total_bytes,
            free_bytes: 0,
            available_bytes: 0,
        })
    }

    pub fn volume_info(&self) -> VolumeInfo {
        log::trace!("volume_info()");
        VolumeInfo {
            label: self.name.clone(),
            file_system_name: FILE_SYSTEM_NAME.to_string(),
            read_only: true,
            case_sensitive: true,
        }
    }

    // ── Mutating callbacks ───────────────────────────────────────────

    pub fn write_file(&self, path: &str, offset: u64, data: &[u8]) -> FsResult<usize> {
        log::trace!("write_file({path}, {offset}, {} bytes)", data.len());
        Err(FsError::NotImplemented("write"))
    }

    pub fn flush_file(&self, path: &str) -> FsResult<()> {
        log::trace!("flush_file({path})");
        Err(FsError::NotImplemented("flush"))
    }

    pub fn delete_file(&self, path: &str) -> FsResult<()> {
        log::trace!("delete_file({path})");
        Err(FsError::NotImplemented("delete file"))
    }

    pub fn delete_directory(&self, path: &str) -> FsResult<()> {
        log::trace!("delete_directory({path})");
        Err(FsError::NotImplemented("delete directory"))
    }

    pub fn move_file(&self, from: &str, to: &str, replace: bool) -> FsResult<()> {
        log::trace!("move_file({from}, {to}, {replace})");
        Err(FsError::NotImplemented("move"))
    }

    pub fn set_end_of_file(&self, path: &str, len: u64) -> FsResult<()> {
        log::trace!("set_end_of_file({path}, {len})");
        Err(FsError::NotImplemented("set end of file"))
    }

    pub fn set_allocation_size(&self, path: &str, len: u64) -> FsResult<()> {
        log::trace!("set_allocation_size({path}, {len})");
        Err(FsError::NotImplemented("set allocation size"))
    }

    pub fn lock_file(&self, path: &str, offset: u64, len: u64) -> FsResult<()> {
        log::trace!("lock_file({path}, {offset}, {len})");
        Err(FsError::NotImplemented("lock"))
    }

    pub fn unlock_file(&self, path: &str, offset: u64, len: u64) -> FsResult<()> {
        log::trace!("unlock_file({path}, {offset}, {len})");
        Err(FsError::NotImplemented("unlock"))
    }

    pub fn set_file_attributes(&self, path: &str, attributes: u32) -> FsResult<()> {
        log::trace!("set_file_attributes({path}, {attributes:#x})");
        Err(FsError::NotImplemented("set attributes"))
    }

    pub fn set_file_times(
        &self,
        path: &str,
        created: Option<DateTime<Utc>>,
        accessed: Option<DateTime<Utc>>,
        modified: Option<DateTime<Utc>>,
    ) -> FsResult<()> {
        log::trace!("set_file_times({path}, {created:?}, {accessed:?}, {modified:?})");
        Err(FsError::NotImplemented("set times"))
    }

    pub fn set_file_security(&self, path: &str) -> FsResult<()> {
        log::trace!("set_file_security({path})");
        Err(FsError::NotImplemented("set security"))
    }
}
