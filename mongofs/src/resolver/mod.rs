//! Node resolvers: list, stat and read over every [`PathNode`].
//!
//! Each call recomputes from the store. List, stat and read for the same node
//! run the same find (same predicate, `_id` ascending) and the same encoder,
//! so a listed size always equals the length of the bytes read back.

use crate::error::MongoFsError;
use crate::fs::{FileInfo, FsError, FsResult};
use crate::path::{
    DocumentEncoding, PathNode, DATA_DIR, INDEXES_FILE, QUERY_ALL_FILE, QUERY_DIR, STATS_FILE,
};
use crate::predicate::Predicate;
use crate::projection;
use crate::store::{DocumentStore, FindQuery};
use bson::{Bson, Document};
use chrono::{DateTime, Utc};
use glob::Pattern;
use std::sync::Arc;

/// The bytes behind a file node.
struct Payload {
    bytes: Vec<u8>,
    created_at: Option<DateTime<Utc>>,
}

impl Payload {
    fn new(bytes: Vec<u8>) -> Self {
        Payload {
            bytes,
            created_at: None,
        }
    }
}

pub struct Resolver {
    store: Arc<dyn DocumentStore>,
    separator: char,
}

impl Resolver {
    pub fn new(store: Arc<dyn DocumentStore>, separator: char) -> Self {
        Resolver { store, separator }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Children of a directory node, optionally filtered by a shell-style
    /// name pattern.
    pub fn list_children(&self, node: &PathNode, pattern: Option<&str>) -> FsResult<Vec<FileInfo>> {
        let pattern = pattern.map(compile_pattern).transpose()?;

        let entries = match node {
            PathNode::Root => self
                .store
                .database_names()
                .map_err(store_failure)?
                .into_iter()
                .map(FileInfo::directory)
                .collect(),
            PathNode::Database { database } => self
                .store
                .collection_names(database)
                .map_err(store_failure)?
                .into_iter()
                .map(FileInfo::directory)
                .collect(),
            PathNode::Collection {
                database,
                collection,
            } => {
                let stats = self.stats_payload(database, collection)?;
                let indexes = self.indexes_payload(database, collection)?;
                vec![
                    FileInfo::file(STATS_FILE, stats.len() as u64, Utc::now()),
                    FileInfo::file(INDEXES_FILE, indexes.len() as u64, Utc::now()),
                    FileInfo::directory(DATA_DIR),
                    FileInfo::directory(QUERY_DIR),
                ]
            }
            PathNode::DataDir {
                database,
                collection,
            } => {
                let documents = self.find_all(database, collection, None)?;
                document_entries(&documents)?
            }
            PathNode::QueryDir {
                database,
                collection,
                query,
            } => {
                let documents =
                    self.find_all(database, collection, Some(Predicate::for_query(query)))?;
                let all = projection::encode_documents(&documents).map_err(store_failure)?;

                let mut entries = vec![FileInfo::file(QUERY_ALL_FILE, all.len() as u64, Utc::now())];
                entries.extend(document_entries(&documents)?);
                entries
            }
            PathNode::QueryEmptyDir { .. } => Vec::new(),
            PathNode::Stats { .. }
            | PathNode::Indexes { .. }
            | PathNode::DataDocument { .. }
            | PathNode::QueryDocument { .. }
            | PathNode::QueryAll { .. }
            | PathNode::Diagnostic(_) => return Err(unsupported("list", node)),
        };

        Ok(match pattern {
            Some(pattern) => entries
                .into_iter()
                .filter(|entry| pattern.matches(&entry.name))
                .collect(),
            None => entries,
        })
    }

    /// Metadata for a node. File sizes come from materializing the payload.
    pub fn stat(&self, node: &PathNode) -> FsResult<FileInfo> {
        let name = node.file_name(self.separator);
        match node {
            PathNode::Root
            | PathNode::Database { .. }
            | PathNode::Collection { .. }
            | PathNode::DataDir { .. }
            | PathNode::QueryEmptyDir { .. }
            | PathNode::QueryDir { .. } => Ok(FileInfo::directory(name)),
            PathNode::Stats { .. }
            | PathNode::Indexes { .. }
            | PathNode::DataDocument { .. }
            | PathNode::QueryDocument { .. }
            | PathNode::QueryAll { .. }
            | PathNode::Diagnostic(_) => {
                let payload = self.payload(node, "stat")?;
                Ok(FileInfo::file(
                    name,
                    payload.bytes.len() as u64,
                    payload.created_at.unwrap_or_else(Utc::now),
                ))
            }
        }
    }

    /// Up to `max_len` bytes of the node's payload starting at `offset`.
    /// Reading exactly at the end yields an empty buffer.
    pub fn read_range(&self, node: &PathNode, offset: u64, max_len: usize) -> FsResult<Vec<u8>> {
        let payload = self.payload(node, "read")?;
        let len = payload.bytes.len() as u64;
        if offset > len {
            log::debug!("Read at offset {offset} past the end of {node} ({len} bytes)");
            return Err(FsError::OutOfRange {
                path: node.to_string(),
                offset,
                len,
            });
        }

        // offset <= len, so it fits in usize
        let start = offset as usize;
        let end = start.saturating_add(max_len).min(payload.bytes.len());
        Ok(payload.bytes[start..end].to_vec())
    }

    fn payload(&self, node: &PathNode, operation: &'static str) -> FsResult<Payload> {
        match node {
            PathNode::Stats {
                database,
                collection,
            } => Ok(Payload::new(self.stats_payload(database, collection)?)),
            PathNode::Indexes {
                database,
                collection,
            } => Ok(Payload::new(self.indexes_payload(database, collection)?)),
            PathNode::Diagnostic(diagnostic) => {
                let document = self
                    .store
                    .admin_command(*diagnostic)
                    .map_err(store_failure)?;
                Ok(Payload::new(encode_json_document(&document)?))
            }
            PathNode::DataDocument {
                database,
                collection,
                index,
                encoding,
            } => {
                let document = self.document_at(node, database, collection, None, *index)?;
                Ok(Payload {
                    bytes: projection::encode_document(&document, *encoding)
                        .map_err(store_failure)?,
                    created_at: projection::created_at(&document),
                })
            }
            PathNode::QueryDocument {
                database,
                collection,
                query,
                index,
                encoding,
            } => {
                let filter = Some(Predicate::for_query(query));
                let document = self.document_at(node, database, collection, filter, *index)?;
                Ok(Payload {
                    bytes: projection::encode_document(&document, *encoding)
                        .map_err(store_failure)?,
                    created_at: projection::created_at(&document),
                })
            }
            PathNode::QueryAll {
                database,
                collection,
                query,
            } => {
                let documents =
                    self.find_all(database, collection, Some(Predicate::for_query(query)))?;
                Ok(Payload::new(
                    projection::encode_documents(&documents).map_err(store_failure)?,
                ))
            }
            PathNode::Root
            | PathNode::Database { .. }
            | PathNode::Collection { .. }
            | PathNode::DataDir { .. }
            | PathNode::QueryEmptyDir { .. }
            | PathNode::QueryDir { .. } => Err(unsupported(operation, node)),
        }
    }

    fn stats_payload(&self, database: &str, collection: &str) -> FsResult<Vec<u8>> {
        let stats = self
            .store
            .collection_stats(database, collection)
            .map_err(store_failure)?;
        encode_json_document(&stats)
    }

    fn indexes_payload(&self, database: &str, collection: &str) -> FsResult<Vec<u8>> {
        let indexes = self
            .store
            .indexes(database, collection)
            .map_err(store_failure)?;
        let mut document = Document::new();
        document.insert(
            "Indexes",
            Bson::Array(indexes.into_iter().map(Bson::Document).collect()),
        );
        encode_json_document(&document)
    }

    fn find_all(
        &self,
        database: &str,
        collection: &str,
        filter: Option<Predicate>,
    ) -> FsResult<Vec<Document>> {
        self.store
            .find(database, collection, &FindQuery::all(filter))
            .map_err(store_failure)
    }

    fn document_at(
        &self,
        node: &PathNode,
        database: &str,
        collection: &str,
        filter: Option<Predicate>,
        index: u64,
    ) -> FsResult<Document> {
        self.store
            .find(database, collection, &FindQuery::at(filter, index))
            .map_err(store_failure)?
            .into_iter()
            .next()
            .ok_or_else(|| FsError::not_found(format!("{node} #{index}")))
    }
}

/// `<i>.json` and `<i>.bson` for each document, `i` being its ordinal.
fn document_entries(documents: &[Document]) -> FsResult<Vec<FileInfo>> {
    let mut entries = Vec::with_capacity(documents.len() * 2);
    for (index, document) in documents.iter().enumerate() {
        let created_at = projection::created_at(document).unwrap_or_else(Utc::now);
        for encoding in [DocumentEncoding::Json, DocumentEncoding::Bson] {
            let bytes = projection::encode_document(document, encoding).map_err(store_failure)?;
            entries.push(FileInfo::file(
                encoding.file_name(index as u64),
                bytes.len() as u64,
                created_at,
            ));
        }
    }
    Ok(entries)
}

fn encode_json_document(document: &Document) -> FsResult<Vec<u8>> {
    projection::encode_json(&projection::to_json_value(document)).map_err(store_failure)
}

fn compile_pattern(pattern: &str) -> FsResult<Pattern> {
    Pattern::new(pattern).map_err(|e| FsError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })
}

fn store_failure(e: MongoFsError) -> FsError {
    log::warn!("Store request failed: {e}");
    FsError::from(e)
}

fn unsupported(operation: &'static str, node: &PathNode) -> FsError {
    log::info!("No {operation} behavior for {node}");
    FsError::unsupported(operation, node)
}
