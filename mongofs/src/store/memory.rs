use super::{as_any_number, DocumentStore, FindQuery, SORT_FIELD};
use crate::error::{MongoFsError, Result};
use crate::path::Diagnostic;
use crate::predicate::Predicate;
use crate::projection;
use bson::{doc, Bson, Document};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard};

type Collections = BTreeMap<String, Vec<Document>>;

/// An in-process [`DocumentStore`].
///
/// Follows the server's query semantics closely enough for the projection:
/// `_id` ordering across BSON types, numeric equality across int32, int64
/// and double, dotted field paths, and array membership.
#[derive(Default)]
pub struct MemoryStore {
    databases: RwLock<BTreeMap<String, Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a fixture of the form `{ "<db>": { "<collection>": [ <doc>, ... ] } }`.
    /// Documents are Extended JSON, so `{"$oid": "..."}` becomes an ObjectId.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let root: serde_json::Value = serde_json::from_str(content)?;
        let databases = root
            .as_object()
            .ok_or_else(|| MongoFsError::Fixture("top level must be an object".into()))?;

        let store = MemoryStore::new();
        for (database, collections) in databases {
            let collections = collections.as_object().ok_or_else(|| {
                MongoFsError::Fixture(format!("database '{database}' must be an object"))
            })?;
            for (collection, documents) in collections {
                let documents = documents.as_array().ok_or_else(|| {
                    MongoFsError::Fixture(format!(
                        "collection '{database}.{collection}' must be an array"
                    ))
                })?;
                store.create_collection(database, collection);
                for value in documents {
                    let bson = Bson::try_from(value.clone())
                        .map_err(|e| MongoFsError::Fixture(e.to_string()))?;
                    match bson {
                        Bson::Document(document) => store.insert(database, collection, document),
                        other => {
                            return Err(MongoFsError::Fixture(format!(
                                "expected a document in '{database}.{collection}', found {other}"
                            )))
                        }
                    }
                }
            }
        }
        Ok(store)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Create an empty collection (and its database) if missing.
    pub fn create_collection(&self, database: &str, collection: &str) {
        let mut databases = self.databases.write().unwrap_or_else(|e| e.into_inner());
        databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
    }

    pub fn insert(&self, database: &str, collection: &str, document: Document) {
        let mut databases = self.databases.write().unwrap_or_else(|e| e.into_inner());
        databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Remove every document whose `_id` equals `id`. Returns how many were removed.
    pub fn remove(&self, database: &str, collection: &str, id: &Bson) -> usize {
        let mut databases = self.databases.write().unwrap_or_else(|e| e.into_inner());
        let Some(documents) = databases
            .get_mut(database)
            .and_then(|collections| collections.get_mut(collection))
        else {
            return 0;
        };
        let before = documents.len();
        documents.retain(|document| !document.get(SORT_FIELD).is_some_and(|v| values_equal(v, id)));
        before - documents.len()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Collections>>> {
        self.databases
            .read()
            .map_err(|_| MongoFsError::Store("memory store lock poisoned".into()))
    }

    fn collection_documents(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        Ok(self
            .read()?
            .get(database)
            .and_then(|collections| collections.get(collection))
            .cloned()
            .unwrap_or_default())
    }
}

impl DocumentStore for MemoryStore {
    fn database_names(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn collection_names(&self, database: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .get(database)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn database_stats(&self, database: &str) -> Result<Document> {
        let databases = self.read()?;
        let empty = Collections::new();
        let collections = databases.get(database).unwrap_or(&empty);

        let mut objects = 0i64;
        let mut data_size = 0i64;
        for documents in collections.values() {
            objects += documents.len() as i64;
            data_size += encoded_size(documents)?;
        }

        Ok(doc! {
            "db": database,
            "collections": collections.len() as i64,
            "objects": objects,
            "dataSize": data_size,
            "totalSize": data_size,
            "ok": 1.0,
        })
    }

    fn collection_stats(&self, database: &str, collection: &str) -> Result<Document> {
        let documents = self.collection_documents(database, collection)?;
        Ok(doc! {
            "ns": format!("{database}.{collection}"),
            "count": documents.len() as i64,
            "size": encoded_size(&documents)?,
            "nindexes": 1,
            "ok": 1.0,
        })
    }

    fn indexes(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let exists = self
            .read()?
            .get(database)
            .is_some_and(|collections| collections.contains_key(collection));
        if !exists {
            return Ok(Vec::new());
        }
        Ok(vec![doc! { "v": 2, "key": { "_id": 1 }, "name": "_id_" }])
    }

    fn find(&self, database: &str, collection: &str, query: &FindQuery) -> Result<Vec<Document>> {
        let mut documents = self.collection_documents(database, collection)?;
        if let Some(predicate) = &query.filter {
            documents.retain(|document| matches(predicate, document));
        }
        documents.sort_by(|a, b| compare_values(sort_key(a), sort_key(b)));

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(documents.into_iter().skip(skip).take(limit).collect())
    }

    fn admin_command(&self, diagnostic: Diagnostic) -> Result<Document> {
        let document = match diagnostic {
            Diagnostic::CurrentOp => doc! { "inprog": [], "ok": 1.0 },
            Diagnostic::ServerStatus => doc! {
                "host": "memory",
                "process": "mongofs",
                "uptime": 0,
                "ok": 1.0,
            },
            Diagnostic::BuildInfo => doc! {
                "version": env!("CARGO_PKG_VERSION"),
                "gitVersion": "memory",
                "ok": 1.0,
            },
            Diagnostic::HostInfo => doc! {
                "system": { "hostname": "localhost" },
                "ok": 1.0,
            },
            Diagnostic::ListCommands => {
                let mut commands = Document::new();
                for diagnostic in Diagnostic::ALL {
                    commands.insert(diagnostic.command_name(), doc! { "adminOnly": true });
                }
                doc! { "commands": commands, "ok": 1.0 }
            }
        };
        Ok(document)
    }
}

fn encoded_size(documents: &[Document]) -> Result<i64> {
    let mut size = 0i64;
    for document in documents {
        size += projection::encode_bson(document)?.len() as i64;
    }
    Ok(size)
}

fn sort_key(document: &Document) -> &Bson {
    document.get(SORT_FIELD).unwrap_or(&Bson::Null)
}

// ── Query evaluation ─────────────────────────────────────────────

/// Whether `document` satisfies `predicate` the way the server would.
pub fn matches(predicate: &Predicate, document: &Document) -> bool {
    let values = lookup(document, predicate.field());
    predicate.candidates().iter().any(|candidate| {
        if values.is_empty() {
            // Equality with null also matches a missing field.
            return matches!(candidate, Bson::Null);
        }
        values.iter().any(|value| {
            values_equal(value, candidate)
                || matches!(value, Bson::Array(items) if items.iter().any(|item| values_equal(item, candidate)))
        })
    })
}

/// Resolve a dotted field path, descending into arrays of documents.
fn lookup<'a>(document: &'a Document, field: &str) -> Vec<&'a Bson> {
    let mut current: Vec<&Bson> = Vec::new();
    let mut parts = field.split('.');
    let Some(first) = parts.next() else {
        return current;
    };
    if let Some(value) = document.get(first) {
        current.push(value);
    }

    for part in parts {
        let mut next = Vec::new();
        for value in current {
            match value {
                Bson::Document(inner) => next.extend(inner.get(part)),
                Bson::Array(items) => {
                    if let Ok(position) = part.parse::<usize>() {
                        next.extend(items.get(position));
                    } else {
                        for item in items {
                            if let Bson::Document(inner) = item {
                                next.extend(inner.get(part));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

/// Equality with numeric values compared by value across numeric types.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            as_integer(a) == as_integer(b)
        }
        _ => match (as_any_number(a), as_any_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

fn as_integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        _ => None,
    }
}

/// Rank of a value's type in the server's cross-type sort order.
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::DbPointer(_) | Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => 12,
        Bson::MaxKey => 13,
    }
}

/// Total order used to sort on `_id`: type rank first, then value.
pub fn compare_values(a: &Bson, b: &Bson) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis().cmp(&y.timestamp_millis())
        }
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            (x.time, x.increment).cmp(&(y.time, y.increment))
        }
        (Bson::Document(x), Bson::Document(y)) => compare_sequences(
            x.iter().map(|(k, v)| (Some(k), v)),
            y.iter().map(|(k, v)| (Some(k), v)),
        ),
        (Bson::Array(x), Bson::Array(y)) => compare_sequences(
            x.iter().map(|v| (None, v)),
            y.iter().map(|v| (None, v)),
        ),
        _ => match (as_integer(a), as_integer(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => match (as_any_number(a), as_any_number(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            },
        },
    }
}

fn compare_sequences<'a>(
    mut left: impl Iterator<Item = (Option<&'a String>, &'a Bson)>,
    mut right: impl Iterator<Item = (Option<&'a String>, &'a Bson)>,
) -> Ordering {
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((lk, lv)), Some((rk, rv))) => {
                let ordering = compare_values(lv, rv).then_with(|| lk.cmp(&rk));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
