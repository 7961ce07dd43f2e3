use crate::config::Config;
use crate::error::{MongoFsError, Result};
use crate::path::Diagnostic;
use crate::predicate::Predicate;
use bson::{Bson, Document};
use std::sync::Arc;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Every find is sorted ascending on this field, so that a document's
/// ordinal is the same for listing, stat and read.
pub const SORT_FIELD: &str = "_id";

/// A find request: optional predicate, then skip/limit over the `_id` order.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub filter: Option<Predicate>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    /// Every document matching `filter`.
    pub fn all(filter: Option<Predicate>) -> Self {
        FindQuery {
            filter,
            skip: 0,
            limit: None,
        }
    }

    /// The single document at ordinal `index` among those matching `filter`.
    pub fn at(filter: Option<Predicate>, index: u64) -> Self {
        FindQuery {
            filter,
            skip: index,
            limit: Some(1),
        }
    }
}

/// The backing document store. Implementations must be safe to share
/// between the driver's worker threads.
pub trait DocumentStore: Send + Sync {
    fn database_names(&self) -> Result<Vec<String>>;

    fn collection_names(&self, database: &str) -> Result<Vec<String>>;

    /// Output of `dbStats`.
    fn database_stats(&self, database: &str) -> Result<Document>;

    /// Output of `collStats`.
    fn collection_stats(&self, database: &str, collection: &str) -> Result<Document>;

    fn indexes(&self, database: &str, collection: &str) -> Result<Vec<Document>>;

    /// Run a find. Results are always in ascending [`SORT_FIELD`] order.
    fn find(&self, database: &str, collection: &str, query: &FindQuery) -> Result<Vec<Document>>;

    /// Run the administrative command behind a diagnostic file.
    fn admin_command(&self, diagnostic: Diagnostic) -> Result<Document>;

    /// Storage used by a database: `totalSize`, else `dataSize`, else 0.
    fn database_size(&self, database: &str) -> Result<u64> {
        let stats = self.database_stats(database)?;
        let size = ["totalSize", "dataSize"]
            .iter()
            .find_map(|key| stats.get(*key).and_then(as_any_number))
            .unwrap_or(0.0);
        Ok(size.max(0.0) as u64)
    }

    /// Sum of [`DocumentStore::database_size`] over all databases.
    fn total_size(&self) -> Result<u64> {
        let mut sum = 0u64;
        for database in self.database_names()? {
            sum = sum.saturating_add(self.database_size(&database)?);
        }
        Ok(sum)
    }
}

/// Interpret any numeric BSON value as `f64`.
pub fn as_any_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Open the store selected by the configuration: a fixture file if one is
/// given, otherwise a live server (which must answer a ping).
pub fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    if let Some(fixture) = &config.fixture {
        log::info!("Loading fixture store from {}", fixture.display());
        return Ok(Arc::new(MemoryStore::from_json_file(fixture)?));
    }
    match &config.connection_string {
        Some(uri) => {
            log::info!("Connecting to MongoDB");
            Ok(Arc::new(MongoStore::connect(uri)?))
        }
        None => Err(MongoFsError::Config(
            "either a connection string or a fixture file is required".into(),
        )),
    }
}
