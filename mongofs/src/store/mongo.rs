use super::{DocumentStore, FindQuery, SORT_FIELD};
use crate::error::{MongoFsError, Result};
use crate::path::Diagnostic;
use bson::{doc, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::sync::Client;

const ADMIN_DB: &str = "admin";

/// A [`DocumentStore`] backed by a live server through the synchronous driver.
/// The driver's client is thread-safe and pools its own connections.
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Connect and verify the server answers. A failure here is fatal for
    /// the caller: nothing is served from an unreachable store.
    pub fn connect(uri: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)?;
        let store = MongoStore { client };
        store.ping()?;
        Ok(store)
    }

    fn ping(&self) -> Result<()> {
        self.client
            .database(ADMIN_DB)
            .run_command(doc! { "ping": 1 }, None)?;
        Ok(())
    }

    fn run_command(&self, database: &str, name: &str, argument: Bson) -> Result<Document> {
        let mut command = Document::new();
        command.insert(name, argument);
        log::debug!("Running {name} on {database}");
        Ok(self.client.database(database).run_command(command, None)?)
    }
}

impl DocumentStore for MongoStore {
    fn database_names(&self) -> Result<Vec<String>> {
        Ok(self.client.list_database_names(None, None)?)
    }

    fn collection_names(&self, database: &str) -> Result<Vec<String>> {
        Ok(self.client.database(database).list_collection_names(None)?)
    }

    fn database_stats(&self, database: &str) -> Result<Document> {
        self.run_command(database, "dbStats", Bson::Int32(1))
    }

    fn collection_stats(&self, database: &str, collection: &str) -> Result<Document> {
        self.run_command(database, "collStats", Bson::String(collection.to_string()))
    }

    fn indexes(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let response =
            self.run_command(database, "listIndexes", Bson::String(collection.to_string()))?;
        let batch = response
            .get_document("cursor")
            .and_then(|cursor| cursor.get_array("firstBatch"))
            .map_err(|e| MongoFsError::Store(format!("Malformed listIndexes reply: {e}")))?;

        Ok(batch
            .iter()
            .filter_map(|index| index.as_document().cloned())
            .collect())
    }

    fn find(&self, database: &str, collection: &str, query: &FindQuery) -> Result<Vec<Document>> {
        let mut sort = Document::new();
        sort.insert(SORT_FIELD, 1);

        let mut options = FindOptions::default();
        options.sort = Some(sort);
        options.skip = Some(query.skip);
        options.limit = query
            .limit
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));

        let filter = query.filter.as_ref().map(|predicate| predicate.to_filter());
        let cursor = self
            .client
            .database(database)
            .collection::<Document>(collection)
            .find(filter, options)?;

        let mut documents = Vec::new();
        for document in cursor {
            documents.push(document?);
        }
        Ok(documents)
    }

    fn admin_command(&self, diagnostic: Diagnostic) -> Result<Document> {
        self.run_command(ADMIN_DB, diagnostic.command_name(), Bson::Int32(1))
    }
}
